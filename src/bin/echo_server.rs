//! TCP echo server demo.
//!
//! Accepts connections and echoes every received byte back to the sender.
//! Stops gracefully on Ctrl+C.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::time::Instant;
use tracing::{debug, error, info};

use tinyserver::logging;
use tinyserver::transport::{handler_fn, Connection, Server};

const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "echo_server", about = "TCP echo server")]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    let address = format!("{}:{}", args.host, args.port);

    let server = match Server::bind(&address).await {
        Ok(server) => server,
        Err(e) => {
            error!("failed to create server: {e}");
            return ExitCode::from(1);
        }
    };
    server.set_handler(handler_fn(echo));

    info!("starting TCP echo server on {address}");
    if let Err(e) = server.start() {
        error!("failed to start server: {e}");
        return ExitCode::from(1);
    }

    info!("echo server is running, press Ctrl+C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to wait for shutdown signal: {e}");
    }

    info!("shutting down");
    if let Err(e) = server.stop().await {
        error!("error during shutdown: {e}");
        return ExitCode::from(1);
    }

    info!("server stopped successfully");
    ExitCode::SUCCESS
}

async fn echo(conn: Arc<Connection>) {
    let peer = conn.peer_addr();
    info!(%peer, "client connected");

    let mut buffer = [0u8; 1024];
    loop {
        conn.set_deadline(Instant::now() + IDLE_TIMEOUT);

        let n = match conn.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(%peer, "read error: {e}");
                break;
            }
        };

        debug!(%peer, "echoing {n} bytes");
        if let Err(e) = conn.write(&buffer[..n]).await {
            debug!(%peer, "write error: {e}");
            break;
        }
    }

    info!(%peer, "client disconnected");
}

//! TCP echo client demo.
//!
//! Sends a single message with `--message`, or runs an interactive loop
//! reading lines from stdin. Exits non-zero on dial failure or when the
//! echoed bytes do not match what was sent.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{debug, error, info};

use tinyserver::logging;
use tinyserver::transport::{Connection, Dialer};

const DIAL_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "echo_client", about = "TCP echo client")]
struct Args {
    /// Server host to connect to
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port to connect to
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Single message to send (non-interactive mode)
    #[arg(long)]
    message: Option<String>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    let address = format!("{}:{}", args.host, args.port);
    info!("connecting to echo server at {address}");

    let dialer = Dialer::new();
    let conn = match dialer.dial_timeout(&address, DIAL_TIMEOUT).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("failed to connect to server: {e}");
            return ExitCode::from(1);
        }
    };
    info!("connected");

    let outcome = match &args.message {
        Some(message) => send_single_message(&conn, message).await,
        None => run_interactive(&conn).await,
    };

    let _ = conn.close().await;
    outcome
}

async fn send_single_message(conn: &Connection, message: &str) -> ExitCode {
    match echo_once(conn, message).await {
        Ok(response) if response == message => {
            info!("echo successful: {response:?}");
            ExitCode::SUCCESS
        }
        Ok(response) => {
            error!("echo mismatch, sent {message:?}, got {response:?}");
            ExitCode::from(1)
        }
        Err(e) => {
            error!("echo failed: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run_interactive(conn: &Connection) -> ExitCode {
    println!("Interactive echo mode. Type a message and press Enter; 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("input error: {e}");
                return ExitCode::from(1);
            }
        };

        let input = line.trim();
        if input == "quit" || input == "exit" {
            println!("Goodbye!");
            break;
        }
        if input.is_empty() {
            continue;
        }

        match echo_once(conn, input).await {
            Ok(response) => println!("Echo: {response}"),
            Err(e) => {
                error!("echo failed: {e}");
                return ExitCode::from(1);
            }
        }
    }

    ExitCode::SUCCESS
}

async fn echo_once(conn: &Connection, message: &str) -> tinyserver::Result<String> {
    conn.write(message.as_bytes()).await?;
    debug!("sent {message:?}");

    conn.set_read_deadline(Instant::now() + READ_TIMEOUT);

    let mut buffer = vec![0u8; message.len().max(1024)];
    let n = conn.read(&mut buffer).await?;
    Ok(String::from_utf8_lossy(&buffer[..n]).into_owned())
}

//! Server lifecycle, accept ordering, shutdown liveness and the echo
//! end-to-end scenario.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use tinyserver::transport::{handler_fn, Connection, Dialer, Listener, Server};
use tinyserver::ErrorKind;

async fn echo_handler(conn: Arc<Connection>) {
    let mut buffer = [0u8; 1024];
    loop {
        match conn.read(&mut buffer).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if conn.write(&buffer[..n]).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[tokio::test]
async fn echo_round_trip() {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    server.set_handler(handler_fn(echo_handler));
    server.start().unwrap();
    let addr = server.local_addr();

    let conn = Dialer::new().dial(addr).await.unwrap();
    let message = b"Hello, TinyServer!";
    conn.write(message).await.unwrap();

    conn.set_read_deadline(Instant::now() + Duration::from_secs(5));
    let mut buf = [0u8; 64];
    let n = conn.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], message);

    conn.close().await.unwrap();
    server.stop().await.unwrap();
}

#[tokio::test]
async fn start_requires_a_handler() {
    let server = Server::bind("127.0.0.1:0").await.unwrap();

    let err = server.start().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert!(err.to_string().contains("no connection handler set"));
    assert!(!server.is_running());
}

#[tokio::test]
async fn double_start_is_rejected() {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    server.set_handler(handler_fn(echo_handler));

    server.start().unwrap();
    let err = server.start().unwrap_err();
    assert!(err.to_string().contains("server is already running"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn stop_is_a_no_op_outside_running() {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    // never started
    server.stop().await.unwrap();

    // stop() on Created leaves the state untouched, so start still works
    server.set_handler(handler_fn(echo_handler));
    server.start().unwrap();
    assert!(server.is_running());

    server.stop().await.unwrap();
    // second stop after a real stop is also a no-op
    server.stop().await.unwrap();
    assert!(!server.is_running());
}

#[tokio::test]
async fn server_closes_connection_after_handler_returns() {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    server.set_handler(handler_fn(|_conn: Arc<Connection>| async {}));
    server.start().unwrap();

    let conn = Dialer::new().dial(server.local_addr()).await.unwrap();
    conn.set_read_deadline(Instant::now() + Duration::from_secs(5));

    // the worker closes the connection, so the client sees end of stream
    let mut buf = [0u8; 8];
    let n = conn.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);

    conn.close().await.unwrap();
    server.stop().await.unwrap();
}

#[tokio::test]
async fn accept_preserves_dial_order() {
    let listener = Listener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr();

    let dials = tokio::spawn(async move {
        let dialer = Dialer::new();
        let mut conns = Vec::new();
        for i in 0u8..5 {
            let conn = dialer.dial(addr).await.unwrap();
            conn.write(&[i]).await.unwrap();
            conns.push(conn);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        conns
    });

    for expected in 0u8..5 {
        let conn = listener.accept().await.unwrap();
        let mut buf = [0u8; 1];
        conn.set_read_deadline(Instant::now() + Duration::from_secs(5));
        let n = conn.read(&mut buf).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(buf[0], expected);
        conn.close().await.unwrap();
    }

    let conns = dials.await.unwrap();
    for conn in conns {
        let _ = conn.close().await;
    }
    listener.close().unwrap();
}

#[tokio::test]
async fn closed_listener_rejects_accept_immediately() {
    let listener = Listener::bind("127.0.0.1:0").await.unwrap();
    listener.close().unwrap();

    let started = Instant::now();
    let err = listener.accept().await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(err.to_string().contains("listener is closed"));

    // close is idempotent
    listener.close().unwrap();
}

#[tokio::test]
async fn close_unblocks_a_pending_accept() {
    let listener = Arc::new(Listener::bind("127.0.0.1:0").await.unwrap());

    let pending = {
        let listener = Arc::clone(&listener);
        tokio::spawn(async move { listener.accept().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    listener.close().unwrap();

    let result =
        tokio::time::timeout(Duration::from_secs(1), pending).await.unwrap().unwrap();
    assert!(result.unwrap_err().to_string().contains("listener is closed"));
}

#[tokio::test]
async fn stopped_server_stops_accepting() {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    server.set_handler(handler_fn(echo_handler));
    server.start().unwrap();
    let addr = server.local_addr();

    server.stop().await.unwrap();

    // either the dial is refused outright or the connection is never serviced
    if let Ok(conn) = Dialer::new().dial_timeout(addr, Duration::from_millis(500)).await {
        conn.set_read_deadline(Instant::now() + Duration::from_millis(500));
        conn.write(b"anyone there?").await.ok();
        let mut buf = [0u8; 8];
        match conn.read(&mut buf).await {
            Ok(n) => assert_eq!(n, 0, "no worker should echo after stop"),
            Err(_) => {}
        }
        let _ = conn.close().await;
    }
}

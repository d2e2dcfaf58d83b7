//! HTTP served over the TCP engine: a worker decodes the request straight
//! off the connection, invokes application logic and serializes the
//! response back onto the wire.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::time::Instant;
use tokio_util::codec::Decoder;

use tinyserver::codec::RequestDecoder;
use tinyserver::parser::Parser;
use tinyserver::protocol::{Message, PayloadItem, Request, Response, StatusCode};
use tinyserver::transport::{handler_fn, Connection, Dialer, Server};

/// Incrementally decodes one request from the connection.
async fn read_request(conn: &Connection) -> Option<Request> {
    let mut decoder = RequestDecoder::new();
    let mut buffer = BytesMut::new();
    let mut chunk = [0u8; 4096];
    let mut head: Option<Request> = None;
    let mut body = BytesMut::new();

    loop {
        loop {
            match decoder.decode(&mut buffer) {
                Ok(Some(Message::Head(request))) => head = Some(request),
                Ok(Some(Message::Payload(PayloadItem::Chunk(bytes)))) => {
                    body.extend_from_slice(&bytes)
                }
                Ok(Some(Message::Payload(PayloadItem::Eof))) => {
                    let mut request = head.take()?;
                    request.set_body(body.freeze());
                    return Some(request);
                }
                Ok(None) => break,
                Err(_) => return None,
            }
        }

        conn.set_read_deadline(Instant::now() + Duration::from_secs(5));
        let n = conn.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
}

async fn http_worker(conn: Arc<Connection>) {
    let mut response = match read_request(&conn).await {
        Some(request) => {
            let name = request.query_param("name").unwrap_or_else(|| "stranger".to_owned());
            Response::text(StatusCode::OK, format!("hello {name}"))
        }
        None => Response::error_page(StatusCode::BAD_REQUEST, "malformed request"),
    };
    response.set_common_headers();

    let _ = conn.write(&response.to_bytes()).await;
}

async fn exchange(addr: std::net::SocketAddr, raw: &[u8]) -> Response {
    let conn = Dialer::new().dial(addr).await.unwrap();
    conn.write(raw).await.unwrap();

    // the server stamps Connection: close and the worker closes the socket,
    // so reading to end of stream yields exactly one response
    let mut wire = Vec::new();
    let mut chunk = [0u8; 4096];
    conn.set_read_deadline(Instant::now() + Duration::from_secs(5));
    loop {
        match conn.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => wire.extend_from_slice(&chunk[..n]),
        }
    }
    let _ = conn.close().await;

    Parser::new().parse_response_bytes(&wire).unwrap()
}

#[tokio::test]
async fn get_with_query_is_served() {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    server.set_handler(handler_fn(http_worker));
    server.start().unwrap();

    let response =
        exchange(server.local_addr(), b"GET /greet?name=world HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"hello world");
    assert_eq!(response.header("connection"), Some("close"));
    assert_eq!(response.header("server"), Some("TinyServer/1.0"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn post_body_reaches_the_worker() {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    server.set_handler(handler_fn(|conn: Arc<Connection>| async move {
        let mut response = match read_request(&conn).await {
            Some(request) => Response::text(
                StatusCode::OK,
                format!("got {} bytes", request.body().len()),
            ),
            None => Response::error_page(StatusCode::BAD_REQUEST, ""),
        };
        response.set_common_headers();
        let _ = conn.write(&response.to_bytes()).await;
    }));
    server.start().unwrap();

    let response = exchange(
        server.local_addr(),
        b"POST /data HTTP/1.1\r\nHost: localhost\r\nContent-Length: 11\r\n\r\nhello bytes",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"got 11 bytes");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn malformed_request_gets_a_400() {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    server.set_handler(handler_fn(http_worker));
    server.start().unwrap();

    let response = exchange(server.local_addr(), b"GET /invalid request line\r\n\r\n").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(std::str::from_utf8(response.body()).unwrap().contains("400 Bad Request"));

    server.stop().await.unwrap();
}

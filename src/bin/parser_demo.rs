//! HTTP parser demo: feeds built-in samples through the parser and prints
//! what comes out.

use tinyserver::parser::Parser;
use tinyserver::protocol::{Request, Response};

const SAMPLES: &[(&str, &[u8])] = &[
    (
        "Simple GET",
        b"GET /hello HTTP/1.1\r\nHost: example.com\r\nUser-Agent: TinyClient/1.0\r\n\r\n",
    ),
    (
        "POST with JSON body",
        b"POST /api/users HTTP/1.1\r\nHost: api.example.com\r\nContent-Type: application/json\r\n\
Content-Length: 40\r\nAuthorization: Bearer token123\r\n\r\n\
{\"username\":\"user\",\"password\":\"pass123\"}",
    ),
    (
        "GET with query parameters",
        b"GET /api/users?id=123&sort=name HTTP/1.1\r\nHost: example.com\r\n\r\n",
    ),
    (
        "Chunked POST",
        b"POST /upload HTTP/1.1\r\nHost: example.com\r\nTransfer-Encoding: chunked\r\n\r\n\
5\r\nHello\r\n6\r\n World\r\n0\r\n\r\n",
    ),
    ("Malformed request line", b"GET /invalid request line\r\n\r\n"),
];

const RESPONSE_SAMPLE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
Content-Length: 50\r\nServer: TinyServer/1.0\r\n\r\n\
{\"status\":\"success\",\"message\":\"Request processed\"}";

fn main() {
    let parser = Parser::new();

    for (label, raw) in SAMPLES {
        println!("=== {label} ===");
        match parser.parse_request_bytes(raw) {
            Ok(request) => print_request(&request),
            Err(e) => println!("parse error: {e}"),
        }
        println!();
    }

    println!("=== Response sample ===");
    match parser.parse_response_bytes(RESPONSE_SAMPLE) {
        Ok(response) => print_response(&response),
        Err(e) => println!("parse error: {e}"),
    }
}

fn print_request(request: &Request) {
    println!("{} {} {}", request.method(), request.path(), request.version());
    for (name, value) in request.headers().iter() {
        println!("  {name}: {value}");
    }

    let query = request.query();
    if !query.is_empty() {
        println!("query parameters:");
        for (key, value) in query.iter() {
            println!("  {key} = {value}");
        }
    }

    if request.body().is_empty() {
        println!("no body");
    } else {
        println!("body ({} bytes): {}", request.body().len(), String::from_utf8_lossy(request.body()));
    }
}

fn print_response(response: &Response) {
    println!("{} {} {}", response.version(), response.status(), response.status().reason());
    for (name, value) in response.headers().iter() {
        println!("  {name}: {value}");
    }
    if !response.body().is_empty() {
        println!("body ({} bytes): {}", response.body().len(), String::from_utf8_lossy(response.body()));
    }
}

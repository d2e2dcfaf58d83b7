//! The response value and its convenience constructors.

use std::time::SystemTime;

use bytes::Bytes;
use httpdate::fmt_http_date;

use crate::protocol::header;
use crate::protocol::{HeaderMap, StatusCode, Version};

/// The `Server` header value stamped by [`Response::set_common_headers`].
pub const SERVER_NAME: &str = "TinyServer/1.0";

/// A parsed or locally built HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, version: Version) -> Self {
        Self { status, version, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// A plain-text response with `Content-Type` and a byte-accurate
    /// `Content-Length`.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_typed_body(status, header::MIME_TEXT_PLAIN, body.into())
    }

    /// An HTML response.
    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_typed_body(status, header::MIME_TEXT_HTML, body.into())
    }

    /// A JSON response. The payload is taken verbatim.
    pub fn json(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_typed_body(status, header::MIME_APPLICATION_JSON, body.into())
    }

    /// A redirect carrying `Location` and a small HTML body linking to the
    /// target.
    pub fn redirect(status: StatusCode, location: &str) -> Self {
        let html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n    <title>{code} {reason}</title>\n</head>\n\
             <body>\n    <h1>{code} {reason}</h1>\n    <p>The document has moved \
             <a href=\"{location}\">here</a>.</p>\n    <hr>\n    <p><em>TinyServer</em></p>\n\
             </body>\n</html>",
            code = status.as_u16(),
            reason = status.reason(),
        );
        let mut response = Self::with_typed_body(status, header::MIME_TEXT_HTML, html);
        response.headers.set(header::LOCATION, location);
        response
    }

    /// A standard HTML error page parameterised by code and message.
    pub fn error_page(status: StatusCode, message: &str) -> Self {
        let message = if message.is_empty() { status.reason() } else { message };
        let html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n    <title>{code} {reason}</title>\n</head>\n\
             <body>\n    <h1>{code} {reason}</h1>\n    <p>{message}</p>\n    <hr>\n    \
             <p><em>TinyServer</em></p>\n</body>\n</html>",
            code = status.as_u16(),
            reason = status.reason(),
        );
        Self::with_typed_body(status, header::MIME_TEXT_HTML, html)
    }

    /// A JSON error payload parameterised by code and message.
    pub fn error_json(status: StatusCode, message: &str) -> Self {
        let message = if message.is_empty() { status.reason() } else { message };
        let json = format!(
            "{{\n    \"error\": {{\n        \"code\": {},\n        \"message\": \"{}\"\n    }}\n}}",
            status.as_u16(),
            message,
        );
        Self::with_typed_body(status, header::MIME_APPLICATION_JSON, json)
    }

    fn with_typed_body(status: StatusCode, content_type: &str, body: String) -> Self {
        let mut response = Self::new(status, Version::Http11);
        response.headers.set(header::CONTENT_TYPE, content_type);
        response.headers.set(header::CONTENT_LENGTH, body.len().to_string());
        response.body = Bytes::from(body);
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn content_length(&self) -> u64 {
        self.headers.content_length()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_error(&self) -> bool {
        self.status.is_error()
    }

    pub fn is_redirection(&self) -> bool {
        self.status.is_redirection()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.append(name, value);
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Stamps `Server`, `Date` (HTTP-date format) and `Connection: close`.
    pub fn set_common_headers(&mut self) {
        self.headers.set(header::SERVER, SERVER_NAME);
        self.headers.set(header::DATE, fmt_http_date(SystemTime::now()));
        self.headers.set(header::CONNECTION, "close");
    }

    /// Serializes the response bit-exactly to wire format.
    pub fn to_bytes(&self) -> Bytes {
        crate::codec::encode_response(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_sets_type_and_byte_length() {
        let response = Response::text(StatusCode::OK, "héllo");
        assert_eq!(response.header(header::CONTENT_TYPE), Some("text/plain"));
        // byte length, not character count
        assert_eq!(response.header(header::CONTENT_LENGTH), Some("6"));
        assert_eq!(response.body().as_ref(), "héllo".as_bytes());
    }

    #[test]
    fn json_sets_mime_type() {
        let response = Response::json(StatusCode::CREATED, "{\"ok\":true}");
        assert_eq!(response.header(header::CONTENT_TYPE), Some("application/json"));
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn redirect_sets_location_and_links_target() {
        let response = Response::redirect(StatusCode::FOUND, "/new-home");
        assert_eq!(response.header(header::LOCATION), Some("/new-home"));
        assert_eq!(response.header(header::CONTENT_TYPE), Some("text/html"));

        let body = std::str::from_utf8(response.body()).unwrap();
        assert!(body.contains("<a href=\"/new-home\">here</a>"));
        assert_eq!(response.content_length(), response.body().len() as u64);
    }

    #[test]
    fn error_page_defaults_message_to_reason() {
        let response = Response::error_page(StatusCode::NOT_FOUND, "");
        let body = std::str::from_utf8(response.body()).unwrap();
        assert!(body.contains("<h1>404 Not Found</h1>"));
        assert!(body.contains("<p>Not Found</p>"));
    }

    #[test]
    fn error_json_carries_code_and_message() {
        let response = Response::error_json(StatusCode::SERVICE_UNAVAILABLE, "try later");
        assert_eq!(response.header(header::CONTENT_TYPE), Some("application/json"));

        let body = std::str::from_utf8(response.body()).unwrap();
        assert!(body.contains("\"code\": 503"));
        assert!(body.contains("\"message\": \"try later\""));
    }

    #[test]
    fn common_headers_are_stamped() {
        let mut response = Response::text(StatusCode::OK, "hi");
        response.set_common_headers();

        assert_eq!(response.header(header::SERVER), Some(SERVER_NAME));
        assert_eq!(response.header(header::CONNECTION), Some("close"));
        let date = response.header(header::DATE).unwrap();
        assert!(date.ends_with(" GMT"));
    }
}

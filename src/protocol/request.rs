//! The request value and its builder.

use bytes::Bytes;

use crate::protocol::header;
use crate::protocol::{HeaderMap, Method, Query, Version};

/// A parsed or locally built HTTP request.
///
/// The value is immutable after parse except through the explicit setters.
/// `path` keeps the optional query string; decoded parameters are derived
/// lazily through [`Request::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    path: String,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>, version: Version) -> Self {
        Self { method, path: path.into(), version, headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub fn builder(method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, path)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The request target, including the query string when present.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The request target with the query string stripped.
    pub fn path_without_query(&self) -> &str {
        match self.path.split_once('?') {
            Some((path, _)) => path,
            None => &self.path,
        }
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

    /// The first value of `name`, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Query parameters decoded from the path, first value per key.
    pub fn query(&self) -> Query {
        match self.path.split_once('?') {
            Some((_, raw)) => Query::from(raw),
            None => Query::default(),
        }
    }

    /// The first value for `key` in the query string.
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.query().get(key).map(str::to_owned)
    }

    /// `Content-Length` as declared in the headers, 0 when absent.
    pub fn content_length(&self) -> u64 {
        self.headers.content_length()
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Replaces all values of `name` with `value`.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Appends a value under `name`, keeping earlier ones.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.append(name, value);
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Serializes the request bit-exactly to wire format.
    pub fn to_bytes(&self) -> Bytes {
        crate::codec::encode_request(self)
    }
}

/// Builds a request in memory, keeping `Content-Length` in sync with the
/// body it is given.
#[derive(Debug)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { request: Request::new(method, path, Version::Http11) }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.request.version = version;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.append(name, value);
        self
    }

    /// Sets the body and stamps a byte-accurate `Content-Length`.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        if !body.is_empty() {
            self.request.headers.set(header::CONTENT_LENGTH, body.len().to_string());
        }
        self.request.body = body;
        self
    }

    pub fn build(self) -> Request {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_and_query_derivation() {
        let req = Request::new(Method::Get, "/api/users?id=123&name=a+b", Version::Http11);
        assert_eq!(req.path(), "/api/users?id=123&name=a+b");
        assert_eq!(req.path_without_query(), "/api/users");
        assert_eq!(req.query().get("id"), Some("123"));
        assert_eq!(req.query_param("name").as_deref(), Some("a b"));
    }

    #[test]
    fn no_query_yields_empty_params() {
        let req = Request::new(Method::Get, "/hello", Version::Http11);
        assert!(req.query().is_empty());
        assert_eq!(req.query_param("id"), None);
    }

    #[test]
    fn set_path_changes_derived_query() {
        let mut req = Request::new(Method::Get, "/a?x=1", Version::Http11);
        assert_eq!(req.query().get("x"), Some("1"));

        req.set_path("/b?y=2");
        assert_eq!(req.query().get("x"), None);
        assert_eq!(req.query().get("y"), Some("2"));
    }

    #[test]
    fn builder_stamps_content_length() {
        let req = Request::builder(Method::Post, "/api/users")
            .header("Host", "api.example.com")
            .body(&b"{\"k\":\"v\"}"[..])
            .build();

        assert_eq!(req.header(header::CONTENT_LENGTH), Some("9"));
        assert_eq!(req.content_length(), 9);
        assert_eq!(req.body().as_ref(), b"{\"k\":\"v\"}");
    }

    #[test]
    fn builder_leaves_empty_body_unframed() {
        let req = Request::builder(Method::Get, "/").build();
        assert!(!req.headers().contains(header::CONTENT_LENGTH));
        assert!(req.body().is_empty());
    }
}

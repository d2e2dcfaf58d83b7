//! The HTTP/1.1 message model.
//!
//! Values in this module are plain data: a [`Request`] or [`Response`] holds
//! a method or status, a version, an ordered multi-value [`HeaderMap`] and a
//! body. Turning bytes into these values and back is the job of
//! [`crate::codec`] and [`crate::parser`].

mod error;
pub mod header;
mod message;
mod method;
mod query;
mod request;
mod response;
mod status;
mod version;

pub use error::{ParseError, SendError};
pub use header::HeaderMap;
pub use message::{Message, PayloadItem, PayloadSize};
pub use method::Method;
pub use query::{percent_decode, Query};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use status::StatusCode;
pub use version::Version;

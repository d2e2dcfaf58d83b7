//! A didactic HTTP/1.1 implementation built from scratch on TCP.
//!
//! The crate owns the whole stack between the socket and the message model:
//! the transport layer (connections with deadlines, a listener with an
//! observable shutdown, a dialer, a worker-per-connection server) and the
//! HTTP/1.1 codec (a strict parser and a bit-exact serializer for requests
//! and responses framed by `Content-Length` or chunked transfer encoding).

pub mod codec;
pub mod error;
pub mod logging;
pub mod parser;
pub mod protocol;
pub mod transport;

pub use error::{Error, ErrorKind, Result};

pub(crate) use help::ensure;

mod help {

    macro_rules! ensure {
        ($predicate:expr, $error:expr) => {
            if !$predicate {
                return Err($error);
            }
        };
    }
    pub(crate) use ensure;
}

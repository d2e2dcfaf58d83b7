//! The TCP layer: connections, listener, dialer, server.
//!
//! A [`Connection`] is a bidirectional byte stream with per-direction
//! deadlines and an idempotent close; [`MessageConnection`] adds
//! delimiter-framed messaging on top. The [`Listener`] hands out accepted
//! connections in order and stays unblockable on shutdown, the [`Dialer`]
//! produces configured outbound connections, and the [`Server`] runs one
//! worker task per connection until stopped.

mod connection;
mod dialer;
mod listener;
mod server;

pub use connection::{Connection, MessageConnection, MAX_MESSAGE_SIZE};
pub use dialer::{Dialer, DEFAULT_DIAL_TIMEOUT, DEFAULT_KEEP_ALIVE};
pub use listener::Listener;
pub use server::{handler_fn, ConnectionHandler, Server, SHUTDOWN_TIMEOUT};

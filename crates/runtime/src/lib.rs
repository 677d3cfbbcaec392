//! Engine session runtime: transports, request correlation and session lifecycle.
//!
//! [`Session`] is the entry point: it owns one socket, runs the inbound message
//! loop and hands out correlation ids. [`FakeTransportBuilder`] provides an
//! in-memory transport for tests.

pub mod connection;
pub mod error;
pub mod fake_transport;
pub mod session;
pub mod transport;
pub mod websocket;

pub use dashtap_protocol as protocol;

pub use connection::{Connection, PendingCall, SessionPhase};
pub use error::{Error, Result};
pub use fake_transport::{FakeTransportBuilder, FakeTransportController};
pub use session::Session;
pub use transport::{Transport, TransportParts, TransportReceiver};
pub use websocket::WebSocketTransport;

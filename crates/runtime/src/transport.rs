//! Transport seam between the connection and the socket.
//!
//! A transport is split into a sending half owned by the [`Connection`] and a
//! receiving half that runs as its own task, forwarding decoded frames over an
//! unbounded channel.
//!
//! [`Connection`]: crate::connection::Connection

use std::future::Future;
use std::pin::Pin;

use serde_json::Value as JsonValue;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Sending half of a transport.
pub trait Transport: Send {
	/// Sends one JSON message to the engine.
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

	/// Closes the underlying socket.
	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Receiving half of a transport.
///
/// `run` completes with `Ok(())` when the peer closes the socket and with an
/// error when a frame cannot be read or decoded.
pub trait TransportReceiver: Send {
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Everything a [`Connection`] needs to talk to one engine endpoint.
///
/// [`Connection`]: crate::connection::Connection
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<JsonValue>,
}

/// Decodes one text frame into JSON.
pub fn decode_frame(text: &str) -> Result<JsonValue> {
	serde_json::from_str(text).map_err(|e| {
		let preview: String = text.chars().take(120).collect();
		Error::Protocol(format!("frame is not JSON ({e}): {preview}"))
	})
}

//! Error types for the engine session runtime.

use thiserror::Error;

/// Result alias used throughout the runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Session-level failures.
///
/// Variants carry rendered messages so a single close reason can be handed to
/// every request still waiting when the session goes down.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
	/// Socket-level failure (connect, send, read).
	#[error("transport error: {0}")]
	Transport(String),

	/// The socket closed before the awaited reply or notification arrived.
	#[error("connection closed before the engine replied")]
	ConnectionClosed,

	/// An inbound frame could not be decoded as a protocol message.
	#[error("protocol error: {0}")]
	Protocol(String),

	/// The engine answered a call with a JSON-RPC error member.
	#[error("engine error {code} for request {id}: {message}")]
	Engine { id: u32, code: i64, message: String },

	#[error("serialization error: {0}")]
	Serde(String),
}

impl Error {
	/// Returns `true` for failures of the socket itself, including premature close.
	pub fn is_transport(&self) -> bool {
		matches!(self, Error::Transport(_) | Error::ConnectionClosed)
	}

	/// Returns `true` for undecodable inbound frames.
	pub fn is_protocol(&self) -> bool {
		matches!(self, Error::Protocol(_))
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Serde(err.to_string())
	}
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
	fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
		Error::Transport(err.to_string())
	}
}

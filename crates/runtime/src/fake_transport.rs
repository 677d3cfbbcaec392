//! Fake transport for testing request correlation and session phases.
//!
//! Provides an in-memory transport so the protocol layer can be exercised
//! without an engine.
//!
//! # Example
//!
//! ```ignore
//! let (parts, controller) = FakeTransportBuilder::new().build();
//! controller.inject_connected();
//! let session = Session::open("fake://engine", parts).await?;
//!
//! let pending = session.call("GetDocList", GLOBAL_HANDLE, json!([])).await?;
//! controller.inject_response(pending.id(), json!({"qDocList": []}));
//! let result = pending.response().await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex as AsyncMutex, Notify, mpsc};

use crate::error::Result;
use crate::protocol::method;
use crate::transport::{Transport, TransportParts, TransportReceiver, decode_frame};

/// Frame queued for delivery to the connection.
enum FakeFrame {
	Json(JsonValue),
	Text(String),
	Disconnect,
}

/// Builder for creating fake transport instances.
#[derive(Default)]
pub struct FakeTransportBuilder {}

impl FakeTransportBuilder {
	pub fn new() -> Self {
		Self {}
	}

	/// Build the fake transport and return both parts and a controller.
	///
	/// Returns [`TransportParts`] for opening a [`Session`] and a
	/// [`FakeTransportController`] for injecting frames and inspecting sent messages.
	///
	/// [`Session`]: crate::session::Session
	pub fn build(self) -> (TransportParts, FakeTransportController) {
		let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let sent = Arc::new(Mutex::new(Vec::new()));
		let closes = Arc::new(AtomicUsize::new(0));
		let closed = Arc::new(Notify::new());

		let sender = FakeTransportSender {
			sent: Arc::clone(&sent),
			outbound_tx,
			closes: Arc::clone(&closes),
			closed: Arc::clone(&closed),
		};

		let receiver = FakeTransportReceiver {
			inbound_rx,
			message_tx,
			closed,
		};

		let controller = FakeTransportController {
			inbound_tx,
			sent,
			outbound_rx: AsyncMutex::new(outbound_rx),
			closes,
		};

		let parts = TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		};

		(parts, controller)
	}
}

/// Controller for injecting inbound frames and observing the client side.
pub struct FakeTransportController {
	inbound_tx: mpsc::UnboundedSender<FakeFrame>,
	sent: Arc<Mutex<Vec<JsonValue>>>,
	outbound_rx: AsyncMutex<mpsc::UnboundedReceiver<JsonValue>>,
	closes: Arc<AtomicUsize>,
}

impl FakeTransportController {
	/// Inject a raw JSON frame as if the engine had sent it.
	pub fn inject(&self, message: JsonValue) {
		let _ = self.inbound_tx.send(FakeFrame::Json(message));
	}

	/// Inject an undecoded text frame; non-JSON text surfaces as a protocol error.
	pub fn inject_text(&self, text: impl Into<String>) {
		let _ = self.inbound_tx.send(FakeFrame::Text(text.into()));
	}

	/// True once the receiving half has been dropped, e.g. after its task was aborted.
	pub fn receiver_dropped(&self) -> bool {
		self.inbound_tx.is_closed()
	}

	/// Inject the engine's session-ready notification.
	pub fn inject_connected(&self) {
		self.inject_notification(method::ON_CONNECTED, serde_json::json!({"qSessionState": "SESSION_CREATED"}));
	}

	pub fn inject_notification(&self, method: &str, params: JsonValue) {
		self.inject(serde_json::json!({
			"jsonrpc": "2.0",
			"method": method,
			"params": params
		}));
	}

	/// Inject a successful reply for correlation id `id`.
	pub fn inject_response(&self, id: u32, result: JsonValue) {
		self.inject(serde_json::json!({
			"jsonrpc": "2.0",
			"id": id,
			"result": result
		}));
	}

	/// Inject a JSON-RPC error reply for correlation id `id`.
	pub fn inject_error(&self, id: u32, code: i64, message: &str) {
		self.inject(serde_json::json!({
			"jsonrpc": "2.0",
			"id": id,
			"error": {
				"code": code,
				"message": message
			}
		}));
	}

	/// Simulate the engine dropping the socket.
	pub fn disconnect(&self) {
		let _ = self.inbound_tx.send(FakeFrame::Disconnect);
	}

	/// Wait for the next message the client sends.
	///
	/// Returns `None` once the client side of the transport is gone.
	pub async fn next_sent(&self) -> Option<JsonValue> {
		self.outbound_rx.lock().await.recv().await
	}

	/// Take all sent messages recorded so far, clearing the buffer.
	pub fn take_sent(&self) -> Vec<JsonValue> {
		std::mem::take(&mut *self.sent.lock())
	}

	/// Number of times the client closed the transport.
	pub fn close_count(&self) -> usize {
		self.closes.load(Ordering::SeqCst)
	}
}

struct FakeTransportSender {
	sent: Arc<Mutex<Vec<JsonValue>>>,
	outbound_tx: mpsc::UnboundedSender<JsonValue>,
	closes: Arc<AtomicUsize>,
	closed: Arc<Notify>,
}

impl Transport for FakeTransportSender {
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		self.sent.lock().push(message.clone());
		let _ = self.outbound_tx.send(message);
		Box::pin(async { Ok(()) })
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		self.closes.fetch_add(1, Ordering::SeqCst);
		self.closed.notify_one();
		Box::pin(async { Ok(()) })
	}
}

struct FakeTransportReceiver {
	inbound_rx: mpsc::UnboundedReceiver<FakeFrame>,
	message_tx: mpsc::UnboundedSender<JsonValue>,
	closed: Arc<Notify>,
}

impl TransportReceiver for FakeTransportReceiver {
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			loop {
				let frame = tokio::select! {
					biased;
					frame = self.inbound_rx.recv() => frame,
					_ = self.closed.notified() => return Ok(()),
				};

				let value = match frame {
					Some(FakeFrame::Json(value)) => value,
					Some(FakeFrame::Text(text)) => decode_frame(&text)?,
					Some(FakeFrame::Disconnect) | None => return Ok(()),
				};

				if self.message_tx.send(value).is_err() {
					return Ok(());
				}
			}
		})
	}
}

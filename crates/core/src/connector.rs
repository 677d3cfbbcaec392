//! Session factory seam used by the pipeline components.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use dashtap_runtime::{Error as RuntimeError, Session, TransportParts};
use parking_lot::Mutex;
use url::Url;

use crate::error::Result;

/// Opens connected sessions against engine endpoints.
///
/// Production code uses [`WebSocketConnector`]; tests hand out sessions over
/// the in-memory fake transport.
pub trait Connector: Send + Sync {
	fn open<'a>(&'a self, endpoint: &'a Url) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>>;
}

/// Connects over a real WebSocket.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
	fn open<'a>(&'a self, endpoint: &'a Url) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>> {
		Box::pin(async move { Ok(Session::connect(endpoint.as_str()).await?) })
	}
}

/// Hands out pre-built transports in order, one per `open`.
///
/// Pair with [`FakeTransportBuilder`](dashtap_runtime::FakeTransportBuilder) to
/// script an engine in tests.
#[derive(Default)]
pub struct QueuedConnector {
	parts: Mutex<VecDeque<TransportParts>>,
	opened: Mutex<Vec<Url>>,
}

impl QueuedConnector {
	pub fn new(parts: impl IntoIterator<Item = TransportParts>) -> Self {
		Self {
			parts: Mutex::new(parts.into_iter().collect()),
			opened: Mutex::new(Vec::new()),
		}
	}

	/// Endpoints opened so far, in order.
	pub fn opened(&self) -> Vec<Url> {
		self.opened.lock().clone()
	}
}

impl Connector for QueuedConnector {
	fn open<'a>(&'a self, endpoint: &'a Url) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>> {
		Box::pin(async move {
			let parts = self.parts.lock().pop_front();
			let parts = parts.ok_or_else(|| RuntimeError::Transport(format!("no transport queued for {endpoint}")))?;
			self.opened.lock().push(endpoint.clone());
			Ok(Session::open(endpoint.as_str(), parts).await?)
		})
	}
}

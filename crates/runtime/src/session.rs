//! Opened engine session: one socket, one message loop, one correlation space.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::connection::{Connection, PendingCall, SessionPhase};
use crate::error::Result;
use crate::transport::TransportParts;
use crate::websocket::WebSocketTransport;

/// A connected session against one engine endpoint.
///
/// Owned by whichever component opened it; that component is responsible for
/// calling [`Session::terminate`] once it has consumed what it needs.
pub struct Session {
	connection: Arc<Connection>,
	endpoint: String,
	loop_task: JoinHandle<()>,
}

impl Session {
	/// Connects a WebSocket to `endpoint` and waits for the engine's `OnConnected`.
	pub async fn connect(endpoint: &str) -> Result<Self> {
		let (transport, message_rx) = WebSocketTransport::connect(endpoint).await?;
		Self::open(endpoint, transport.into_transport_parts(message_rx)).await
	}

	/// Starts the message loop over `parts` and waits for `OnConnected`.
	///
	/// A socket that opens but never announces readiness stalls here; there is no timeout.
	pub async fn open(endpoint: impl Into<String>, parts: TransportParts) -> Result<Self> {
		let endpoint = endpoint.into();
		let connection = Arc::new(Connection::new(parts));
		let loop_task = tokio::spawn({
			let connection = Arc::clone(&connection);
			async move { connection.run().await }
		});

		let session = Self {
			connection,
			endpoint,
			loop_task,
		};

		debug!(target = "dashtap.session", endpoint = %session.endpoint, "waiting for OnConnected");
		if let Err(e) = session.connection.wait_connected().await {
			session.terminate().await;
			return Err(e);
		}

		info!(target = "dashtap.session", endpoint = %session.endpoint, "engine session ready");
		Ok(session)
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	pub fn phase(&self) -> SessionPhase {
		self.connection.phase()
	}

	/// Sends a call; the reply is awaited through the returned [`PendingCall`].
	pub async fn call(&self, method: &str, handle: i64, params: Value) -> Result<PendingCall> {
		self.connection.call(method, handle, params).await
	}

	/// Sends a call and waits for its reply.
	pub async fn request(&self, method: &str, handle: i64, params: Value) -> Result<Value> {
		self.connection.send_message(method, handle, params).await
	}

	/// Closes the socket. Safe to call more than once.
	pub async fn terminate(&self) {
		self.connection.terminate().await;
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		self.loop_task.abort();
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::fake_transport::FakeTransportBuilder;
	use crate::protocol::{GLOBAL_HANDLE, method};

	#[tokio::test]
	async fn open_resolves_after_connected_notification() {
		let (parts, controller) = FakeTransportBuilder::new().build();
		controller.inject_notification("OnAuthenticationInformation", json!({"mustAuthenticate": false}));
		controller.inject_connected();

		let session = Session::open("fake://engine/app/engineData", parts).await.unwrap();
		assert_eq!(session.phase(), SessionPhase::Ready);
		assert_eq!(session.endpoint(), "fake://engine/app/engineData");
	}

	#[tokio::test]
	async fn open_fails_when_socket_drops_before_connected() {
		let (parts, controller) = FakeTransportBuilder::new().build();
		controller.disconnect();

		let err = Session::open("fake://engine", parts).await.err().unwrap();
		assert!(err.is_transport());
	}

	#[tokio::test]
	async fn request_round_trip() {
		let (parts, controller) = FakeTransportBuilder::new().build();
		controller.inject_connected();
		let session = Session::open("fake://engine", parts).await.unwrap();

		let request = session.request(method::GET_DOC_LIST, GLOBAL_HANDLE, json!([]));
		let reply = async {
			let sent = controller.next_sent().await.unwrap();
			assert_eq!(sent["method"], "GetDocList");
			controller.inject_response(sent["id"].as_u64().unwrap() as u32, json!({"qDocList": []}));
		};

		let (result, ()) = tokio::join!(request, reply);
		assert_eq!(result.unwrap(), json!({"qDocList": []}));

		session.terminate().await;
		session.terminate().await;
		assert_eq!(controller.close_count(), 1);
	}

	#[tokio::test]
	async fn dropping_session_stops_the_transport_receiver() {
		let (parts, controller) = FakeTransportBuilder::new().build();
		controller.inject_connected();
		let session = Session::open("fake://engine", parts).await.unwrap();
		assert!(!controller.receiver_dropped());

		drop(session);

		let stopped = tokio::time::timeout(std::time::Duration::from_secs(1), async {
			while !controller.receiver_dropped() {
				tokio::task::yield_now().await;
			}
		})
		.await;
		assert!(stopped.is_ok(), "receiver still running after session drop");
		assert_eq!(controller.close_count(), 0);
	}
}

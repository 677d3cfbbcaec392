//! JSON-RPC connection layer for the engine protocol.
//!
//! This module implements request/response correlation on top of a transport.
//! It handles:
//! - Generating correlation ids (starting at 1, unique per session)
//! - Keeping a pending-request map from correlation id to completion handle
//! - Tracking the session phase (awaiting `OnConnected`, ready, closed)
//! - Dispatching each inbound frame according to the current phase
//!
//! # Message Flow
//!
//! 1. Caller invokes [`Connection::call`] with method, handle and params
//! 2. Connection assigns the next id and parks a oneshot sender under it
//! 3. Request is serialized and sent via the transport
//! 4. Caller awaits the returned [`PendingCall`] whenever it likes
//! 5. The message loop receives a reply from the transport
//! 6. Reply is matched by id, never by arrival order, and completes the oneshot
//!
//! Many calls may be outstanding at once; the engine is free to answer them in
//! any order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{Message, Request, Response, method};
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Aborts the receiver task when the message loop ends or is itself aborted.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
	fn drop(&mut self) {
		self.0.abort();
	}
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
	/// Socket is open but the engine has not pushed `OnConnected` yet.
	AwaitingConnected,
	/// Calls may be issued.
	Ready,
	/// Terminated locally or dropped by the peer; no further frames are processed.
	Closed,
}

impl std::fmt::Display for SessionPhase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SessionPhase::AwaitingConnected => write!(f, "awaiting-connected"),
			SessionPhase::Ready => write!(f, "ready"),
			SessionPhase::Closed => write!(f, "closed"),
		}
	}
}

/// A sent request whose reply has not been consumed yet.
#[derive(Debug)]
pub struct PendingCall {
	id: u32,
	method: String,
	rx: oneshot::Receiver<Result<Value>>,
}

impl PendingCall {
	/// Correlation id the engine will echo back.
	pub fn id(&self) -> u32 {
		self.id
	}

	pub fn method(&self) -> &str {
		&self.method
	}

	/// Waits for the matching reply.
	///
	/// Resolves with the `result` member, an [`Error::Engine`] for error replies,
	/// or the session's close reason if it went down first.
	pub async fn response(self) -> Result<Value> {
		self.rx.await.map_err(|_| Error::ConnectionClosed).and_then(|result| result)
	}
}

type Callbacks = HashMap<u32, oneshot::Sender<Result<Value>>>;

/// JSON-RPC connection to one engine endpoint.
///
/// Shared across tasks behind an `Arc`; [`Connection::run`] drives the inbound
/// side while any number of tasks issue calls.
pub struct Connection {
	/// Last assigned correlation id; the first call gets 1.
	last_id: AtomicU32,
	/// Pending request completions keyed by correlation id.
	callbacks: Mutex<Callbacks>,
	sender: AsyncMutex<Box<dyn Transport>>,
	/// Taken by the first `run`.
	receiver: Mutex<Option<(Box<dyn TransportReceiver>, mpsc::UnboundedReceiver<Value>)>>,
	phase: watch::Sender<SessionPhase>,
	close_reason: Mutex<Option<Error>>,
	terminated: AtomicBool,
}

impl Connection {
	pub fn new(parts: TransportParts) -> Self {
		let (phase, _) = watch::channel(SessionPhase::AwaitingConnected);
		Self {
			last_id: AtomicU32::new(0),
			callbacks: Mutex::new(HashMap::new()),
			sender: AsyncMutex::new(parts.sender),
			receiver: Mutex::new(Some((parts.receiver, parts.message_rx))),
			phase,
			close_reason: Mutex::new(None),
			terminated: AtomicBool::new(false),
		}
	}

	pub fn phase(&self) -> SessionPhase {
		*self.phase.borrow()
	}

	/// Number of calls still waiting for a reply.
	pub fn pending_count(&self) -> usize {
		self.callbacks.lock().len()
	}

	/// Resolves once the engine has announced the session as connected.
	pub async fn wait_connected(&self) -> Result<()> {
		let mut rx = self.phase.subscribe();
		let phase = match rx.wait_for(|phase| *phase != SessionPhase::AwaitingConnected).await {
			Ok(phase) => *phase,
			Err(_) => return Err(self.close_reason()),
		};

		match phase {
			SessionPhase::Ready => Ok(()),
			_ => Err(self.close_reason()),
		}
	}

	/// Sends a request without waiting for its reply.
	pub async fn call(&self, method: &str, handle: i64, params: Value) -> Result<PendingCall> {
		if self.phase() == SessionPhase::Closed {
			return Err(self.close_reason());
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
		let request = serde_json::to_value(Request::new(id, method, handle, params))?;

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, tx);

		// The loop may have closed between the check above and the insert.
		if self.phase() == SessionPhase::Closed {
			self.callbacks.lock().remove(&id);
			return Err(self.close_reason());
		}

		if let Err(e) = self.sender.lock().await.send(request).await {
			self.callbacks.lock().remove(&id);
			return Err(e);
		}

		debug!(target = "dashtap.rpc", id, method, handle, "request sent");
		Ok(PendingCall {
			id,
			method: method.to_string(),
			rx,
		})
	}

	/// Sends a request and waits for its reply.
	pub async fn send_message(&self, method: &str, handle: i64, params: Value) -> Result<Value> {
		self.call(method, handle, params).await?.response().await
	}

	/// Runs the inbound message loop until the transport ends or a frame is rejected.
	///
	/// On exit every pending call fails with the close reason.
	pub async fn run(&self) {
		let taken = self.receiver.lock().take();
		let Some((receiver, mut message_rx)) = taken else {
			warn!(target = "dashtap.rpc", "message loop already running");
			return;
		};

		let mut transport_task = AbortOnDrop(tokio::spawn(receiver.run()));

		let mut rejected = None;
		while let Some(frame) = message_rx.recv().await {
			if let Err(e) = self.handle_frame(frame) {
				rejected = Some(e);
				break;
			}
		}

		let reason = match rejected {
			Some(e) => {
				transport_task.0.abort();
				e
			}
			None => match (&mut transport_task.0).await {
				Ok(Ok(())) => Error::ConnectionClosed,
				Ok(Err(e)) => e,
				Err(e) => Error::Transport(format!("receiver task failed: {e}")),
			},
		};

		if self.terminated.load(Ordering::SeqCst) {
			debug!(target = "dashtap.rpc", "message loop ended after terminate");
		} else {
			warn!(target = "dashtap.rpc", error = %reason, pending = self.pending_count(), "session closed by peer");
		}
		self.close_with(reason);
	}

	/// Closes the socket. Only the first call has any effect.
	pub async fn terminate(&self) {
		if self.terminated.swap(true, Ordering::SeqCst) {
			return;
		}

		self.close_with(Error::ConnectionClosed);
		if let Err(e) = self.sender.lock().await.close().await {
			warn!(target = "dashtap.rpc", error = %e, "closing transport failed");
		}
		debug!(target = "dashtap.rpc", "session terminated");
	}

	fn handle_frame(&self, frame: Value) -> Result<()> {
		let message = serde_json::from_value::<Message>(frame.clone())
			.map_err(|e| Error::Protocol(format!("unrecognised frame ({e}): {frame}")))?;
		self.dispatch(message)
	}

	/// Routes one decoded frame according to the current phase.
	fn dispatch(&self, message: Message) -> Result<()> {
		match (self.phase(), message) {
			(SessionPhase::Closed, message) => {
				trace!(target = "dashtap.rpc", ?message, "frame after close dropped");
				Ok(())
			}
			(SessionPhase::AwaitingConnected, Message::Notification(n)) if n.method == method::ON_CONNECTED => {
				debug!(target = "dashtap.rpc", params = %n.params, "engine connected");
				self.phase.send_replace(SessionPhase::Ready);
				Ok(())
			}
			(SessionPhase::AwaitingConnected, Message::Response(r)) => {
				Err(Error::Protocol(format!("reply for id={} arrived before the session was connected", r.id)))
			}
			(SessionPhase::Ready, Message::Response(r)) => {
				self.complete(r);
				Ok(())
			}
			(phase, Message::Notification(n)) => {
				debug!(target = "dashtap.rpc", %phase, method = %n.method, "notification ignored");
				Ok(())
			}
		}
	}

	fn complete(&self, response: Response) {
		let id = response.id;
		let Some(callback) = self.callbacks.lock().remove(&id) else {
			warn!(target = "dashtap.rpc", id, "reply without pending request ignored");
			return;
		};

		let result = match response.error {
			Some(err) => Err(Error::Engine {
				id,
				code: err.code,
				message: err.message,
			}),
			None => Ok(response.result.unwrap_or(Value::Null)),
		};

		trace!(target = "dashtap.rpc", id, ok = result.is_ok(), "reply matched");
		// Receiver may have been dropped by an abandoned caller.
		let _ = callback.send(result);
	}

	fn close_with(&self, reason: Error) {
		self.close_reason.lock().get_or_insert(reason);
		self.phase.send_replace(SessionPhase::Closed);

		let pending: Vec<_> = self.callbacks.lock().drain().collect();
		for (id, callback) in pending {
			debug!(target = "dashtap.rpc", id, "failing pending request");
			let _ = callback.send(Err(self.close_reason()));
		}
	}

	fn close_reason(&self) -> Error {
		self.close_reason.lock().clone().unwrap_or(Error::ConnectionClosed)
	}
}

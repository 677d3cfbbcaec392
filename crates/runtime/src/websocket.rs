//! WebSocket transport over `tokio-tungstenite`.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value as JsonValue;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver, decode_frame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connected WebSocket, not yet split into transport halves.
pub struct WebSocketTransport {
	sink: SplitSink<WsStream, Message>,
	stream: SplitStream<WsStream>,
	message_tx: mpsc::UnboundedSender<JsonValue>,
	endpoint: String,
}

impl WebSocketTransport {
	/// Opens a WebSocket to `url` (`ws://` or `wss://`).
	///
	/// Returns the transport and the receiver on which decoded inbound frames
	/// will be delivered once the receiving half runs.
	pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<JsonValue>)> {
		let (ws, response) = tokio_tungstenite::connect_async(url)
			.await
			.map_err(|e| Error::Transport(format!("failed to connect to {url}: {e}")))?;
		debug!(target = "dashtap.transport", endpoint = url, status = %response.status(), "websocket connected");

		let (sink, stream) = ws.split();
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		Ok((
			Self {
				sink,
				stream,
				message_tx,
				endpoint: url.to_string(),
			},
			message_rx,
		))
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<JsonValue>) -> TransportParts {
		TransportParts {
			sender: Box::new(WebSocketSender {
				sink: self.sink,
				endpoint: self.endpoint.clone(),
			}),
			receiver: Box::new(WebSocketReceiver {
				stream: self.stream,
				message_tx: self.message_tx,
				endpoint: self.endpoint,
			}),
			message_rx,
		}
	}
}

struct WebSocketSender {
	sink: SplitSink<WsStream, Message>,
	endpoint: String,
}

impl Transport for WebSocketSender {
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			let text = serde_json::to_string(&message)?;
			trace!(target = "dashtap.transport", endpoint = %self.endpoint, frame = %text, "send");
			self.sink.send(Message::Text(text.into())).await?;
			Ok(())
		})
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			match self.sink.close().await {
				Ok(()) | Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
				Err(e) => Err(e.into()),
			}
		})
	}
}

struct WebSocketReceiver {
	stream: SplitStream<WsStream>,
	message_tx: mpsc::UnboundedSender<JsonValue>,
	endpoint: String,
}

impl TransportReceiver for WebSocketReceiver {
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			while let Some(frame) = self.stream.next().await {
				let value = match frame {
					Ok(Message::Text(text)) => decode_frame(text.as_str())?,
					Ok(Message::Binary(bytes)) => {
						let text = std::str::from_utf8(&bytes).map_err(|e| Error::Protocol(format!("binary frame is not UTF-8: {e}")))?;
						decode_frame(text)?
					}
					Ok(Message::Close(frame)) => {
						debug!(target = "dashtap.transport", endpoint = %self.endpoint, ?frame, "peer closed websocket");
						break;
					}
					Ok(_) => continue,
					Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => break,
					Err(e) => return Err(Error::Transport(format!("read from {} failed: {e}", self.endpoint))),
				};

				trace!(target = "dashtap.transport", endpoint = %self.endpoint, frame = %value, "recv");
				if self.message_tx.send(value).is_err() {
					break;
				}
			}
			Ok(())
		})
	}
}

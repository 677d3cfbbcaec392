//! JSON-RPC frames exchanged with the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version carried by every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Handle addressing the engine's global object (document list, open document).
pub const GLOBAL_HANDLE: i64 = -1;

/// Method names used by the extraction pipeline.
pub mod method {
	/// Lists the documents available on the bootstrap endpoint.
	pub const GET_DOC_LIST: &str = "GetDocList";
	/// Opens a document and returns its session handle.
	pub const OPEN_DOC: &str = "OpenDoc";
	/// Instantiates a visual object inside an open document.
	pub const GET_OBJECT: &str = "GetObject";
	/// Computes the realized layout of an instantiated object.
	pub const GET_LAYOUT: &str = "GetLayout";
	/// Notification pushed by the engine once the session is usable.
	pub const ON_CONNECTED: &str = "OnConnected";
}

/// Request sent to the engine.
///
/// ```json
/// {"delta": true, "method": "GetObject", "handle": 1, "params": ["hRZaKk"], "id": 2, "jsonrpc": "2.0"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
	/// Ask the engine to answer with JSON-patch deltas.
	pub delta: bool,
	pub method: String,
	/// Handle of the engine object the call is addressed to.
	pub handle: i64,
	/// Positional parameters.
	pub params: Value,
	/// Correlation id, unique for the life of the session.
	pub id: u32,
	pub jsonrpc: String,
}

impl Request {
	pub fn new(id: u32, method: impl Into<String>, handle: i64, params: Value) -> Self {
		Self {
			delta: true,
			method: method.into(),
			handle,
			params,
			id,
			jsonrpc: JSONRPC_VERSION.to_string(),
		}
	}
}

/// Reply to a previously sent [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
	/// Correlation id of the originating request.
	pub id: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<RpcError>,
}

/// JSON-RPC error member of a [`Response`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
	#[serde(default)]
	pub code: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parameter: Option<String>,
	#[serde(default)]
	pub message: String,
}

/// Engine-initiated message without a correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
	pub method: String,
	#[serde(default)]
	pub params: Value,
}

/// Inbound frame, discriminated by the presence of `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	Response(Response),
	Notification(Notification),
}

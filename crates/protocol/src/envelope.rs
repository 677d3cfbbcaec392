//! Result envelopes for the calls the pipeline issues.
//!
//! Requests are sent with `delta: true`, so every result member is an array of
//! JSON-patch operations. On a fresh object the engine answers with a single
//! `add` patch at `/` whose `value` is the full payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One JSON-patch operation of a delta result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch<T> {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub op: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	pub value: T,
}

/// Result of `OpenDoc` and `GetObject`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnResult {
	#[serde(rename = "qReturn", default)]
	pub q_return: Vec<Patch<ObjectInterface>>,
}

/// Engine-side reference to an opened document or instantiated object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInterface {
	#[serde(rename = "qType", default)]
	pub q_type: String,
	#[serde(rename = "qHandle", default, skip_serializing_if = "Option::is_none")]
	pub q_handle: Option<i64>,
	#[serde(rename = "qGenericType", default, skip_serializing_if = "Option::is_none")]
	pub q_generic_type: Option<String>,
	#[serde(rename = "qGenericId", default, skip_serializing_if = "Option::is_none")]
	pub q_generic_id: Option<String>,
}

/// Result of `GetDocList`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocListResult {
	#[serde(rename = "qDocList", default)]
	pub q_doc_list: Vec<Patch<Vec<DocListEntry>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocListEntry {
	#[serde(rename = "qDocId")]
	pub q_doc_id: String,
	#[serde(rename = "qDocName", default, skip_serializing_if = "Option::is_none")]
	pub q_doc_name: Option<String>,
	#[serde(rename = "qMeta", default)]
	pub q_meta: DocMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
	#[serde(rename = "modifiedDate", default, skip_serializing_if = "Option::is_none")]
	pub modified_date: Option<String>,
}

/// Result of `GetLayout`. The layout itself stays opaque at this level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
	#[serde(rename = "qLayout", default)]
	pub q_layout: Vec<Patch<Value>>,
}

//! Document discovery against the bootstrap endpoint.

use dashtap_protocol::{DocListResult, GLOBAL_HANDLE, method};
use dashtap_runtime::Session;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;
use url::Url;

use crate::connector::Connector;
use crate::error::{Error, Result};

/// The dataset document the dashboard currently serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
	pub document_id: String,
	/// Modification timestamp as reported by the engine.
	pub last_modified: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// Opens a throwaway session on `bootstrap`, lists documents and returns the first one.
///
/// The session is terminated before returning, on success and on failure.
pub async fn resolve_document(connector: &dyn Connector, bootstrap: &Url) -> Result<DocumentReference> {
	let session = connector.open(bootstrap).await?;
	let outcome = list_first_document(&session).await;
	session.terminate().await;

	let document = outcome?;
	info!(
		target = "dashtap.resolver",
		document = %document.document_id,
		name = document.name.as_deref().unwrap_or("-"),
		modified = %document.last_modified,
		"resolved dataset document"
	);
	Ok(document)
}

async fn list_first_document(session: &Session) -> Result<DocumentReference> {
	let result = session.request(method::GET_DOC_LIST, GLOBAL_HANDLE, json!([])).await?;
	first_document(result)
}

/// Extracts the first entry of a `GetDocList` result.
pub fn first_document(result: Value) -> Result<DocumentReference> {
	let list: DocListResult = serde_json::from_value(result).map_err(|e| Error::Resolution(format!("unexpected document list shape: {e}")))?;

	let entry = list
		.q_doc_list
		.into_iter()
		.next()
		.and_then(|patch| patch.value.into_iter().next())
		.ok_or_else(|| Error::Resolution("engine returned no documents".to_string()))?;

	let last_modified = entry
		.q_meta
		.modified_date
		.ok_or_else(|| Error::Resolution(format!("document {} has no modifiedDate", entry.q_doc_id)))?;

	Ok(DocumentReference {
		document_id: entry.q_doc_id,
		last_modified,
		name: entry.q_doc_name,
	})
}

//! Opens the dataset document and instantiates the configured objects.
//!
//! All `GetObject` calls are sent back to back; acknowledgments are consumed in
//! completion order and matched to their request strictly by correlation id.

use dashtap_protocol::{GLOBAL_HANDLE, ObjectInterface, ReturnResult, method};
use dashtap_runtime::Session;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::connector::Connector;
use crate::error::{Error, Result};
use crate::objects::ObjectDescriptor;
use crate::resolver::DocumentReference;

/// Engine acknowledgment of one instantiated object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectHandle {
	/// Id of the `GetObject` call that produced this handle; later calls address the object by it.
	pub correlation_id: u32,
	pub engine_object_id: String,
	pub engine_object_type: String,
	/// Configured id the object was requested under.
	pub external_id: String,
	/// Position of the descriptor in the configured list.
	#[serde(skip)]
	pub ordinal: usize,
}

/// Opens `document` on its own session and instantiates every descriptor.
///
/// Resolves once one handle per descriptor has been collected. The open session
/// is handed back to the caller, who becomes responsible for terminating it; on
/// failure it is terminated here.
pub async fn load_catalog(
	connector: &dyn Connector,
	endpoint: &Url,
	document: &DocumentReference,
	descriptors: &[ObjectDescriptor],
) -> Result<(Session, Vec<ObjectHandle>)> {
	let session = connector.open(endpoint).await?;
	match instantiate(&session, document, descriptors).await {
		Ok(handles) => Ok((session, handles)),
		Err(e) => {
			session.terminate().await;
			Err(e)
		}
	}
}

async fn instantiate(session: &Session, document: &DocumentReference, descriptors: &[ObjectDescriptor]) -> Result<Vec<ObjectHandle>> {
	let doc_handle = open_document(session, document).await?;

	let mut acks = FuturesUnordered::new();
	for (ordinal, descriptor) in descriptors.iter().enumerate() {
		let pending = session.call(method::GET_OBJECT, doc_handle, json!([descriptor.external_id])).await?;
		acks.push(async move {
			let id = pending.id();
			(ordinal, id, pending.response().await)
		});
	}

	let mut handles = Vec::with_capacity(descriptors.len());
	while let Some((ordinal, id, result)) = acks.next().await {
		let descriptor = &descriptors[ordinal];
		let iface = first_return(result?).ok_or_else(|| {
			Error::Catalog(format!(
				"GetObject for {} (id={id}) returned no object",
				descriptor.external_id
			))
		})?;

		let handle = ObjectHandle {
			correlation_id: id,
			engine_object_id: iface.q_generic_id.unwrap_or_else(|| descriptor.external_id.clone()),
			engine_object_type: iface.q_generic_type.unwrap_or(iface.q_type),
			external_id: descriptor.external_id.clone(),
			ordinal,
		};
		debug!(
			target = "dashtap.catalog",
			id,
			object = %handle.engine_object_id,
			kind = %handle.engine_object_type,
			"object instantiated"
		);
		handles.push(handle);
	}

	info!(target = "dashtap.catalog", objects = handles.len(), "catalog loaded");
	Ok(handles)
}

/// Sends `OpenDoc` and returns the document's session handle.
async fn open_document(session: &Session, document: &DocumentReference) -> Result<i64> {
	let result = session.request(method::OPEN_DOC, GLOBAL_HANDLE, json!([document.document_id])).await?;
	let handle = first_return(result)
		.and_then(|iface| iface.q_handle)
		.ok_or_else(|| Error::Catalog(format!("OpenDoc for {} returned no handle", document.document_id)))?;

	debug!(target = "dashtap.catalog", document = %document.document_id, handle, "document opened");
	Ok(handle)
}

/// First interface of a delta `qReturn`, if the reply carries one.
fn first_return(result: Value) -> Option<ObjectInterface> {
	serde_json::from_value::<ReturnResult>(result)
		.ok()?
		.q_return
		.into_iter()
		.next()
		.map(|patch| patch.value)
}

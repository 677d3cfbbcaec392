//! Layout collection for instantiated objects.

use dashtap_protocol::{LayoutResult, method};
use dashtap_runtime::Session;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::catalog::ObjectHandle;
use crate::error::{Error, Result};

/// Realized layout of one object, exactly as the engine returned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLayout {
	pub object_id: String,
	pub correlation_id: u32,
	#[serde(skip)]
	pub ordinal: usize,
	pub layout: Value,
}

/// Requests every handle's layout and collects them in completion order.
///
/// Each `GetLayout` is addressed to the handle's correlation id, which the
/// engine treats as the object's session handle.
pub async fn fetch_layouts(session: &Session, handles: &[ObjectHandle]) -> Result<Vec<RawLayout>> {
	let mut replies = FuturesUnordered::new();
	for handle in handles {
		let pending = session.call(method::GET_LAYOUT, i64::from(handle.correlation_id), json!([])).await?;
		replies.push(async move {
			let id = pending.id();
			(handle, id, pending.response().await)
		});
	}

	let mut layouts = Vec::with_capacity(handles.len());
	while let Some((handle, id, result)) = replies.next().await {
		let layout = first_layout(result?)
			.ok_or_else(|| Error::Layout(format!("GetLayout for {} (id={id}) returned no layout", handle.engine_object_id)))?;

		debug!(
			target = "dashtap.layout",
			id,
			object = %handle.engine_object_id,
			received = layouts.len() + 1,
			expected = handles.len(),
			"layout received"
		);
		layouts.push(RawLayout {
			object_id: handle.external_id.clone(),
			correlation_id: handle.correlation_id,
			ordinal: handle.ordinal,
			layout,
		});
	}

	info!(target = "dashtap.layout", layouts = layouts.len(), "layouts collected");
	Ok(layouts)
}

fn first_layout(result: Value) -> Option<Value> {
	serde_json::from_value::<LayoutResult>(result)
		.ok()?
		.q_layout
		.into_iter()
		.next()
		.map(|patch| patch.value)
}

#[cfg(test)]
mod tests {
	use dashtap_runtime::FakeTransportBuilder;

	use super::*;

	fn handle(correlation_id: u32, id: &str, ordinal: usize) -> ObjectHandle {
		ObjectHandle {
			correlation_id,
			engine_object_id: id.to_string(),
			engine_object_type: "kpi".to_string(),
			external_id: id.to_string(),
			ordinal,
		}
	}

	#[tokio::test]
	async fn out_of_order_layouts_pair_with_their_handles() {
		let (parts, engine) = FakeTransportBuilder::new().build();
		engine.inject_connected();
		let session = Session::open("fake://engine/app/doc1", parts).await.unwrap();

		let handles = vec![handle(2, "kpiA", 0), handle(3, "tableB", 1), handle(4, "chartC", 2)];

		let fetch = fetch_layouts(&session, &handles);
		let script = async {
			let mut requests = Vec::new();
			for _ in 0..3 {
				requests.push(engine.next_sent().await.unwrap());
			}
			let addressed: Vec<_> = requests.iter().map(|r| r["handle"].as_i64().unwrap()).collect();
			assert_eq!(addressed, vec![2, 3, 4]);
			assert!(requests.iter().all(|r| r["method"] == "GetLayout" && r["params"] == json!([])));

			for request in [&requests[1], &requests[2], &requests[0]] {
				let id = request["id"].as_u64().unwrap() as u32;
				let handle = request["handle"].as_i64().unwrap();
				engine.inject_response(id, json!({"qLayout": [{"op": "add", "path": "/", "value": {"servedBy": handle}}]}));
			}
		};

		let (layouts, ()) = tokio::join!(fetch, script);
		let layouts = layouts.unwrap();
		assert_eq!(layouts.len(), 3);

		let order: Vec<_> = layouts.iter().map(|l| l.object_id.as_str()).collect();
		assert_eq!(order, vec!["tableB", "chartC", "kpiA"]);
		for layout in &layouts {
			assert_eq!(layout.layout["servedBy"], i64::from(layout.correlation_id));
		}
	}

	#[tokio::test]
	async fn missing_layout_is_layout_error() {
		let (parts, engine) = FakeTransportBuilder::new().build();
		engine.inject_connected();
		let session = Session::open("fake://engine/app/doc1", parts).await.unwrap();
		let handles = vec![handle(2, "kpiA", 0)];

		let fetch = fetch_layouts(&session, &handles);
		let script = async {
			let request = engine.next_sent().await.unwrap();
			engine.inject_response(request["id"].as_u64().unwrap() as u32, json!({"qLayout": []}));
		};

		let (result, ()) = tokio::join!(fetch, script);
		assert!(matches!(result.unwrap_err(), Error::Layout(msg) if msg.contains("kpiA")));
	}

	#[tokio::test]
	async fn engine_error_reply_is_fatal() {
		let (parts, engine) = FakeTransportBuilder::new().build();
		engine.inject_connected();
		let session = Session::open("fake://engine/app/doc1", parts).await.unwrap();
		let handles = vec![handle(2, "kpiA", 0)];

		let fetch = fetch_layouts(&session, &handles);
		let script = async {
			let request = engine.next_sent().await.unwrap();
			engine.inject_error(request["id"].as_u64().unwrap() as u32, 3, "Invalid handle");
		};

		let (result, ()) = tokio::join!(fetch, script);
		assert!(matches!(
			result.unwrap_err(),
			Error::Session(dashtap_runtime::Error::Engine { code: 3, .. })
		));
	}
}

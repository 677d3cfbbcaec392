//! Scrape runs over a scripted in-memory engine, writing into a temp dir.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::Router;
use axum::routing::get;
use dashtap::{QueuedConnector, Scheme};
use dashtap_cli::commands::scrape::run;
use dashtap_cli::config::ScrapeConfig;
use dashtap_cli::error::CliError;
use dashtap_runtime::{FakeTransportBuilder, FakeTransportController};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

fn id_of(request: &Value) -> u32 {
	request["id"].as_u64().unwrap() as u32
}

fn config(out_dir: &std::path::Path, objects: &[&str], page_uri: String) -> ScrapeConfig {
	ScrapeConfig {
		host: "engine.test".to_string(),
		page_uri,
		scheme: Scheme::Plain,
		objects: objects.iter().map(|o| o.to_string()).collect(),
		names: HashMap::from([("kpiA".to_string(), "total_cases".to_string())]),
		out_dir: out_dir.to_path_buf(),
	}
}

fn serve_bootstrap(engine: FakeTransportController, modified: &'static str) -> JoinHandle<()> {
	tokio::spawn(async move {
		engine.inject_connected();
		let request = engine.next_sent().await.unwrap();
		engine.inject_response(
			id_of(&request),
			json!({"qDocList": [{"op": "add", "path": "/", "value": [{"qDocId": "doc1", "qDocName": "Dashboard", "qMeta": {"modifiedDate": modified}}]}]}),
		);
	})
}

/// Serves a single KPI object named `kpiA`.
fn serve_single_kpi(engine: FakeTransportController) -> JoinHandle<()> {
	tokio::spawn(async move {
		engine.inject_connected();
		let open = engine.next_sent().await.unwrap();
		engine.inject_response(id_of(&open), json!({"qReturn": [{"value": {"qType": "Doc", "qHandle": 1}}]}));

		let object = engine.next_sent().await.unwrap();
		assert_eq!(object["params"], json!(["kpiA"]));
		engine.inject_response(
			id_of(&object),
			json!({"qReturn": [{"value": {"qType": "GenericObject", "qHandle": 2, "qGenericId": "kpiA", "qGenericType": "kpi"}}]}),
		);

		let layout = engine.next_sent().await.unwrap();
		engine.inject_response(
			id_of(&layout),
			json!({"qLayout": [{"op": "add", "path": "/", "value": {
				"visualization": "kpi",
				"qHyperCube": {
					"qMeasureInfo": [{"qFallbackTitle": "Total cases"}],
					"qGrandTotalRow": [{"qText": "34,000", "qNum": 34000}]
				}
			}}]}),
		);
	})
}

#[tokio::test]
async fn configured_objects_are_written_under_document_date() {
	let out = tempfile::tempdir().unwrap();
	let (bootstrap_parts, bootstrap) = FakeTransportBuilder::new().build();
	let (document_parts, document) = FakeTransportBuilder::new().build();
	let _bootstrap = serve_bootstrap(bootstrap, "2021-08-01T06:30:00.000Z");
	let _document = serve_single_kpi(document);

	let connector = QueuedConnector::new([bootstrap_parts, document_parts]);
	// unreachable page; configured objects mean it is never fetched
	let config = config(out.path(), &["kpiA"], "http://127.0.0.1:9/page".to_string());

	let summary = run(&config, connector, &reqwest::Client::new()).await.unwrap();
	assert_eq!(summary.document_id, "doc1");
	assert_eq!(summary.records, 1);
	assert_eq!(summary.unknown, 0);
	assert_eq!(summary.files.records, out.path().join("2021-08-01-records.json"));

	let records: Value = serde_json::from_str(&std::fs::read_to_string(&summary.files.records).unwrap()).unwrap();
	assert_eq!(
		records,
		json!([{"objectId": "kpiA", "name": "total_cases", "kind": "kpi", "payload": {"label": "Total cases", "value": 34000}}])
	);

	let layouts: Value = serde_json::from_str(&std::fs::read_to_string(&summary.files.layouts).unwrap()).unwrap();
	assert_eq!(layouts[0]["objectId"], "kpiA");
	assert_eq!(layouts[0]["layout"]["visualization"], "kpi");
}

#[tokio::test]
async fn object_ids_come_from_the_page_when_not_configured() {
	let page = Router::new().route(
		"/dashboard",
		get(|| async { r#"<script>window.cfg = {"qlik_components":[{"component_id":"kpiA"}]};</script>"# }),
	);
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr: SocketAddr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, page).await.unwrap();
	});

	let out = tempfile::tempdir().unwrap();
	let (bootstrap_parts, bootstrap) = FakeTransportBuilder::new().build();
	let (document_parts, document) = FakeTransportBuilder::new().build();
	let _bootstrap = serve_bootstrap(bootstrap, "2021-08-02");
	let _document = serve_single_kpi(document);

	let connector = QueuedConnector::new([bootstrap_parts, document_parts]);
	let config = config(out.path(), &[], format!("http://{addr}/dashboard"));

	let summary = run(&config, connector, &reqwest::Client::new()).await.unwrap();
	assert_eq!(summary.records, 1);
	assert!(out.path().join("2021-08-02-records.json").exists());
	assert!(out.path().join("2021-08-02-layouts.json").exists());
}

#[tokio::test]
async fn failed_run_writes_nothing() {
	let out = tempfile::tempdir().unwrap();
	let target = out.path().join("data");
	let (bootstrap_parts, bootstrap) = FakeTransportBuilder::new().build();
	let _bootstrap = tokio::spawn(async move {
		bootstrap.inject_connected();
		let request = bootstrap.next_sent().await.unwrap();
		bootstrap.inject_error(id_of(&request), -128, "Access denied");
	});

	let connector = QueuedConnector::new([bootstrap_parts]);
	let config = config(&target, &["kpiA"], "http://127.0.0.1:9/page".to_string());

	let err = run(&config, connector, &reqwest::Client::new()).await.unwrap_err();
	assert!(matches!(err, CliError::Pipeline(_)), "unexpected error: {err}");
	assert!(!target.exists());
}

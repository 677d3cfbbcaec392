use dashtap::{Connector, EngineEndpoints, ObjectCatalog, Pipeline, RecordKind, WebSocketConnector};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ScrapeArgs;
use crate::config::ScrapeConfig;
use crate::error::Result;
use crate::page::fetch_component_ids;
use crate::persist::{FileWriter, WrittenFiles};

/// Printed to stdout after a successful run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeSummary {
	pub document_id: String,
	pub last_modified: String,
	pub records: usize,
	pub unknown: usize,
	pub files: WrittenFiles,
}

pub async fn execute(args: &ScrapeArgs) -> Result<()> {
	let config = ScrapeConfig::resolve(args)?;
	let client = reqwest::Client::new();
	let summary = run(&config, WebSocketConnector, &client).await?;
	println!("{}", serde_json::to_string_pretty(&summary)?);
	Ok(())
}

/// One full scrape against `connector`; the page is only fetched when no
/// objects are configured.
pub async fn run<C: Connector>(config: &ScrapeConfig, connector: C, client: &reqwest::Client) -> Result<ScrapeSummary> {
	let object_ids = if config.objects.is_empty() {
		fetch_component_ids(client, &config.page_uri).await?
	} else {
		config.objects.clone()
	};
	if object_ids.is_empty() {
		warn!(target = "dashtap.scrape", page_uri = %config.page_uri, "no objects to extract");
	}

	let endpoints = EngineEndpoints::new(config.host.as_str(), config.page_uri.as_str()).with_scheme(config.scheme);
	let catalog = ObjectCatalog::new(object_ids).with_names(config.names.clone());
	let writer = FileWriter::new(&config.out_dir);

	info!(target = "dashtap.scrape", host = %config.host, objects = catalog.len(), "starting run");
	let output = Pipeline::new(connector, endpoints, catalog).run(&writer).await?;

	Ok(ScrapeSummary {
		files: writer.paths_for(&output),
		unknown: output.records.iter().filter(|r| r.kind == RecordKind::Unknown).count(),
		records: output.records.len(),
		document_id: output.document.document_id,
		last_modified: output.document.last_modified,
	})
}

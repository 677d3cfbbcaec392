//! Discovers the dashboard's object ids from its HTML page.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{CliError, Result};

static COMPONENTS_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"\{"qlik_components":(\[(?:\{"component_id":"\w{1,10}"\},?)*\])"#).expect("COMPONENTS_RE should compile")
});

#[derive(Deserialize)]
struct Component {
	component_id: String,
}

/// Returns the object ids embedded in the page, in page order.
///
/// Only the first `qlik_components` block is read.
pub fn extract_component_ids(html: &str) -> Result<Vec<String>> {
	let captures = COMPONENTS_RE
		.captures(html)
		.ok_or_else(|| CliError::Scrape("no qlik_components block in page".to_string()))?;
	let list = captures.get(1).map(|m| m.as_str()).unwrap_or("[]");

	let components: Vec<Component> = serde_json::from_str(list).map_err(|e| CliError::Scrape(format!("malformed component list: {e}")))?;
	Ok(components.into_iter().map(|c| c.component_id).collect())
}

pub async fn fetch_component_ids(client: &reqwest::Client, page_uri: &str) -> Result<Vec<String>> {
	debug!(target = "dashtap.page", page_uri, "fetching dashboard page");
	let html = client.get(page_uri).send().await?.error_for_status()?.text().await?;

	let ids = extract_component_ids(&html)?;
	info!(target = "dashtap.page", count = ids.len(), "discovered dashboard objects");
	Ok(ids)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_ids_in_page_order() {
		let html = r#"<div data-x='{"qlik_components":[{"component_id":"hRZaKk"},{"component_id":"PmBxd"},{"component_id":"ajJrJ"}]}'></div>"#;
		assert_eq!(extract_component_ids(html).unwrap(), vec!["hRZaKk", "PmBxd", "ajJrJ"]);
	}

	#[test]
	fn only_the_first_block_counts() {
		let html = r#"{"qlik_components":[{"component_id":"first"}]} {"qlik_components":[{"component_id":"second"}]}"#;
		assert_eq!(extract_component_ids(html).unwrap(), vec!["first"]);
	}

	#[test]
	fn empty_block_yields_no_ids() {
		assert!(extract_component_ids(r#"{"qlik_components":[]}"#).unwrap().is_empty());
	}

	#[test]
	fn missing_block_is_a_scrape_error() {
		let err = extract_component_ids("<html><body>maintenance</body></html>").unwrap_err();
		assert!(matches!(err, CliError::Scrape(_)));
	}

	#[test]
	fn overlong_ids_do_not_match() {
		let html = r#"{"qlik_components":[{"component_id":"abcdefghijklmnop"}]}"#;
		// ids are capped at ten word characters
		assert!(extract_component_ids(html).is_err());
	}
}

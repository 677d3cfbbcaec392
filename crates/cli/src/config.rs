//! Scrape configuration: CLI flags over a JSON config file over defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dashtap::{DEFAULT_HOST, Scheme};
use serde::Deserialize;

use crate::cli::ScrapeArgs;
use crate::error::{CliError, Result};

/// Dashboard page the engine session is bootstrapped from.
pub const DEFAULT_PAGE_URI: &str =
	"https://www.health.gov.au/news/health-alerts/novel-coronavirus-2019-ncov-health-alert/coronavirus-covid-19-current-situation-and-case-numbers";

/// On-disk config file.
///
/// ```json
/// {
///   "host": "covid19-data.health.gov.au",
///   "objects": ["hRZaKk", "PmBxd"],
///   "names": {"hRZaKk": "cases_by_state"}
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
	pub host: Option<String>,
	pub page_uri: Option<String>,
	#[serde(default)]
	pub objects: Vec<String>,
	#[serde(default)]
	pub names: HashMap<String, String>,
}

impl FileConfig {
	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
		serde_json::from_str(&text).map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
	}
}

/// Effective settings for one `scrape` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
	pub host: String,
	pub page_uri: String,
	pub scheme: Scheme,
	/// Explicit object ids; empty means scrape them from the page.
	pub objects: Vec<String>,
	pub names: HashMap<String, String>,
	pub out_dir: PathBuf,
}

impl ScrapeConfig {
	pub fn resolve(args: &ScrapeArgs) -> Result<Self> {
		let file = match &args.config {
			Some(path) => FileConfig::load(path)?,
			None => FileConfig::default(),
		};
		Ok(Self::merge(args, file))
	}

	fn merge(args: &ScrapeArgs, file: FileConfig) -> Self {
		let objects = if args.objects.is_empty() { file.objects } else { args.objects.clone() };

		Self {
			host: args.host.clone().or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
			page_uri: args.page_uri.clone().or(file.page_uri).unwrap_or_else(|| DEFAULT_PAGE_URI.to_string()),
			scheme: if args.insecure_ws { Scheme::Plain } else { Scheme::Secure },
			objects,
			names: file.names,
			out_dir: args.out_dir.clone(),
		}
	}
}

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Pipeline(#[from] dashtap::Error),

	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("invalid URL: {0}")]
	Url(#[from] url::ParseError),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("{path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("config error: {0}")]
	Config(String),

	#[error("page scrape failed: {0}")]
	Scrape(String),
}

impl CliError {
	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		CliError::Io { path: path.into(), source }
	}
}

//! Engine endpoint construction.

use url::Url;

use crate::error::Result;

/// Host the public dashboard engine is served from.
pub const DEFAULT_HOST: &str = "covid19-data.health.gov.au";

/// Path segment of the engine's document-discovery app.
const BOOTSTRAP_APP: &str = "engineData";

/// WebSocket scheme used to reach the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scheme {
	#[default]
	Secure,
	/// Plain `ws://`, for local engines and tests.
	Plain,
}

impl Scheme {
	fn as_str(self) -> &'static str {
		match self {
			Scheme::Secure => "wss",
			Scheme::Plain => "ws",
		}
	}
}

/// Builds the bootstrap and per-document endpoint URLs.
///
/// Both carry the dashboard page as the `reloadUri` query parameter, which the
/// engine uses to pick the virtual proxy for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEndpoints {
	scheme: Scheme,
	host: String,
	reload_uri: String,
}

impl EngineEndpoints {
	pub fn new(host: impl Into<String>, reload_uri: impl Into<String>) -> Self {
		Self {
			scheme: Scheme::Secure,
			host: host.into(),
			reload_uri: reload_uri.into(),
		}
	}

	pub fn with_scheme(mut self, scheme: Scheme) -> Self {
		self.scheme = scheme;
		self
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	/// `{scheme}://{host}/app/engineData?reloadUri={page}`
	pub fn bootstrap(&self) -> Result<Url> {
		self.app_url(BOOTSTRAP_APP)
	}

	/// `{scheme}://{host}/app/{documentId}?reloadUri={page}`
	pub fn document(&self, document_id: &str) -> Result<Url> {
		self.app_url(document_id)
	}

	fn app_url(&self, app: &str) -> Result<Url> {
		let mut url = Url::parse(&format!("{}://{}/", self.scheme.as_str(), self.host))?;
		url.set_path(&format!("/app/{app}"));
		url.query_pairs_mut().append_pair("reloadUri", &self.reload_uri);
		Ok(url)
	}
}

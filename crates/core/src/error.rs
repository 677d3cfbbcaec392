//! Error types for the extraction pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal pipeline failures.
///
/// Unrecognised visual types are not errors; they surface as
/// [`RecordKind::Unknown`](crate::record::RecordKind::Unknown) records.
#[derive(Debug, Error)]
pub enum Error {
	/// Socket failure, premature close, undecodable frame or engine error reply.
	#[error(transparent)]
	Session(#[from] dashtap_runtime::Error),

	/// The document list did not contain a usable first document.
	#[error("document resolution failed: {0}")]
	Resolution(String),

	/// `OpenDoc` or `GetObject` returned no usable handle.
	#[error("object catalog failed: {0}")]
	Catalog(String),

	/// `GetLayout` returned no layout.
	#[error("layout fetch failed: {0}")]
	Layout(String),

	#[error("invalid endpoint: {0}")]
	Endpoint(#[from] url::ParseError),

	/// The persistence collaborator rejected the finished run.
	#[error("handoff failed: {0}")]
	Handoff(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
	/// Returns `true` for socket failures, including premature close.
	pub fn is_transport(&self) -> bool {
		matches!(self, Error::Session(e) if e.is_transport())
	}

	/// Returns `true` for frames the engine sent that could not be decoded.
	pub fn is_protocol(&self) -> bool {
		matches!(self, Error::Session(e) if e.is_protocol())
	}
}

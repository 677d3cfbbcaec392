//! Session orchestrator: one discovery-to-extraction cycle.
//!
//! ```text
//! Idle → Resolving → Cataloging → FetchingLayouts → Normalizing → Done
//!            └───────────┴──────────────┴─────────────────┴──→ Failed
//! ```
//!
//! Each state owns the values produced so far; nothing is shared between
//! phases except what a transition moves into the next state.

use std::fmt;

use dashtap_runtime::Session;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::catalog::{ObjectHandle, load_catalog};
use crate::connector::Connector;
use crate::endpoint::EngineEndpoints;
use crate::error::{Error, Result};
use crate::layout::{RawLayout, fetch_layouts};
use crate::normalize::normalize;
use crate::objects::ObjectCatalog;
use crate::record::CanonicalRecord;
use crate::resolver::{DocumentReference, resolve_document};

/// Result of a completed run, ordered like the configured objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
	pub document: DocumentReference,
	pub records: Vec<CanonicalRecord>,
	pub layouts: Vec<RawLayout>,
}

/// Receives the output of a completed run; typically writes it to disk.
pub trait Handoff {
	type Error: std::error::Error + Send + Sync + 'static;

	fn accept(&self, output: &RunOutput) -> std::result::Result<(), Self::Error>;
}

/// Pipeline phase, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Idle,
	Resolving,
	Cataloging,
	FetchingLayouts,
	Normalizing,
	Done,
	Failed,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Phase::Idle => "idle",
			Phase::Resolving => "resolving",
			Phase::Cataloging => "cataloging",
			Phase::FetchingLayouts => "fetching-layouts",
			Phase::Normalizing => "normalizing",
			Phase::Done => "done",
			Phase::Failed => "failed",
		};
		f.write_str(name)
	}
}

enum RunState {
	Idle,
	Resolving,
	Cataloging {
		document: DocumentReference,
	},
	FetchingLayouts {
		document: DocumentReference,
		session: Session,
		handles: Vec<ObjectHandle>,
	},
	Normalizing {
		document: DocumentReference,
		session: Session,
		layouts: Vec<RawLayout>,
	},
	Done {
		output: RunOutput,
		session: Session,
	},
	Failed {
		error: Error,
		phase: Phase,
		session: Option<Session>,
	},
}

impl RunState {
	fn phase(&self) -> Phase {
		match self {
			RunState::Idle => Phase::Idle,
			RunState::Resolving => Phase::Resolving,
			RunState::Cataloging { .. } => Phase::Cataloging,
			RunState::FetchingLayouts { .. } => Phase::FetchingLayouts,
			RunState::Normalizing { .. } => Phase::Normalizing,
			RunState::Done { .. } => Phase::Done,
			RunState::Failed { .. } => Phase::Failed,
		}
	}
}

/// Sequences resolver, catalog loader, layout fetcher and normalizer.
pub struct Pipeline<C: Connector> {
	connector: C,
	endpoints: EngineEndpoints,
	objects: ObjectCatalog,
}

impl<C: Connector> Pipeline<C> {
	pub fn new(connector: C, endpoints: EngineEndpoints, objects: ObjectCatalog) -> Self {
		Self {
			connector,
			endpoints,
			objects,
		}
	}

	pub fn connector(&self) -> &C {
		&self.connector
	}

	/// Runs one cycle and hands the result to `handoff`.
	///
	/// Any session still open is terminated before this returns, whether the
	/// run reached `Done` or `Failed`. `handoff` is only invoked on `Done`.
	pub async fn run<H: Handoff>(&self, handoff: &H) -> Result<RunOutput> {
		let mut state = RunState::Idle;
		loop {
			let from = state.phase();
			state = match state {
				RunState::Idle => RunState::Resolving,
				RunState::Resolving => self.resolve().await,
				RunState::Cataloging { document } => self.catalog(document).await,
				RunState::FetchingLayouts {
					document,
					session,
					handles,
				} => match fetch_layouts(&session, &handles).await {
					Ok(layouts) => RunState::Normalizing {
						document,
						session,
						layouts,
					},
					Err(error) => RunState::Failed {
						error,
						phase: Phase::FetchingLayouts,
						session: Some(session),
					},
				},
				RunState::Normalizing {
					document,
					session,
					layouts,
				} => RunState::Done {
					output: self.normalize(document, layouts),
					session,
				},
				RunState::Done { output, session } => {
					let accepted = handoff.accept(&output);
					session.terminate().await;
					accepted.map_err(|e| Error::Handoff(Box::new(e)))?;
					info!(target = "dashtap.pipeline", records = output.records.len(), "run complete");
					return Ok(output);
				}
				RunState::Failed { error, phase, session } => {
					if let Some(session) = session {
						session.terminate().await;
					}
					error!(target = "dashtap.pipeline", %phase, error = %error, "run failed");
					return Err(error);
				}
			};
			debug!(target = "dashtap.pipeline", %from, to = %state.phase(), "transition");
		}
	}

	async fn resolve(&self) -> RunState {
		let outcome = match self.endpoints.bootstrap() {
			Ok(endpoint) => resolve_document(&self.connector, &endpoint).await,
			Err(e) => Err(e),
		};

		match outcome {
			Ok(document) => RunState::Cataloging { document },
			Err(error) => RunState::Failed {
				error,
				phase: Phase::Resolving,
				session: None,
			},
		}
	}

	async fn catalog(&self, document: DocumentReference) -> RunState {
		let outcome = match self.endpoints.document(&document.document_id) {
			Ok(endpoint) => load_catalog(&self.connector, &endpoint, &document, self.objects.descriptors()).await,
			Err(e) => Err(e),
		};

		match outcome {
			Ok((session, handles)) => RunState::FetchingLayouts {
				document,
				session,
				handles,
			},
			Err(error) => RunState::Failed {
				error,
				phase: Phase::Cataloging,
				session: None,
			},
		}
	}

	/// Puts layouts back into declaration order and normalizes each.
	fn normalize(&self, document: DocumentReference, mut layouts: Vec<RawLayout>) -> RunOutput {
		layouts.sort_by_key(|layout| layout.ordinal);
		let records = layouts.iter().map(|layout| normalize(layout, &self.objects)).collect();
		RunOutput {
			document,
			records,
			layouts,
		}
	}
}

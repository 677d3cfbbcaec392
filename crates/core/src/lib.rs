//! Dashboard statistics extraction over the BI engine's WebSocket protocol.
//!
//! A run resolves the current dataset document, opens it, instantiates the
//! configured visual objects, fetches their computed layouts and normalizes
//! each hypercube into a flat [`CanonicalRecord`].
//!
//! ```ignore
//! let endpoints = EngineEndpoints::new(DEFAULT_HOST, page_uri);
//! let objects = ObjectCatalog::new(["hRZaKk", "PmBxd"]);
//! let pipeline = Pipeline::new(WebSocketConnector, endpoints, objects);
//! let output = pipeline.run(&writer).await?;
//! ```

pub mod catalog;
pub mod connector;
pub mod endpoint;
pub mod error;
pub mod layout;
pub mod normalize;
pub mod objects;
pub mod pipeline;
pub mod record;
pub mod resolver;

pub use catalog::{ObjectHandle, load_catalog};
pub use connector::{Connector, QueuedConnector, WebSocketConnector};
pub use endpoint::{DEFAULT_HOST, EngineEndpoints, Scheme};
pub use error::{Error, Result};
pub use layout::{RawLayout, fetch_layouts};
pub use normalize::{normalize, normalize_layout, resolve_cell};
pub use objects::{ObjectCatalog, ObjectDescriptor};
pub use pipeline::{Handoff, Phase, Pipeline, RunOutput};
pub use record::{CanonicalRecord, CellValue, Payload, RecordKind};
pub use resolver::{DocumentReference, resolve_document};

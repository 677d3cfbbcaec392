//! Static description of which dashboard objects to extract.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One dashboard object to instantiate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescriptor {
	pub external_id: String,
}

impl ObjectDescriptor {
	pub fn new(external_id: impl Into<String>) -> Self {
		Self {
			external_id: external_id.into(),
		}
	}
}

/// Ordered object list plus the id → human-readable name map used to label records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectCatalog {
	descriptors: Vec<ObjectDescriptor>,
	names: HashMap<String, String>,
}

impl ObjectCatalog {
	pub fn new<I, S>(ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			descriptors: ids.into_iter().map(ObjectDescriptor::new).collect(),
			names: HashMap::new(),
		}
	}

	pub fn with_names(mut self, names: HashMap<String, String>) -> Self {
		self.names = names;
		self
	}

	/// Descriptors in declaration order.
	pub fn descriptors(&self) -> &[ObjectDescriptor] {
		&self.descriptors
	}

	pub fn len(&self) -> usize {
		self.descriptors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.descriptors.is_empty()
	}

	/// Label for `object_id`, if one is configured.
	pub fn name_for(&self, object_id: &str) -> Option<&str> {
		self.names.get(object_id).map(String::as_str)
	}
}

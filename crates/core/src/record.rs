//! Canonical record shapes produced by the normalizer.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Number;

/// Cell value after applying the numeric-over-text rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
	Number(Number),
	Text(String),
}

impl CellValue {
	/// Renders the value as a map key.
	pub fn to_key(&self) -> String {
		match self {
			CellValue::Number(n) => n.to_string(),
			CellValue::Text(t) => t.clone(),
		}
	}
}

impl From<i64> for CellValue {
	fn from(value: i64) -> Self {
		CellValue::Number(value.into())
	}
}

impl From<&str> for CellValue {
	fn from(value: &str) -> Self {
		CellValue::Text(value.to_string())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
	Kpi,
	Matrix,
	MatrixByDimension,
	MatrixByMeasure,
	Unknown,
}

/// One normalized dashboard object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
	pub object_id: String,
	pub name: Option<String>,
	pub kind: RecordKind,
	pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
	Kpi(Kpi),
	Matrix(Matrix),
	Series(Series),
	Unknown(Diagnostic),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
	pub label: String,
	pub value: CellValue,
}

/// Header row plus body rows, dimensions first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
	pub header: Vec<String>,
	pub body: Vec<Vec<CellValue>>,
}

/// Measure label → (dimension value → cell value), insertion ordered.
///
/// Serialized as nested JSON objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
	pub measures: Vec<MeasureSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasureSeries {
	pub label: String,
	pub points: Vec<(String, CellValue)>,
}

impl Series {
	/// Appends `series`, or replaces the points of an existing measure with
	/// the same label in place.
	pub fn insert(&mut self, series: MeasureSeries) {
		match self.measures.iter_mut().find(|m| m.label == series.label) {
			Some(existing) => existing.points = series.points,
			None => self.measures.push(series),
		}
	}

	/// Value of `measure` at dimension key `key`.
	pub fn get(&self, measure: &str, key: &str) -> Option<&CellValue> {
		self.measures
			.iter()
			.find(|m| m.label == measure)?
			.points
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v)
	}
}

impl MeasureSeries {
	pub fn new(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			points: Vec::new(),
		}
	}

	/// Sets the value at `key`; a repeated key keeps its first position.
	pub fn insert(&mut self, key: String, value: CellValue) {
		match self.points.iter_mut().find(|(k, _)| *k == key) {
			Some((_, existing)) => *existing = value,
			None => self.points.push((key, value)),
		}
	}
}

impl Serialize for Series {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.measures.len()))?;
		for measure in &self.measures {
			map.serialize_entry(&measure.label, &Points(&measure.points))?;
		}
		map.end()
	}
}

struct Points<'a>(&'a [(String, CellValue)]);

impl Serialize for Points<'_> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
	}
}

/// Why an object could not be normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
	pub message: String,
}

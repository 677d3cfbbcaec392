//! Typed view of an object layout and its hypercube.
//!
//! Only the members the normalizer reads are modelled; everything else in the
//! layout is ignored on decode and preserved in the raw payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Realized layout of a visual object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
	#[serde(rename = "qInfo", default, skip_serializing_if = "Option::is_none")]
	pub q_info: Option<ObjectInfo>,
	/// Declared visualization type (`kpi`, `table`, `barchart`, `widget`, ...).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub visualization: Option<String>,
	#[serde(rename = "qHyperCube", default, skip_serializing_if = "Option::is_none")]
	pub q_hyper_cube: Option<HyperCube>,
	/// Present on widget-library objects; names the embedded widget.
	#[serde(rename = "widgetMeta", default, skip_serializing_if = "Option::is_none")]
	pub widget_meta: Option<WidgetMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
	#[serde(rename = "qId", default)]
	pub q_id: String,
	#[serde(rename = "qType", default)]
	pub q_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetMeta {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperCube {
	#[serde(rename = "qDimensionInfo", default)]
	pub q_dimension_info: Vec<FieldInfo>,
	#[serde(rename = "qMeasureInfo", default)]
	pub q_measure_info: Vec<FieldInfo>,
	#[serde(rename = "qGrandTotalRow", default)]
	pub q_grand_total_row: Vec<Cell>,
	#[serde(rename = "qDataPages", default)]
	pub q_data_pages: Vec<DataPage>,
}

/// Header of a dimension or measure column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
	#[serde(rename = "qFallbackTitle", default)]
	pub q_fallback_title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPage {
	#[serde(rename = "qMatrix", default)]
	pub q_matrix: Vec<Vec<Cell>>,
}

/// Matrix cell carrying both representations of its value.
///
/// `qNum` is a JSON number for numeric cells and the string `"NaN"` otherwise,
/// so it is kept as a raw [`Value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
	#[serde(rename = "qText", default, skip_serializing_if = "Option::is_none")]
	pub q_text: Option<String>,
	#[serde(rename = "qNum", default, skip_serializing_if = "Option::is_none")]
	pub q_num: Option<Value>,
}

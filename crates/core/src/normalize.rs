//! Shape normalizer: raw hypercube layouts to canonical records.
//!
//! Classification goes by the layout's declared visualization type:
//!
//! | declared type                      | record kind         |
//! |------------------------------------|---------------------|
//! | `kpi`                              | `kpi`               |
//! | `table`                            | `matrix`            |
//! | `widget`                           | by embedded widget name (kpi / table), else `unknown` |
//! | `barchart`, `qlik-barplus-chart`   | `matrixByDimension` |
//! | `combochart`                       | `matrixByMeasure`   |
//! | anything else                      | `unknown`           |
//!
//! Nothing here fails: a layout that cannot be normalized yields an `unknown`
//! record carrying a diagnostic message.

use dashtap_protocol::{Cell, FieldInfo, HyperCube, Layout};
use serde_json::{Number, Value};
use tracing::warn;

use crate::layout::RawLayout;
use crate::objects::ObjectCatalog;
use crate::record::{CanonicalRecord, CellValue, Diagnostic, Kpi, Matrix, MeasureSeries, Payload, RecordKind, Series};

type Normalized = std::result::Result<(RecordKind, Payload), String>;

/// How the dimension column of a chart becomes a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DimensionKey {
	/// Numeric representation unless it is not a number.
	Resolved,
	/// Always the textual representation.
	Text,
}

/// Normalizes one raw layout and labels it from `objects`.
pub fn normalize(raw: &RawLayout, objects: &ObjectCatalog) -> CanonicalRecord {
	let (kind, payload) = normalize_layout(&raw.layout);
	if let Payload::Unknown(diagnostic) = &payload {
		warn!(target = "dashtap.normalize", object = %raw.object_id, message = %diagnostic.message, "object not normalized");
	}

	CanonicalRecord {
		object_id: raw.object_id.clone(),
		name: objects.name_for(&raw.object_id).map(str::to_string),
		kind,
		payload,
	}
}

/// Classifies and converts a layout value.
pub fn normalize_layout(layout: &Value) -> (RecordKind, Payload) {
	let parsed = match serde_json::from_value::<Layout>(layout.clone()) {
		Ok(parsed) => parsed,
		Err(e) => return unknown(format!("layout does not decode: {e}")),
	};

	let declared = parsed
		.visualization
		.as_deref()
		.or_else(|| parsed.q_info.as_ref().map(|info| info.q_type.as_str()))
		.unwrap_or_default();

	let normalized = match declared {
		"kpi" => kpi(&parsed),
		"table" => matrix(&parsed),
		"widget" => widget(&parsed),
		"barchart" | "qlik-barplus-chart" => series(&parsed, DimensionKey::Resolved).map(|s| (RecordKind::MatrixByDimension, s)),
		// Combo-chart dimensions are categorical labels; keep them verbatim even when they look numeric.
		"combochart" => series(&parsed, DimensionKey::Text).map(|s| (RecordKind::MatrixByMeasure, s)),
		"" => Err("layout declares no visualization type".to_string()),
		other => Err(format!("unsupported visualization type {other:?}")),
	};

	normalized.unwrap_or_else(unknown)
}

/// Numeric representation unless it fails to parse as a number, else the text.
pub fn resolve_cell(cell: &Cell) -> CellValue {
	match cell.q_num.as_ref().and_then(numeric) {
		Some(n) => CellValue::Number(n),
		None => CellValue::Text(cell.q_text.clone().unwrap_or_default()),
	}
}

fn numeric(value: &Value) -> Option<Number> {
	match value {
		Value::Number(n) => Some(integral(n.clone())),
		Value::String(s) => {
			let s = s.trim();
			s.parse::<i64>()
				.ok()
				.map(Number::from)
				.or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).and_then(Number::from_f64))
				.map(integral)
		}
		_ => None,
	}
}

/// `2.0` becomes `2`, so whole numbers render the same however the engine encoded them.
fn integral(n: Number) -> Number {
	if n.is_f64() {
		if let Some(f) = n.as_f64() {
			if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
				return Number::from(f as i64);
			}
		}
	}
	n
}

fn unknown(message: String) -> (RecordKind, Payload) {
	(RecordKind::Unknown, Payload::Unknown(Diagnostic { message }))
}

fn hypercube(layout: &Layout) -> Result<&HyperCube, String> {
	layout.q_hyper_cube.as_ref().ok_or_else(|| "layout has no hypercube".to_string())
}

fn titles(fields: &[FieldInfo]) -> impl Iterator<Item = String> + '_ {
	fields.iter().map(|f| f.q_fallback_title.clone())
}

fn rows(cube: &HyperCube) -> impl Iterator<Item = &Vec<Cell>> {
	cube.q_data_pages.iter().flat_map(|page| page.q_matrix.iter())
}

fn kpi(layout: &Layout) -> Normalized {
	let cube = hypercube(layout)?;
	let value = cube.q_grand_total_row.first().map(resolve_cell).ok_or("kpi has no grand total row")?;
	let label = cube.q_measure_info.first().map(|m| m.q_fallback_title.clone()).ok_or("kpi has no measure")?;
	Ok((RecordKind::Kpi, Payload::Kpi(Kpi { label, value })))
}

fn matrix(layout: &Layout) -> Normalized {
	let cube = hypercube(layout)?;
	let header = titles(&cube.q_dimension_info).chain(titles(&cube.q_measure_info)).collect();
	let body = rows(cube).map(|row| row.iter().map(resolve_cell).collect()).collect();
	Ok((RecordKind::Matrix, Payload::Matrix(Matrix { header, body })))
}

fn widget(layout: &Layout) -> Normalized {
	let name = layout
		.widget_meta
		.as_ref()
		.and_then(|meta| meta.name.as_deref())
		.ok_or("widget layout does not name its widget type")?;

	let flavour = name.to_ascii_lowercase();
	if flavour.contains("kpi") {
		kpi(layout)
	} else if flavour.contains("table") {
		matrix(layout)
	} else {
		Err(format!("unsupported widget type {name:?}"))
	}
}

fn series(layout: &Layout, key: DimensionKey) -> Result<Payload, String> {
	let cube = hypercube(layout)?;
	if cube.q_dimension_info.is_empty() {
		return Err("chart has no dimension".to_string());
	}

	let mut series = Series::default();
	for (m, info) in cube.q_measure_info.iter().enumerate() {
		let mut measure = MeasureSeries::new(info.q_fallback_title.clone());
		for row in rows(cube) {
			let (Some(dimension), Some(cell)) = (row.first(), row.get(m + 1)) else {
				continue;
			};
			let key = match key {
				DimensionKey::Resolved => resolve_cell(dimension).to_key(),
				DimensionKey::Text => dimension.q_text.clone().unwrap_or_default(),
			};
			measure.insert(key, resolve_cell(cell));
		}
		series.insert(measure);
	}

	Ok(Payload::Series(series))
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use serde_json::json;

	use super::*;

	fn cell(text: &str, num: Value) -> Value {
		json!({"qText": text, "qNum": num})
	}

	fn cube_layout(visualization: &str, dims: &[&str], measures: &[&str], matrix: Value) -> Value {
		json!({
			"qInfo": {"qId": "obj", "qType": visualization},
			"visualization": visualization,
			"qHyperCube": {
				"qDimensionInfo": dims.iter().map(|d| json!({"qFallbackTitle": d})).collect::<Vec<_>>(),
				"qMeasureInfo": measures.iter().map(|m| json!({"qFallbackTitle": m})).collect::<Vec<_>>(),
				"qDataPages": [{"qMatrix": matrix}]
			}
		})
	}

	#[test]
	fn valid_number_wins_over_differing_text() {
		let c: Cell = serde_json::from_value(cell("1,234", json!(1234))).unwrap();
		assert_eq!(resolve_cell(&c), CellValue::from(1234));
	}

	#[test]
	fn nan_falls_back_to_text() {
		let c: Cell = serde_json::from_value(cell("NSW", json!("NaN"))).unwrap();
		assert_eq!(resolve_cell(&c), CellValue::from("NSW"));

		let c: Cell = serde_json::from_value(cell("-", json!("not a number"))).unwrap();
		assert_eq!(resolve_cell(&c), CellValue::from("-"));

		let c: Cell = serde_json::from_value(json!({"qText": "n/a"})).unwrap();
		assert_eq!(resolve_cell(&c), CellValue::from("n/a"));
	}

	#[test]
	fn numeric_string_resolves_to_number() {
		let c: Cell = serde_json::from_value(cell("12", json!("12"))).unwrap();
		assert_eq!(resolve_cell(&c), CellValue::from(12));
	}

	#[test]
	fn kpi_takes_grand_total_and_first_measure() {
		let layout = json!({
			"visualization": "kpi",
			"qHyperCube": {
				"qMeasureInfo": [{"qFallbackTitle": "Total cases"}, {"qFallbackTitle": "Other"}],
				"qGrandTotalRow": [{"qText": "1,234", "qNum": 1234}, {"qText": "5", "qNum": 5}],
				"qDataPages": []
			}
		});

		let (kind, payload) = normalize_layout(&layout);
		assert_eq!(kind, RecordKind::Kpi);
		assert_eq!(serde_json::to_value(&payload).unwrap(), json!({"label": "Total cases", "value": 1234}));
	}

	#[test]
	fn table_header_is_dimensions_then_measures() {
		let layout = cube_layout(
			"table",
			&["State"],
			&["Cases", "Deaths"],
			json!([
				[cell("NSW", json!("NaN")), cell("244", json!(244)), cell("2", json!(2))],
				[cell("QLD", json!("NaN")), cell("123", json!(123)), cell("1", json!(1))]
			]),
		);

		let (kind, payload) = normalize_layout(&layout);
		assert_eq!(kind, RecordKind::Matrix);
		assert_eq!(
			serde_json::to_value(&payload).unwrap(),
			json!({"header": ["State", "Cases", "Deaths"], "body": [["NSW", 244, 2], ["QLD", 123, 1]]})
		);
	}

	#[test]
	fn table_rows_span_all_data_pages() {
		let mut layout = cube_layout("table", &["State"], &["Cases"], json!([[cell("NSW", json!("NaN")), cell("1", json!(1))]]));
		layout["qHyperCube"]["qDataPages"]
			.as_array_mut()
			.unwrap()
			.push(json!({"qMatrix": [[cell("VIC", json!("NaN")), cell("2", json!(2))]]}));

		let (_, payload) = normalize_layout(&layout);
		let Payload::Matrix(matrix) = payload else { panic!("expected matrix") };
		assert_eq!(matrix.body.len(), 2);
		assert_eq!(matrix.body[1][0], CellValue::from("VIC"));
	}

	#[test]
	fn barchart_keys_by_numeric_dimension_per_measure() {
		let layout = cube_layout(
			"barchart",
			&["Date"],
			&["Cases", "Tests"],
			json!([
				[cell("01/08/2021", json!(44409)), cell("239", json!(239)), cell("1000", json!(1000))],
				[cell("Unknown", json!("NaN")), cell("3", json!(3)), cell("-", json!("NaN"))]
			]),
		);

		let (kind, payload) = normalize_layout(&layout);
		assert_eq!(kind, RecordKind::MatrixByDimension);
		assert_eq!(
			serde_json::to_value(&payload).unwrap(),
			json!({"Cases": {"44409": 239, "Unknown": 3}, "Tests": {"44409": 1000, "Unknown": "-"}})
		);
	}

	#[test]
	fn barplus_chart_normalizes_like_barchart() {
		let layout = cube_layout("qlik-barplus-chart", &["Age"], &["Cases"], json!([[cell("20-29", json!("NaN")), cell("5", json!(5))]]));
		let (kind, payload) = normalize_layout(&layout);
		assert_eq!(kind, RecordKind::MatrixByDimension);
		assert_eq!(serde_json::to_value(&payload).unwrap(), json!({"Cases": {"20-29": 5}}));
	}

	#[test]
	fn combochart_keeps_dimension_text() {
		let layout = cube_layout("combochart", &["Date"], &["Cases"], json!([[cell("01/08/2021", json!(44409)), cell("239", json!(239))]]));

		let (kind, payload) = normalize_layout(&layout);
		assert_eq!(kind, RecordKind::MatrixByMeasure);
		let Payload::Series(series) = payload else { panic!("expected series") };
		assert_eq!(series.get("Cases", "01/08/2021"), Some(&CellValue::from(239)));
		assert_eq!(series.get("Cases", "44409"), None);
	}

	#[test]
	fn colliding_keys_keep_last_value_at_first_position() {
		let layout = cube_layout(
			"barchart",
			&["Date"],
			&["Cases", "Cases"],
			json!([
				[cell("1 Aug", json!(44409)), cell("1", json!(1)), cell("3", json!(3))],
				[cell("31 Jul", json!(44408)), cell("7", json!(7)), cell("8", json!(8))],
				[cell("01/08", json!(44409)), cell("2", json!(2)), cell("4", json!(4))]
			]),
		);

		let (_, payload) = normalize_layout(&layout);
		assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"Cases":{"44409":4,"44408":8}}"#);
	}

	#[test]
	fn whole_floats_render_as_integers() {
		let c: Cell = serde_json::from_value(cell("2", json!(2.0))).unwrap();
		assert_eq!(resolve_cell(&c), CellValue::from(2));
		assert_eq!(resolve_cell(&c).to_key(), "2");

		let c: Cell = serde_json::from_value(cell("3", json!("3.0"))).unwrap();
		assert_eq!(resolve_cell(&c), CellValue::from(3));

		let c: Cell = serde_json::from_value(cell("2.5", json!(2.5))).unwrap();
		assert_eq!(resolve_cell(&c).to_key(), "2.5");
	}

	#[test]
	fn widget_dispatches_on_embedded_name() {
		let mut kpi_widget = json!({
			"visualization": "widget",
			"widgetMeta": {"name": "Simple KPI"},
			"qHyperCube": {
				"qMeasureInfo": [{"qFallbackTitle": "Hospitalised"}],
				"qGrandTotalRow": [{"qText": "42", "qNum": 42}]
			}
		});
		assert_eq!(normalize_layout(&kpi_widget).0, RecordKind::Kpi);

		kpi_widget["widgetMeta"]["name"] = json!("simple-table");
		assert_eq!(normalize_layout(&kpi_widget).0, RecordKind::Matrix);

		kpi_widget["widgetMeta"]["name"] = json!("Word cloud");
		let (kind, payload) = normalize_layout(&kpi_widget);
		assert_eq!(kind, RecordKind::Unknown);
		assert!(matches!(payload, Payload::Unknown(d) if d.message.contains("Word cloud")));
	}

	#[test]
	fn unrecognised_or_broken_layouts_are_unknown() {
		for layout in [
			json!({"visualization": "map"}),
			json!({"visualization": "kpi"}),
			json!({"visualization": "widget"}),
			json!({"qInfo": {"qId": "x"}}),
			json!({"visualization": 7}),
			json!(null),
			cube_layout("barchart", &[], &["Cases"], json!([])),
		] {
			let (kind, payload) = normalize_layout(&layout);
			assert_eq!(kind, RecordKind::Unknown, "layout {layout}");
			assert!(matches!(payload, Payload::Unknown(d) if !d.message.is_empty()));
		}
	}

	#[test]
	fn normalize_labels_from_catalog() {
		let objects = ObjectCatalog::new(["kpiA", "other"]).with_names(HashMap::from([("kpiA".to_string(), "total_cases".to_string())]));
		let raw = |id: &str| RawLayout {
			object_id: id.to_string(),
			correlation_id: 2,
			ordinal: 0,
			layout: json!({"visualization": "sheet"}),
		};

		let labelled = normalize(&raw("kpiA"), &objects);
		assert_eq!(labelled.name.as_deref(), Some("total_cases"));
		assert_eq!(labelled.kind, RecordKind::Unknown);

		let unlabelled = normalize(&raw("other"), &objects);
		assert_eq!(unlabelled.name, None);
		assert_eq!(unlabelled.object_id, "other");
	}
}

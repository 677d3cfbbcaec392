//! Writes a completed run to date-stamped JSON files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use dashtap::{Handoff, RunOutput};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CliError, Result};

/// Date prefix for a document's `lastModified`, as `YYYY-MM-DD`.
///
/// Accepts RFC 3339 timestamps and bare dates. Anything else falls back to
/// today's UTC date.
pub fn date_stamp(last_modified: &str) -> String {
	let trimmed = last_modified.trim();
	if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
		return ts.with_timezone(&Utc).format("%Y-%m-%d").to_string();
	}
	if let Some(date) = trimmed.get(..10).and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()) {
		return date.format("%Y-%m-%d").to_string();
	}
	warn!(target = "dashtap.persist", last_modified, "unparseable lastModified, stamping with today");
	Utc::now().format("%Y-%m-%d").to_string()
}

/// [`Handoff`] that writes `{date}-records.json` and `{date}-layouts.json`.
#[derive(Debug, Clone)]
pub struct FileWriter {
	out_dir: PathBuf,
}

/// Paths written by one [`FileWriter`] handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFiles {
	pub records: PathBuf,
	pub layouts: PathBuf,
}

impl FileWriter {
	pub fn new(out_dir: impl Into<PathBuf>) -> Self {
		Self { out_dir: out_dir.into() }
	}

	pub fn out_dir(&self) -> &Path {
		&self.out_dir
	}

	pub fn paths_for(&self, output: &RunOutput) -> WrittenFiles {
		let date = date_stamp(&output.document.last_modified);
		WrittenFiles {
			records: self.out_dir.join(format!("{date}-records.json")),
			layouts: self.out_dir.join(format!("{date}-layouts.json")),
		}
	}

	pub fn write(&self, output: &RunOutput) -> Result<WrittenFiles> {
		std::fs::create_dir_all(&self.out_dir).map_err(|e| CliError::io(&self.out_dir, e))?;

		let paths = self.paths_for(output);
		let records = stage_json(&paths.records, &output.records)?;
		let layouts = match stage_json(&paths.layouts, &output.layouts) {
			Ok(staged) => staged,
			Err(e) => {
				let _ = std::fs::remove_file(&records);
				return Err(e);
			}
		};

		// Both files are staged; only now do they replace anything under their final names.
		if let Err(e) = std::fs::rename(&records, &paths.records) {
			let _ = std::fs::remove_file(&records);
			let _ = std::fs::remove_file(&layouts);
			return Err(CliError::io(&paths.records, e));
		}
		if let Err(e) = std::fs::rename(&layouts, &paths.layouts) {
			let _ = std::fs::remove_file(&paths.records);
			let _ = std::fs::remove_file(&layouts);
			return Err(CliError::io(&paths.layouts, e));
		}

		info!(
			target = "dashtap.persist",
			records = %paths.records.display(),
			layouts = %paths.layouts.display(),
			"wrote run output"
		);
		Ok(paths)
	}
}

impl Handoff for FileWriter {
	type Error = CliError;

	fn accept(&self, output: &RunOutput) -> Result<()> {
		self.write(output).map(|_| ())
	}
}

/// Writes `value` next to `path` under a `.tmp` suffix and returns the staged path.
fn stage_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<PathBuf> {
	let staged = staging_path(path);
	let mut body = serde_json::to_string_pretty(value)?;
	body.push('\n');
	std::fs::write(&staged, body).map_err(|e| CliError::io(&staged, e))?;
	Ok(staged)
}

fn staging_path(path: &Path) -> PathBuf {
	let mut name = path.as_os_str().to_owned();
	name.push(".tmp");
	PathBuf::from(name)
}

#[cfg(test)]
mod tests {
	use dashtap::DocumentReference;

	use super::*;

	fn output(last_modified: &str) -> RunOutput {
		RunOutput {
			document: DocumentReference {
				document_id: "doc1".to_string(),
				last_modified: last_modified.to_string(),
				name: None,
			},
			records: Vec::new(),
			layouts: Vec::new(),
		}
	}

	#[test]
	fn writes_both_files_and_no_staging_leftovers() {
		let out = tempfile::tempdir().unwrap();
		let writer = FileWriter::new(out.path().join("data"));

		let paths = writer.write(&output("2021-08-01")).unwrap();
		assert_eq!(paths.records, out.path().join("data/2021-08-01-records.json"));
		assert_eq!(std::fs::read_to_string(&paths.layouts).unwrap(), "[]\n");

		let mut names: Vec<_> = std::fs::read_dir(writer.out_dir()).unwrap().map(|e| e.unwrap().file_name()).collect();
		names.sort();
		assert_eq!(names, vec!["2021-08-01-layouts.json", "2021-08-01-records.json"]);
	}

	#[test]
	fn failed_layouts_write_leaves_no_records_file() {
		let out = tempfile::tempdir().unwrap();
		let writer = FileWriter::new(out.path());
		// a directory where the staged layouts file would go
		std::fs::create_dir(out.path().join("2021-08-01-layouts.json.tmp")).unwrap();

		let err = writer.write(&output("2021-08-01")).unwrap_err();
		assert!(matches!(err, CliError::Io { .. }), "unexpected error: {err}");
		assert!(!out.path().join("2021-08-01-records.json").exists());
		assert!(!out.path().join("2021-08-01-records.json.tmp").exists());
		assert!(!out.path().join("2021-08-01-layouts.json").exists());
	}

	#[test]
	fn stamps_bare_dates_and_timestamps() {
		assert_eq!(date_stamp("2021-08-01"), "2021-08-01");
		assert_eq!(date_stamp("2021-08-01T23:10:00.000Z"), "2021-08-01");
		assert_eq!(date_stamp("2021-08-01T23:10:00+10:00"), "2021-08-01");
		assert_eq!(date_stamp("2021-08-02T01:00:00+10:00"), "2021-08-01");
	}

	#[test]
	fn unparseable_dates_fall_back_to_today() {
		let today = Utc::now().format("%Y-%m-%d").to_string();
		let stamped = date_stamp("last tuesday");
		// midnight rollover between the two calls
		let tomorrow = (Utc::now() + chrono::Duration::days(1)).format("%Y-%m-%d").to_string();
		assert!(stamped == today || stamped == tomorrow, "{stamped}");
	}
}

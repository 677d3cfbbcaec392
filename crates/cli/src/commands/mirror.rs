//! Date-stamped copies of the second provider's pre-built data files.

use std::path::{Path, PathBuf};

use chrono::Local;
use futures::future::try_join_all;
use tracing::{debug, info};
use url::Url;

use crate::cli::MirrorArgs;
use crate::error::{CliError, Result};

pub const DEFAULT_BASE_URL: &str = "https://nswdac-covid-19-postcode-heatmap.azurewebsites.net/datafiles/";

pub const DEFAULT_FILES: &[&str] = &[
	"active_cases.json",
	"agedata.json",
	"agedata_vaccines.json",
	"fatalitiesdata.json",
	"lga_2019_populations.json",
	"lga_daily_cases.json",
	"lga_daily_tests.json",
	"lga_daily_vaccines.json",
	"population.json",
	"postcode_2019_lga_2020_lists.json",
	"postcode_daily_cases.json",
	"postcode_daily_tests.json",
	"state_vaccination_metrics.json",
	"state_vaccination_metrics_daily.json",
	"stats.json",
	"test_24.json",
	"usecase2.json",
	"vaccination_metrics-v3.json",
];

pub async fn execute(args: &MirrorArgs) -> Result<()> {
	let files: Vec<String> = if args.files.is_empty() {
		DEFAULT_FILES.iter().map(|f| f.to_string()).collect()
	} else {
		args.files.clone()
	};
	let date = Local::now().format("%Y-%m-%d").to_string();

	let written = mirror(&reqwest::Client::new(), &args.base_url, &files, &args.out_dir, &date).await?;
	for path in written {
		println!("{}", path.display());
	}
	Ok(())
}

/// Fetches every file, then writes each as `{out_dir}/{date}-{name}`.
///
/// Nothing is written unless every fetch succeeds.
pub async fn mirror(client: &reqwest::Client, base_url: &str, files: &[String], out_dir: &Path, date: &str) -> Result<Vec<PathBuf>> {
	let base = directory_url(base_url)?;

	let bodies = try_join_all(files.iter().map(|name| {
		let base = &base;
		async move {
			let url = base.join(name)?;
			debug!(target = "dashtap.mirror", %url, "fetching");
			let body = client.get(url).send().await?.error_for_status()?.bytes().await?;
			Ok::<_, CliError>((name, body))
		}
	}))
	.await?;

	std::fs::create_dir_all(out_dir).map_err(|e| CliError::io(out_dir, e))?;
	let mut written = Vec::with_capacity(bodies.len());
	for (name, body) in bodies {
		let path = out_dir.join(format!("{date}-{name}"));
		std::fs::write(&path, &body).map_err(|e| CliError::io(&path, e))?;
		written.push(path);
	}

	info!(target = "dashtap.mirror", files = written.len(), out_dir = %out_dir.display(), "mirrored data files");
	Ok(written)
}

/// Parses `base_url` so relative joins land inside it.
fn directory_url(base_url: &str) -> Result<Url> {
	if base_url.ends_with('/') {
		Ok(Url::parse(base_url)?)
	} else {
		Ok(Url::parse(&format!("{base_url}/"))?)
	}
}

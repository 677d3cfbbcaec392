use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::mirror::DEFAULT_BASE_URL;

#[derive(Parser, Debug)]
#[command(name = "dashtap")]
#[command(about = "Extract dashboard statistics from a BI engine WebSocket session")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Resolve the current document, extract every configured object and write the results
	Scrape(ScrapeArgs),

	/// Download the pre-built data files of the second provider and save them date-stamped
	Mirror(MirrorArgs),
}

#[derive(Args, Debug, Default)]
pub struct ScrapeArgs {
	/// Engine host (defaults to the public dashboard engine)
	#[arg(long)]
	pub host: Option<String>,

	/// Dashboard page; sent as the engine reloadUri and scraped for object ids
	#[arg(long, value_name = "URL")]
	pub page_uri: Option<String>,

	/// JSON config file with host, page_uri, objects and names
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Object id to extract (repeatable); skips page scraping
	#[arg(long = "object", value_name = "ID")]
	pub objects: Vec<String>,

	/// Directory the date-stamped result files are written to
	#[arg(short, long, default_value = "data")]
	pub out_dir: PathBuf,

	/// Connect with ws:// instead of wss://
	#[arg(long)]
	pub insecure_ws: bool,
}

#[derive(Args, Debug)]
pub struct MirrorArgs {
	/// Base URL the files are fetched from
	#[arg(long, default_value = DEFAULT_BASE_URL)]
	pub base_url: String,

	/// Directory the date-stamped copies are written to
	#[arg(short, long, default_value = "data/nsw")]
	pub out_dir: PathBuf,

	/// File to fetch (repeatable); defaults to the built-in list
	#[arg(long = "file", value_name = "NAME")]
	pub files: Vec<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scrape_accepts_repeated_objects() {
		let cli = Cli::parse_from(["dashtap", "-vv", "scrape", "--object", "hRZaKk", "--object", "PmBxd", "-o", "out"]);
		assert_eq!(cli.verbose, 2);
		let Commands::Scrape(args) = cli.command else {
			panic!("expected scrape");
		};
		assert_eq!(args.objects, vec!["hRZaKk", "PmBxd"]);
		assert_eq!(args.out_dir, PathBuf::from("out"));
		assert!(args.host.is_none());
	}

	#[test]
	fn mirror_defaults_to_builtin_provider() {
		let cli = Cli::parse_from(["dashtap", "mirror"]);
		let Commands::Mirror(args) = cli.command else {
			panic!("expected mirror");
		};
		assert_eq!(args.base_url, DEFAULT_BASE_URL);
		assert!(args.files.is_empty());
		assert_eq!(args.out_dir, PathBuf::from("data/nsw"));
	}
}

pub mod mirror;
pub mod scrape;

use crate::cli::Commands;
use crate::error::Result;

pub async fn dispatch(command: Commands) -> Result<()> {
	match command {
		Commands::Scrape(args) => scrape::execute(&args).await,
		Commands::Mirror(args) => mirror::execute(&args).await,
	}
}

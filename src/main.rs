use anyhow::Result;
use clap::Parser;
use log::error;

use celebrate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    celebrate::init_logger();

    let cli = Cli::parse();
    if let Err(err) = celebrate::run(cli).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
    Ok(())
}

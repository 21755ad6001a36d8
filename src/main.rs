//! parkpass - parkrun athlete lookup for wallet passes
//!
//! Runs the athlete lookup API, or resolves a single athlete ID from the
//! command line.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;

use parkpass::app;
use parkpass::cli::{Cli, Command, ResolverConfig};
use parkpass::data::ClientHints;
use parkpass::{logging, server};

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = ResolverConfig::from_args(&cli.resolver)?;
    let resolver = app::build_resolver(&config).await?;

    match cli.command {
        Command::Serve { bind } => server::serve(bind, resolver).await?,
        Command::Lookup { aid } => {
            let resolved = resolver.resolve(&aid, &ClientHints::default()).await?;
            println!("{}", resolved.payload);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

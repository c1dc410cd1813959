mod cli;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use courtfetch::config::Config;
use courtfetch::observability::init_tracing;
use courtfetch::service::{AcquisitionService, AppContext};
use courtfetch::triggers::DiscoveredItem;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AnyError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load_with(cli.config)?;

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let bind_addr = config.server.bind_addr;
    let batch_size = config.discovery.batch_size;
    let validation_court = config.pacer.validation_court.clone();
    let service = AcquisitionService::new(Arc::new(AppContext::build(config)?));

    match cli.command {
        Commands::Serve(args) => {
            courtfetch::server::run(service, args.address.unwrap_or(bind_addr)).await?
        }
        Commands::Evaluate(args) => {
            let raw = std::fs::read(&args.file)?;
            let items: Vec<DiscoveredItem> = serde_json::from_slice(&raw)?;
            print_json(&service.evaluate_batch(&items)?)?;
            service.persist_queue()?;
        }
        Commands::Process(args) => {
            let report = service
                .process_batch(args.max_count.unwrap_or(batch_size))
                .await?;
            print_json(&report)?;
        }
        Commands::Status => print_json(&service.get_status()?)?,
        Commands::Login(args) => {
            let court = args.court.unwrap_or(validation_court);
            let outcome = service.login(&court).await;
            print_json(&outcome)?;
            if !outcome.success {
                return Err(outcome.message.into());
            }
        }
        Commands::Docket(args) => {
            print_json(&service.fetch_docket(&args.court, &args.case_number).await?)?
        }
        Commands::Config => {}
    }

    Ok(())
}

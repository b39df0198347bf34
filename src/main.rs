mod cli;

use std::process::ExitCode;

use anyhow::Result;
use cardsync::config::SyncConfig;
use cardsync::events::{badge_date, load_events, partition, EventEntry};
use chrono::Local;
use clap::Parser;
use cli::{Cli, Commands};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cardsync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = SyncConfig::load(cli.config.as_deref())?;
    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let report = cardsync::sync(&cfg).await?;
            info!(
                written = report.written,
                fresh = report.fresh,
                carried = report.carried,
                failed_sources = report.failed_sources(),
                "sync finished -> {}",
                cfg.output.display()
            );
        }
        Commands::Events { today } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let board = partition(load_events(&cfg.events).await?, today);
            print_events("Upcoming", &board.upcoming, "No upcoming events yet.");
            print_events("Past", &board.past, "-");
        }
    }
    Ok(())
}

fn print_events(heading: &str, list: &[EventEntry], empty: &str) {
    println!("{heading}:");
    if list.is_empty() {
        println!("  {empty}");
    }
    for e in list {
        let date = e.date.as_deref().and_then(badge_date).unwrap_or_else(|| "TBA".to_string());
        let location = e.location();
        println!("  {date:<12} {}", e.title);
        if let Some(sub) = e.subtitle.as_deref().filter(|s| !s.is_empty()) { println!("  {:<12} {sub}", ""); }
        if !location.is_empty() { println!("  {:<12} {location}", ""); }
        println!("  {:<12} {}", "", e.link);
    }
}

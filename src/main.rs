use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use revtally::cli::{Cli, CliCommand};
use revtally::config::Config;
use revtally::display::format_report;
use revtally::error::{Error, Result};
use revtally::overrides::SuppressionSet;
use revtally::service::{ReviewService, failure_summary};
use revtally::sources::github::GitHubSource;
use revtally::store::Store;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    debug!(?config, "config loaded");

    if let Err(e) = run(cli.command, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: CliCommand, config: Config) -> Result<()> {
    let service = Arc::new(ReviewService::new(
        Arc::new(GitHubSource::new()),
        Arc::new(SuppressionSet::new()),
        Store::new(&config.data_dir),
        config.cache_ttl,
        config.preview_chars,
    ));

    match command {
        CliCommand::Report {
            prs,
            suppressions,
            json,
            force,
        } => {
            let keys = if prs.is_empty() {
                config.repositories.clone()
            } else {
                prs
            };
            if keys.is_empty() {
                return Err(Error::NoThreadSelected(
                    "pass --pr or add [[repositories]] to the config".to_string(),
                ));
            }
            for (duplicate, original) in &suppressions {
                service.suppress(duplicate, original);
            }

            info!(reviews = keys.len(), "reconciling");
            let results = service.report_all(&keys, force).await;

            let mut reports = Vec::with_capacity(results.len());
            let mut failures = Vec::new();
            for (key, result) in results {
                match result {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        eprintln!("error: {key}: {e}");
                        failures.push(key);
                    }
                }
            }

            if json {
                let out = serde_json::to_string_pretty(&reports)
                    .map_err(|e| Error::Output(format!("failed to serialize report: {e}")))?;
                println!("{out}");
            } else {
                println!("{}", config.name);
                for report in &reports {
                    println!();
                    print!("{}", format_report(report));
                }
            }

            match failure_summary(keys.len(), &failures) {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        CliCommand::Assign { pr, url, owner } => {
            let updated = service.set_owner(&pr, &url, &owner)?;
            for url in updated {
                println!("{url}");
            }
            Ok(())
        }
        CliCommand::Roster { pr, handles } => {
            let store = service.store();
            if handles.is_empty() {
                for handle in store.load_roster(&pr) {
                    println!("{handle}");
                }
            } else {
                store.save_roster(&pr, &handles)?;
                info!(key = %pr, participants = handles.len(), "roster saved");
            }
            Ok(())
        }
    }
}

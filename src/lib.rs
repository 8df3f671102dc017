mod utils;

pub mod allergens;
pub mod commands;
pub mod config;
pub mod db;
pub mod history;
pub mod lookup;
pub mod profile;
pub mod scan;
pub mod settings;

use std::sync::Arc;

use anyhow::{Context, Result};
use commands::ConsoleCommand;
use config::ScannerConfig;
use db::Database;
use history::HistoryLedger;
use lookup::OpenFoodFactsClient;
use profile::ProfileRegistry;
use scan::ScanController;
use settings::SettingsStore;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

/// Everything the console needs, wired from one config.
pub struct ScannerApp {
    pub controller: ScanController,
}

impl ScannerApp {
    pub async fn bootstrap(config: &ScannerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("failed to create data directory {}", config.data_dir.display())
        })?;

        let database = Database::new(config.database_path())?;
        let history = HistoryLedger::open(Arc::new(database)).await?;

        let settings = SettingsStore::new(config.settings_path())?;
        let profile = ProfileRegistry::load(Arc::new(settings))?;

        let lookup = OpenFoodFactsClient::new(&config.lookup_base_url, config.lookup_timeout)
            .context("failed to build product lookup client")?;

        let controller = ScanController::new(
            Arc::new(lookup),
            Arc::new(profile),
            history,
            config.lookup_timeout,
        );

        Ok(Self { controller })
    }
}

async fn serve(config: ScannerConfig) -> Result<()> {
    let app = ScannerApp::bootstrap(&config).await?;

    let mut events = app.controller.subscribe_events();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    log::debug!("{} event", event.name());
                    if let Some(line) = commands::render_event(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Console fell behind by {skipped} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{}", commands::render_state(&app.controller.snapshot().await));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let Some(parsed) = ConsoleCommand::parse(&line) else {
            continue;
        };

        let command = match parsed {
            Ok(command) => command,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        let quit = command == ConsoleCommand::Quit;

        match commands::dispatch(&app, command).await {
            Ok(reply) => println!("{reply}"),
            Err(err) => eprintln!("{err}"),
        }
        if quit {
            break;
        }
    }

    app.controller.clear().await;
    drop(app);
    printer.abort();
    log::info!("Allergen scanner shutting down");
    Ok(())
}

pub fn run() {
    let config = match ScannerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err:#}");
            std::process::exit(2);
        }
    };

    // RUST_LOG still applies per module; the config only picks the default level.
    env_logger::Builder::from_default_env()
        .filter_level(config.log_level())
        .init();

    log::info!("Allergen scanner starting up...");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(serve(config)) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

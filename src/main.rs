// src/main.rs
mod tui;
mod store;
mod storage;
mod cli;
mod config;
mod error;
mod models;
mod validation;

use clap::Parser;

fn main() -> Result<(), error::AppError> {
    env_logger::init();
    log::info!("Starting AccMan-RS application");

    let cli_args = cli::Cli::parse();
    let app_config = config::load_config();
    let storage_dir = cli_args
        .storage_dir
        .clone()
        .unwrap_or_else(|| app_config.resolve_storage_dir());
    log::info!("Using account storage in {:?}", storage_dir);

    let in_memory = matches!(cli_args.command, Some(cli::Commands::Tui { in_memory: true }));

    match cli::handle_cli_command(cli_args.command, &storage_dir, &app_config) {
        Ok(should_run_tui) => {
            if should_run_tui {
                let result = if in_memory {
                    log::info!("Running TUI with in-memory storage; nothing will be saved.");
                    tui::run_tui(storage::MemoryStorage::new(), &app_config)
                } else {
                    tui::run_tui(storage::FileStorage::new(&storage_dir), &app_config)
                };
                if let Err(e) = result {
                    log::error!("Application TUI error: {:#?}", e);
                    eprintln!("Error: {}", e);
                    return Err(e);
                }
            } else {
                log::info!("CLI command processed.");
            }
        }
        Err(e) => {
            log::error!("Application failed: {:#?}", e);
            eprintln!("Error: {}", e);
            return Err(e);
        }
    }

    log::info!("AccMan-RS application finished successfully.");
    Ok(())
}

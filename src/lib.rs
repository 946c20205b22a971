//! Blight Scan — potato leaf disease scanning client.
//!
//! The library holds the scan flow; `main.rs` only calls `run()`.
//!
//!   - validate.rs  — file type/size rules, selections, loaded payloads
//!   - api/         — classification service client (predict, history, ping, twin)
//!   - interpret.rs — confidence bands, low-confidence advisory, formatting
//!   - location/    — best-effort geotagging
//!   - history.rs   — scan records and the history store
//!   - workflow.rs  — upload-and-predict state machine
//!   - source.rs    — image sources (single file, watched directory)
//!   - prepare.rs   — optional downscale before upload
//!   - monitor.rs   — unattended capture loop
//!   - cli.rs       — command-line front-end

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod interpret;
pub mod location;
pub mod monitor;
pub mod prepare;
pub mod source;
pub mod validate;
pub mod workflow;

use clap::Parser;
use std::process::ExitCode;

/// Entry point — called by `main`.
pub async fn run() -> ExitCode {
    // .env.local wins over .env; real environment variables win over both.
    for env_file in [".env.local", ".env"] {
        let path = std::path::Path::new(env_file);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break;
        }
    }

    env_logger::init();

    let cli = cli::Cli::parse();
    let result = match config::Settings::from_env() {
        Ok(settings) => cli::execute(cli, settings).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("[STARTUP] {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

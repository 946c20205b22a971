//! Command-line front-end.
//!
//! Thin: argument parsing, wiring, and printing. Every decision about
//! validation, errors and interpretation lives in the library modules.

use crate::api::{PredictionApi, PredictionClient};
use crate::config::{ApiConfig, Settings};
use crate::error::{CliError, SourceError};
use crate::history::{ScanHistoryStore, ScanRecord};
use crate::interpret::{format_file_size, format_percentage, Interpretation};
use crate::location::{LocationEnricher, LocationStatus, StaticLocationProvider};
use crate::monitor::{run_monitor, MonitorOptions};
use crate::prepare::{prepare_selection, DEFAULT_MAX_DIMENSION};
use crate::source::{DirectorySource, FileSource, ImageSource};
use crate::workflow::{NotificationKind, ScanState, ScanWorkflow};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "blight-scan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Potato leaf disease scans against a classification service", long_about = None)]
pub struct Cli {
    /// Base URL of the classification service (overrides API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Scan history snapshot (overrides SCAN_HISTORY_FILE)
    #[arg(long, global = true)]
    pub history_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify one image
    Predict {
        /// JPG, JPEG or PNG file, at most 5 MB
        file: PathBuf,

        #[command(flatten)]
        location: LocationArgs,

        /// Downscale so the longest side fits before upload
        #[arg(long)]
        max_dimension: Option<u32>,

        /// Retry once after a failed submission
        #[arg(long)]
        retry: bool,
    },
    /// Page through predictions stored by the service
    History {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Check service health and model status
    Ping,
    /// Show the latest digital-twin state
    Twin,
    /// Manage local scan history
    Scans {
        #[command(subcommand)]
        action: ScansAction,
    },
    /// Scan the newest image in a directory on an interval
    Monitor {
        dir: PathBuf,

        /// Seconds between cycles (overrides CAPTURE_INTERVAL)
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many cycles
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        cycles: Option<u64>,

        #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION)]
        max_dimension: u32,

        #[command(flatten)]
        location: LocationArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScansAction {
    /// Newest first
    List,
    /// Remove one record
    Delete { id: String },
    /// Remove every record
    Clear,
}

/// Fixed coordinates to tag scans with.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct LocationArgs {
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Accuracy in meters
    #[arg(long, requires = "lat")]
    pub accuracy: Option<f64>,
}

impl LocationArgs {
    fn enricher(&self, timeout: Duration) -> Result<Option<LocationEnricher>, CliError> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Ok(None);
        };
        let provider = StaticLocationProvider::new(lat, lon, self.accuracy)?;
        Ok(Some(LocationEnricher::new(Arc::new(provider), timeout)))
    }
}

/// Run one parsed command.
pub async fn execute(cli: Cli, settings: Settings) -> Result<(), CliError> {
    let api = match &cli.api_url {
        Some(url) => ApiConfig::new(url)?.with_timeout(settings.api.request_timeout),
        None => settings.api.clone(),
    };
    let history_file = cli
        .history_file
        .clone()
        .unwrap_or_else(|| settings.history_file.clone());

    match cli.command {
        Command::Predict {
            file,
            location,
            max_dimension,
            retry,
        } => {
            let client = Arc::new(PredictionClient::new(api)?);
            let enricher = location.enricher(settings.location_timeout)?;
            predict(client, &file, enricher, max_dimension, retry, &history_file).await
        }
        Command::History { page, page_size } => {
            let client = PredictionClient::new(api)?;
            show_history(&client, page, page_size).await
        }
        Command::Ping => {
            let health = PredictionClient::new(api)?.ping().await?;
            println!("Status:       {}", health.status);
            println!("Model loaded: {}", health.model_loaded);
            if let Some(info) = health.model_info {
                if !info.class_names.is_empty() {
                    println!("Classes:      {}", info.class_names.join(", "));
                }
                if let Some(shape) = info.input_shape {
                    let dims: Vec<String> = shape
                        .iter()
                        .map(|d| d.map_or_else(|| "?".to_string(), |d| d.to_string()))
                        .collect();
                    println!("Input shape:  [{}]", dims.join(", "));
                }
            }
            Ok(())
        }
        Command::Twin => {
            let twin = PredictionClient::new(api)?.digital_twin().await?;
            println!("Plant:         {}", twin.plant_id);
            println!("Disease:       {}", twin.disease_type);
            println!("Disease level: {}", twin.disease_level);
            println!("Updated:       {}", twin.timestamp);
            Ok(())
        }
        Command::Scans { action } => manage_scans(action, &history_file),
        Command::Monitor {
            dir,
            interval,
            cycles,
            max_dimension,
            location,
        } => {
            let client = Arc::new(PredictionClient::new(api)?);
            let store = Arc::new(ScanHistoryStore::load_json(&history_file)?);
            let mut workflow = ScanWorkflow::new(client).with_history(Arc::clone(&store));
            if let Some(enricher) = location.enricher(settings.location_timeout)? {
                workflow = workflow.with_location(enricher);
            }

            let mut options = MonitorOptions::new(
                interval
                    .map(Duration::from_secs)
                    .unwrap_or(settings.capture_interval),
            );
            options.max_cycles = cycles;
            options.max_dimension = Some(max_dimension);

            let source = DirectorySource::new(dir);
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("[MONITOR] Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            let report = run_monitor(&source, &mut workflow, &options, shutdown).await;
            store.save_json(&history_file)?;
            println!(
                "{} cycles: {} scanned, {} failed, {} idle",
                report.cycles, report.scanned, report.failed, report.idle
            );
            Ok(())
        }
    }
}

async fn predict(
    api: Arc<dyn PredictionApi>,
    file: &Path,
    enricher: Option<LocationEnricher>,
    max_dimension: Option<u32>,
    retry: bool,
    history_file: &Path,
) -> Result<(), CliError> {
    let mut selection = FileSource::new(file)
        .pick()
        .await?
        .ok_or_else(|| SourceError::NoImage(file.display().to_string()))?;
    if let Some(max) = max_dimension {
        selection = prepare_selection(selection, max).await?;
    }

    let store = Arc::new(ScanHistoryStore::load_json(history_file)?);
    let mut workflow = ScanWorkflow::new(api).with_history(Arc::clone(&store));
    if let Some(enricher) = enricher {
        workflow = workflow.with_location(enricher);
    }

    let submission = workflow.accept(selection).await?;
    let outcome = submission.send().await;
    workflow.complete(outcome);
    print_notifications(&mut workflow);

    if retry && workflow.can_retry() {
        if let ScanState::ErrorDisplayed(e) = workflow.state() {
            eprintln!("error: {} (retrying)", e);
        }
        workflow.retry_now().await;
        print_notifications(&mut workflow);
    }

    match workflow.state() {
        ScanState::Displaying(interpretation) => {
            print_interpretation(interpretation);
            match workflow.location_status() {
                LocationStatus::Acquired(sample) => {
                    println!("Location:   {:.6}, {:.6}", sample.latitude, sample.longitude)
                }
                LocationStatus::Failed(e) => println!("Location:   unavailable ({})", e),
                LocationStatus::Absent => {}
            }
            if let Some(id) = workflow.last_record_id() {
                println!("Saved scan: {}", id);
            }
            store.save_json(history_file)?;
            Ok(())
        }
        ScanState::ErrorDisplayed(e) => Err(e.clone().into()),
        // accept() returns rejections as errors, so a settled workflow is
        // never Idle or Submitting here.
        _ => Ok(()),
    }
}

async fn show_history(
    api: &dyn PredictionApi,
    page: u32,
    page_size: u32,
) -> Result<(), CliError> {
    let history = api.fetch_history(page, page_size).await?;
    if history.data.is_empty() {
        println!("No predictions yet.");
    }
    for record in &history.data {
        println!(
            "{:<26} {:<14} {:>7}%  {} ({})",
            record.timestamp.as_deref().unwrap_or("-"),
            record.predicted_class,
            format_percentage(record.confidence),
            record.file_metadata.filename,
            format_file_size(record.file_metadata.size),
        );
    }
    let p = history.pagination;
    println!(
        "Page {} of {} ({} total, {} per page)",
        p.page, p.pages, p.total, p.page_size
    );
    Ok(())
}

fn manage_scans(action: ScansAction, history_file: &Path) -> Result<(), CliError> {
    let store = ScanHistoryStore::load_json(history_file)?;
    match action {
        ScansAction::List => {
            let records = store.list_by_recency();
            if records.is_empty() {
                println!("No scans recorded.");
            }
            for record in &records {
                print_record(record);
            }
            Ok(())
        }
        ScansAction::Delete { id } => {
            if !store.delete(&id) {
                return Err(CliError::UnknownScan(id));
            }
            store.save_json(history_file)?;
            println!("Deleted {}", id);
            Ok(())
        }
        ScansAction::Clear => {
            let count = store.len();
            store.clear();
            store.save_json(history_file)?;
            println!("Removed {} scans", count);
            Ok(())
        }
    }
}

fn print_interpretation(interpretation: &Interpretation) {
    println!("Disease:    {}", interpretation.result.predicted_class);
    println!(
        "Confidence: {} ({})",
        interpretation.confidence_display(),
        interpretation.band.color()
    );
    if let Some(scores) = &interpretation.class_confidences {
        let mut scores: Vec<_> = scores.iter().collect();
        scores.sort_by(|a, b| b.1.total_cmp(a.1));
        for (class, score) in scores {
            println!("  {:<14} {:.2}%", class, score * 100.0);
        }
    }
}

fn print_record(record: &ScanRecord) {
    let location = record
        .location
        .map(|l| format!("{:.4}, {:.4}", l.latitude, l.longitude))
        .unwrap_or_default();
    println!(
        "{}  {}  {:<14} {:>7}%  {}",
        record.id, record.timestamp, record.disease, record.confidence, location
    );
}

fn print_notifications(workflow: &mut ScanWorkflow) {
    for note in workflow.take_notifications() {
        match note.kind {
            NotificationKind::Warning => eprintln!("warning: {}", note.message),
            NotificationKind::Info => eprintln!("note: {}", note.message),
            // Reported once, on the way out.
            NotificationKind::Error => {}
        }
    }
}

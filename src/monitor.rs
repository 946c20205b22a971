//! Unattended capture loop.
//!
//! Every interval, pick the newest unseen image from a source, optionally
//! shrink it, and run it through the scan workflow. A failed cycle backs
//! off before the next one. The loop ends on the shutdown future or after
//! a fixed number of cycles.

use crate::prepare::prepare_selection;
use crate::source::ImageSource;
use crate::workflow::{ScanState, ScanWorkflow};
use std::future::Future;
use std::time::{Duration, Instant};

/// Pause after a failed cycle.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub interval: Duration,
    pub error_backoff: Duration,
    /// Stop after this many cycles. `None` runs until shutdown.
    pub max_cycles: Option<u64>,
    /// Downscale before upload. `None` uploads the file as-is.
    pub max_dimension: Option<u32>,
}

impl MonitorOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            error_backoff: ERROR_BACKOFF,
            max_cycles: None,
            max_dimension: None,
        }
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorReport {
    pub cycles: u64,
    pub scanned: u64,
    pub failed: u64,
    pub idle: u64,
}

enum CycleOutcome {
    Scanned,
    Failed,
    Idle,
}

/// Drive `workflow` from `source` until `shutdown` resolves or the cycle
/// limit is hit.
pub async fn run_monitor<F>(
    source: &dyn ImageSource,
    workflow: &mut ScanWorkflow,
    options: &MonitorOptions,
    shutdown: F,
) -> MonitorReport
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut report = MonitorReport::default();
    log::info!(
        "[MONITOR] Starting (interval {:?}, max cycles {:?})",
        options.interval,
        options.max_cycles
    );

    loop {
        if options.max_cycles.is_some_and(|max| report.cycles >= max) {
            break;
        }
        let start = Instant::now();
        let outcome = tokio::select! {
            outcome = run_cycle(source, workflow, options) => outcome,
            _ = &mut shutdown => {
                log::info!("[MONITOR] Shutdown during cycle {}", report.cycles + 1);
                break;
            }
        };
        report.cycles += 1;

        let pause = match outcome {
            CycleOutcome::Scanned => {
                report.scanned += 1;
                options.interval
            }
            CycleOutcome::Idle => {
                report.idle += 1;
                options.interval
            }
            CycleOutcome::Failed => {
                report.failed += 1;
                log::warn!("[MONITOR] Backing off for {:?}", options.error_backoff);
                options.error_backoff
            }
        };
        log::info!(
            "[MONITOR] Cycle {} done in {}ms",
            report.cycles,
            start.elapsed().as_millis()
        );

        // No pause after the last cycle.
        if options.max_cycles.is_some_and(|max| report.cycles >= max) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = &mut shutdown => {
                log::info!("[MONITOR] Shutdown requested");
                break;
            }
        }
    }

    log::info!(
        "[MONITOR] Stopped after {} cycles ({} scanned, {} failed, {} idle)",
        report.cycles,
        report.scanned,
        report.failed,
        report.idle
    );
    report
}

async fn run_cycle(
    source: &dyn ImageSource,
    workflow: &mut ScanWorkflow,
    options: &MonitorOptions,
) -> CycleOutcome {
    let selection = match source.pick().await {
        Ok(Some(selection)) => selection,
        Ok(None) => {
            log::info!("[MONITOR] No new image");
            return CycleOutcome::Idle;
        }
        Err(e) => {
            log::error!("[MONITOR] Capture failed: {}", e);
            return CycleOutcome::Failed;
        }
    };

    let selection = match options.max_dimension {
        Some(max) => match prepare_selection(selection, max).await {
            Ok(prepared) => prepared,
            Err(e) => {
                log::error!("[MONITOR] Could not prepare image: {}", e);
                return CycleOutcome::Failed;
            }
        },
        None => selection,
    };

    let uri = selection.uri.clone();
    match workflow.submit(selection).await {
        ScanState::Displaying(interpretation) => {
            log::info!(
                "[MONITOR] {}: {} ({})",
                uri,
                interpretation.result.predicted_class,
                interpretation.confidence_display()
            );
            CycleOutcome::Scanned
        }
        ScanState::ErrorDisplayed(e) => {
            log::error!("[MONITOR] {}: {}", uri, e);
            CycleOutcome::Failed
        }
        // Rejected by validation.
        _ => {
            log::warn!("[MONITOR] {}: skipped", uri);
            CycleOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{PredictionApi, PredictionHistoryPage, PredictionResponse};
    use crate::error::{ScanError, SourceError};
    use crate::validate::{ImagePayload, ImageSelection};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct AlwaysHealthy {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PredictionApi for AlwaysHealthy {
        async fn submit(&self, _: &ImagePayload) -> Result<PredictionResponse, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PredictionResponse {
                class: Some("Healthy".to_string()),
                confidence: Some(0.93),
                ..Default::default()
            })
        }

        async fn fetch_history(&self, _: u32, _: u32) -> Result<PredictionHistoryPage, ScanError> {
            unimplemented!()
        }
    }

    /// Yields the queued picks in order, then nothing.
    struct Queue(Mutex<Vec<Result<Option<ImageSelection>, SourceError>>>);

    #[async_trait::async_trait]
    impl ImageSource for Queue {
        async fn pick(&self) -> Result<Option<ImageSelection>, SourceError> {
            let mut queue = self.0.lock().unwrap();
            if queue.is_empty() {
                Ok(None)
            } else {
                queue.remove(0)
            }
        }
    }

    fn leaf(name: &str) -> ImageSelection {
        ImageSelection::from_bytes(format!("mem://{}", name), name, "image/jpeg", vec![1u8; 32])
    }

    fn fast(max_cycles: u64) -> MonitorOptions {
        MonitorOptions {
            interval: Duration::from_millis(5),
            error_backoff: Duration::from_millis(5),
            max_cycles: Some(max_cycles),
            max_dimension: None,
        }
    }

    #[tokio::test]
    async fn counts_scans_failures_and_idle_cycles() {
        let api = Arc::new(AlwaysHealthy {
            calls: AtomicUsize::new(0),
        });
        let mut workflow = ScanWorkflow::new(api.clone());
        let source = Queue(Mutex::new(vec![
            Ok(Some(leaf("a.jpg"))),
            Err(SourceError::PermissionDenied("camera".to_string())),
            Ok(Some(leaf("b.jpg"))),
        ]));

        let report = run_monitor(&source, &mut workflow, &fast(4), std::future::pending()).await;
        assert_eq!(
            report,
            MonitorReport {
                cycles: 4,
                scanned: 2,
                failed: 1,
                idle: 1
            }
        );
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn shutdown_stops_an_unbounded_run() {
        let api = Arc::new(AlwaysHealthy {
            calls: AtomicUsize::new(0),
        });
        let mut workflow = ScanWorkflow::new(api);
        let source = Queue(Mutex::new(Vec::new()));
        let options = MonitorOptions::new(Duration::from_secs(3600));

        let report = run_monitor(
            &source,
            &mut workflow,
            &options,
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;
        assert_eq!(report.cycles, 1);
        assert_eq!(report.idle, 1);
    }

    #[tokio::test]
    async fn zero_cycle_limit_runs_nothing() {
        let api = Arc::new(AlwaysHealthy {
            calls: AtomicUsize::new(0),
        });
        let mut workflow = ScanWorkflow::new(api.clone());
        let source = Queue(Mutex::new(vec![Ok(Some(leaf("a.jpg")))]));

        let report = run_monitor(&source, &mut workflow, &fast(0), std::future::pending()).await;
        assert_eq!(report, MonitorReport::default());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.0.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycle_waits_for_backoff_not_interval() {
        let api = Arc::new(AlwaysHealthy {
            calls: AtomicUsize::new(0),
        });
        let mut workflow = ScanWorkflow::new(api);
        let source = Queue(Mutex::new(vec![Err(SourceError::PermissionDenied(
            "camera".to_string(),
        ))]));
        let options = MonitorOptions {
            interval: Duration::from_secs(1),
            error_backoff: Duration::from_secs(60),
            max_cycles: Some(2),
            max_dimension: None,
        };

        let start = tokio::time::Instant::now();
        let report = run_monitor(&source, &mut workflow, &options, std::future::pending()).await;
        let elapsed = start.elapsed();

        assert_eq!(report.failed, 1);
        assert_eq!(report.idle, 1);
        assert!(elapsed >= Duration::from_secs(60), "waited {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(61), "waited {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_cycle_waits_for_interval() {
        let api = Arc::new(AlwaysHealthy {
            calls: AtomicUsize::new(0),
        });
        let mut workflow = ScanWorkflow::new(api);
        let source = Queue(Mutex::new(vec![Ok(Some(leaf("a.jpg")))]));
        let options = MonitorOptions {
            interval: Duration::from_secs(1),
            error_backoff: Duration::from_secs(60),
            max_cycles: Some(2),
            max_dimension: None,
        };

        let start = tokio::time::Instant::now();
        let report = run_monitor(&source, &mut workflow, &options, std::future::pending()).await;
        let elapsed = start.elapsed();

        assert_eq!(report.scanned, 1);
        assert!(elapsed >= Duration::from_secs(1), "waited {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(60), "waited {:?}", elapsed);
    }
}

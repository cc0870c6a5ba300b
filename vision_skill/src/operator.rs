/// Tracking Operator - dedicated capture/processing flow
///
/// Runs the update/predict/evict cycle on its own thread:
/// - Polls the frame source generation on a fixed tick
/// - Refreshes the shared tracking service when a new frame arrives
/// - Stops on `shutdown()` or drop
///
/// Query-side readers share the same `TrackingService` and only read its
/// published snapshot.
use crate::config::OperatorConfig;
use crate::error::Result;
use crate::frame_source::FrameSource;
use crate::service::TrackingService;
use crossbeam::channel::{bounded, tick, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub struct TrackingOperator {
    shutdown_tx: Option<Sender<()>>,
    worker_handle: Option<thread::JoinHandle<()>>,
}

impl TrackingOperator {
    pub fn spawn<S>(
        source: Arc<S>,
        service: Arc<TrackingService>,
        config: &OperatorConfig,
    ) -> Result<Self>
    where
        S: FrameSource + 'static,
    {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let interval = Duration::from_millis(config.poll_interval_ms.max(1));

        let worker_handle = thread::Builder::new()
            .name("tracking-operator".to_string())
            .spawn(move || Self::run(source, service, interval, shutdown_rx))?;

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            worker_handle: Some(worker_handle),
        })
    }

    fn run<S: FrameSource>(
        source: Arc<S>,
        service: Arc<TrackingService>,
        interval: Duration,
        shutdown_rx: Receiver<()>,
    ) {
        log::info!(
            "Tracking operator started (checking every {}ms)",
            interval.as_millis()
        );

        let ticker = tick(interval);
        let mut cycles = 0_u64;

        loop {
            crossbeam::select! {
                recv(ticker) -> _ => {
                    service.refresh(source.as_ref());
                    cycles += 1;

                    if cycles % 500 == 0 {
                        log::info!(
                            "Tracking operator: {} polls, {} cycles, {} active trackers",
                            cycles,
                            service.cycle_count(),
                            service.num_trackers()
                        );
                    }
                }
                recv(shutdown_rx) -> _ => {
                    log::info!("Tracking operator shutting down after {} polls", cycles);
                    break;
                }
            }
        }

        log::info!("Tracking operator stopped");
    }

    pub fn is_running(&self) -> bool {
        self.worker_handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the worker thread and wait for it
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.worker_handle.take() {
            if handle.join().is_err() {
                log::error!("Tracking operator thread panicked");
            }
        }
    }
}

impl Drop for TrackingOperator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

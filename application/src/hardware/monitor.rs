//! Periodic hardware scanning

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::scanner::HardwareScanner;
use crate::config::MonitorConfig;

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Re-runs the scanner on a fixed interval until stopped
pub struct HardwareMonitor {
    scanner: Arc<HardwareScanner>,
    config: MonitorConfig,
    running: Mutex<Option<Running>>,
}

impl HardwareMonitor {
    pub fn new(scanner: Arc<HardwareScanner>, config: MonitorConfig) -> Self {
        Self {
            scanner,
            config,
            running: Mutex::new(None),
        }
    }

    /// Start scanning immediately and then every interval; false if already running
    pub fn start(&self) -> bool {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return false;
        }

        let token = CancellationToken::new();
        let scanner = Arc::clone(&self.scanner);
        let period = self.config.interval;
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        scanner.scan().await;
                    }
                }
            }
            tracing::debug!("Hardware monitor stopped");
        });

        tracing::info!(interval_secs = period.as_secs(), "Hardware monitor started");
        *running = Some(Running { token, handle });
        true
    }

    pub fn stop(&self) {
        if let Some(running) = self
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            running.token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }
}

impl Drop for HardwareMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

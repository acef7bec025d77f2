//! Logging infrastructure: the structured execution audit log.
//!
//! Provides [`JsonlExecutionLogger`], a JSONL file writer implementing the
//! [`ExecutionLogger`] port, and [`spawn_resource_audit`], which copies
//! resource manager events into any logger.

mod jsonl_logger;

pub use jsonl_logger::JsonlExecutionLogger;

use std::sync::Arc;

use argos_application::ports::execution_logger::{ExecutionEvent, ExecutionLogger};
use argos_domain::resource::entities::ResourceEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::warn;

/// Forward every resource event to `logger` as a `resource_event` record.
///
/// The task ends when the manager (and its sender) is dropped.
pub fn spawn_resource_audit(
    mut events: broadcast::Receiver<ResourceEvent>,
    logger: Arc<dyn ExecutionLogger>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_value(&event) {
                    Ok(payload) => logger.log(ExecutionEvent::new("resource_event", payload)),
                    Err(e) => warn!(error = %e, "Could not serialize resource event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Resource audit fell behind, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_domain::resource::entities::ScarceDevice;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collecting(Mutex<Vec<(String, serde_json::Value)>>);

    impl ExecutionLogger for Collecting {
        fn log(&self, event: ExecutionEvent) {
            self.0
                .lock()
                .unwrap()
                .push((event.event_type.to_string(), event.payload));
        }
    }

    #[tokio::test]
    async fn test_resource_events_are_forwarded_until_closed() {
        let (tx, rx) = broadcast::channel(8);
        let logger = Arc::new(Collecting::default());
        let handle = spawn_resource_audit(rx, logger.clone());

        tx.send(ResourceEvent::Acquired {
            device: ScarceDevice::Hackrf,
            owner: "sweep".to_string(),
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        let records = logger.0.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "resource_event");
        assert_eq!(records[0].1["event"], "acquired");
        assert_eq!(records[0].1["device"], "hackrf");
    }
}

use super::EventReceiver;
use crate::storage::event_store::EventStore;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Single writer task owning all appends to the event store.
///
/// Every `log()` call funnels through the bounded queue into this task, so
/// append order is preserved and a burst of callers never fans out into
/// unbounded concurrent file handles. Runs until every sender is dropped
/// and the queue is drained.
pub async fn run_writer(mut rx: EventReceiver, store: Arc<EventStore>) {
    info!("Append writer task started");

    while let Some(event) = rx.recv().await {
        if let Err(e) = store.append(&event).await {
            // The failure and the payload both land in the log; a pending
            // record is never dropped silently.
            error!(
                error = %e,
                message = %event.message,
                "Failed to persist log event"
            );
        }
    }

    debug!("Append writer task stopped");
}

use crate::event::LogEvent;
use crate::remote::{IngestError, LogIngest, PutEventsOutcome};
use crate::storage::event_store::EventStore;
use crate::storage::token_store::TokenStore;
use crate::storage::StoreError;
use crate::uploader::batch::{partition_batches, Batch};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("sequence token still rejected after corrected retry")]
    TokenDesync,

    #[error("ordering rejected after timestamp normalization")]
    OrderingRejected,
}

pub type Result<T> = std::result::Result<T, UploadError>;

/// What became of one batch submission, after any in-place recovery.
enum BatchOutcome {
    /// Accepted upstream (or already accepted earlier): safe to drop the
    /// batch's events from durable storage.
    Confirmed,
    /// The destination stream was missing and has been recreated; the
    /// remainder of this cycle is deferred to the next invocation.
    StreamRepaired,
    /// The server rejected the batch's timestamp ordering; the whole
    /// working set needs normalizing and a fresh pass.
    OrderingViolation,
}

/// Drives upload cycles: reads the pending set, partitions it, uploads the
/// batches strictly in order, and applies the per-rejection recovery
/// strategies while keeping the continuation token current.
pub struct UploadEngine {
    ingest: Arc<dyn LogIngest>,
    event_store: Arc<EventStore>,
    token_store: Arc<TokenStore>,
    cycle_guard: Mutex<()>,
}

impl UploadEngine {
    pub fn new(
        ingest: Arc<dyn LogIngest>,
        event_store: Arc<EventStore>,
        token_store: Arc<TokenStore>,
    ) -> Self {
        Self {
            ingest,
            event_store,
            token_store,
            cycle_guard: Mutex::new(()),
        }
    }

    /// Run one upload cycle over everything currently pending.
    ///
    /// At most one cycle runs at a time; the continuation token is a single
    /// sequential cursor per stream, so concurrent submission would race on
    /// its validity. The cancellation token is honored at batch boundaries,
    /// never mid-batch.
    ///
    /// Events from a cycle that previously failed part-way are still in the
    /// store, so the fresh read below picks them up again.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<()> {
        let _cycle = self.cycle_guard.lock().await;

        let mut working = self.event_store.read_all().await?;
        if working.is_empty() {
            debug!("No pending events to upload");
            return Ok(());
        }

        // Appends are chronological in practice; the sort is a guard
        // against clock skew between producers and a no-op otherwise.
        working.sort_by_key(|e| e.timestamp_millis);
        let mut snapshot_len = working.len();
        let mut normalized = false;

        'pass: loop {
            let batches = partition_batches(working.clone());
            info!(
                batches = batches.len(),
                pending = working.len(),
                "Starting upload pass"
            );

            for batch in batches {
                if cancel.is_cancelled() {
                    info!("Upload cycle cancelled at batch boundary");
                    return Ok(());
                }

                match self.upload_batch(&batch).await? {
                    BatchOutcome::Confirmed => {
                        // Batches confirm strictly front-to-back, so the
                        // confirmed events are the working set's prefix.
                        working.drain(..batch.len());
                        self.event_store.replace(&working, snapshot_len).await?;
                        snapshot_len = working.len();
                    }
                    BatchOutcome::StreamRepaired => {
                        info!(
                            deferred = working.len(),
                            "Stream recreated; deferring remaining events to the next cycle"
                        );
                        return Ok(());
                    }
                    BatchOutcome::OrderingViolation => {
                        if normalized {
                            // A flattened set cannot legitimately be
                            // rejected for ordering again.
                            return Err(UploadError::OrderingRejected);
                        }
                        normalized = true;

                        let now = Utc::now().timestamp_millis();
                        warn!(
                            events = working.len(),
                            "Ordering rejected; normalizing all pending timestamps and restarting"
                        );
                        for event in &mut working {
                            event.timestamp_millis = now;
                        }
                        self.event_store.replace(&working, snapshot_len).await?;
                        snapshot_len = working.len();
                        continue 'pass;
                    }
                }
            }

            return Ok(());
        }
    }

    /// Submit one batch, recovering in place from token divergence.
    async fn upload_batch(&self, batch: &Batch) -> Result<BatchOutcome> {
        let group_name = self.token_store.group_name().await;
        let stream_name = self.token_store.stream_name().await;
        let mut token = self.token_store.sequence_token().await;
        let mut corrected_retry = false;

        loop {
            let outcome = self
                .ingest
                .put_events(&group_name, &stream_name, token.as_deref(), &batch.events)
                .await?;

            match outcome {
                PutEventsOutcome::Accepted {
                    next_sequence_token,
                } => {
                    self.token_store
                        .set_sequence_token(next_sequence_token)
                        .await?;
                    debug!(
                        batch_id = %batch.batch_id,
                        events = batch.len(),
                        "Batch accepted"
                    );
                    return Ok(BatchOutcome::Confirmed);
                }
                PutEventsOutcome::InvalidToken {
                    expected_sequence_token,
                } => {
                    self.token_store
                        .set_sequence_token(expected_sequence_token.clone())
                        .await?;
                    if corrected_retry {
                        warn!(
                            batch_id = %batch.batch_id,
                            "Corrected token rejected again; ending cycle"
                        );
                        return Err(UploadError::TokenDesync);
                    }
                    corrected_retry = true;
                    warn!(
                        batch_id = %batch.batch_id,
                        "Stale sequence token; retrying batch once with the server's token"
                    );
                    token = expected_sequence_token;
                }
                PutEventsOutcome::AlreadyAccepted {
                    expected_sequence_token,
                } => {
                    self.token_store
                        .set_sequence_token(expected_sequence_token)
                        .await?;
                    info!(
                        batch_id = %batch.batch_id,
                        events = batch.len(),
                        "Batch already accepted upstream; skipping resend"
                    );
                    return Ok(BatchOutcome::Confirmed);
                }
                PutEventsOutcome::StreamNotFound => {
                    warn!(
                        group_name = %group_name,
                        stream_name = %stream_name,
                        "Destination stream missing; recreating"
                    );
                    self.ingest.create_stream(&group_name, &stream_name).await?;
                    return Ok(BatchOutcome::StreamRepaired);
                }
                PutEventsOutcome::InvalidOrdering => {
                    return Ok(BatchOutcome::OrderingViolation);
                }
            }
        }
    }
}

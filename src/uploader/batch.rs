use crate::event::LogEvent;
use uuid::Uuid;

/// Hard cap on events per upload call.
pub const MAX_BATCH_EVENTS: usize = 5000;

/// Maximum spread between the oldest and newest timestamp in one batch.
pub const MAX_BATCH_SPAN_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// A contiguous, ordered, non-empty slice of the pending event set sized
/// for one upload call. The id only correlates log lines across the
/// upload lifecycle; it never goes over the wire.
#[derive(Debug, Clone)]
pub struct Batch {
    pub batch_id: Uuid,
    pub events: Vec<LogEvent>,
}

impl Batch {
    fn new(events: Vec<LogEvent>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Split a chronologically ordered (oldest first) event set into the
/// ordered list of batches to upload.
///
/// A 24h window is anchored at the oldest unconsumed event; the events
/// inside that window are chunked into groups of at most
/// `MAX_BATCH_EVENTS`, then the next window is anchored at the first event
/// beyond it, until the set is drained. Concatenating the produced batches
/// reconstructs the input exactly.
pub fn partition_batches(events: Vec<LogEvent>) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut remaining = events;

    while !remaining.is_empty() {
        let window_start = remaining[0].timestamp_millis;
        let split = remaining
            .partition_point(|e| e.timestamp_millis - window_start <= MAX_BATCH_SPAN_MILLIS);

        let beyond_window = remaining.split_off(split);
        let within_window = remaining;

        for chunk in within_window.chunks(MAX_BATCH_EVENTS) {
            batches.push(Batch::new(chunk.to_vec()));
        }

        remaining = beyond_window;
    }

    batches
}

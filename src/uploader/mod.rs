pub mod batch;
pub mod engine;

pub use batch::{partition_batches, Batch, MAX_BATCH_EVENTS, MAX_BATCH_SPAN_MILLIS};
pub use engine::{UploadEngine, UploadError};

use crate::event::LogEvent;
use tokio::sync::mpsc;

pub type EventSender = mpsc::Sender<LogEvent>;
pub type EventReceiver = mpsc::Receiver<LogEvent>;

/// Create the bounded append queue between `log()` callers and the single
/// writer task.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity)
}

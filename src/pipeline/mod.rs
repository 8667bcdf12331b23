pub mod channel;
pub mod writer;

pub use channel::{event_channel, EventReceiver, EventSender};
pub use writer::run_writer;

mod events;
mod result;
mod retry;
mod scheduler;

pub use events::{
    ChannelSink, EventSink, MemorySink, NullSink, ProgressEvent, ProgressSnapshot, Stage,
    TracingSink,
};
pub use result::{DocumentResult, DocumentStatus};
pub use retry::{retry_with_backoff, retry_with_backoff_notify};
pub use scheduler::{ScheduleOutcome, Scheduler, SchedulerOptions, StopReason};

//! logship Domain Layer
//!
//! Pure types with zero I/O dependencies: log events, sequence tokens,
//! stream identities and the batch limits imposed by the log service.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod clock;
pub mod event;
pub mod limits;
pub mod value_objects;

// Re-export commonly used types
pub use clock::{Clock, MockClock, SystemClock};
pub use event::LogEvent;
pub use limits::{
    pack_batches, DEFAULT_FLUSH_EVERY, MAX_BATCH_BYTES, MAX_BATCH_EVENTS, MAX_BATCH_SPAN_MS,
    MAX_EVENT_MESSAGE_BYTES, PER_EVENT_OVERHEAD_BYTES, READ_THROTTLE,
};
pub use value_objects::{
    validate_group_name, DomainError, DomainResult, SequenceToken, StreamIdentity,
};

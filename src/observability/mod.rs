//! Observability subsystem
//!
//! Structured JSON logging for store lifecycle events, and typed change
//! events delivered to registered observers.

mod events;
mod logger;

pub use events::{ChangeEvent, ChangeKind, StoreObserver};
pub use logger::{Logger, Severity};

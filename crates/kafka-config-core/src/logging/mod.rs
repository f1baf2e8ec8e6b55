//! Logging abstractions for host-agnostic logging

mod memory;
mod noop;
mod traits;

pub use memory::MemoryLogger;
pub use noop::NoOpLogger;
pub use traits::{LogLevel, Logger, LoggerExt, SharedLogger};

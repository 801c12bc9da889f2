//! Shared helpers: timing and logging.

mod logger;
mod timer;

pub use logger::{init_logger, LogLevel};
pub use timer::Timer;

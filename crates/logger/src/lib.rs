//! Tracing setup shared by the NetPulse binaries.

mod subscriber;

pub use subscriber::{LogTarget, default_log_path, init};

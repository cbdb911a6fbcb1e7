//! # Utility Modules
//!
//! Supporting utilities used throughout the crate.
//!
//! ## Components
//! - **Logging**: structured logging setup from [`LoggingConfig`](crate::config::LoggingConfig)
//! - **Hexdump**: lazy hex rendering of datagrams for trace logs
//! - **Metrics**: per-socket traffic counters

pub mod hexdump;
pub mod logging;
pub mod metrics;

pub use hexdump::HexDump;
pub use logging::init_logging;
pub use metrics::{Metrics, MetricsSnapshot};

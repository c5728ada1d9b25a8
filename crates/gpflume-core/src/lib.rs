//! gpflume Core - Common infrastructure for the gpfdist ingestion adapter
//!
//! This crate provides the reusable building blocks of the ingestion
//! pipeline: the bounded frame buffer shared with a protocol listener,
//! the start/stop lifecycle guard, cooperative cancellation, and rate
//! metering.

pub mod cancel;
pub mod lifecycle;
pub mod logging;
pub mod meter;
pub mod ring;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use lifecycle::Lifecycle;
pub use logging::init_logging;
pub use meter::RateMeter;
pub use ring::{Pop, PushError, RingBuffer, Termination};

//! gpflume gpfdist - Ingestion adapter for gpfdist bulk loading
//!
//! Streams textual records into a bounded buffer served by a gpfdist
//! protocol listener, while a background worker periodically triggers an
//! external bulk-load pass that pulls the buffered data into a warehouse
//! table. The adapter owns buffer admission, rate metering, scheduled
//! load-triggering, and the drain/shutdown protocol.

pub mod adapter;
pub mod config;
pub mod error;
pub mod listener;
pub mod load;
pub mod network;
pub mod sql;
pub mod task;

// Re-exports for convenience
pub use adapter::{GpfdistAdapter, Payload};
pub use config::GpfdistConfig;
pub use error::AdapterError;
pub use listener::{Listener, ListenerFactory};
pub use load::{BulkLoad, LoadError, RuntimeContext};
pub use sql::{SqlBulkLoad, SqlExecutor};
pub use task::TaskHandle;

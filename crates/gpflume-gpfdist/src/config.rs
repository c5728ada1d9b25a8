//! Adapter configuration

use std::time::Duration;

/// Immutable configuration for a [`GpfdistAdapter`](crate::GpfdistAdapter).
///
/// Supplied entirely at construction time; there is no dynamic
/// reconfiguration while running.
#[derive(Debug, Clone)]
pub struct GpfdistConfig {
    /// Listener port; 0 binds an ephemeral port
    pub port: u16,
    /// Flush to the client after this many buffered records
    pub flush_count: usize,
    /// Flush to the client after this many seconds regardless of count
    pub flush_time: u64,
    /// Seconds the listener holds a batch open before timing out
    pub batch_timeout: u64,
    /// Records per served batch
    pub batch_count: usize,
    /// Seconds between bulk-load passes
    pub batch_period: u64,
    /// Delimiter appended to every record; `None` pushes records as-is
    pub delimiter: Option<String>,
    /// Log rates every Nth record; 0 disables the meter
    pub rate_interval: u64,
    /// Frame slots in the buffer shared with the listener
    pub buffer_slots: usize,
    /// How long stop() polls for the buffer to drain. The default fits a
    /// 30-second external shutdown deadline with margin for teardown.
    pub drain_window: Duration,
    /// Interval between drain polls
    pub drain_poll: Duration,
}

impl Default for GpfdistConfig {
    fn default() -> Self {
        Self {
            port: 0,
            flush_count: 100,
            flush_time: 2,
            batch_timeout: 4,
            batch_count: 100,
            batch_period: 10,
            delimiter: Some("\n".to_string()),
            rate_interval: 0,
            buffer_slots: 8192,
            drain_window: Duration::from_secs(25),
            drain_poll: Duration::from_secs(1),
        }
    }
}

impl GpfdistConfig {
    /// An empty delimiter means "no delimiter"
    pub(crate) fn normalize(mut self) -> Self {
        if self.delimiter.as_deref() == Some("") {
            self.delimiter = None;
        }
        self
    }

    /// Check invariants that only matter once a load invoker is attached.
    pub(crate) fn validate(&self, has_load: bool) -> Result<(), String> {
        if self.buffer_slots == 0 {
            return Err("buffer_slots must be positive".to_string());
        }
        if has_load && self.batch_period == 0 {
            return Err("batch_period must be positive when a bulk load invoker is set".to_string());
        }
        Ok(())
    }
}

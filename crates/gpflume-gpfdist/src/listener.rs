//! Protocol listener seam.
//!
//! The network implementation lives outside this crate; the adapter only
//! needs to open a listener over a fresh buffer, learn its bound port,
//! and stop it during teardown. The listener drains the shared
//! [`RingBuffer`] and serves its frames to one external bulk-load client.

use std::sync::Arc;

use gpflume_core::RingBuffer;

use crate::config::GpfdistConfig;

/// A running protocol listener bound to one buffer.
pub trait Listener: Send {
    /// Port the listener actually bound (resolves port 0)
    fn local_port(&self) -> u16;

    /// Tear the listener down. Pending client connections may be dropped.
    fn stop(&mut self) -> std::io::Result<()>;
}

/// Opens a listener over a buffer. One fresh buffer per adapter start;
/// the buffer is never reused across starts.
pub trait ListenerFactory: Send + Sync {
    fn open(
        &self,
        buffer: Arc<RingBuffer>,
        config: &GpfdistConfig,
    ) -> std::io::Result<Box<dyn Listener>>;
}

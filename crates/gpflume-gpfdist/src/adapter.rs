//! Ingestion adapter: buffer admission, rate metering, load scheduling,
//! and the drain/shutdown protocol.
//!
//! Three independently-timed actors meet here: producers pushing records,
//! the protocol listener draining the buffer, and the periodic load loop.
//! There is no transactional handshake between them — correctness rests
//! on capacity polling and cooperative cancellation.

use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use gpflume_core::{Lifecycle, RateMeter, RingBuffer};

use crate::config::GpfdistConfig;
use crate::error::AdapterError;
use crate::listener::{Listener, ListenerFactory};
use crate::load::{BulkLoad, RuntimeContext};
use crate::network;
use crate::task::{self, TaskHandle};

/// A record offered for admission. Only text is admissible; anything
/// else is rejected before touching the buffer.
#[derive(Debug)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

/// Streams textual records into a bounded buffer served by a gpfdist
/// protocol listener, with an optional periodic bulk-load loop pulling
/// the buffered data into a warehouse table.
///
/// Without a load invoker the adapter runs as a plain buffered byte sink.
pub struct GpfdistAdapter {
    config: GpfdistConfig,
    lifecycle: Lifecycle,
    meter: RateMeter,
    factory: Box<dyn ListenerFactory>,
    load: Option<Arc<dyn BulkLoad>>,
    /// Current buffer handle; a fresh one per start. Read-locked briefly
    /// on every push — the lifecycle lock never guards the push path.
    buffer: RwLock<Option<Arc<RingBuffer>>>,
    listener: Mutex<Option<Box<dyn Listener>>>,
    task: Mutex<Option<TaskHandle>>,
}

impl GpfdistAdapter {
    pub fn new(config: GpfdistConfig, factory: Box<dyn ListenerFactory>) -> Self {
        let config = config.normalize();
        Self {
            meter: RateMeter::new(config.rate_interval),
            lifecycle: Lifecycle::new("gpfdist adapter"),
            factory,
            load: None,
            buffer: RwLock::new(None),
            listener: Mutex::new(None),
            task: Mutex::new(None),
            config,
        }
    }

    /// Attach the bulk-load invoker. Wiring-time only, before the first
    /// start.
    pub fn with_load(mut self, load: Arc<dyn BulkLoad>) -> Self {
        self.load = Some(load);
        self
    }

    pub fn config(&self) -> &GpfdistConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Start the listener over a fresh buffer and, if a load invoker is
    /// configured, the background load loop. No-op when already running.
    /// A startup failure leaves nothing running.
    pub fn start(&self) -> Result<(), AdapterError> {
        self.lifecycle.start(|| self.do_start())
    }

    /// Run the shutdown protocol and tear the listener down. No-op when
    /// already stopped.
    pub fn stop(&self) -> Result<(), AdapterError> {
        self.lifecycle.stop(|| {
            self.do_stop();
            Ok(())
        })
    }

    /// Stop, then run `callback` while still holding the lifecycle lock,
    /// so it observes a fully-stopped adapter.
    pub fn stop_then(&self, callback: impl FnOnce()) -> Result<(), AdapterError> {
        self.lifecycle.stop_then(
            || {
                self.do_stop();
                Ok(())
            },
            callback,
        )
    }

    /// Admit one record: frame it with the configured delimiter and push
    /// it onto the buffer, then mark the meter.
    ///
    /// Non-text payloads are rejected with no side effect. A full buffer
    /// applies backpressure (the push blocks briefly) rather than
    /// dropping data; a terminated buffer fails the push.
    pub fn handle(&self, payload: Payload) -> Result<(), AdapterError> {
        let record = match payload {
            Payload::Text(s) => s,
            Payload::Binary(_) => return Err(AdapterError::InvalidPayload("binary")),
        };

        let buffer = self
            .buffer
            .read()
            .unwrap()
            .clone()
            .ok_or(AdapterError::NotRunning)?;

        let frame = match &self.config.delimiter {
            Some(d) => {
                let mut framed = record.into_bytes();
                framed.extend_from_slice(d.as_bytes());
                framed
            }
            None => record.into_bytes(),
        };
        buffer.push(frame)?;
        self.meter.mark();
        Ok(())
    }

    fn do_start(&self) -> Result<(), AdapterError> {
        self.config
            .validate(self.load.is_some())
            .map_err(AdapterError::Config)?;
        self.meter.reset();

        let buffer = Arc::new(RingBuffer::with_capacity(self.config.buffer_slots));
        log::info!(
            "creating gpfdist protocol listener on port={}",
            self.config.port
        );
        let listener = self
            .factory
            .open(buffer.clone(), &self.config)
            .map_err(AdapterError::Startup)?;
        let port = listener.local_port();
        log::info!("gpfdist protocol listener running on port={port}");

        let task = match &self.load {
            Some(load) => {
                log::info!(
                    "scheduling bulk load task with batch_period={}s",
                    self.config.batch_period
                );
                let mut context = RuntimeContext::new();
                context.add_location(network::gpfdist_uri(port));
                let period = Duration::from_secs(self.config.batch_period);
                match task::spawn_load_loop(load.clone(), Arc::new(context), period) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        // No partial state: tear the listener down again
                        let mut listener = listener;
                        buffer.force_shutdown();
                        if let Err(stop_err) = listener.stop() {
                            log::warn!("error stopping listener after failed start: {stop_err}");
                        }
                        return Err(AdapterError::Startup(e));
                    }
                }
            }
            None => {
                log::info!("no bulk load invoker configured, running as plain byte sink");
                None
            }
        };

        *self.buffer.write().unwrap() = Some(buffer);
        *self.listener.lock().unwrap() = Some(listener);
        *self.task.lock().unwrap() = task;
        Ok(())
    }

    /// Two-phase shutdown. Every step is independently guarded: a stuck
    /// shutdown is worse than an incomplete one under an external
    /// deadline, so failures are logged and the next step runs anyway.
    fn do_stop(&self) {
        let buffer = self.buffer.write().unwrap().take();
        let task = self.task.lock().unwrap().take();
        let listener = self.listener.lock().unwrap().take();

        let mut drained = false;
        if self.load.is_some() {
            if let Some(buffer) = &buffer {
                drained = self.wait_for_drain(buffer);
            }
            if let Some(task) = task {
                self.cancel_load_task(&task);
            }
        }

        if let Some(buffer) = &buffer {
            if drained {
                // Safe to block: emptiness was just confirmed
                log::info!("sending complete to buffer");
                buffer.complete();
            } else {
                // complete() would block indefinitely on unconsumed data
                log::info!("forcing buffer shutdown");
                buffer.force_shutdown();
            }
        }

        if let Some(mut listener) = listener {
            log::info!("shutting down protocol listener");
            if let Err(e) = listener.stop() {
                log::warn!("error shutting down protocol listener: {e}");
            }
        }
    }

    /// Poll used capacity until the buffer is empty or the drain window
    /// closes. Returns whether the stream drained.
    fn wait_for_drain(&self, buffer: &RingBuffer) -> bool {
        log::info!("waiting for buffer to drain");
        let deadline = Instant::now() + self.config.drain_window;
        loop {
            let capacity = buffer.capacity();
            let available = buffer.available_capacity();
            log::debug!("buffer capacity={capacity} available={available}");
            if capacity == available {
                log::info!("marking stream drained");
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::warn!(
                    "buffer not drained within {:?}, {} frames left",
                    self.config.drain_window,
                    capacity - available
                );
                return false;
            }
            // Never sleep past the window
            std::thread::sleep(self.config.drain_poll.min(remaining));
        }
    }

    /// Cancel the load loop and wait for its outcome — long enough for
    /// one in-flight pass plus one sleep cycle to unwind.
    fn cancel_load_task(&self, task: &TaskHandle) {
        log::info!("cancelling bulk load task");
        task.cancel();
        let timeout =
            Duration::from_secs(self.config.batch_timeout + self.config.batch_period + 2);
        let started = Instant::now();
        match task.wait(timeout) {
            Ok(clean) => log::info!(
                "load task finished clean={clean} after {}ms",
                started.elapsed().as_millis()
            ),
            Err(e) => log::warn!("load task wait failed, may indicate trouble: {e}"),
        }
    }
}

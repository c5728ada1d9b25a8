//! Mutually-exclusive start/stop lifecycle guard

use std::sync::{Mutex, MutexGuard};

/// Idempotent start/stop state machine.
///
/// All transitions serialize through one lock so overlapping start/stop
/// calls from different threads cannot interleave. The hooks run while
/// the lock is held; the running flag only flips after a hook returns
/// `Ok`, so a failed start leaves the guard stopped.
pub struct Lifecycle {
    name: &'static str,
    running: Mutex<bool>,
}

impl Lifecycle {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: Mutex::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    /// Run the start hook and mark running. No-op if already running.
    pub fn start<E>(&self, hook: impl FnOnce() -> Result<(), E>) -> Result<(), E> {
        let mut running = self.running.lock().unwrap();
        if *running {
            log::debug!("{} already started", self.name);
            return Ok(());
        }
        hook()?;
        *running = true;
        log::info!("{} started", self.name);
        Ok(())
    }

    /// Run the stop hook and mark stopped. No-op if already stopped.
    pub fn stop<E>(&self, hook: impl FnOnce() -> Result<(), E>) -> Result<(), E> {
        let mut running = self.running.lock().unwrap();
        self.stop_locked(&mut running, hook)
    }

    /// Stop, then run `callback` while still holding the lifecycle lock.
    ///
    /// The callback observes a fully-stopped state; no concurrent start
    /// can race it. It runs even when stop was a no-op, but not when the
    /// stop hook fails.
    pub fn stop_then<E>(
        &self,
        hook: impl FnOnce() -> Result<(), E>,
        callback: impl FnOnce(),
    ) -> Result<(), E> {
        let mut running = self.running.lock().unwrap();
        self.stop_locked(&mut running, hook)?;
        callback();
        Ok(())
    }

    fn stop_locked<E>(
        &self,
        running: &mut MutexGuard<'_, bool>,
        hook: impl FnOnce() -> Result<(), E>,
    ) -> Result<(), E> {
        if !**running {
            log::debug!("{} already stopped", self.name);
            return Ok(());
        }
        hook()?;
        **running = false;
        log::info!("{} stopped", self.name);
        Ok(())
    }
}

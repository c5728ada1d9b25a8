//! Background load loop on a dedicated worker thread.
//!
//! The loop invokes the bulk load, logs-and-continues on failure, then
//! sleeps one batch period in cancellable segments. It is fire-and-forget:
//! its only observable status is a one-shot outcome written exactly once
//! when the loop exits. A load pass can outlast the period, so the loop
//! never overlaps passes the way a fixed-rate schedule would.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use gpflume_core::CancelToken;

use crate::load::{BulkLoad, RuntimeContext};

/// Stop-side handle to a running load loop: the cancellation flag plus
/// the receiving end of the one-shot outcome.
pub struct TaskHandle {
    cancel: CancelToken,
    outcome: Receiver<bool>,
}

impl TaskHandle {
    /// Signal the loop to exit after its current pass
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait up to `timeout` for the loop's terminal outcome: `true` for a
    /// clean cooperative exit, `false` when the loop died abnormally.
    ///
    /// This bounds how long the caller waits, not how long the loop
    /// thread actually lives — a pass stuck inside the load call cannot
    /// be interrupted mid-call.
    pub fn wait(&self, timeout: Duration) -> Result<bool, RecvTimeoutError> {
        self.outcome.recv_timeout(timeout)
    }
}

/// Spawn the load loop. Runs until cancelled; an individual failed pass
/// is logged and retried at the next period, never fatal.
pub fn spawn_load_loop(
    load: Arc<dyn BulkLoad>,
    context: Arc<RuntimeContext>,
    period: Duration,
) -> std::io::Result<TaskHandle> {
    let cancel = CancelToken::new();
    let flag = cancel.clone();
    let (tx, rx) = mpsc::sync_channel(1);

    thread::Builder::new()
        .name("gpload-loop".into())
        .spawn(move || {
            let clean = panic::catch_unwind(AssertUnwindSafe(|| {
                run_loop(&*load, &context, period, &flag)
            }))
            .is_ok();
            if !clean {
                log::error!("load loop died abnormally");
            }
            // Receiver gone means nobody is waiting; outcome is discarded
            let _ = tx.send(clean);
        })?;

    Ok(TaskHandle {
        cancel,
        outcome: rx,
    })
}

fn run_loop(load: &dyn BulkLoad, context: &RuntimeContext, period: Duration, flag: &CancelToken) {
    while !flag.is_cancelled() {
        if let Err(e) = load.load(context) {
            log::error!("error in load pass: {e}");
        }
        if !flag.sleep(period) {
            break;
        }
    }
}

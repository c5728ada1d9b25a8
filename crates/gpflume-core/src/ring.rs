//! Bounded frame buffer decoupling record producers from a protocol listener.
//!
//! Producers block when the buffer is full (backpressure), the listener
//! drains frames in push order, and the owner can end the stream either
//! gracefully (`complete`, blocks until drained) or immediately
//! (`force_shutdown`, abandons pending frames). Built on `Mutex + Condvar`,
//! no external dependencies.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// How a buffer's stream was ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Graceful end-of-stream after the listener consumed everything
    Completed,
    /// Immediate abort, pending frames abandoned
    ForceShutdown,
}

/// Error from pushing into a terminated buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct PushError(pub Termination);

impl std::fmt::Display for PushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Termination::Completed => write!(f, "buffer completed"),
            Termination::ForceShutdown => write!(f, "buffer force-shut-down"),
        }
    }
}

impl std::error::Error for PushError {}

/// Result of a consumer-side [`RingBuffer::pop_timeout`].
#[derive(Debug, PartialEq, Eq)]
pub enum Pop {
    /// Next frame in push order
    Frame(Vec<u8>),
    /// Timed out with no frame available; stream still live
    Idle,
    /// End of stream — completed and drained, or force-shut-down
    Closed,
}

struct State {
    frames: VecDeque<Vec<u8>>,
    terminated: Option<Termination>,
}

/// Fixed-capacity frame queue with capacity introspection.
///
/// Capacity is counted in frames: one push occupies one slot until the
/// consumer pops it. `capacity() == available_capacity()` means empty.
pub struct RingBuffer {
    capacity: usize,
    state: Mutex<State>,
    /// Producers (and `complete`) wait here; signalled on pop
    space: Condvar,
    /// Consumer waits here; signalled on push and termination
    data: Condvar,
}

impl RingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        Self {
            capacity,
            state: Mutex::new(State {
                frames: VecDeque::with_capacity(capacity),
                terminated: None,
            }),
            space: Condvar::new(),
            data: Condvar::new(),
        }
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available_capacity(&self) -> usize {
        self.capacity - self.state.lock().unwrap().frames.len()
    }

    /// Frames currently queued
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How the stream ended, if it has
    pub fn termination(&self) -> Option<Termination> {
        self.state.lock().unwrap().terminated
    }

    /// Append one frame, blocking while the buffer is full.
    ///
    /// The block is bounded in practice: either the listener pops a frame
    /// or a termination signal wakes the producer with an error. Never
    /// silently drops data.
    pub fn push(&self, frame: Vec<u8>) -> Result<(), PushError> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(t) = state.terminated {
                return Err(PushError(t));
            }
            if state.frames.len() < self.capacity {
                state.frames.push_back(frame);
                self.data.notify_one();
                return Ok(());
            }
            state = self.space.wait(state).unwrap();
        }
    }

    /// Consumer side: wait up to `timeout` for the next frame.
    pub fn pop_timeout(&self, timeout: Duration) -> Pop {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(frame) = state.frames.pop_front() {
                self.space.notify_all();
                return Pop::Frame(frame);
            }
            // Completed + drained, or force shutdown (frames cleared)
            if state.terminated.is_some() {
                return Pop::Closed;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Pop::Idle;
            }
            (state, _) = self.data.wait_timeout(state, remaining).unwrap();
        }
    }

    /// Graceful end-of-stream: reject further pushes and block until the
    /// listener has consumed every pending frame.
    ///
    /// No-op if the stream is already terminated.
    pub fn complete(&self) {
        let mut state = self.state.lock().unwrap();
        if state.terminated.is_some() {
            return;
        }
        state.terminated = Some(Termination::Completed);
        // Wake a consumer blocked on an empty buffer and any blocked producers
        self.data.notify_all();
        self.space.notify_all();
        while !state.frames.is_empty() {
            state = self.space.wait(state).unwrap();
        }
    }

    /// Immediate abort: clear pending frames, reject further pushes,
    /// wake everyone. Never blocks.
    pub fn force_shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        if state.terminated.is_some() {
            return;
        }
        let abandoned = state.frames.len();
        if abandoned > 0 {
            log::warn!("force shutdown abandoning {abandoned} buffered frames");
        }
        state.frames.clear();
        state.terminated = Some(Termination::ForceShutdown);
        self.data.notify_all();
        self.space.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    const SHORT: Duration = Duration::from_millis(50);

    #[test]
    fn frames_pop_in_push_order() {
        let buf = RingBuffer::with_capacity(4);
        buf.push(b"a".to_vec()).unwrap();
        buf.push(b"b".to_vec()).unwrap();
        buf.push(b"c".to_vec()).unwrap();
        assert_eq!(buf.pop_timeout(SHORT), Pop::Frame(b"a".to_vec()));
        assert_eq!(buf.pop_timeout(SHORT), Pop::Frame(b"b".to_vec()));
        assert_eq!(buf.pop_timeout(SHORT), Pop::Frame(b"c".to_vec()));
        assert_eq!(buf.pop_timeout(SHORT), Pop::Idle);
    }

    #[test]
    fn capacity_introspection() {
        let buf = RingBuffer::with_capacity(4);
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.available_capacity(), 4);
        buf.push(b"x".to_vec()).unwrap();
        assert_eq!(buf.available_capacity(), 3);
        buf.pop_timeout(SHORT);
        assert_eq!(buf.available_capacity(), 4);
    }

    #[test]
    fn full_buffer_blocks_until_pop() {
        let buf = Arc::new(RingBuffer::with_capacity(1));
        buf.push(b"first".to_vec()).unwrap();

        let producer = {
            let buf = buf.clone();
            std::thread::spawn(move || buf.push(b"second".to_vec()))
        };

        // Give the producer time to block on the full buffer
        std::thread::sleep(SHORT);
        assert_eq!(buf.len(), 1);

        assert_eq!(buf.pop_timeout(SHORT), Pop::Frame(b"first".to_vec()));
        producer.join().unwrap().unwrap();
        assert_eq!(buf.pop_timeout(SHORT), Pop::Frame(b"second".to_vec()));
    }

    #[test]
    fn force_shutdown_wakes_blocked_producer() {
        let buf = Arc::new(RingBuffer::with_capacity(1));
        buf.push(b"first".to_vec()).unwrap();

        let producer = {
            let buf = buf.clone();
            std::thread::spawn(move || buf.push(b"second".to_vec()))
        };

        std::thread::sleep(SHORT);
        buf.force_shutdown();

        let res = producer.join().unwrap();
        assert_eq!(res, Err(PushError(Termination::ForceShutdown)));
    }

    #[test]
    fn push_after_complete_fails() {
        let buf = RingBuffer::with_capacity(4);
        buf.complete();
        assert_eq!(
            buf.push(b"late".to_vec()),
            Err(PushError(Termination::Completed))
        );
    }

    #[test]
    fn complete_blocks_until_drained() {
        let buf = Arc::new(RingBuffer::with_capacity(4));
        buf.push(b"pending".to_vec()).unwrap();

        let consumer = {
            let buf = buf.clone();
            std::thread::spawn(move || {
                std::thread::sleep(SHORT);
                let mut frames = Vec::new();
                loop {
                    match buf.pop_timeout(Duration::from_secs(5)) {
                        Pop::Frame(f) => frames.push(f),
                        Pop::Closed => break,
                        Pop::Idle => panic!("consumer starved"),
                    }
                }
                frames
            })
        };

        buf.complete();
        // complete() returned, so the consumer must have drained the frame
        assert!(buf.is_empty());
        assert_eq!(buf.termination(), Some(Termination::Completed));
        assert_eq!(consumer.join().unwrap(), vec![b"pending".to_vec()]);
    }

    #[test]
    fn force_shutdown_abandons_pending_frames() {
        let buf = RingBuffer::with_capacity(4);
        buf.push(b"doomed".to_vec()).unwrap();
        buf.force_shutdown();
        assert_eq!(buf.termination(), Some(Termination::ForceShutdown));
        assert_eq!(buf.available_capacity(), buf.capacity());
        assert_eq!(buf.pop_timeout(SHORT), Pop::Closed);
    }

    #[test]
    fn first_termination_wins() {
        let buf = RingBuffer::with_capacity(4);
        buf.complete();
        buf.force_shutdown();
        assert_eq!(buf.termination(), Some(Termination::Completed));
    }

    #[test]
    fn consumer_wakes_on_push() {
        let buf = Arc::new(RingBuffer::with_capacity(4));
        let consumer = {
            let buf = buf.clone();
            std::thread::spawn(move || buf.pop_timeout(Duration::from_secs(5)))
        };
        std::thread::sleep(SHORT);
        buf.push(b"wake".to_vec()).unwrap();
        assert_eq!(consumer.join().unwrap(), Pop::Frame(b"wake".to_vec()));
    }
}

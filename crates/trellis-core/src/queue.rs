//! An explicitly-run completion queue.
//!
//! The asynchronous entry points do not own any threads. Instead they
//! schedule continuations on a [`CompletionQueue`], and the application
//! donates threads by calling [`CompletionQueue::run`]. Timers, retry
//! waits, and poll delays all become scheduled continuations, so one
//! queue can multiplex any number of in-flight operations over however
//! many runner threads the application provides.
//!
//! Shutting the queue down does not drop pending continuations: each one
//! still runs, with [`QueueStatus::ShuttingDown`], so every in-flight
//! operation terminates with a cancellation error instead of hanging.

use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

/// Passed to every continuation when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    /// Normal execution.
    Ok,
    /// The queue is shutting down; finish up and do not schedule more work.
    ShuttingDown,
}

impl QueueStatus {
    /// Whether the queue was shut down before this continuation ran.
    pub fn is_shutting_down(self) -> bool {
        matches!(self, QueueStatus::ShuttingDown)
    }
}

/// A scheduled continuation.
type Work = Box<dyn FnOnce(QueueStatus) + Send + 'static>;

struct TimerEntry {
    due: Instant,
    seq: u64,
    work: Work,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed so the max-heap pops the earliest deadline first, with
        // scheduling order breaking ties.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Work>,
    timers: BinaryHeap<TimerEntry>,
    next_seq: u64,
    shutdown: bool,
}

struct Inner {
    state: Mutex<QueueState>,
    wake: Condvar,
}

/// A shared, explicitly-run scheduler for continuations and timers.
///
/// Cloning is cheap and every clone refers to the same queue. Scheduling
/// is safe from any thread, including from inside a running continuation.
/// Continuations scheduled from one logical operation run in the order
/// they were scheduled.
#[derive(Clone)]
pub struct CompletionQueue {
    inner: Arc<Inner>,
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionQueue {
    /// Create a new, empty queue.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                wake: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Schedule `work` to run as soon as a runner thread is free.
    ///
    /// If the queue has already been shut down the continuation runs
    /// inline, on the calling thread, with [`QueueStatus::ShuttingDown`].
    pub fn schedule(&self, work: impl FnOnce(QueueStatus) + Send + 'static) {
        let work: Work = Box::new(work);
        {
            let mut state = self.lock();
            if !state.shutdown {
                state.ready.push_back(work);
                self.inner.wake.notify_all();
                return;
            }
        }
        work(QueueStatus::ShuttingDown);
    }

    /// Schedule `work` to run after `delay` has elapsed.
    ///
    /// Like [`CompletionQueue::schedule`], a shut-down queue runs the
    /// continuation inline instead of waiting out the delay.
    pub fn schedule_after(&self, delay: Duration, work: impl FnOnce(QueueStatus) + Send + 'static) {
        let work: Work = Box::new(work);
        {
            let mut state = self.lock();
            if !state.shutdown {
                let seq = state.next_seq;
                state.next_seq += 1;
                state.timers.push(TimerEntry {
                    due: Instant::now() + delay,
                    seq,
                    work,
                });
                self.inner.wake.notify_all();
                return;
            }
        }
        work(QueueStatus::ShuttingDown);
    }

    /// Serve the queue until it is shut down and fully drained.
    ///
    /// Blocks the calling thread; applications typically dedicate one or
    /// more threads to this. Safe to call from several threads at once,
    /// in which case continuations are distributed among them.
    pub fn run(&self) {
        while let Some((work, status)) = self.next_work(true) {
            work(status);
        }
    }

    /// Serve the queue until no scheduled work remains, then return.
    ///
    /// Waits out pending timers rather than abandoning them, so a retry
    /// chain in mid-backoff still runs to completion.
    pub fn run_until_idle(&self) {
        while let Some((work, status)) = self.next_work(false) {
            work(status);
        }
    }

    /// Shut the queue down.
    ///
    /// Every continuation still scheduled, timers included, runs promptly
    /// with [`QueueStatus::ShuttingDown`]. Once drained, blocked
    /// [`CompletionQueue::run`] calls return.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.shutdown = true;
        debug!(
            ready = state.ready.len(),
            timers = state.timers.len(),
            "Completion queue shutting down"
        );
        self.inner.wake.notify_all();
    }

    /// Whether [`CompletionQueue::shutdown`] has been called.
    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    /// Take the next continuation to run, or `None` when done.
    ///
    /// With `wait_for_more` the call blocks on an empty queue until new
    /// work arrives or the queue shuts down; without it an empty queue
    /// ends the loop. Continuations always execute outside the lock.
    fn next_work(&self, wait_for_more: bool) -> Option<(Work, QueueStatus)> {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                if let Some(work) = state.ready.pop_front() {
                    return Some((work, QueueStatus::ShuttingDown));
                }
                if let Some(entry) = state.timers.pop() {
                    return Some((entry.work, QueueStatus::ShuttingDown));
                }
                return None;
            }
            if let Some(work) = state.ready.pop_front() {
                return Some((work, QueueStatus::Ok));
            }
            match state.timers.peek().map(|entry| entry.due) {
                Some(due) => {
                    let now = Instant::now();
                    if due <= now {
                        if let Some(entry) = state.timers.pop() {
                            return Some((entry.work, QueueStatus::Ok));
                        }
                    } else {
                        let (guard, _timed_out) = self
                            .inner
                            .wake
                            .wait_timeout(state, due - now)
                            .unwrap_or_else(|e| e.into_inner());
                        state = guard;
                    }
                }
                None => {
                    if !wait_for_more {
                        return None;
                    }
                    state = self
                        .inner
                        .wake
                        .wait(state)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }
}

impl fmt::Debug for CompletionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("CompletionQueue")
            .field("ready", &state.ready.len())
            .field("timers", &state.timers.len())
            .field("shutdown", &state.shutdown)
            .finish()
    }
}

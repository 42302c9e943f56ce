//! Futures over the completion queue.
//!
//! The synchronous entry points in [`crate::retry`], [`crate::paginate`],
//! and [`crate::lro`] block between attempts. The adapters here run the
//! same decision logic as chains of continuations on a
//! [`CompletionQueue`]: every "sleep then retry" becomes a scheduled
//! timer, and the caller gets an [`OperationFuture`] that resolves when
//! the chain reaches a terminal state. The core never spawns a thread;
//! the application drives the queue with [`CompletionQueue::run`].
//!
//! Each chain is one logical operation. Its continuations are scheduled
//! one at a time, so attempts stay strictly ordered, while independent
//! chains interleave freely on however many runner threads serve the
//! queue.

use crate::error::{Error, Result};
use crate::idempotency::Idempotency;
use crate::lro::{on_poll_result, OperationPoll, PollStep, StartedOperation};
use crate::paginate::Page;
use crate::polling::PollingPolicy;
use crate::queue::{CompletionQueue, QueueStatus};
use crate::retry::{after_failure, AttemptDisposition, BackoffPolicy, RetryPolicy};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;

/// A handle to the eventual result of one asynchronous operation.
///
/// Resolves once the operation's chain reaches a terminal state. If the
/// queue is shut down first, the future resolves to
/// [`Error::CancelledOrShutdown`] rather than hanging.
#[derive(Debug)]
pub struct OperationFuture<T> {
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> OperationFuture<T> {
    /// An already-resolved future.
    ///
    /// Used when an operation fails before anything is scheduled, for
    /// example when the request itself is malformed.
    pub fn ready(result: Result<T>) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(result);
        Self { receiver }
    }

    /// Block the calling thread until the operation finishes.
    ///
    /// For callers that drive the queue from dedicated worker threads and
    /// want a synchronous rendezvous. Must not be called from an async
    /// context; `await` the future instead.
    pub fn wait(self) -> Result<T> {
        match self.receiver.blocking_recv() {
            Ok(result) => result,
            Err(_) => Err(Error::CancelledOrShutdown),
        }
    }
}

impl<T> Future for OperationFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::CancelledOrShutdown)),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn deliver<T>(sender: oneshot::Sender<Result<T>>, result: Result<T>) {
    // The caller may have dropped the future; the operation's outcome is
    // simply discarded then.
    let _ = sender.send(result);
}

/// One retried operation as a chain of queue continuations.
struct RetryChain<T, F> {
    queue: CompletionQueue,
    idempotency: Idempotency,
    retry: Box<dyn RetryPolicy>,
    backoff: Box<dyn BackoffPolicy>,
    attempts: u32,
    attempt: F,
    done: Box<dyn FnOnce(Result<T>) + Send>,
}

impl<T, F> RetryChain<T, F>
where
    T: Send + 'static,
    F: FnMut() -> Result<T> + Send + 'static,
{
    fn schedule(self) {
        let queue = self.queue.clone();
        queue.schedule(move |status| self.step(status));
    }

    fn schedule_after(self, delay: Duration) {
        let queue = self.queue.clone();
        queue.schedule_after(delay, move |status| self.step(status));
    }

    fn step(mut self, status: QueueStatus) {
        if status.is_shutting_down() {
            (self.done)(Err(Error::CancelledOrShutdown));
            return;
        }
        self.attempts += 1;
        let error = match (self.attempt)() {
            Ok(value) => {
                (self.done)(Ok(value));
                return;
            }
            Err(error) => error,
        };
        match after_failure(
            self.idempotency,
            self.retry.as_mut(),
            self.backoff.as_mut(),
            self.attempts,
            error,
        ) {
            AttemptDisposition::Finish(error) => (self.done)(Err(error)),
            AttemptDisposition::Backoff(delay) => self.schedule_after(delay),
        }
    }
}

/// Run `attempt` under the retry policies without blocking the caller.
///
/// The attempt closure runs on whichever thread serves the queue, one
/// invocation per attempt, with backoff delays in between as scheduled
/// timers. Semantics match [`crate::retry::execute_with_retry`]
/// attempt-for-attempt.
pub fn execute_with_retry_async<T, F>(
    queue: &CompletionQueue,
    idempotency: Idempotency,
    retry: Box<dyn RetryPolicy>,
    backoff: Box<dyn BackoffPolicy>,
    attempt: F,
) -> OperationFuture<T>
where
    T: Send + 'static,
    F: FnMut() -> Result<T> + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    RetryChain {
        queue: queue.clone(),
        idempotency,
        retry,
        backoff,
        attempts: 0,
        attempt,
        done: Box::new(move |result| deliver(sender, result)),
    }
    .schedule();
    OperationFuture { receiver }
}

/// One paginated listing as a chain of queue continuations.
struct ListChain<P: Page, F> {
    queue: CompletionQueue,
    retry_prototype: Box<dyn RetryPolicy>,
    backoff_prototype: Box<dyn BackoffPolicy>,
    retry: Box<dyn RetryPolicy>,
    backoff: Box<dyn BackoffPolicy>,
    attempts: u32,
    token: String,
    items: Vec<P::Item>,
    fetch: F,
    done: Box<dyn FnOnce(Result<Vec<P::Item>>) + Send>,
}

impl<P, F> ListChain<P, F>
where
    P: Page + 'static,
    P::Item: Send + 'static,
    F: FnMut(&str) -> Result<P> + Send + 'static,
{
    fn schedule(self) {
        let queue = self.queue.clone();
        queue.schedule(move |status| self.step(status));
    }

    fn schedule_after(self, delay: Duration) {
        let queue = self.queue.clone();
        queue.schedule_after(delay, move |status| self.step(status));
    }

    fn step(mut self, status: QueueStatus) {
        if status.is_shutting_down() {
            (self.done)(Err(Error::CancelledOrShutdown));
            return;
        }
        self.attempts += 1;
        match (self.fetch)(&self.token) {
            Ok(page) => {
                let next_token = page.next_token().to_string();
                self.items.extend(page.into_items());
                if next_token.is_empty() {
                    (self.done)(Ok(self.items));
                    return;
                }
                // Next page: fresh policies, fresh attempt counter.
                self.token = next_token;
                self.attempts = 0;
                self.retry = self.retry_prototype.clone_policy();
                self.backoff = self.backoff_prototype.clone_policy();
                self.schedule();
            }
            Err(error) => {
                match after_failure(
                    Idempotency::Idempotent,
                    self.retry.as_mut(),
                    self.backoff.as_mut(),
                    self.attempts,
                    error,
                ) {
                    AttemptDisposition::Finish(error) => (self.done)(Err(error)),
                    AttemptDisposition::Backoff(delay) => self.schedule_after(delay),
                }
            }
        }
    }
}

/// Fetch every page of a listing without blocking the caller.
///
/// Semantics match [`crate::paginate::list_all`]: page fetches are
/// idempotent, each page gets fresh clones of the policy prototypes, and
/// a failed page discards the accumulated items.
pub fn list_all_async<P, F>(
    queue: &CompletionQueue,
    retry: Box<dyn RetryPolicy>,
    backoff: Box<dyn BackoffPolicy>,
    fetch_page: F,
) -> OperationFuture<Vec<P::Item>>
where
    P: Page + 'static,
    P::Item: Send + 'static,
    F: FnMut(&str) -> Result<P> + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    ListChain {
        queue: queue.clone(),
        retry: retry.clone_policy(),
        backoff: backoff.clone_policy(),
        retry_prototype: retry,
        backoff_prototype: backoff,
        attempts: 0,
        token: String::new(),
        items: Vec::new(),
        fetch: fetch_page,
        done: Box::new(move |result| deliver(sender, result)),
    }
    .schedule();
    OperationFuture { receiver }
}

/// One polled operation as a chain of queue continuations.
struct PollChain<H, T, C> {
    queue: CompletionQueue,
    operation: String,
    polling: Box<dyn PollingPolicy>,
    handle: H,
    check: C,
    done: Box<dyn FnOnce(Result<T>) + Send>,
}

impl<H, T, C> PollChain<H, T, C>
where
    H: Send + 'static,
    T: Send + 'static,
    C: FnMut(&H) -> Result<OperationPoll<T>> + Send + 'static,
{
    fn schedule(self) {
        let queue = self.queue.clone();
        queue.schedule(move |status| self.step(status));
    }

    fn schedule_after(self, delay: Duration) {
        let queue = self.queue.clone();
        queue.schedule_after(delay, move |status| self.step(status));
    }

    fn step(mut self, status: QueueStatus) {
        if status.is_shutting_down() {
            (self.done)(Err(Error::CancelledOrShutdown));
            return;
        }
        let outcome = (self.check)(&self.handle);
        match on_poll_result(self.polling.as_mut(), &self.operation, outcome) {
            PollStep::Finish(result) => (self.done)(result),
            PollStep::Wait(delay) => self.schedule_after(delay),
        }
    }
}

/// Run a long-running operation end to end without blocking the caller.
///
/// The initiating RPC runs as a retry chain; if it reports the operation
/// in progress, the handle is polled under `polling` with the first
/// status check issued immediately and later ones spaced by the policy's
/// wait periods. Semantics match [`crate::lro::execute_polled`].
#[allow(clippy::too_many_arguments)]
pub fn execute_polled_async<H, T, F, C>(
    queue: &CompletionQueue,
    operation: impl Into<String>,
    idempotency: Idempotency,
    retry: Box<dyn RetryPolicy>,
    backoff: Box<dyn BackoffPolicy>,
    polling: Box<dyn PollingPolicy>,
    initiate: F,
    check: C,
) -> OperationFuture<T>
where
    H: Send + 'static,
    T: Send + 'static,
    F: FnMut() -> Result<StartedOperation<H, T>> + Send + 'static,
    C: FnMut(&H) -> Result<OperationPoll<T>> + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let operation = operation.into();
    let poll_queue = queue.clone();
    RetryChain {
        queue: queue.clone(),
        idempotency,
        retry,
        backoff,
        attempts: 0,
        attempt: initiate,
        done: Box::new(move |started: Result<StartedOperation<H, T>>| match started {
            Ok(StartedOperation::Completed(value)) => deliver(sender, Ok(value)),
            Ok(StartedOperation::Failed(status)) => deliver(sender, Err(Error::Rpc(status))),
            Ok(StartedOperation::InProgress(handle)) => PollChain {
                queue: poll_queue,
                operation,
                polling,
                handle,
                check,
                done: Box::new(move |result| deliver(sender, result)),
            }
            .schedule(),
            Err(error) => deliver(sender, Err(error)),
        }),
    }
    .schedule();
    OperationFuture { receiver }
}

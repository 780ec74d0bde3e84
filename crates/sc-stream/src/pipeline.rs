//! Bounded-window prefetching with in-order delivery.
//!
//! A [`PrefetchPipeline`] owns an ordered list of fetch tasks. It keeps at
//! most `window` of them running ahead of the consumer and yields their
//! results strictly in list order, regardless of which finishes first. The
//! slot of the oldest task is refilled as soon as its result is taken, so
//! `window` fetches keep running while the caller writes that result out,
//! and no more than `window` fetches ever run at once.

use std::collections::VecDeque;

use futures::future::BoxFuture;
use sc_core::{Error, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A deferred fetch; nothing runs until the pipeline starts it.
pub type FetchTask<T> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T>> + Send>;

pub struct PrefetchPipeline<T> {
    window: usize,
    pending: VecDeque<FetchTask<T>>,
    in_flight: VecDeque<JoinHandle<Result<T>>>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> PrefetchPipeline<T> {
    /// Create a pipeline over `tasks`.
    ///
    /// Tasks observe a child of `cancel`: cancelling the parent stops every
    /// running fetch, and dropping the pipeline stops them too without
    /// touching the parent.
    pub fn new(tasks: Vec<FetchTask<T>>, window: usize, cancel: &CancellationToken) -> Self {
        Self {
            window: window.max(1),
            pending: tasks.into(),
            in_flight: VecDeque::new(),
            cancel: cancel.child_token(),
        }
    }

    /// Number of tasks started and not yet yielded.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of tasks not yet started.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Next result in task order, or `None` once every task has been yielded.
    ///
    /// On success the freed slot is refilled before returning. After an
    /// error nothing new is started.
    pub async fn next(&mut self) -> Option<Result<T>> {
        self.fill();
        let head = self.in_flight.pop_front()?;

        let result = match head.await {
            Ok(r) => r,
            Err(e) if e.is_cancelled() => Err(Error::Cancelled),
            Err(e) => Err(Error::Internal(format!("fetch task failed: {e}"))),
        };
        if result.is_ok() {
            self.fill();
        }
        Some(result)
    }

    fn fill(&mut self) {
        while self.in_flight.len() < self.window {
            let Some(task) = self.pending.pop_front() else {
                break;
            };
            let cancel = self.cancel.clone();
            let fut = task();
            self.in_flight.push_back(tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(Error::Cancelled),
                    r = fut => r,
                }
            }));
        }
    }
}

impl<T> Drop for PrefetchPipeline<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
        for handle in &self.in_flight {
            handle.abort();
        }
        if !self.in_flight.is_empty() || !self.pending.is_empty() {
            tracing::debug!(
                in_flight = self.in_flight.len(),
                pending = self.pending.len(),
                "Prefetch pipeline dropped with outstanding fetches"
            );
        }
    }
}

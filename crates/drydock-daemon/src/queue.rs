//! Job queue runner
//!
//! Bounds how many checks run at once. Jobs are admitted strictly in
//! registration order; each completion releases its permit and immediately
//! admits the next queued job. `wait` resolves once the queue has fully
//! drained: nothing queued and nothing in flight.
//!
//! The permit counter and FIFO are the only shared mutable state, guarded by
//! a mutex whose critical sections contain no await points.

use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Occupancy snapshot for status reporting
#[derive(Debug, Clone, Copy)]
pub struct QueueStatus {
    pub capacity: usize,
    pub in_flight: usize,
    pub queued: usize,
}

/// Concurrency-bounded FIFO scheduler for check jobs
#[derive(Clone)]
pub struct JobQueueRunner {
    inner: Arc<Inner>,
}

struct Inner {
    capacity: usize,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    queue: VecDeque<Job>,
    in_flight: usize,
    drain_waiters: Vec<oneshot::Sender<()>>,
}

impl JobQueueRunner {
    /// New runner admitting at most `max_in_parallel` jobs at once
    /// (floored at 1)
    #[must_use]
    pub fn new(max_in_parallel: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: max_in_parallel.max(1),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Enqueue a job for eventual execution.
    ///
    /// The job owns its own error reporting; the runner never retries. A job
    /// that panics still releases its permit, so the queue cannot wedge.
    pub fn register<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        state.queue.push_back(Box::pin(job));
        Self::admit(&self.inner, &mut state);
    }

    /// Resolve once the queue is drained: no jobs pending and none in
    /// flight. All concurrent waiters are notified on the same drain event;
    /// jobs registered afterwards start a fresh cycle.
    pub async fn wait(&self) {
        let receiver = {
            let mut state = self.inner.state.lock();
            if state.queue.is_empty() && state.in_flight == 0 {
                return;
            }
            let (tx, rx) = oneshot::channel();
            state.drain_waiters.push(tx);
            rx
        };
        // The sender is only ever dropped with the whole runner.
        let _ = receiver.await;
    }

    #[must_use]
    pub fn status(&self) -> QueueStatus {
        let state = self.inner.state.lock();
        QueueStatus {
            capacity: self.inner.capacity,
            in_flight: state.in_flight,
            queued: state.queue.len(),
        }
    }

    /// Admit queued jobs while permits remain. Admission order is the
    /// registration order; nothing else ever pops the queue.
    fn admit(inner: &Arc<Inner>, state: &mut State) {
        while state.in_flight < inner.capacity {
            let Some(job) = state.queue.pop_front() else {
                break;
            };
            state.in_flight += 1;
            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                    tracing::warn!("check job panicked");
                }
                Self::complete(&inner);
            });
        }
    }

    fn complete(inner: &Arc<Inner>) {
        let mut state = inner.state.lock();
        state.in_flight -= 1;
        Self::admit(inner, &mut state);
        if state.queue.is_empty() && state.in_flight == 0 {
            for waiter in state.drain_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }
}

//! Loop handle.
//!
//! # Lifecycle
//! ```text
//! Loop::new / LoopBuilder::spawn
//!   ├─► state built, queue + signals allocated, worker spawned
//!   ├─► producers submit (queue / do_task / query)
//!   └─► shutdown
//!         ├─► first caller flips the shutdown broadcast
//!         ├─► worker exits without draining the queue
//!         └─► completion broadcast flips; every shutdown caller returns
//! ```
//!
//! A loop is single-use. Once shutdown was requested every submission fails
//! with [`LoopError::ShuttingDown`].
//!
//! Dropping a `Loop` without calling `shutdown` also stops the worker.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use crate::action::{Query, Task};
use crate::config::LoopConfig;
use crate::context::Context;
use crate::error::LoopError;
use crate::ids::LoopId;
use crate::ops;
use crate::stats::{Counters, LoopStats};
use crate::worker::Worker;

pub use crate::worker::ErrorHandler;

pub(crate) mod sealed {
    use std::sync::Arc;

    use tokio::sync::{mpsc, watch};

    use crate::stats::Counters;
    use crate::worker::BoxedAction;

    /// Submission side of a loop.
    pub struct Inbox<S> {
        pub(crate) tx: mpsc::Sender<BoxedAction<S>>,
        pub(crate) shutdown: watch::Receiver<bool>,
        pub(crate) counters: Arc<Counters>,
    }

    /// Keeps [`Doer`](super::Doer) implementable only inside this crate.
    pub trait Sealed<S> {
        fn inbox(&self) -> &Inbox<S>;
    }
}

/// Submission surface of a loop over state `S`.
///
/// Sealed: only [`Loop`] implements it. Use it as a bound when code should
/// accept "some loop over `S`".
#[async_trait]
pub trait Doer<S: Send + 'static>: sealed::Sealed<S> + Send + Sync {
    /// Fire-and-forget a task. Only submission errors are returned.
    async fn queue<T: Task<S>>(&self, ctx: &Context, task: T) -> Result<(), LoopError> {
        ops::queue::<S, Self, T>(ctx, self, task).await
    }

    /// Run a task and wait for it; returns the task's own error.
    async fn do_task<T: Task<S>>(&self, ctx: &Context, task: T) -> Result<(), LoopError> {
        ops::do_task::<S, Self, T>(ctx, self, task).await
    }

    async fn query<Q: Query<S>>(&self, ctx: &Context, query: Q) -> Result<Q::Output, LoopError> {
        ops::query::<S, Self, Q>(ctx, self, query).await
    }

    async fn shutdown(&self, ctx: &Context) -> Result<(), LoopError>;
}

/// Single-worker loop owning a value of `S`.
pub struct Loop<S> {
    id: LoopId,
    name: Option<String>,
    capacity: usize,
    inbox: sealed::Inbox<S>,
    shutdown_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

impl<S: Default + Send + 'static> Loop<S> {
    /// Spawn a loop on the current tokio runtime.
    ///
    /// - `queue_buffer <= 0` is treated as 1
    /// - `init = None` starts from `S::default()`
    /// - `on_error = None` drops fire-and-forget errors
    ///
    /// `S: Default` is required even when `init` is given. For a state type
    /// without `Default`, use [`LoopBuilder::with_init`](crate::LoopBuilder::with_init).
    ///
    /// # Panics
    /// Outside a tokio runtime.
    pub fn new(
        queue_buffer: i64,
        init: Option<Box<dyn FnOnce() -> S>>,
        on_error: Option<ErrorHandler>,
    ) -> Self {
        let state = match init {
            Some(init) => init(),
            None => S::default(),
        };
        Self::launch(LoopConfig::new(queue_buffer), state, on_error)
    }

    pub fn builder() -> crate::builder::LoopBuilder<S> {
        crate::builder::LoopBuilder::new()
    }
}

impl<S: Send + 'static> Loop<S> {
    pub(crate) fn launch(config: LoopConfig, state: S, on_error: Option<ErrorHandler>) -> Self {
        let id = LoopId::new();
        let capacity = config.capacity();
        let (tx, rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        let counters = Arc::new(Counters::default());

        let worker = Worker {
            id,
            state,
            inbox: rx,
            shutdown: shutdown_rx.clone(),
            done: done_tx,
            on_error,
            counters: Arc::clone(&counters),
        };
        let span = tracing::debug_span!("actloop", name = config.name.as_deref().unwrap_or("-"));
        tokio::spawn(worker.run().instrument(span));

        Self {
            id,
            name: config.name,
            capacity,
            inbox: sealed::Inbox {
                tx,
                shutdown: shutdown_rx,
                counters,
            },
            shutdown_tx,
            done_rx,
        }
    }

    pub fn id(&self) -> LoopId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Flip the shutdown broadcast without waiting.
    ///
    /// Returns `true` only for the call that made the transition.
    pub fn request_shutdown(&self) -> bool {
        let first = self.shutdown_tx.send_if_modified(|down| {
            if *down {
                false
            } else {
                *down = true;
                true
            }
        });
        if first {
            tracing::debug!(loop_id = %self.id, "shutdown requested");
        }
        first
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Whether the worker has exited (normally or by panic).
    pub fn is_stopped(&self) -> bool {
        *self.done_rx.borrow() || self.done_rx.has_changed().is_err()
    }

    /// Wait for the worker to exit. Does not request shutdown.
    pub async fn wait_stopped(&self) {
        let mut done = self.done_rx.clone();
        // Err: sender dropped without flipping, i.e. the worker panicked
        let _ = done.wait_for(|stopped| *stopped).await;
    }

    /// Request shutdown and wait for the worker to exit.
    ///
    /// Safe to call any number of times. A context error only abandons the
    /// wait; the worker keeps going until its current item returns.
    pub async fn shutdown(&self, ctx: &Context) -> Result<(), LoopError> {
        self.request_shutdown();
        tokio::select! {
            biased;
            _ = self.wait_stopped() => Ok(()),
            _ = ctx.done() => Err(ctx.done_err().into()),
        }
    }

    pub fn stats(&self) -> LoopStats {
        let tx = &self.inbox.tx;
        let counters = &self.inbox.counters;
        LoopStats {
            loop_id: self.id,
            name: self.name.clone(),
            capacity: self.capacity,
            queued: tx.max_capacity().saturating_sub(tx.capacity()),
            submitted: counters.submitted(),
            executed: counters.executed(),
            failed: counters.failed(),
            shutting_down: self.is_shutting_down(),
            stopped: self.is_stopped(),
        }
    }
}

impl<S> sealed::Sealed<S> for Loop<S> {
    fn inbox(&self) -> &sealed::Inbox<S> {
        &self.inbox
    }
}

#[async_trait]
impl<S: Send + 'static> Doer<S> for Loop<S> {
    async fn shutdown(&self, ctx: &Context) -> Result<(), LoopError> {
        Loop::shutdown(self, ctx).await
    }
}

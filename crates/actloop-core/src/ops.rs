//! Free-standing submission helpers.
//!
//! These are generic over the response type and work with any [`Doer`].
//! Callers usually wrap them in a small state-specific function:
//!
//! ```ignore
//! async fn read_thing<D: Doer<Doc> + ?Sized>(ctx: &Context, d: &D) -> Result<String, LoopError> {
//!     ops::query(ctx, d, query_fn(|_, doc: &mut Doc| Ok(doc.thing.clone()))).await
//! }
//! ```
//!
//! # Suspension points
//! 1. enqueue: submitter context vs. shutdown vs. queue send
//! 2. await (awaitable only): submitter context vs. reply vs. shutdown
//!
//! A submitter that gives up after step 1 does not un-queue the item; the
//! worker still runs it.

use tokio::sync::{oneshot, watch};

use crate::action::{Action, Query, Task};
use crate::adapter::{Awaited, Detached, Reply};
use crate::context::Context;
use crate::error::LoopError;
use crate::handle::Doer;
use crate::worker::BoxedAction;

/// Fire-and-forget: the response is discarded, an error goes to the loop's
/// error handler. The query runs with the worker's background context.
pub async fn queue<S, D, Q>(ctx: &Context, doer: &D, query: Q) -> Result<(), LoopError>
where
    S: Send + 'static,
    D: Doer<S> + ?Sized,
    Q: Query<S>,
{
    enqueue(ctx, doer, Box::new(Detached(query))).await
}

/// Fire-and-forget for a plain [`Action`]; no adapter involved.
pub async fn queue_action<S, D, A>(ctx: &Context, doer: &D, action: A) -> Result<(), LoopError>
where
    S: Send + 'static,
    D: Doer<S> + ?Sized,
    A: Action<S>,
{
    enqueue(ctx, doer, Box::new(action)).await
}

/// Submit a task and wait for it to finish.
pub async fn do_task<S, D, T>(ctx: &Context, doer: &D, task: T) -> Result<(), LoopError>
where
    S: Send + 'static,
    D: Doer<S> + ?Sized,
    T: Task<S>,
{
    query::<S, D, T>(ctx, doer, task).await
}

/// Submit a query and wait for its response.
pub async fn query<S, D, Q>(ctx: &Context, doer: &D, query: Q) -> Result<Q::Output, LoopError>
where
    S: Send + 'static,
    D: Doer<S> + ?Sized,
    Q: Query<S>,
{
    let (action, reply) = Awaited::new(query, ctx.clone());
    let mut shutdown = doer.inbox().shutdown.clone();

    enqueue(ctx, doer, Box::new(action)).await?;
    await_reply(ctx, &mut shutdown, reply).await
}

async fn enqueue<S, D>(ctx: &Context, doer: &D, action: BoxedAction<S>) -> Result<(), LoopError>
where
    S: Send + 'static,
    D: Doer<S> + ?Sized,
{
    let inbox = doer.inbox();
    let mut shutdown = inbox.shutdown.clone();

    tokio::select! {
        biased;
        _ = ctx.done() => Err(ctx.done_err().into()),
        _ = shutdown.wait_for(|down| *down) => Err(LoopError::ShuttingDown),
        sent = inbox.tx.send(action) => {
            // 受信側が閉じている = worker がもういない
            sent.map_err(|_| LoopError::ShuttingDown)?;
            inbox.counters.record_submitted();
            Ok(())
        }
    }
}

async fn await_reply<R>(
    ctx: &Context,
    shutdown: &mut watch::Receiver<bool>,
    reply: oneshot::Receiver<Reply<R>>,
) -> Result<R, LoopError> {
    tokio::select! {
        biased;
        _ = ctx.done() => Err(ctx.done_err().into()),
        reply = reply => match reply {
            Ok(result) => result.map_err(LoopError::Action),
            // the item was dropped unexecuted (worker exited or panicked)
            Err(_) => Err(LoopError::ShuttingDown),
        },
        _ = shutdown.wait_for(|down| *down) => Err(LoopError::ShuttingDown),
    }
}

//! Adapters - turn a `Query` into a queueable `Action`.
//!
//! # Type erasure
//! The queue only knows `Box<dyn Action<S>>`. Awaitable queries are wrapped in
//! [`Awaited`], which owns a single-slot `oneshot` reply; detached
//! (fire-and-forget) queries are wrapped in [`Detached`], which has no reply.
//!
//! # Rules
//! - `Awaited` always returns `Ok(())` to the worker. The query's error
//!   belongs to the submitter, never to the loop's error handler.
//! - `Awaited` runs the query with the submitter's context, not the
//!   worker's background one.
//! - The reply send never blocks: `oneshot` has one slot and one writer.
//!   If the submitter stopped waiting the result is dropped.
//! - `Detached` discards the response and returns the error to the worker.

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::action::{Action, Query};
use crate::context::Context;
use crate::error::ActionError;

pub(crate) type Reply<R> = Result<R, ActionError>;

pub(crate) struct Awaited<Q, R> {
    query: Q,
    ctx: Context,
    reply: oneshot::Sender<Reply<R>>,
}

impl<Q, R> Awaited<Q, R> {
    pub(crate) fn new(query: Q, ctx: Context) -> (Self, oneshot::Receiver<Reply<R>>) {
        let (reply, rx) = oneshot::channel();
        (Self { query, ctx, reply }, rx)
    }
}

#[async_trait]
impl<S, Q, R> Action<S> for Awaited<Q, R>
where
    S: Send + 'static,
    R: Send + 'static,
    Q: Query<S, Output = R>,
{
    async fn act(self: Box<Self>, _worker_ctx: &Context, state: &mut S) -> Result<(), ActionError> {
        let Awaited { query, ctx, reply } = *self;
        let result = query.query(&ctx, state).await;
        // 受け取り側が既に諦めていても worker は止めない
        let _ = reply.send(result);
        Ok(())
    }
}

pub(crate) struct Detached<Q>(pub(crate) Q);

#[async_trait]
impl<S, Q> Action<S> for Detached<Q>
where
    S: Send + 'static,
    Q: Query<S>,
{
    async fn act(self: Box<Self>, ctx: &Context, state: &mut S) -> Result<(), ActionError> {
        self.0.query(ctx, state).await.map(drop)
    }
}

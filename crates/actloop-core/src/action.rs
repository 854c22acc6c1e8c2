//! Work items - what a loop executes against its state.
//!
//! # 三種類
//! - **Action**: fire-and-forget, `Result<(), ActionError>`. The queue element type.
//! - **Query**: awaitable, returns `Output` (or an error) to the submitter.
//! - **Task**: a `Query` whose `Output` is `()`.
//!
//! Every call gets an exclusive `&mut S` that lives only for the call, so a
//! work item cannot keep the state past its return.
//!
//! For synchronous bodies use [`action_fn`], [`query_fn`] or [`task_fn`];
//! implement the traits directly when the body needs to `.await`.

use async_trait::async_trait;

use crate::context::Context;
use crate::error::ActionError;

/// Lowest-level queueable unit.
///
/// Object safe: the loop stores `Box<dyn Action<S>>`.
#[async_trait]
pub trait Action<S>: Send + 'static {
    async fn act(self: Box<Self>, ctx: &Context, state: &mut S) -> Result<(), ActionError>;
}

/// Awaitable unit with a typed response.
///
/// # Example
/// ```ignore
/// struct ReadThing;
///
/// #[async_trait]
/// impl Query<Doc> for ReadThing {
///     type Output = String;
///
///     async fn query(self, _ctx: &Context, doc: &mut Doc) -> Result<String, ActionError> {
///         Ok(doc.thing.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait Query<S>: Send + 'static {
    type Output: Send + 'static;

    async fn query(self, ctx: &Context, state: &mut S) -> Result<Self::Output, ActionError>;
}

/// Awaitable unit where only completion matters.
pub trait Task<S>: Query<S, Output = ()> {}

impl<S, T> Task<S> for T where T: Query<S, Output = ()> {}

/// [`Action`] backed by a synchronous closure.
pub struct ActionFn<F>(F);

#[async_trait]
impl<S, F> Action<S> for ActionFn<F>
where
    S: Send + 'static,
    F: FnOnce(&Context, &mut S) -> Result<(), ActionError> + Send + 'static,
{
    async fn act(self: Box<Self>, ctx: &Context, state: &mut S) -> Result<(), ActionError> {
        (self.0)(ctx, state)
    }
}

/// [`Query`] backed by a synchronous closure.
pub struct QueryFn<F>(F);

#[async_trait]
impl<S, F, R> Query<S> for QueryFn<F>
where
    S: Send + 'static,
    R: Send + 'static,
    F: FnOnce(&Context, &mut S) -> Result<R, ActionError> + Send + 'static,
{
    type Output = R;

    async fn query(self, ctx: &Context, state: &mut S) -> Result<R, ActionError> {
        (self.0)(ctx, state)
    }
}

pub fn action_fn<S, F>(f: F) -> ActionFn<F>
where
    F: FnOnce(&Context, &mut S) -> Result<(), ActionError> + Send + 'static,
{
    ActionFn(f)
}

pub fn query_fn<S, R, F>(f: F) -> QueryFn<F>
where
    F: FnOnce(&Context, &mut S) -> Result<R, ActionError> + Send + 'static,
{
    QueryFn(f)
}

pub fn task_fn<S, F>(f: F) -> QueryFn<F>
where
    F: FnOnce(&Context, &mut S) -> Result<(), ActionError> + Send + 'static,
{
    QueryFn(f)
}

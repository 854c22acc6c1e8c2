//! actloop-core
//!
//! A single-worker action loop that serialises every read and write of a
//! caller-supplied state value.
//!
//! # モジュール構成
//! - **context**: cancellation scope with optional deadline (`Context`)
//! - **error**: `LoopError`, `ContextError`, `ActionError`
//! - **action**: work item traits (`Action`, `Query`, `Task`) and closure wrappers
//! - **adapter**: awaitable / detached adapters that turn queries into queueable actions
//! - **config / builder**: `LoopConfig` and `LoopBuilder`
//! - **handle**: `Loop` and the sealed `Doer` trait
//! - **ops**: free-standing generic submission helpers
//! - **stats**: `LoopStats` snapshot
//!
//! # Example
//! ```ignore
//! let lp = Loop::<Counter>::builder().queue_buffer(16).spawn();
//! let ctx = Context::background();
//!
//! lp.do_task(&ctx, task_fn(|_, c: &mut Counter| { c.n += 1; Ok(()) })).await?;
//! let n = lp.query(&ctx, query_fn(|_, c: &mut Counter| Ok(c.n))).await?;
//!
//! lp.shutdown(&ctx).await?;
//! ```

pub mod action;
pub mod adapter;
pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod handle;
pub mod ids;
pub mod ops;
pub mod stats;
mod worker;

pub use self::action::{Action, ActionFn, Query, QueryFn, Task, action_fn, query_fn, task_fn};
pub use self::builder::LoopBuilder;
pub use self::config::LoopConfig;
pub use self::context::Context;
pub use self::error::{ActionError, ContextError, LoopError};
pub use self::handle::{Doer, ErrorHandler, Loop};
pub use self::ids::LoopId;
pub use self::stats::LoopStats;

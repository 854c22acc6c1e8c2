//! LoopBuilder - wiring for a loop.
//!
//! # 使用例
//! ```ignore
//! let lp = LoopBuilder::<Kv>::new()
//!     .queue_buffer(64)
//!     .name("kv")
//!     .error_handler(|err| eprintln!("kv: {err}"))
//!     .spawn();
//! ```

use crate::config::LoopConfig;
use crate::error::ActionError;
use crate::handle::{ErrorHandler, Loop};

pub struct LoopBuilder<S> {
    config: LoopConfig,
    init: Box<dyn FnOnce() -> S>,
    on_error: Option<ErrorHandler>,
}

impl<S: Default + 'static> LoopBuilder<S> {
    /// Start from `S::default()`.
    pub fn new() -> Self {
        Self::with_init(S::default)
    }
}

impl<S: Default + 'static> Default for LoopBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static> LoopBuilder<S> {
    /// Start from whatever `init` produces. `S` need not be `Default`.
    pub fn with_init<F>(init: F) -> Self
    where
        F: FnOnce() -> S + 'static,
    {
        Self {
            config: LoopConfig::default(),
            init: Box::new(init),
            on_error: None,
        }
    }

    pub fn queue_buffer(mut self, queue_buffer: i64) -> Self {
        self.config.queue_buffer = queue_buffer;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Replace queue buffer and name with `config`.
    pub fn config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn error_handler<H>(mut self, handler: H) -> Self
    where
        H: FnMut(ActionError) + Send + 'static,
    {
        self.on_error = Some(Box::new(handler));
        self
    }

    pub fn config_ref(&self) -> &LoopConfig {
        &self.config
    }
}

impl<S: Send + 'static> LoopBuilder<S> {
    /// Build the state and spawn the worker on the current tokio runtime.
    pub fn spawn(self) -> Loop<S> {
        let state = (self.init)();
        Loop::launch(self.config, state, self.on_error)
    }
}

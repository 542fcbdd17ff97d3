//! Completion listener chain.

use std::panic::{self, AssertUnwindSafe};

use crate::context::adapter::Context;
use crate::context::error::ContextError;

/// Callback run once the response is complete.
pub type CompletionListener = Box<dyn FnOnce(&Context) -> Result<(), ContextError> + Send>;

/// Listeners in registration order. Created on the first registration.
#[derive(Default)]
pub struct CompletionListeners {
    listeners: Vec<CompletionListener>,
}

impl CompletionListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listener: CompletionListener) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Run every listener. A failing or panicking listener is logged and the rest
    /// still run.
    pub fn run(self, ctx: &Context) {
        for (index, listener) in self.listeners.into_iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(ctx))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(
                    listener = index,
                    path = %ctx.request_path(),
                    error = %e,
                    "Completion listener failed"
                ),
                Err(_) => tracing::error!(
                    listener = index,
                    path = %ctx.request_path(),
                    "Completion listener panicked"
                ),
            }
        }
    }
}

impl std::fmt::Debug for CompletionListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

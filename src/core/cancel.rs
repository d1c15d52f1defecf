//! Cooperative cancellation for hierarchy expansions and indexing passes.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared flag checked between external steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn cancel(&self)
    {
        self.0
            .store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool
    {
        self.0
            .load(Ordering::SeqCst)
    }

    /// Underlying flag, for `signal_hook::flag::register`.
    pub fn flag(&self) -> Arc<AtomicBool>
    {
        Arc::clone(&self.0)
    }
}

//! Site-aware execution.
//!
//! Binds a [`SiteContext`] as the ambient context of a task so code deep in a
//! call chain can reach site-scoped config and caches without threading the
//! context through every signature. The binding is task-local: it follows the
//! task across worker threads, disappears when the scope ends (normally, by
//! error, or by panic), and never leaks into other tasks sharing the worker.

use std::future::Future;
use std::sync::Arc;

use siteline_core::{ContextError, SitelineResult};
use tokio::runtime::Handle;
use tokio::task::futures::TaskLocalFuture;
use tokio::task::JoinHandle;

use crate::site_context::SiteContext;

tokio::task_local! {
    static CURRENT_SITE: Arc<SiteContext>;
}

/// A future running with a site context bound.
pub type SiteAware<F> = TaskLocalFuture<Arc<SiteContext>, F>;

/// The context bound to the current task, if any.
pub fn current() -> Option<Arc<SiteContext>> {
    CURRENT_SITE.try_with(Arc::clone).ok()
}

/// The context bound to the current task, or `ContextError::NoAmbientContext`.
pub fn require_current() -> SitelineResult<Arc<SiteContext>> {
    current().ok_or_else(|| ContextError::NoAmbientContext.into())
}

/// Run `future` with `context` bound.
pub fn with_site<F: Future>(context: Arc<SiteContext>, future: F) -> SiteAware<F> {
    CURRENT_SITE.scope(context, future)
}

/// Run a synchronous closure with `context` bound.
pub fn with_site_blocking<R>(context: Arc<SiteContext>, f: impl FnOnce() -> R) -> R {
    CURRENT_SITE.sync_scope(context, f)
}

/// `.bind_site(ctx)` for any future.
pub trait BindSiteExt: Future + Sized {
    fn bind_site(self, context: Arc<SiteContext>) -> SiteAware<Self> {
        with_site(context, self)
    }
}

impl<F: Future> BindSiteExt for F {}

/// Spawns work onto a runtime with the submitter's site context carried
/// along.
///
/// The context is captured at submission time, not when the task starts, so
/// a task spawned from inside `with_site(acme, ..)` runs as `acme` even if
/// the spawning task has moved on.
#[derive(Debug, Clone)]
pub struct SiteAwareExecutor {
    handle: Handle,
}

impl SiteAwareExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Executor on the runtime of the calling task. Panics outside a tokio
    /// runtime, like [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawn `future` bound to the caller's context. Runs unbound if the
    /// caller has none.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match current() {
            Some(context) => self.spawn_for(context, future),
            None => self.handle.spawn(future),
        }
    }

    /// Spawn `future` bound to an explicit context.
    pub fn spawn_for<F>(&self, context: Arc<SiteContext>, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tracing::trace!(site = %context.site_name(), "Spawning site-aware task");
        self.handle.spawn(with_site(context, future))
    }

    /// Run `f` on the blocking pool bound to the caller's context.
    pub fn spawn_blocking<F, R>(&self, f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match current() {
            Some(context) => self.spawn_blocking_for(context, f),
            None => self.handle.spawn_blocking(f),
        }
    }

    /// Run `f` on the blocking pool bound to an explicit context.
    pub fn spawn_blocking_for<F, R>(&self, context: Arc<SiteContext>, f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.handle
            .spawn_blocking(move || with_site_blocking(context, f))
    }
}

//! Cooperative cache refresh.
//!
//! Several engine components keep an in-memory copy of data that lives in
//! the usage store. To pick up new signals they have to be told to reload,
//! and because the components form a dependency graph that shares nodes
//! (one data model typically feeds a similarity, a neighbourhood and a
//! recommender), a naive recursive reload would rebuild shared caches once
//! per path. A [`RefreshCycle`] carries the set of components that were
//! already refreshed in the current pass, so every component rebuilds at
//! most once per cycle and always after its upstream dependencies.

use std::collections::HashSet;
use std::sync::Arc;

/// A component that can rebuild its in-memory state from its dependencies.
///
/// Implementations refresh their upstream dependencies through
/// [`RefreshCycle::run`] before rebuilding their own cache. Components that
/// work directly on the store have nothing to rebuild and implement this as
/// a no-op.
pub trait Refreshable: Send + Sync {
    /// Rebuilds this component within the given cycle.
    ///
    /// A storage failure aborts the whole cycle; callers keep serving the
    /// previously installed snapshots and may retry the cycle later.
    fn refresh(&self, cycle: &mut RefreshCycle) -> anyhow::Result<()>;
}

/// One full rebuild pass over a component graph.
///
/// The cycle tracks component identity by the address of the shared
/// allocation, so every `Arc` clone of a component counts as the same node
/// no matter which trait object it travels behind.
#[derive(Default)]
pub struct RefreshCycle {
    refreshed: HashSet<usize>,
}

impl RefreshCycle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refreshes `component` unless it already ran in this cycle.
    ///
    /// The component is marked before its `refresh` executes, which keeps a
    /// diamond-shaped graph from re-entering a node through a second path
    /// while the first visit is still on the stack.
    pub fn run<C>(&mut self, component: &Arc<C>) -> anyhow::Result<()>
    where
        C: Refreshable + ?Sized,
    {
        let key = Arc::as_ptr(component).cast::<()>() as usize;
        if self.refreshed.insert(key) {
            component.refresh(self)?;
        }
        Ok(())
    }

    /// Number of components refreshed so far in this cycle.
    #[must_use]
    pub fn refreshed_count(&self) -> usize {
        self.refreshed.len()
    }
}

//! Atomically published resolver selection.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwapOption;

/// The currently selected resolver, as published by a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedResolver {
    pub address: IpAddr,
    pub label: String,
    pub selected_at: SystemTime,
}

/// Process-wide holder for the active resolver selection.
///
/// Starts unset. The benchmark's publish step is the single writer;
/// readers are unbounded. Publication is one atomic pointer swap, so a
/// reader sees either the previous selection or the new one, never a
/// partial write. Clones share the same slot.
#[derive(Clone, Default)]
pub struct ActiveResolver {
    inner: Arc<ArcSwapOption<SelectedResolver>>,
}

impl ActiveResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current selection, if a benchmark has published one.
    pub fn current(&self) -> Option<Arc<SelectedResolver>> {
        self.inner.load_full()
    }

    /// Replace the selection. Only the benchmark calls this.
    pub(crate) fn publish(&self, selection: SelectedResolver) {
        self.inner.store(Some(Arc::new(selection)));
    }
}

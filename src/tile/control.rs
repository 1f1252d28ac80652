//! Cooperative cancellation and progress reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::Tile;

/// Shared flag used to stop a run between tiles.
///
/// Clones observe the same flag, so one handle can be kept by the caller while
/// another is passed into the run.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Tiles already started still finish.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Progress notification sent after each finished tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileProgress {
    /// Tiles finished so far, including this one.
    pub completed: usize,
    /// Tiles in the plan.
    pub total: usize,
    /// The tile that just finished.
    pub tile: Tile,
}

/// Optional hooks for a registration run.
#[derive(Clone, Copy, Default)]
pub struct RunControl<'a> {
    /// Checked before each tile starts.
    pub cancel: Option<&'a CancelToken>,
    /// Called after each tile. In parallel runs it may be called from worker
    /// threads and `completed` counts tiles in completion order.
    pub progress: Option<&'a (dyn Fn(TileProgress) + Sync)>,
}

impl<'a> RunControl<'a> {
    /// Control with no cancellation and no progress callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a cancellation token.
    pub fn with_cancel(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Attaches a progress callback.
    pub fn with_progress(mut self, progress: &'a (dyn Fn(TileProgress) + Sync)) -> Self {
        self.progress = Some(progress);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    pub(crate) fn report(&self, progress: TileProgress) {
        if let Some(f) = self.progress {
            f(progress);
        }
    }
}

impl std::fmt::Debug for RunControl<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunControl")
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

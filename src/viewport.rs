use crate::geom::{Size, Vec2};
use crate::timers::{Millis, TimerId};

/// Quiet period after the last resize before the simulation is reset.
pub const RESIZE_DEBOUNCE_MS: Millis = 220.0;

/// Below this smaller-side length the viewport counts as small.
pub const SMALL_VIEWPORT: f32 = 700.0;

/// Tracks the effective viewport and owns the resize debounce timer.
#[derive(Debug)]
pub struct ViewportMonitor {
    size: Size,
    debounce: Option<TimerId>,
}

impl ViewportMonitor {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            debounce: None,
        }
    }

    /// Hosts may report document and window metrics that disagree; the larger of each wins.
    pub fn effective(document: Size, window: Size) -> Size {
        Size::new(
            document.width.max(window.width).max(0.0),
            document.height.max(window.height).max(0.0),
        )
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_small(&self) -> bool {
        self.size.min_side() < SMALL_VIEWPORT
    }

    /// Record new metrics. Returns the debounce timer that must be cancelled, if any;
    /// the caller arms a fresh one via [`ViewportMonitor::arm`].
    pub fn observe(&mut self, document: Size, window: Size) -> Option<TimerId> {
        self.size = Self::effective(document, window);
        self.debounce.take()
    }

    pub fn arm(&mut self, id: TimerId) {
        self.debounce = Some(id);
    }

    /// Claim a fired debounce timer. `false` means it was superseded.
    pub fn take_debounce(&mut self, id: TimerId) -> bool {
        if self.debounce == Some(id) {
            self.debounce = None;
            true
        } else {
            false
        }
    }

    pub fn debounce_pending(&self) -> bool {
        self.debounce.is_some()
    }
}

/// Last known pointer position.
#[derive(Debug, Default)]
pub struct PointerTracker {
    last: Option<Vec2>,
}

impl PointerTracker {
    /// Reported before any pointer has been seen; far outside any repulsion radius.
    pub const FAR_AWAY: Vec2 = Vec2::new(-1.0e9, -1.0e9);

    pub fn observe(&mut self, pos: Vec2) {
        self.last = Some(pos);
    }

    pub fn position(&self) -> Vec2 {
        self.last.unwrap_or(Self::FAR_AWAY)
    }
}

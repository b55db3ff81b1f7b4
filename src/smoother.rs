use egui::Pos2;

use crate::path::SmoothedPath;

/// Minimum per-axis displacement, in surface units, before a new segment is emitted
pub const MOVE_THRESHOLD: f32 = 4.0;

#[derive(Debug, Clone, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Active {
        /// Last sample that produced a segment
        last: Pos2,
        path: SmoothedPath,
    },
}

impl GestureState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Active { .. } => "Active",
        }
    }
}

/// Turns raw pointer samples of one gesture into a rolling midpoint-smoothed path
#[derive(Debug, Default)]
pub struct StrokeSmoother {
    state: GestureState,
}

impl StrokeSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, GestureState::Active { .. })
    }

    /// Starts a new path at `p`. Any in-progress path is discarded.
    pub fn begin(&mut self, p: Pos2) {
        let mut path = SmoothedPath::new();
        path.move_to(p);
        self.state = GestureState::Active { last: p, path };
    }

    /// Feeds a sample. Returns true when a segment was emitted.
    pub fn extend(&mut self, p: Pos2) -> bool {
        let GestureState::Active { last, path } = &mut self.state else {
            return false;
        };

        let dx = (p.x - last.x).abs();
        let dy = (p.y - last.y).abs();
        if dx.max(dy) < MOVE_THRESHOLD {
            return false;
        }

        // Control point is the previous raw sample, endpoint the midpoint
        let mid = Pos2::new((p.x + last.x) / 2.0, (p.y + last.y) / 2.0);
        path.quad_to(*last, mid);
        *last = p;
        true
    }

    /// Closes the path at the last committed sample and hands it over
    pub fn finish(&mut self) -> Option<SmoothedPath> {
        match std::mem::take(&mut self.state) {
            GestureState::Active { last, mut path } => {
                path.line_to(last);
                Some(path)
            }
            GestureState::Idle => None,
        }
    }

    /// Drops the in-progress path without producing anything
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }

    /// In-progress path for live rendering
    pub fn current_path(&self) -> Option<&SmoothedPath> {
        match &self.state {
            GestureState::Active { path, .. } => Some(path),
            GestureState::Idle => None,
        }
    }
}

//! Area layout
//!
//! Areas are placed into a fixed five-slot template rather than packed:
//!
//! ```text
//!              [   crown   ]
//!   ------------- strip -------------
//!   [ row 2 left ]     [ row 2 right ]
//!   ------------- strip -------------
//!   [ row 1 left ]     [ row 1 right ]
//! ---------------- y = 0 ----------------
//! ```
//!
//! Left/right areas sit `gap` either side of the centerline. Rows stack towards +y,
//! each separated from the tallest area below by `gap + strip_height`. Areas beyond
//! the fifth slot are left where they are.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::state::AreaId;
use crate::error::AtlasError;

/// Number of slots in the layout template
pub const LAYOUT_SLOTS: usize = 5;

/// Template slot, in fill order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutSlot {
    FirstRowLeft,
    FirstRowRight,
    SecondRowLeft,
    SecondRowRight,
    Crown,
}

impl LayoutSlot {
    pub const ALL: [LayoutSlot; LAYOUT_SLOTS] = [
        LayoutSlot::FirstRowLeft,
        LayoutSlot::FirstRowRight,
        LayoutSlot::SecondRowLeft,
        LayoutSlot::SecondRowRight,
        LayoutSlot::Crown,
    ];

    pub fn for_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Neutral region separating two rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StripRegion {
    pub center: Vec2,
    pub size: Vec2,
}

/// Output of [`compose`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutPlan {
    /// World-space bounds center per area; `None` for areas past the template
    pub anchors: Vec<Option<Vec2>>,
    pub strips: Vec<StripRegion>,
    pub unplaced: usize,
}

/// Place areas of the given extents (width, height) into the template
pub fn compose(extents: &[Vec2], gap: f32, strip_height: f32) -> LayoutPlan {
    let mut plan = LayoutPlan {
        anchors: vec![None; extents.len()],
        ..Default::default()
    };

    if extents.len() > LAYOUT_SLOTS {
        plan.unplaced = extents.len() - LAYOUT_SLOTS;
        log::warn!(
            "{}",
            AtlasError::TopologyMismatch {
                areas: extents.len(),
                slots: LAYOUT_SLOTS,
                unplaced: plan.unplaced,
            }
        );
    }

    let tallest = |areas: &[Vec2]| areas.iter().map(|e| e.y).fold(0.0_f32, f32::max);
    let row_width = |areas: &[Vec2]| areas.iter().map(|e| e.x + gap).sum::<f32>();

    let first_row = row(extents, 0, 2);
    let second_row = row(extents, 2, 4);
    let crown = row(extents, 4, 5);

    // Bottom edge of each row
    let first_base = 0.0;
    let second_base = first_base + tallest(first_row) + gap + strip_height;
    let crown_base = second_base + tallest(second_row) + gap + strip_height;

    for (index, extent) in extents.iter().enumerate().take(LAYOUT_SLOTS) {
        let half = *extent * 0.5;
        let Some(slot) = LayoutSlot::for_index(index) else {
            break;
        };
        let anchor = match slot {
            LayoutSlot::FirstRowLeft => Vec2::new(-(gap + half.x), first_base + half.y),
            LayoutSlot::FirstRowRight => Vec2::new(gap + half.x, first_base + half.y),
            LayoutSlot::SecondRowLeft => Vec2::new(-(gap + half.x), second_base + half.y),
            LayoutSlot::SecondRowRight => Vec2::new(gap + half.x, second_base + half.y),
            LayoutSlot::Crown => Vec2::new(0.0, crown_base + half.y),
        };
        plan.anchors[index] = Some(anchor);
    }

    // One strip per row boundary, centred in the space between the rows
    let mut push_strip = |below_top: f32, above_base: f32, width: f32| {
        plan.strips.push(StripRegion {
            center: Vec2::new(0.0, (below_top + above_base) * 0.5),
            size: Vec2::new(width, strip_height),
        });
    };
    if !second_row.is_empty() {
        let width = row_width(first_row).max(row_width(second_row));
        push_strip(first_base + tallest(first_row), second_base, width);
    }
    if !crown.is_empty() {
        let width = row_width(second_row).max(crown[0].x);
        push_strip(second_base + tallest(second_row), crown_base, width);
    }

    plan
}

/// Slots `start..end` of the template that actually have an area
fn row(extents: &[Vec2], start: usize, end: usize) -> &[Vec2] {
    let end = end.min(extents.len());
    &extents[start.min(end)..end]
}

/// How a call to [`LayoutAnimation::advance`] left the animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStatus {
    Running,
    /// Every track reached its anchor during this call. Reported once.
    Finished,
    /// Finished on an earlier call
    Idle,
}

/// One area moving from its staging offset to its laid-out offset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutTrack {
    pub area: AreaId,
    pub from: Vec2,
    pub to: Vec2,
    pub duration: f32,
    pub elapsed: f32,
}

impl LayoutTrack {
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn position(&self) -> Vec2 {
        if self.is_done() {
            self.to
        } else {
            self.from.lerp(self.to, self.progress())
        }
    }

    pub fn is_done(&self) -> bool {
        self.progress() >= 1.0
    }
}

/// Linear per-area layout animation with a single completion signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutAnimation {
    pub tracks: Vec<LayoutTrack>,
    signalled: bool,
}

impl LayoutAnimation {
    /// Build tracks with durations drawn from `duration_range` (min, max).
    /// An inverted range is swapped; negative or NaN bounds clamp to zero.
    pub fn new(moves: Vec<(AreaId, Vec2, Vec2)>, rng: &mut Pcg32, duration_range: (f32, f32)) -> Self {
        let (a, b) = duration_range;
        let lo = a.min(b).max(0.0);
        let hi = a.max(b).max(lo);
        let tracks = moves
            .into_iter()
            .map(|(area, from, to)| LayoutTrack {
                area,
                from,
                to,
                duration: rng.random_range(lo..=hi),
                elapsed: 0.0,
            })
            .collect();
        Self {
            tracks,
            signalled: false,
        }
    }

    /// Advance every track by `dt`
    pub fn advance(&mut self, dt: f32) -> LayoutStatus {
        if self.signalled {
            return LayoutStatus::Idle;
        }
        for track in &mut self.tracks {
            track.elapsed = (track.elapsed + dt).min(track.duration.max(0.0));
        }
        self.status()
    }

    /// Snap every track to its anchor
    pub fn finish_now(&mut self) -> LayoutStatus {
        if self.signalled {
            return LayoutStatus::Idle;
        }
        for track in &mut self.tracks {
            track.elapsed = track.duration;
        }
        self.status()
    }

    pub fn is_finished(&self) -> bool {
        self.signalled
    }

    fn status(&mut self) -> LayoutStatus {
        if self.tracks.iter().all(LayoutTrack::is_done) {
            self.signalled = true;
            LayoutStatus::Finished
        } else {
            LayoutStatus::Running
        }
    }
}

//! Section Atlas - procedural section graphs for map exploration
//!
//! Core modules:
//! - `atlas`: Deterministic generation (point fields, area layout, link graph)
//!   and runtime reachability
//! - `settings`: Data-driven generation constants
//! - `error`: Error taxonomy shared by every stage

pub mod atlas;
pub mod error;
pub mod settings;

pub use error::{AtlasError, Result};
pub use settings::WorldConfig;

use glam::Vec2;

/// Default generation constants
pub mod consts {
    /// Minimum spacing between normal sections
    pub const MIN_DISTANCE: f32 = 10.0;
    /// Maximum spacing from a new section to its nearest placed neighbor
    pub const MAX_DISTANCE: f32 = 12.0;
    /// Maximum distance from the area's generation center
    pub const MAX_RADIUS: f32 = 30.0;

    /// Hub spacing - hubs sit further out than detection can reach
    pub const HUB_MIN_DISTANCE: f32 = 18.0;
    pub const HUB_MAX_DISTANCE: f32 = 24.0;

    /// Attempts per point before the exhaustion policy kicks in
    pub const ATTEMPT_GUARD: u32 = 500;
    /// Upper bound on relaxation passes for the dense policy
    pub const MAX_RELAX_PASSES: u32 = 40;
    /// Fraction of min distance kept after each relaxation pass
    pub const RELAX_FACTOR: f32 = 0.9;

    /// Horizontal gap between neighbouring areas (and between rows)
    pub const LAYOUT_GAP: f32 = 5.0;
    /// Height of the neutral strip separating area rows
    pub const STRIP_HEIGHT: f32 = 6.0;
    /// Margin added around generated points to form the area bounding box
    pub const AREA_PADDING: f32 = 2.0;
    /// Spacing between areas along X before layout moves them
    pub const STAGING_STRIDE: f32 = 100.0;

    /// Layout animation duration range (time units)
    pub const LAYOUT_DURATION_MIN: f32 = 0.5;
    pub const LAYOUT_DURATION_MAX: f32 = 1.2;

    /// Player detection radius (matches MAX_DISTANCE so generated neighbors are reachable)
    pub const DETECTION_RADIUS: f32 = 12.0;
    /// Footprint of a section for the circular overlap test
    pub const SECTION_RADIUS: f32 = 0.0;
    /// Proxy inset from the edge of the detection radius
    pub const PROXY_EPSILON: f32 = 0.5;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Whether two circles overlap (touching counts)
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    a.distance_squared(b) <= (ra + rb) * (ra + rb)
}

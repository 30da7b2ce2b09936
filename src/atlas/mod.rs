//! Section graph generation and navigation
//!
//! Generation is deterministic: every random draw comes from a PCG stream seeded
//! from the world seed, and every pass iterates in id order.
//! - `points`: per-area point fields
//! - `layout`: area placement and the layout animation
//! - `graph`: explicit links where detection does not reach
//! - `reach`: per-move reachability and proxies
//! - `world`: ties the stages together

pub mod graph;
pub mod layout;
pub mod points;
pub mod reach;
pub mod seed;
pub mod state;
pub mod visuals;
pub mod world;

pub use graph::{GraphReport, SectionGraphBuilder};
pub use layout::{LayoutAnimation, LayoutPlan, LayoutSlot, LayoutStatus, StripRegion};
pub use points::{CancelToken, ExhaustionPolicy, FieldOutcome, PointField, PointFieldParams};
pub use reach::{ProxyChanges, ProxySet, detect_sections, move_to};
pub use seed::area_seed;
pub use state::{
    Area, AreaId, Bounds, EventKind, Link, PlayerAgent, ProxyId, ProxyNode, SectionAppearance, SectionFlags,
    SectionId, SectionKind, SectionNode, SectionRegistry,
};
pub use visuals::{HeadlessVisuals, SectionVisuals, VisualHandle, VisualKind};
pub use world::{AreaDescriptor, GeneratedArea, SectionSpec, World, WorldEvent, generate_area};

//! Sections, areas, links and the registry that owns them
//!
//! Every cross reference (link endpoints, proxy targets, area membership) is an id
//! into [`SectionRegistry`], which is the single owner of section state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::visuals::VisualHandle;
use crate::error::{AtlasError, Result};

/// Index of a section in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(pub u32);

impl SectionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of an area in generation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AreaId(pub u32);

impl AreaId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Section category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SectionKind {
    #[default]
    Normal,
    /// Higher-importance node, bridged to its nearest neighbor
    Hub,
    /// Area entry point, always placed at the generation start point
    Origin,
}

/// What happens when the player arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventKind {
    #[default]
    Empty,
    Battle,
    Elite,
    Treasure,
    Rest,
    Shop,
    Story,
    Boss,
}

/// Per-section state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionFlags {
    /// Monotonic: set on arrival, never cleared
    pub visited: bool,
    pub cleared: bool,
    pub player_on: bool,
    /// Inside the player's detection circle (no link needed)
    pub in_range: bool,
    /// `in_range` or linked from the player's section; recomputed on every detection pass
    pub can_move: bool,
}

/// One direction of an explicit edge; always stored in mirrored pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub owner: SectionId,
    pub target: SectionId,
}

/// A navigable point of interest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionNode {
    pub id: SectionId,
    pub area: AreaId,
    pub label: String,
    pub kind: SectionKind,
    pub event: EventKind,
    /// Position in the area's local space
    pub local: Vec2,
    /// Position in world space (area offset + local)
    pub pos: Vec2,
    pub flags: SectionFlags,
    pub links: Vec<Link>,
    #[serde(skip)]
    pub visual: Option<VisualHandle>,
}

impl SectionNode {
    /// Whether this node already carries a link to `other`
    pub fn links_to(&self, other: SectionId) -> bool {
        self.links.iter().any(|l| l.target == other)
    }

    pub fn appearance(&self) -> SectionAppearance {
        SectionAppearance {
            kind: self.kind,
            event: self.event,
            flags: self.flags,
        }
    }
}

/// Everything a visual needs to draw a section (mirrored by proxies)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionAppearance {
    pub kind: SectionKind,
    pub event: EventKind,
    pub flags: SectionFlags,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Bounds of a point set grown by `padding` on every side
    pub fn around(points: impl IntoIterator<Item = Vec2>, padding: f32) -> Self {
        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        let mut any = false;
        for p in points {
            min = min.min(p);
            max = max.max(p);
            any = true;
        }
        if !any {
            min = Vec2::ZERO;
            max = Vec2::ZERO;
        }
        Self {
            min: min - Vec2::splat(padding),
            max: max + Vec2::splat(padding),
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Strict overlap; boxes that only share an edge do not overlap
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// A region holding an independently generated cluster of sections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub name: String,
    /// Bounding box in local space
    pub bounds: Bounds,
    /// Translation from local to world space
    pub offset: Vec2,
    /// World position of the bounds center once laid out (None = unplaced)
    pub anchor: Option<Vec2>,
    pub sections: Vec<SectionId>,
}

impl Area {
    pub fn world_bounds(&self) -> Bounds {
        self.bounds.translated(self.offset)
    }

    /// Offset that puts the bounds center on `anchor`
    pub fn offset_for_anchor(&self, anchor: Vec2) -> Vec2 {
        anchor - self.bounds.center()
    }
}

/// Index of a live proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProxyId(pub u32);

/// Temporary stand-in for an out-of-range linked target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyNode {
    pub id: ProxyId,
    /// Node the player occupies
    pub owner: SectionId,
    /// Real node this proxy stands in for
    pub target: SectionId,
    pub pos: Vec2,
    pub mirror: SectionAppearance,
    #[serde(skip)]
    pub visual: Option<VisualHandle>,
}

/// The player's position in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerAgent {
    pub current: Option<SectionId>,
    pub previous: Option<SectionId>,
    pub detection_radius: f32,
}

impl PlayerAgent {
    pub fn new(detection_radius: f32) -> Self {
        Self {
            current: None,
            previous: None,
            detection_radius,
        }
    }
}

/// Arena owning every section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionRegistry {
    nodes: Vec<SectionNode>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section; its id is its index
    pub fn insert(
        &mut self,
        area: AreaId,
        label: impl Into<String>,
        kind: SectionKind,
        event: EventKind,
        local: Vec2,
    ) -> SectionId {
        let id = SectionId(self.nodes.len() as u32);
        self.nodes.push(SectionNode {
            id,
            area,
            label: label.into(),
            kind,
            event,
            local,
            pos: local,
            flags: SectionFlags::default(),
            links: Vec::new(),
            visual: None,
        });
        id
    }

    #[inline]
    pub fn get(&self, id: SectionId) -> Option<&SectionNode> {
        self.nodes.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: SectionId) -> Option<&mut SectionNode> {
        self.nodes.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionNode> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SectionNode> {
        self.nodes.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn are_linked(&self, a: SectionId, b: SectionId) -> bool {
        self.get(a).is_some_and(|n| n.links_to(b))
    }

    /// Attach a mirrored link pair to both endpoints
    pub fn link(&mut self, a: SectionId, b: SectionId) -> Result<()> {
        if a == b {
            return Err(AtlasError::LinkConflict {
                from: a,
                to: b,
                reason: "self link",
            });
        }
        if self.get(a).is_none() {
            return Err(AtlasError::MissingComponent(a, "section"));
        }
        if self.get(b).is_none() {
            return Err(AtlasError::MissingComponent(b, "section"));
        }
        if self.are_linked(a, b) || self.are_linked(b, a) {
            return Err(AtlasError::LinkConflict {
                from: a,
                to: b,
                reason: "already linked",
            });
        }
        self.nodes[a.index()].links.push(Link { owner: a, target: b });
        self.nodes[b.index()].links.push(Link { owner: b, target: a });
        Ok(())
    }
}

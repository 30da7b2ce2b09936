//! Explicit link construction
//!
//! Detection already connects anything within `max_distance` of the player, so links
//! are only added where that is not enough:
//! - between the closest pair of sections of two bridged areas
//! - from each hub to its nearest neighbor in its own area
//!
//! Ties keep the first candidate in registry order (lowest id).

use serde::{Deserialize, Serialize};

use super::state::{Area, AreaId, SectionId, SectionKind, SectionRegistry};
use crate::error::{AtlasError, Result};

/// Area groups bridged for the fixed layout template, by slot index
const TEMPLATE_BRIDGES: [[u32; 2]; 6] = [[0, 1], [2, 3], [0, 2], [1, 3], [2, 4], [3, 4]];

/// Links added by a build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphReport {
    pub bridges: Vec<(SectionId, SectionId)>,
    pub hub_links: Vec<(SectionId, SectionId)>,
    /// Candidate edges dropped as self links or duplicates
    pub rejected: usize,
}

impl GraphReport {
    pub fn link_count(&self) -> usize {
        self.bridges.len() + self.hub_links.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeSource {
    Bridge,
    Hub,
}

/// Collects candidate edges, dedups them, then commits them as mirrored links
#[derive(Debug)]
pub struct SectionGraphBuilder {
    max_distance: f32,
    queued: Vec<(SectionId, SectionId, EdgeSource)>,
    rejected: usize,
}

impl SectionGraphBuilder {
    pub fn new(max_distance: f32) -> Self {
        Self {
            max_distance,
            queued: Vec::new(),
            rejected: 0,
        }
    }

    /// Queue a link between the closest sections of every pair of areas in `group`
    pub fn bridge_group(&mut self, registry: &SectionRegistry, areas: &[Area], group: &[AreaId]) {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                let (Some(area_a), Some(area_b)) = (areas.get(a.index()), areas.get(b.index())) else {
                    log::warn!("Bridge group references missing area {:?}/{:?}", a, b);
                    continue;
                };
                let Some((from, to, dist)) = closest_pair(registry, &area_a.sections, &area_b.sections)
                else {
                    continue;
                };
                if dist > self.max_distance {
                    self.enqueue_from(registry, from, to, EdgeSource::Bridge);
                } else {
                    log::debug!("{} and {} already touch ({:.2})", area_a.name, area_b.name, dist);
                }
            }
        }
    }

    /// Queue a link from every hub in `area` to its nearest neighbor, if out of reach
    pub fn bridge_hubs(&mut self, registry: &SectionRegistry, area: &Area) {
        for &hub in &area.sections {
            let is_hub = registry.get(hub).is_some_and(|n| n.kind == SectionKind::Hub);
            if !is_hub {
                continue;
            }
            if let Some((nearest, dist)) = nearest_neighbor(registry, hub, &area.sections) {
                if dist > self.max_distance {
                    self.enqueue_from(registry, hub, nearest, EdgeSource::Hub);
                }
            }
        }
    }

    /// Queue an edge unless it is a self edge, already queued, or already linked
    pub fn enqueue(&mut self, registry: &SectionRegistry, a: SectionId, b: SectionId) -> bool {
        self.enqueue_from(registry, a, b, EdgeSource::Bridge)
    }

    fn enqueue_from(
        &mut self,
        registry: &SectionRegistry,
        a: SectionId,
        b: SectionId,
        source: EdgeSource,
    ) -> bool {
        match self.check(registry, a, b) {
            Ok(()) => {
                self.queued.push((a, b, source));
                true
            }
            Err(err) => {
                log::warn!("{err}");
                self.rejected += 1;
                false
            }
        }
    }

    fn check(&self, registry: &SectionRegistry, a: SectionId, b: SectionId) -> Result<()> {
        let conflict = |reason: &'static str| AtlasError::LinkConflict { from: a, to: b, reason };
        if a == b {
            return Err(conflict("self link"));
        }
        if self
            .queued
            .iter()
            .any(|&(x, y, _)| (x == a && y == b) || (x == b && y == a))
        {
            return Err(conflict("already queued"));
        }
        if registry.are_linked(a, b) || registry.are_linked(b, a) {
            return Err(conflict("already linked"));
        }
        Ok(())
    }

    /// Attach every queued edge to both endpoints
    pub fn commit(self, registry: &mut SectionRegistry) -> GraphReport {
        let mut report = GraphReport {
            rejected: self.rejected,
            ..Default::default()
        };
        for (a, b, source) in self.queued {
            match registry.link(a, b) {
                Ok(()) => match source {
                    EdgeSource::Bridge => report.bridges.push((a, b)),
                    EdgeSource::Hub => report.hub_links.push((a, b)),
                },
                Err(err) => {
                    log::warn!("{err}");
                    report.rejected += 1;
                }
            }
        }
        report
    }
}

/// Closest pair across two section sets by exhaustive comparison
pub fn closest_pair(
    registry: &SectionRegistry,
    a: &[SectionId],
    b: &[SectionId],
) -> Option<(SectionId, SectionId, f32)> {
    let mut best: Option<(SectionId, SectionId, f32)> = None;
    for na in a.iter().filter_map(|&id| registry.get(id)) {
        for nb in b.iter().filter_map(|&id| registry.get(id)) {
            let dist = na.pos.distance(nb.pos);
            if best.is_none_or(|(_, _, d)| dist < d) {
                best = Some((na.id, nb.id, dist));
            }
        }
    }
    best
}

/// Nearest other section among `candidates`, skipping co-located duplicates
pub fn nearest_neighbor(
    registry: &SectionRegistry,
    of: SectionId,
    candidates: &[SectionId],
) -> Option<(SectionId, f32)> {
    let origin = registry.get(of)?.pos;
    let mut best: Option<(SectionId, f32)> = None;
    for node in candidates.iter().filter_map(|&id| registry.get(id)) {
        if node.id == of {
            continue;
        }
        let dist = origin.distance(node.pos);
        if dist <= 0.0 {
            continue;
        }
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((node.id, dist));
        }
    }
    best
}

/// Bridge groups for the layout template, restricted to areas that exist
pub fn template_bridges(area_count: usize) -> Vec<Vec<AreaId>> {
    TEMPLATE_BRIDGES
        .iter()
        .filter(|pair| pair.iter().all(|&i| (i as usize) < area_count))
        .map(|pair| pair.iter().map(|&i| AreaId(i)).collect())
        .collect()
}

/// Run both passes: cross-area bridges, then hub links
pub fn build(
    registry: &mut SectionRegistry,
    areas: &[Area],
    groups: &[Vec<AreaId>],
    max_distance: f32,
) -> GraphReport {
    let mut builder = SectionGraphBuilder::new(max_distance);
    for group in groups {
        builder.bridge_group(registry, areas, group);
    }
    for area in areas {
        builder.bridge_hubs(registry, area);
    }
    let report = builder.commit(registry);
    log::info!(
        "Graph built: {} bridges, {} hub links, {} rejected",
        report.bridges.len(),
        report.hub_links.len(),
        report.rejected
    );
    report
}

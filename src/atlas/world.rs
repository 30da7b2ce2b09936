//! World orchestration
//!
//! Owns the section registry and drives the stages in order:
//! per-area generation (independent, optionally threaded) -> layout animation ->
//! graph build (once, on the layout-finished signal) -> reachability on every move.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::graph::{self, GraphReport};
use super::layout::{self, LayoutAnimation, LayoutPlan, LayoutStatus, StripRegion};
use super::points::{CancelToken, ExhaustionPolicy, FieldOutcome, PointFieldParams, generate_around};
use super::reach::{self, ProxySet};
use super::seed::{area_seed, rng_for};
use super::state::{
    Area, AreaId, Bounds, EventKind, PlayerAgent, ProxyId, ProxyNode, SectionId, SectionKind, SectionNode,
    SectionRegistry,
};
use super::visuals::{HeadlessVisuals, SectionVisuals, VisualHandle, VisualKind};
use crate::error::AtlasError;
use crate::settings::WorldConfig;

/// One section as described by content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub label: String,
    #[serde(default)]
    pub kind: SectionKind,
    #[serde(default)]
    pub event: EventKind,
    /// Fixed local position; `Vec2::ZERO` means auto-place
    #[serde(default)]
    pub fixed: Vec2,
}

impl SectionSpec {
    pub fn new(label: impl Into<String>, kind: SectionKind, event: EventKind) -> Self {
        Self {
            label: label.into(),
            kind,
            event,
            fixed: Vec2::ZERO,
        }
    }

    pub fn at(mut self, fixed: Vec2) -> Self {
        self.fixed = fixed;
        self
    }

    fn is_auto(&self) -> bool {
        self.fixed == Vec2::ZERO
    }
}

/// One area as described by content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDescriptor {
    pub name: String,
    pub sections: Vec<SectionSpec>,
}

/// Local placements for one area, before it joins the registry
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedArea {
    pub name: String,
    /// (index into the descriptor's sections, local position)
    pub placements: Vec<(usize, Vec2)>,
    pub complete: bool,
}

/// Place one area's sections in local space.
///
/// Pure function of (config, descriptor); safe to run for several areas at once.
pub fn generate_area(
    config: &WorldConfig,
    descriptor: &AreaDescriptor,
    cancel: &CancelToken,
) -> GeneratedArea {
    let seed = area_seed(config.seed, &descriptor.name);
    let mut rng = rng_for(seed);
    let specs = &descriptor.sections;
    let mut placements: Vec<(usize, Vec2)> = Vec::with_capacity(specs.len());
    let mut complete = true;

    // Start point: the origin section, else the first auto-placed one
    let start = specs
        .iter()
        .position(|s| s.kind == SectionKind::Origin)
        .or_else(|| specs.iter().position(SectionSpec::is_auto));
    if let Some(i) = start {
        placements.push((i, specs[i].fixed));
    }
    for (i, spec) in specs.iter().enumerate() {
        if Some(i) != start && !spec.is_auto() {
            placements.push((i, spec.fixed));
        }
    }

    let pending = |kind: SectionKind| -> Vec<usize> {
        specs
            .iter()
            .enumerate()
            .filter(|&(i, s)| Some(i) != start && s.is_auto() && s.kind == kind)
            .map(|(i, _)| i)
            .collect()
    };
    let hubs = pending(SectionKind::Hub);
    let mut normals = pending(SectionKind::Normal);
    // Extra origins are placed like normal sections
    normals.extend(pending(SectionKind::Origin));
    normals.sort_unstable();

    let passes = [
        (
            hubs,
            config.hub_min_distance,
            config.hub_max_distance,
            ExhaustionPolicy::Abort,
        ),
        (normals, config.min_distance, config.max_distance, ExhaustionPolicy::Relax),
    ];

    for (indices, min_distance, max_distance, policy) in passes {
        if indices.is_empty() {
            continue;
        }
        let anchors: Vec<Vec2> = placements.iter().map(|&(_, p)| p).collect();
        let params = PointFieldParams {
            count: anchors.len() + indices.len(),
            min_distance,
            max_distance,
            max_radius: config.max_radius,
            center: Vec2::ZERO,
            attempt_guard: config.attempt_guard,
            max_relax_passes: config.max_relax_passes,
            policy,
        };
        let field = generate_around(&params, &mut rng, &anchors, cancel, &mut |_, _| {});
        if field.outcome != FieldOutcome::Complete {
            complete = false;
            log::warn!(
                "{}",
                AtlasError::GenerationExhausted {
                    area: descriptor.name.clone(),
                    placed: field.points.len(),
                    requested: indices.len(),
                }
            );
        }
        if field.relaxed {
            log::info!(
                "{}: min distance relaxed to {:.3}",
                descriptor.name,
                field.min_distance
            );
        }
        placements.extend(indices.into_iter().zip(field.points));
    }

    placements.sort_by_key(|&(i, _)| i);
    GeneratedArea {
        name: descriptor.name.clone(),
        placements,
        complete,
    }
}

/// Signals for presentation and gameplay collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    SectionPlaced { id: SectionId, pos: Vec2 },
    LayoutFinished,
    StripSpawned(StripRegion),
    LinkAdded(SectionId, SectionId),
    ProxySpawned { proxy: ProxyId, target: SectionId, pos: Vec2 },
    ProxyDespawned { proxy: ProxyId, target: SectionId },
    PlayerMoved { from: Option<SectionId>, to: SectionId },
}

/// Generated world plus runtime navigation state
pub struct World<V: SectionVisuals = HeadlessVisuals> {
    config: WorldConfig,
    registry: SectionRegistry,
    areas: Vec<Area>,
    player: PlayerAgent,
    proxies: ProxySet,
    plan: LayoutPlan,
    layout: LayoutAnimation,
    strips: Vec<(StripRegion, Option<VisualHandle>)>,
    graph: Option<GraphReport>,
    events: Vec<WorldEvent>,
    visuals: V,
}

impl<V: SectionVisuals> World<V> {
    /// Generate every area and start the layout animation
    pub fn generate(config: WorldConfig, descriptors: &[AreaDescriptor], visuals: V) -> Self {
        Self::generate_with_cancel(config, descriptors, visuals, &CancelToken::new())
    }

    pub fn generate_with_cancel(
        config: WorldConfig,
        descriptors: &[AreaDescriptor],
        visuals: V,
        cancel: &CancelToken,
    ) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                log::error!("{err}; using default settings");
                WorldConfig {
                    seed: config.seed,
                    bridges: config.bridges,
                    parallel_generation: config.parallel_generation,
                    ..Default::default()
                }
            }
        };
        log::info!(
            "Generating {} areas with seed {}",
            descriptors.len(),
            config.seed
        );

        // Every area must finish before layout starts
        let generated: Vec<GeneratedArea> = if config.parallel_generation {
            let config = &config;
            std::thread::scope(|scope| {
                let handles: Vec<_> = descriptors
                    .iter()
                    .map(|d| scope.spawn(move || generate_area(config, d, cancel)))
                    .collect();
                handles
                    .into_iter()
                    .zip(descriptors)
                    .map(|(handle, d)| {
                        handle.join().unwrap_or_else(|_| {
                            log::error!("Generation thread for {} panicked", d.name);
                            GeneratedArea {
                                name: d.name.clone(),
                                placements: Vec::new(),
                                complete: false,
                            }
                        })
                    })
                    .collect()
            })
        } else {
            descriptors
                .iter()
                .map(|d| generate_area(&config, d, cancel))
                .collect()
        };

        let mut world = Self {
            player: PlayerAgent::new(config.detection_radius),
            registry: SectionRegistry::new(),
            areas: Vec::with_capacity(generated.len()),
            proxies: ProxySet::new(),
            plan: LayoutPlan::default(),
            layout: LayoutAnimation::new(Vec::new(), &mut Pcg32::seed_from_u64(0), (0.0, 0.0)),
            strips: Vec::new(),
            graph: None,
            events: Vec::new(),
            visuals,
            config,
        };

        for (index, (area, descriptor)) in generated.into_iter().zip(descriptors).enumerate() {
            world.insert_area(index, area, descriptor);
        }
        world.start_layout();
        world
    }

    fn insert_area(&mut self, index: usize, generated: GeneratedArea, descriptor: &AreaDescriptor) {
        let id = AreaId(index as u32);
        let offset = Vec2::new(index as f32 * self.config.staging_stride, 0.0);
        let bounds = Bounds::around(generated.placements.iter().map(|&(_, p)| p), self.config.area_padding);

        let dropped = descriptor.sections.len() - generated.placements.len();
        if dropped > 0 {
            log::warn!("{}: {} sections could not be placed", descriptor.name, dropped);
        }

        let mut sections = Vec::with_capacity(generated.placements.len());
        for (spec_index, local) in generated.placements {
            let spec = &descriptor.sections[spec_index];
            let section = self
                .registry
                .insert(id, spec.label.clone(), spec.kind, spec.event, local);
            if let Some(node) = self.registry.get_mut(section) {
                node.pos = offset + local;
                node.visual = self
                    .visuals
                    .spawn(VisualKind::Section(section, node.appearance()), node.pos);
                if node.visual.is_none() {
                    log::error!("{}", AtlasError::MissingComponent(section, "visual"));
                }
                self.events.push(WorldEvent::SectionPlaced {
                    id: section,
                    pos: node.pos,
                });
            }
            sections.push(section);
        }

        log::info!(
            "Area {} ({}): {} sections, {:.1}x{:.1}",
            index,
            generated.name,
            sections.len(),
            bounds.width(),
            bounds.height()
        );
        self.areas.push(Area {
            id,
            name: generated.name,
            bounds,
            offset,
            anchor: None,
            sections,
        });
    }

    fn start_layout(&mut self) {
        let extents: Vec<Vec2> = self.areas.iter().map(|a| a.bounds.size()).collect();
        self.plan = layout::compose(&extents, self.config.gap, self.config.strip_height);

        let mut moves = Vec::new();
        for (area, anchor) in self.areas.iter_mut().zip(&self.plan.anchors) {
            if let Some(anchor) = *anchor {
                area.anchor = Some(anchor);
                moves.push((area.id, area.offset, area.offset_for_anchor(anchor)));
            }
        }

        let mut rng = Pcg32::seed_from_u64(self.config.seed as u64);
        self.layout = LayoutAnimation::new(
            moves,
            &mut rng,
            (self.config.layout_duration_min, self.config.layout_duration_max),
        );
    }

    /// Advance the layout animation. Builds the graph when the layout finishes.
    pub fn advance(&mut self, dt: f32) -> LayoutStatus {
        let status = self.layout.advance(dt);
        self.on_layout_step(status);
        status
    }

    /// Skip the rest of the layout animation
    pub fn finish_layout(&mut self) -> LayoutStatus {
        let status = self.layout.finish_now();
        self.on_layout_step(status);
        status
    }

    fn on_layout_step(&mut self, status: LayoutStatus) {
        if status == LayoutStatus::Idle {
            return;
        }
        for track in &self.layout.tracks {
            let offset = track.position();
            let Some(area) = self.areas.get_mut(track.area.index()) else {
                continue;
            };
            area.offset = offset;
            for &id in &area.sections {
                if let Some(node) = self.registry.get_mut(id) {
                    node.pos = offset + node.local;
                    if let Some(handle) = node.visual {
                        self.visuals.relocate(handle, node.pos);
                    }
                }
            }
        }
        if status == LayoutStatus::Finished {
            self.on_layout_finished();
        }
    }

    fn on_layout_finished(&mut self) {
        log::info!("Layout finished");
        self.events.push(WorldEvent::LayoutFinished);

        for strip in self.plan.strips.clone() {
            let handle = self
                .visuals
                .spawn(VisualKind::Strip { size: strip.size }, strip.center);
            self.strips.push((strip, handle));
            self.events.push(WorldEvent::StripSpawned(strip));
        }

        let groups = self.bridge_groups();
        let report = graph::build(&mut self.registry, &self.areas, &groups, self.config.max_distance);
        for &(a, b) in report.bridges.iter().chain(&report.hub_links) {
            self.events.push(WorldEvent::LinkAdded(a, b));
        }
        self.graph = Some(report);

        match self.start_section() {
            Some(start) => {
                let radius = self.config.section_radius;
                match reach::place_player(&mut self.registry, &mut self.player, start, radius) {
                    Ok(()) => self.events.push(WorldEvent::PlayerMoved { from: None, to: start }),
                    Err(err) => log::error!("Could not place player: {err}"),
                }
            }
            None => log::warn!("No section to start the player on"),
        }
        self.after_move();
    }

    fn bridge_groups(&self) -> Vec<Vec<AreaId>> {
        if self.config.bridges.is_empty() {
            return graph::template_bridges(self.areas.len());
        }
        self.config
            .bridges
            .iter()
            .filter_map(|names| {
                let ids: Option<Vec<AreaId>> = names
                    .iter()
                    .map(|name| self.areas.iter().find(|a| &a.name == name).map(|a| a.id))
                    .collect();
                if ids.is_none() {
                    log::warn!("Bridge {:?} names an unknown area, skipped", names);
                }
                ids
            })
            .collect()
    }

    /// Origin of the first area, else the first section of the first non-empty area
    fn start_section(&self) -> Option<SectionId> {
        let first = self.areas.iter().find(|a| !a.sections.is_empty())?;
        first
            .sections
            .iter()
            .copied()
            .find(|&id| self.registry.get(id).is_some_and(|n| n.kind == SectionKind::Origin))
            .or_else(|| first.sections.first().copied())
    }

    /// Request a move from the input layer. Rejected requests are no-ops.
    pub fn request_move(&mut self, target: SectionId) -> bool {
        if !self.is_ready() {
            log::debug!("Move to {:?} ignored: layout still running", target);
            return false;
        }
        let from = self.player.current;
        match reach::move_to(&mut self.registry, &mut self.player, target, self.config.section_radius) {
            Ok(()) => {
                self.events.push(WorldEvent::PlayerMoved { from, to: target });
                self.after_move();
                true
            }
            Err(AtlasError::InvalidMove(id)) => {
                log::debug!("Move to {:?} ignored: not reachable", id);
                false
            }
            Err(err) => {
                log::error!("{err}");
                false
            }
        }
    }

    /// Clicking a proxy is a move to its target
    pub fn interact_proxy(&mut self, proxy: ProxyId) -> bool {
        match self.proxies.get(proxy).map(|p| p.target) {
            Some(target) => self.request_move(target),
            None => {
                log::debug!("Proxy {:?} no longer exists", proxy);
                false
            }
        }
    }

    /// Mark a section's event as resolved (battle won, chest opened, ...)
    pub fn mark_cleared(&mut self, id: SectionId) -> bool {
        let Some(node) = self.registry.get_mut(id) else {
            log::error!("{}", AtlasError::MissingComponent(id, "section"));
            return false;
        };
        node.flags.cleared = true;
        match node.visual {
            Some(handle) => self.visuals.update(handle, node.flags),
            None => log::error!("{}", AtlasError::MissingComponent(id, "visual")),
        }
        true
    }

    /// Sync proxies and push fresh flags to every visual
    fn after_move(&mut self) {
        let changes = self
            .proxies
            .sync(&self.registry, &self.player, self.config.proxy_epsilon);

        for proxy in changes.despawned {
            if let Some(handle) = proxy.visual {
                self.visuals.despawn(handle);
            }
            self.events.push(WorldEvent::ProxyDespawned {
                proxy: proxy.id,
                target: proxy.target,
            });
        }
        for id in changes.spawned {
            let Some(proxy) = self.proxies.get_mut(id) else {
                continue;
            };
            proxy.visual = self
                .visuals
                .spawn(VisualKind::Proxy(proxy.target, proxy.mirror), proxy.pos);
            self.events.push(WorldEvent::ProxySpawned {
                proxy: id,
                target: proxy.target,
                pos: proxy.pos,
            });
        }

        for node in self.registry.iter() {
            match node.visual {
                Some(handle) => self.visuals.update(handle, node.flags),
                None => log::error!("{}", AtlasError::MissingComponent(node.id, "visual")),
            }
        }
        for proxy in self.proxies.iter() {
            if let Some(handle) = proxy.visual {
                self.visuals.update(handle, proxy.mirror.flags);
            }
        }
    }

    /// Whether the layout has finished and the graph exists
    pub fn is_ready(&self) -> bool {
        self.graph.is_some()
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    pub fn section(&self, id: SectionId) -> Option<&SectionNode> {
        self.registry.get(id)
    }

    pub fn sections(&self) -> impl Iterator<Item = &SectionNode> {
        self.registry.iter()
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn area_of(&self, id: SectionId) -> Option<&Area> {
        let node = self.registry.get(id)?;
        self.areas.get(node.area.index())
    }

    pub fn player(&self) -> &PlayerAgent {
        &self.player
    }

    pub fn proxies(&self) -> impl Iterator<Item = &ProxyNode> {
        self.proxies.iter()
    }

    pub fn proxy_for(&self, owner: SectionId, target: SectionId) -> Option<&ProxyNode> {
        self.proxies.find(owner, target)
    }

    pub fn layout_plan(&self) -> &LayoutPlan {
        &self.plan
    }

    pub fn strips(&self) -> impl Iterator<Item = &StripRegion> {
        self.strips.iter().map(|(s, _)| s)
    }

    pub fn graph_report(&self) -> Option<&GraphReport> {
        self.graph.as_ref()
    }

    pub fn visuals(&self) -> &V {
        &self.visuals
    }

    pub fn visuals_mut(&mut self) -> &mut V {
        &mut self.visuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, normals: usize, hubs: usize) -> AreaDescriptor {
        let mut sections = vec![SectionSpec::new("gate", SectionKind::Origin, EventKind::Empty)];
        sections.extend(
        (0..hubs).map(|i| SectionSpec::new(format!("hub{i}"), SectionKind::Hub, EventKind::Rest)),
    );
        sections.extend(
            (0..normals).map(|i| SectionSpec::new(format!("n{i}"), SectionKind::Normal, EventKind::Battle)),
        );
        AreaDescriptor {
            name: name.into(),
            sections,
        }
    }

    #[test]
    fn test_generate_area_places_origin_at_start() {
        let config = WorldConfig::default();
        let area = generate_area(&config, &descriptor("Marsh", 6, 1), &CancelToken::new());
        assert_eq!(area.placements[0], (0, Vec2::ZERO));
        assert!(area.placements.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_generate_area_keeps_fixed_sections() {
        let config = WorldConfig::default();
        let mut desc = descriptor("Marsh", 3, 0);
        desc.sections
            .push(SectionSpec::new("shrine", SectionKind::Normal, EventKind::Story).at(Vec2::new(0.0, 11.0)));
        let area = generate_area(&config, &desc, &CancelToken::new());
        assert!(area.placements.contains(&(4, Vec2::new(0.0, 11.0))));
        for &(i, p) in &area.placements {
            if i != 4 && i != 0 {
                assert!(p.distance(Vec2::new(0.0, 11.0)) >= 1.0);
            }
        }
    }

    #[test]
    fn test_generate_area_is_deterministic() {
        let config = WorldConfig::default();
        let desc = descriptor("Dunes", 10, 2);
        let a = generate_area(&config, &desc, &CancelToken::new());
        let b = generate_area(&config, &desc, &CancelToken::new());
        assert_eq!(a, b);
    }

    #[test]
    fn test_moves_rejected_until_layout_finishes() {
        let areas = [descriptor("A", 4, 0), descriptor("B", 4, 0)];
        let mut world = World::generate(WorldConfig::default(), &areas, HeadlessVisuals::new());
        assert!(!world.is_ready());
        assert!(!world.request_move(SectionId(1)));
        assert_eq!(world.player().current, None);

        world.finish_layout();
        assert!(world.is_ready());
        let start = world.player().current.unwrap();
        assert_eq!(world.section(start).unwrap().kind, SectionKind::Origin);
        assert_eq!(world.area_of(start).unwrap().name, "A");
    }

    #[test]
    fn test_layout_finished_fires_once() {
        let areas = [descriptor("A", 3, 0), descriptor("B", 3, 0), descriptor("C", 3, 0)];
        let mut world = World::generate(WorldConfig::default(), &areas, HeadlessVisuals::new());
        let mut finished = 0;
        for _ in 0..100 {
            world.advance(0.05);
            finished += world
                .drain_events()
                .iter()
                .filter(|e| **e == WorldEvent::LayoutFinished)
                .count();
        }
        assert_eq!(finished, 1);
        for area in world.areas() {
            let anchor = area.anchor.unwrap();
            assert!((area.world_bounds().center() - anchor).length() < 1e-3);
        }
    }

    #[test]
    fn test_missing_visual_is_isolated() {
        let areas = [descriptor("A", 4, 0)];
        let visuals = HeadlessVisuals {
            refuse: vec![SectionId(2)],
            ..Default::default()
        };
        let mut world = World::generate(WorldConfig::default(), &areas, visuals);
        world.finish_layout();
        assert!(world.section(SectionId(2)).unwrap().visual.is_none());
        assert!(world.section(SectionId(1)).unwrap().visual.is_some());
        assert!(world.mark_cleared(SectionId(2)));
        assert!(world.section(SectionId(2)).unwrap().flags.cleared);
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let config = WorldConfig {
            seed: 9,
            layout_duration_min: 2.0,
            layout_duration_max: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut world = World::generate(config, &[descriptor("A", 4, 0)], HeadlessVisuals::new());
        assert_eq!(world.config().seed, 9);
        assert_eq!(world.config().layout_duration_min, WorldConfig::default().layout_duration_min);
        assert_eq!(world.config().layout_duration_max, WorldConfig::default().layout_duration_max);
        world.finish_layout();
        assert!(world.is_ready());
    }

    #[test]
    fn test_unplaceable_hubs_are_dropped() {
        // Twenty hubs 18 apart cannot fit inside radius 30
        let desc = descriptor("Crag", 3, 20);
        let config = WorldConfig::default();
        let area = generate_area(&config, &desc, &CancelToken::new());
        assert!(!area.complete);
        assert!(area.placements.len() < desc.sections.len());
        assert_eq!(area.placements[0], (0, Vec2::ZERO));

        let mut world = World::generate(config, std::slice::from_ref(&desc), HeadlessVisuals::new());
        assert_eq!(world.registry().len(), area.placements.len());
        for (node, &(spec_index, local)) in world.sections().zip(&area.placements) {
            assert_eq!(node.label, desc.sections[spec_index].label);
            assert_eq!(node.kind, desc.sections[spec_index].kind);
            assert_eq!(node.local, local);
        }

        world.finish_layout();
        assert!(world.is_ready());
        assert!(world.graph_report().is_some());
        let start = world.player().current.unwrap();
        assert_eq!(world.section(start).unwrap().kind, SectionKind::Origin);
        assert!(world.section(start).unwrap().flags.visited);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let areas = [descriptor("A", 8, 1), descriptor("B", 8, 1), descriptor("C", 5, 0)];
        let seq = World::generate(WorldConfig::default(), &areas, HeadlessVisuals::new());
        let par = World::generate(
            WorldConfig {
                parallel_generation: true,
                ..Default::default()
            },
            &areas,
            HeadlessVisuals::new(),
        );
        let a: Vec<Vec2> = seq.sections().map(|n| n.local).collect();
        let b: Vec<Vec2> = par.sections().map(|n| n.local).collect();
        assert_eq!(a, b);
    }
}

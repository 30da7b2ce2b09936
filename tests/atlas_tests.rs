//! End-to-end generation and navigation properties

use glam::Vec2;
use proptest::prelude::*;

use section_atlas::WorldConfig;
use section_atlas::atlas::layout::compose;
use section_atlas::atlas::points::generate;
use section_atlas::atlas::{
    AreaDescriptor, Bounds, CancelToken, EventKind, HeadlessVisuals, PlayerAgent, PointFieldParams, SectionId,
    SectionKind, SectionRegistry, SectionSpec, World, detect_sections, generate_area,
};

fn demo_area(name: &str, normals: usize, hubs: usize) -> AreaDescriptor {
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

fn five_areas() -> Vec<AreaDescriptor> {
    vec![
        demo_area("Lowlands", 6, 0),
        demo_area("Marsh", 7, 1),
        demo_area("Quarry", 5, 0),
        demo_area("Wood", 8, 1),
        demo_area("Spire", 4, 1),
    ]
}

fn ready_world(seed: i64, areas: &[AreaDescriptor]) -> World {
    let config = WorldConfig {
        seed,
        ..Default::default()
    };
    let mut world = World::generate(config, areas, HeadlessVisuals::new());
    world.finish_layout();
    world
}

fn can_move(registry: &SectionRegistry) -> Vec<bool> {
    registry.iter().map(|n| n.flags.can_move).collect()
}

/// Every proxy belongs to the occupied node and stands in for an out-of-range linked
/// target, and every such target has one
fn assert_proxies_consistent(world: &World) {
    let current = world.player().current.unwrap();
    let owner = world.section(current).unwrap();
    for proxy in world.proxies() {
        assert_eq!(proxy.owner, current);
        assert!(owner.links_to(proxy.target));
        assert!(!world.section(proxy.target).unwrap().flags.in_range);
        assert!(proxy.pos.distance(owner.pos) < world.player().detection_radius);
    }
    for link in &owner.links {
        let target = world.section(link.target).unwrap();
        assert_eq!(
            world.proxy_for(current, link.target).is_some(),
            !target.flags.in_range
        );
    }
}

// Scenarios

#[test]
fn scenario_seed_42_point_field() {
    let params = PointFieldParams::new(5, 10.0, 12.0, 30.0);
    let field = generate(&params, 42, Vec2::ZERO);
    assert_eq!(field.points.len(), 5);
    assert_eq!(field.points[0], Vec2::ZERO);
    for i in 1..field.points.len() {
        let p = field.points[i];
        if !field.relaxed {
            for (j, q) in field.points.iter().enumerate() {
                if i != j {
                    assert!(p.distance(*q) >= 10.0 - 1e-4);
                }
            }
        }
        let nearest = field.points[..i]
            .iter()
            .map(|q| q.distance(p))
            .fold(f32::MAX, f32::min);
        assert!(nearest <= 12.0 + 1e-4);
    }
}

#[test]
fn scenario_two_areas_side_by_side() {
    let extents = [Vec2::new(10.0, 10.0), Vec2::new(10.0, 10.0)];
    let plan = compose(&extents, 5.0, 6.0);
    let a = plan.anchors[0].unwrap();
    let b = plan.anchors[1].unwrap();
    assert_eq!(a.x, -10.0);
    assert_eq!(b.x, 10.0);
    assert_eq!(a.y, b.y);
    let box_a = Bounds::new(a - Vec2::splat(5.0), a + Vec2::splat(5.0));
    let box_b = Bounds::new(b - Vec2::splat(5.0), b + Vec2::splat(5.0));
    assert!(!box_a.overlaps(&box_b));
}

#[test]
fn scenario_isolated_player() {
    use section_atlas::atlas::reach::place_player;
    use section_atlas::atlas::AreaId;

    let mut registry = SectionRegistry::new();
    let p = registry.insert(AreaId(0), "p", SectionKind::Origin, EventKind::Empty, Vec2::ZERO);
    for (i, x) in [9.0, 20.0, -15.0].into_iter().enumerate() {
        registry.insert(AreaId(0), format!("s{i}"), SectionKind::Normal, EventKind::Empty, Vec2::new(x, 0.0));
    }
    let mut player = PlayerAgent::new(8.0);
    place_player(&mut registry, &mut player, p, 0.0).unwrap();

    for node in registry.iter() {
        assert_eq!(node.flags.can_move, node.id == p);
    }
}

#[test]
fn scenario_linked_target_out_of_range_gets_proxy() {
    // A lone hub is linked to the origin 18..24 away, past the 12 detection radius
    let keep = AreaDescriptor {
        name: "Keep".into(),
        sections: vec![
            SectionSpec::new("gate", SectionKind::Origin, EventKind::Empty),
            SectionSpec::new("tower", SectionKind::Hub, EventKind::Boss),
        ],
    };
    let world = ready_world(42, &[keep]);
    let gate = world.player().current.unwrap();
    let tower = SectionId(1);

    let tower_node = world.section(tower).unwrap();
    assert!(world.section(gate).unwrap().links_to(tower));
    assert!(tower_node.flags.can_move);
    assert!(!tower_node.flags.in_range);

    let proxy = world.proxy_for(gate, tower).expect("proxy for out-of-range link");
    assert!(proxy.pos.distance(world.section(gate).unwrap().pos) < world.player().detection_radius);
    assert_eq!(proxy.mirror.event, EventKind::Boss);
    assert_eq!(world.visuals().proxies().count(), 1);
}

#[test]
fn proxy_interaction_matches_direct_move() {
    let keep = AreaDescriptor {
        name: "Keep".into(),
        sections: vec![
            SectionSpec::new("gate", SectionKind::Origin, EventKind::Empty),
            SectionSpec::new("tower", SectionKind::Hub, EventKind::Boss),
        ],
    };
    let mut via_proxy = ready_world(7, std::slice::from_ref(&keep));
    let mut direct = ready_world(7, &[keep]);

    let proxy = via_proxy.proxies().next().unwrap().id;
    let target = via_proxy.proxies().next().unwrap().target;
    assert!(via_proxy.interact_proxy(proxy));
    assert!(direct.request_move(target));

    let flags = |w: &World| w.sections().map(|n| n.flags).collect::<Vec<_>>();
    assert_eq!(flags(&via_proxy), flags(&direct));
    assert_eq!(via_proxy.player().current, direct.player().current);
    assert_eq!(via_proxy.player().previous, direct.player().previous);
    // The old proxy went away with the move
    assert!(!via_proxy.interact_proxy(proxy));
}

#[test]
fn five_area_world_is_fully_placed() {
    let world = ready_world(42, &five_areas());
    assert_eq!(world.areas().len(), 5);
    assert_eq!(world.strips().count(), 2);
    let boxes: Vec<Bounds> = world.areas().iter().map(|a| a.world_bounds()).collect();
    for i in 0..boxes.len() {
        for j in i + 1..boxes.len() {
            assert!(!boxes[i].overlaps(&boxes[j]), "{i} overlaps {j}");
        }
    }
    for node in world.sections() {
        let area = world.area_of(node.id).unwrap();
        assert_eq!(node.pos, area.offset + node.local);
    }
}

#[test]
fn extra_areas_stay_at_staging() {
    let mut areas = five_areas();
    areas.push(demo_area("Beyond", 3, 0));
    let world = ready_world(3, &areas);
    let extra = &world.areas()[5];
    assert!(extra.anchor.is_none());
    assert_eq!(extra.offset, Vec2::new(5.0 * world.config().staging_stride, 0.0));
    assert_eq!(world.layout_plan().unplaced, 1);
}

#[test]
fn configured_bridges_replace_template() {
    let config = WorldConfig {
        bridges: vec![vec!["Lowlands".into(), "Spire".into()], vec!["Nowhere".into(), "Marsh".into()]],
        ..Default::default()
    };
    let mut world = World::generate(config, &five_areas(), HeadlessVisuals::new());
    world.finish_layout();
    let report = world.graph_report().unwrap();
    for &(a, b) in &report.bridges {
        let mut names = [world.area_of(a).unwrap().name.as_str(), world.area_of(b).unwrap().name.as_str()];
        names.sort_unstable();
        assert_eq!(names, ["Lowlands", "Spire"]);
    }
}

#[test]
fn cancelled_generation_is_partial() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let config = WorldConfig::default();
    let area = generate_area(&config, &demo_area("Marsh", 10, 2), &cancel);
    // Only the start point survives a run cancelled before it begins
    assert_eq!(area.placements, vec![(0, Vec2::ZERO)]);
    assert!(!area.complete);
}

// Properties

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_point_field_constraints(seed in any::<i32>(), count in 2usize..14) {
        let params = PointFieldParams::new(count, 10.0, 12.0, 30.0);
        let field = generate(&params, seed, Vec2::ZERO);
        prop_assert_eq!(field.points[0], Vec2::ZERO);
        for i in 1..field.points.len() {
            let p = field.points[i];
            prop_assert!(p.length() <= 30.0 + 1e-3);
            let nearest = field.points[..i].iter().map(|q| q.distance(p)).fold(f32::MAX, f32::min);
            prop_assert!(nearest <= 12.0 + 1e-3);
            prop_assert!(nearest >= field.min_distance - 1e-3);
        }
    }

    #[test]
    fn prop_generation_is_deterministic(seed in any::<i64>()) {
        let config = WorldConfig { seed, ..Default::default() };
        let area = demo_area("Marsh", 9, 2);
        let a = generate_area(&config, &area, &CancelToken::new());
        let b = generate_area(&config, &area, &CancelToken::new());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_areas_are_independent(seed in any::<i64>()) {
        let config = WorldConfig { seed, ..Default::default() };
        let marsh = demo_area("Marsh", 9, 1);
        let alone = generate_area(&config, &marsh, &CancelToken::new());
        let world = World::generate(config, &[demo_area("Lowlands", 5, 0), marsh], HeadlessVisuals::new());
        let in_world: Vec<Vec2> = world.areas()[1]
            .sections
            .iter()
            .map(|&id| world.section(id).unwrap().local)
            .collect();
        let expected: Vec<Vec2> = alone.placements.iter().map(|&(_, p)| p).collect();
        prop_assert_eq!(in_world, expected);
    }

    #[test]
    fn prop_links_are_mirrored_and_irreflexive(seed in any::<i64>()) {
        let world = ready_world(seed, &five_areas());
        for node in world.sections() {
            for link in &node.links {
                prop_assert_eq!(link.owner, node.id);
                prop_assert_ne!(link.target, node.id);
                prop_assert!(world.section(link.target).unwrap().links_to(node.id));
            }
            let mut targets: Vec<_> = node.links.iter().map(|l| l.target).collect();
            targets.sort();
            targets.dedup();
            prop_assert_eq!(targets.len(), node.links.len());
        }
    }

    #[test]
    fn prop_navigation_invariants(seed in any::<i64>(), picks in prop::collection::vec(any::<u16>(), 1..24)) {
        let mut world = ready_world(seed, &five_areas());
        let n = world.registry().len();
        let mut visited: Vec<bool> = world.sections().map(|s| s.flags.visited).collect();
        assert_proxies_consistent(&world);

        for pick in picks {
            let target = SectionId(u32::from(pick) % n as u32);
            let allowed = world.section(target).map(|s| s.flags.can_move || s.flags.visited).unwrap();
            let before = world.player().current;
            prop_assert_eq!(world.request_move(target), allowed);
            if !allowed {
                prop_assert_eq!(world.player().current, before);
            }

            // Visited never resets
            let now: Vec<bool> = world.sections().map(|s| s.flags.visited).collect();
            for (was, is) in visited.iter().zip(&now) {
                prop_assert!(!was || *is);
            }
            visited = now;

            // Detection run twice gives the same answer as the move already did
            let mut registry = world.registry().clone();
            let player = world.player().clone();
            let expected = can_move(&registry);
            detect_sections(&mut registry, &player, world.config().section_radius);
            prop_assert_eq!(&can_move(&registry), &expected);
            detect_sections(&mut registry, &player, world.config().section_radius);
            prop_assert_eq!(&can_move(&registry), &expected);

            assert_proxies_consistent(&world);
        }
    }

    #[test]
    fn prop_layout_never_overlaps(
        sizes in prop::collection::vec((1.0f32..60.0, 1.0f32..60.0), 1..=5),
        gap in 0.5f32..10.0,
        strip in 0.0f32..10.0,
    ) {
        let extents: Vec<Vec2> = sizes.iter().map(|&(w, h)| Vec2::new(w, h)).collect();
        let plan = compose(&extents, gap, strip);
        let boxes: Vec<Bounds> = plan
            .anchors
            .iter()
            .zip(&extents)
            .map(|(a, e)| {
                let c = a.unwrap();
                Bounds::new(c - *e * 0.5, c + *e * 0.5)
            })
            .collect();
        for i in 0..boxes.len() {
            for j in i + 1..boxes.len() {
                prop_assert!(!boxes[i].overlaps(&boxes[j]), "{} overlaps {}", i, j);
            }
        }
    }
}

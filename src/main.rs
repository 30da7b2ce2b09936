//! Section Atlas entry point
//!
//! Generates a demo world headlessly, runs the layout to completion and walks the
//! player a few steps. Usage: `section-atlas [config.json] [--seed N]`

use std::process::ExitCode;

use section_atlas::WorldConfig;
use section_atlas::atlas::{
    AreaDescriptor, EventKind, HeadlessVisuals, LayoutStatus, SectionKind, SectionSpec, World, WorldEvent,
};

/// Simulated frame time for the layout animation
const FRAME_DT: f32 = 1.0 / 60.0;
/// Steps the demo walk takes before stopping
const WALK_STEPS: usize = 8;

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Section Atlas starting...");

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let areas = demo_areas();
    let mut world = World::generate(config, &areas, HeadlessVisuals::new());

    let mut frames = 0;
    while world.advance(FRAME_DT) == LayoutStatus::Running {
        frames += 1;
    }
    log::info!("Layout settled after {} frames", frames);

    walk(&mut world);
    print_summary(&mut world);
    ExitCode::SUCCESS
}

fn load_config() -> section_atlas::Result<WorldConfig> {
    let mut config = WorldConfig::default();
    let mut seed = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                let value = args
                    .next()
                    .ok_or_else(|| section_atlas::AtlasError::Config("--seed needs a value".into()))?;
                seed = Some(
                    value
                        .parse::<i64>()
                        .map_err(|e| section_atlas::AtlasError::Config(format!("bad seed {value:?}: {e}")))?,
                );
            }
            path => config = WorldConfig::load(path)?,
        }
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn demo_areas() -> Vec<AreaDescriptor> {
    let events = [
        EventKind::Battle,
        EventKind::Treasure,
        EventKind::Battle,
        EventKind::Rest,
        EventKind::Elite,
        EventKind::Shop,
        EventKind::Story,
    ];
    let names = ["Lowlands", "Marsh", "Old Quarry", "Ashen Wood", "Spire"];

    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let mut sections = vec![SectionSpec::new("gate", SectionKind::Origin, EventKind::Empty)];
            if i % 2 == 1 {
                sections.push(SectionSpec::new("camp", SectionKind::Hub, EventKind::Rest));
            }
            for (j, event) in events.iter().cycle().skip(i).take(6 + i).enumerate() {
                sections.push(SectionSpec::new(format!("{name} {j}"), SectionKind::Normal, *event));
            }
            if i == names.len() - 1 {
                sections.push(SectionSpec::new("summit", SectionKind::Hub, EventKind::Boss));
            }
            AreaDescriptor {
                name: (*name).to_string(),
                sections,
            }
        })
        .collect()
}

/// Greedy walk: prefer unvisited reachable sections, lowest id first
fn walk(world: &mut World) {
    for _ in 0..WALK_STEPS {
        let Some(current) = world.player().current else {
            return;
        };
        let next = world
            .sections()
            .find(|n| n.id != current && n.flags.can_move && !n.flags.visited)
            .map(|n| n.id);
        let Some(next) = next else {
            log::info!("Nothing new in reach of {:?}", current);
            return;
        };
        if world.request_move(next) {
            world.mark_cleared(next);
        }
    }
}

fn print_summary(world: &mut World) {
    let events = world.drain_events();
    let links = events
        .iter()
        .filter(|e| matches!(e, WorldEvent::LinkAdded(..)))
        .count();
    let proxies = events
        .iter()
        .filter(|e| matches!(e, WorldEvent::ProxySpawned { .. }))
        .count();

    println!("Seed {}", world.config().seed);
    for area in world.areas() {
        let bounds = area.world_bounds();
        println!(
            "  {:<12} {:>2} sections  center ({:>6.1}, {:>6.1})  {:>5.1} x {:>5.1}",
            area.name,
            area.sections.len(),
            bounds.center().x,
            bounds.center().y,
            bounds.width(),
            bounds.height()
        );
    }
    println!("{} explicit links, {} proxies spawned", links, proxies);

    let visited: Vec<String> = world
        .sections()
        .filter(|n| n.flags.visited)
        .map(|n| n.label.clone())
        .collect();
    println!("Visited: {}", visited.join(" -> "));
    if let Some(current) = world.player().current.and_then(|id| world.section(id)) {
        println!("Player on {} ({:?})", current.label, current.event);
    }
}

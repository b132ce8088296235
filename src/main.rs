//! Dungeon Nav demo
//!
//! Loads a level (the built-in one, or a JSON file given on the command
//! line) and runs a few queries against it. Set `RUST_LOG=debug` to watch
//! the engine work.

use std::error::Error;

use dungeon_nav::nav::{AgentId, LevelDescription, Location, path_length};
use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Two rooms, a corridor, a pillar and a door
const DEMO_LEVEL: &str = r#"{
    "regions": [
        [[0.0, 0.0], [0.0, 5.0], [5.0, 5.0], [5.0, 0.0]],
        [[5.0, 3.0], [5.0, 4.0], [10.0, 4.0], [10.0, 3.0]],
        [[10.0, 1.0], [10.0, 4.0], [14.0, 4.0], [14.0, 1.0]]
    ],
    "obstacles": [
        {
            "pos": [2.5, 2.5],
            "footprint": { "Rect": { "width": 1.0, "height": 1.0 } },
            "kind": "Scenery",
            "blocks_movement": true,
            "blocks_visibility": true
        },
        {
            "pos": [7.5, 3.5],
            "footprint": { "Rect": { "width": 0.2, "height": 1.0 } },
            "kind": "Scenery",
            "blocks_movement": true,
            "blocks_visibility": true
        }
    ]
}"#;

fn main() {
    env_logger::init();
    log::info!("Dungeon Nav demo starting...");

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let json = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => DEMO_LEVEL.to_string(),
    };
    let mut location = LevelDescription::from_json(&json)?.into_builder()?.build()?;
    println!(
        "Level {:?}: {} regions, {} boundaries, {} waypoints",
        location.calculate_size(),
        location.regions().len(),
        location.boundaries().len(),
        location.waypoints().len()
    );

    let src = Vec2::new(1.0, 1.0);
    let dest = Vec2::new(13.0, 2.0);
    report_path(&location, src, dest);

    // Open every door-sized obstacle and try again
    let doors: Vec<_> = location
        .obstacles()
        .iter()
        .filter(|(_, o)| o.bounds().width() < 0.5)
        .map(|(id, _)| id)
        .collect();
    for id in doors {
        location.edit().set_obstacle_blocking(id, false, false)?;
    }
    report_path(&location, src, dest);
    println!("Full rebuilds after edits: {}", location.full_rebuilds());

    let revealed = location.update_visibility(src);
    println!("Seen from {:?}: regions {:?}", src, revealed);

    let mut rng = Pcg32::seed_from_u64(0x5eed);
    let threat = Vec2::new(4.0, 1.0);
    match location.find_flee_point(&mut rng, src, threat, false) {
        Some(p) => println!("Fleeing {:?} to {:?}", threat, p),
        None => println!("Nowhere to flee from {:?}", threat),
    }

    location.set_agent_position(AgentId(1), Vec2::new(4.0, 4.0));
    if let Some(p) = location.find_free_way_point(&mut rng, src, true, false) {
        println!("Free waypoint in view: {:?}", p);
    }

    let wanted = Vec2::new(2.9, 2.5);
    println!("Nudged {:?} to {:?}", wanted, location.nudge_to_free_space(src, wanted));
    Ok(())
}

fn report_path(location: &Location, src: Vec2, dest: Vec2) {
    let path = location.calculate_path_to(src, dest, None, false);
    if path.is_empty() {
        println!("No path {:?} -> {:?}", src, dest);
    } else {
        println!("Path {:?} -> {:?}: {:?} (length {:.2})", src, dest, path, path_length(src, &path));
    }
}

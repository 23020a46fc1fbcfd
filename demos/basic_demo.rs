//! Basic demonstration of the Horde Survival simulation core.
//!
//! Run with: cargo run --example basic_demo

use horde_sim::{
    GameLoop, Layer, LoopConfig, PickupKind, SimWorld, SpawnRequest, ZombieKind,
};
use std::time::Duration;

fn main() {
    env_logger::init();

    println!("=== Horde Survival - Simulation Demo ===\n");

    let mut sim = SimWorld::new();
    sim.add_collision_listener(|event| {
        if event.split(Layer::Pickup).is_some() {
            println!("  [listener] pickup touched");
        }
    });

    // Stage the arena on the sim timeline before handing it to the loop.
    sim.spawn_now(SpawnRequest::Player { x: 0.0, y: 0.0 });
    sim.spawn_now(SpawnRequest::Obstacle {
        x: 10.0,
        y: 0.0,
        half_w: 1.0,
        half_h: 6.0,
    });
    sim.spawn_now(SpawnRequest::Turret {
        owner: 0,
        x: -4.0,
        y: 4.0,
    });
    sim.spawn_now(SpawnRequest::Pickup {
        kind: PickupKind::Xp(5),
        x: 2.0,
        y: 0.0,
    });
    for i in 0..6 {
        sim.spawn_now(SpawnRequest::Zombie {
            kind: if i % 2 == 0 {
                ZombieKind::Walker
            } else {
                ZombieKind::Runner
            },
            x: 20.0 + i as f32 * 3.0,
            y: -10.0 + i as f32 * 4.0,
            hp_mult: 1.0,
        });
    }

    let game = GameLoop::spawn(sim, LoopConfig::default());
    let handle = game.handle();

    // Walk east while the horde closes in.
    handle.set_player_input(1.0, 0.0).unwrap();

    for second in 1..=5 {
        std::thread::sleep(Duration::from_secs(1));
        let snapshot = handle.snapshot();
        println!(
            "t={}s tick={} entities={} kills={} xp={}",
            second,
            snapshot.tick,
            snapshot.entities.len(),
            snapshot.session.kills,
            snapshot.session.xp
        );
        for entity in snapshot.entities.iter().filter(|e| e.kind == "player") {
            println!(
                "  player at ({:.1}, {:.1}) hp={}/{}",
                entity.x, entity.y, entity.hp, entity.hp_max
            );
        }
    }

    println!("\n--- pausing for one second ---");
    handle.pause().unwrap();
    std::thread::sleep(Duration::from_secs(1));
    let frozen = handle.snapshot();
    println!("paused snapshot: tick={} entities={}", frozen.tick, frozen.entities.len());
    handle.resume().unwrap();

    std::thread::sleep(Duration::from_secs(1));
    let last = handle.snapshot();
    game.stop().unwrap();

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", last.to_json_pretty().unwrap());
}

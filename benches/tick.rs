use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::hint::black_box;

use horde_sim::{SimWorld, SpawnRequest, ZombieKind};

const KINDS: [ZombieKind; 4] = [
    ZombieKind::Walker,
    ZombieKind::Runner,
    ZombieKind::Spitter,
    ZombieKind::Charger,
];

fn populated_world(enemies: usize) -> SimWorld {
    let mut sim = SimWorld::new();
    sim.spawn_now(SpawnRequest::Player { x: 0.0, y: 0.0 });
    for i in 0..enemies {
        let angle = i as f32 * 0.618;
        let dist = 8.0 + (i % 20) as f32;
        sim.spawn_now(SpawnRequest::Zombie {
            kind: KINDS[i % KINDS.len()],
            x: angle.cos() * dist,
            y: angle.sin() * dist,
            hp_mult: 1.0,
        });
    }
    sim
}

fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for enemies in [50usize, 100, 150] {
        group.bench_function(format!("step_{enemies}_enemies"), |b| {
            b.iter_batched(
                || populated_world(enemies),
                |mut sim| {
                    for _ in 0..10 {
                        sim.step(black_box(1.0 / 60.0));
                    }
                    sim
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);

//! Wave spawner / difficulty manager.
//!
//! A monotonic session clock drives three coupled outputs from one ordered
//! breakpoint table: the HP multiplier stamped onto newly spawned enemies,
//! the spawn rate (enemies per second), and the set of unlocked zombie
//! kinds. The spawner accumulates budget (`rate * dt`) each frame and
//! spends one point per spawn, never pushing the live enemy count past the
//! hard cap. Bosses run on their own fixed-interval timer with HP scaled
//! by `base * (1 + 0.5 * boss_number)`.

use crate::components::*;
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;

/// Distance from the player at which enemies appear.
pub const SPAWN_RING_RADIUS: f32 = 28.0;

/// Fast xorshift64* generator for spawn rolls. Not statistically rigorous
/// and not meant to be; the simulation only needs cheap, seedable variety.
#[derive(Debug, Clone)]
pub struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub fn new(seed: u64) -> Self {
        Self {
            // A zero state would be a fixed point.
            state: if seed == 0 { 0x9E3779B97F4A7C15 } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform float in [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform index in [0, len).
    pub fn next_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        (self.next_u64() % len as u64) as usize
    }
}

/// One row of the difficulty table: active from `at` seconds until the
/// next row's `at`.
#[derive(Debug, Clone)]
pub struct WaveBreakpoint {
    pub at: f32,
    /// Enemies per second.
    pub spawn_rate: f32,
    /// HP multiplier stamped onto enemies spawned while this row is active.
    pub hp_mult: f32,
    pub unlocked: Vec<ZombieKind>,
}

/// The default difficulty curve.
pub fn default_wave_table() -> Vec<WaveBreakpoint> {
    use ZombieKind::*;
    vec![
        WaveBreakpoint {
            at: 0.0,
            spawn_rate: 1.0,
            hp_mult: 1.0,
            unlocked: vec![Walker],
        },
        WaveBreakpoint {
            at: 60.0,
            spawn_rate: 1.5,
            hp_mult: 1.2,
            unlocked: vec![Walker, Runner],
        },
        WaveBreakpoint {
            at: 180.0,
            spawn_rate: 2.0,
            hp_mult: 1.5,
            unlocked: vec![Walker, Runner, Spitter],
        },
        WaveBreakpoint {
            at: 360.0,
            spawn_rate: 2.5,
            hp_mult: 2.0,
            unlocked: vec![Walker, Runner, Spitter, Charger, Bomber],
        },
        WaveBreakpoint {
            at: 600.0,
            spawn_rate: 3.0,
            hp_mult: 2.5,
            unlocked: vec![Walker, Runner, Spitter, Charger, Bomber, Brute],
        },
        WaveBreakpoint {
            at: 900.0,
            spawn_rate: 4.0,
            hp_mult: 3.0,
            unlocked: vec![Walker, Runner, Spitter, Charger, Bomber, Brute, Shaman],
        },
    ]
}

/// Spawner state resource.
#[derive(Resource, Debug, Clone)]
pub struct WaveSpawner {
    /// Session-elapsed simulation time, seconds.
    pub elapsed: f32,
    /// Accumulated spawn budget; one point buys one enemy.
    pub budget: f32,
    /// Hard cap on simultaneously active enemies (zombies + bosses).
    pub enemy_cap: usize,
    pub table: Vec<WaveBreakpoint>,
    pub boss_interval: f32,
    pub boss_timer: f32,
    /// Number of bosses spawned so far; scales the next boss's HP.
    pub boss_number: u32,
    rng: XorShift64Star,
}

impl Default for WaveSpawner {
    fn default() -> Self {
        Self::new(0x5EED_CAFE)
    }
}

impl WaveSpawner {
    pub fn new(seed: u64) -> Self {
        Self {
            elapsed: 0.0,
            budget: 0.0,
            enemy_cap: 100,
            table: default_wave_table(),
            boss_interval: 120.0,
            boss_timer: 0.0,
            boss_number: 0,
            rng: XorShift64Star::new(seed),
        }
    }

    /// The table row in force at the current elapsed time.
    pub fn current_row(&self) -> &WaveBreakpoint {
        let mut current = &self.table[0];
        for row in &self.table {
            if row.at <= self.elapsed {
                current = row;
            } else {
                break;
            }
        }
        current
    }

    fn current_row_index(&self) -> usize {
        let mut index = 0;
        for (i, row) in self.table.iter().enumerate() {
            if row.at <= self.elapsed {
                index = i;
            } else {
                break;
            }
        }
        index
    }

    pub fn roll_kind(&mut self) -> ZombieKind {
        let index = self.current_row_index();
        let unlocked = &self.table[index].unlocked;
        unlocked[self.rng.next_index(unlocked.len())]
    }

    pub fn roll_angle(&mut self) -> f32 {
        self.rng.next_f32() * std::f32::consts::TAU
    }
}

/// System that advances the difficulty clock and spends spawn budget.
///
/// ## Data Access
/// - Reads: DeltaTime, player Transform, enemy Active flags
/// - Writes: WaveSpawner, deferred spawns via Commands
pub fn wave_spawner_system(
    dt: Res<DeltaTime>,
    mut spawner: ResMut<WaveSpawner>,
    mut commands: Commands,
    player_q: Query<&Transform, With<PlayerTag>>,
    enemy_q: Query<&Active, Or<(With<ZombieKind>, With<BossKind>)>>,
) {
    let delta = dt.0;

    let prev_row = spawner.current_row_index();
    spawner.elapsed += delta;
    let row = spawner.current_row_index();
    if row != prev_row {
        let bp = &spawner.table[row];
        log::info!(
            "difficulty breakpoint at {:.0}s: rate {}/s, hp x{}, {} kinds unlocked",
            bp.at,
            bp.spawn_rate,
            bp.hp_mult,
            bp.unlocked.len()
        );
    }

    let Ok(player) = player_q.get_single() else {
        return;
    };
    let (px, py) = (player.x, player.y);

    let mut live = enemy_q.iter().filter(|active| active.0).count();

    let rate = spawner.current_row().spawn_rate;
    let hp_mult = spawner.current_row().hp_mult;
    spawner.budget += rate * delta;

    if live >= spawner.enemy_cap {
        // At the cap the budget must not pile up into a burst the moment
        // something dies.
        spawner.budget = spawner.budget.min(1.0);
    }

    while spawner.budget >= 1.0 && live < spawner.enemy_cap {
        spawner.budget -= 1.0;
        let kind = spawner.roll_kind();
        let angle = spawner.roll_angle();
        let x = px + angle.cos() * SPAWN_RING_RADIUS;
        let y = py + angle.sin() * SPAWN_RING_RADIUS;
        commands.spawn(ZombieBundle::new(kind, x, y, hp_mult));
        live += 1;
    }

    // Bosses bypass the enemy budget but still count toward the cap above
    // on later frames.
    spawner.boss_timer += delta;
    if spawner.boss_timer >= spawner.boss_interval {
        spawner.boss_timer -= spawner.boss_interval;
        let kind = if spawner.boss_number % 2 == 0 {
            BossKind::Butcher
        } else {
            BossKind::Abomination
        };
        let angle = spawner.roll_angle();
        let x = px + angle.cos() * SPAWN_RING_RADIUS;
        let y = py + angle.sin() * SPAWN_RING_RADIUS;
        let number = spawner.boss_number;
        commands.spawn(BossBundle::new(kind, x, y, number));
        spawner.boss_number += 1;
        log::info!("boss {} ({}) spawned", number, kind.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawner_world(spawner: WaveSpawner) -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0 / 60.0));
        world.insert_resource(spawner);
        world.spawn(PlayerBundle::new(0.0, 0.0));
        let mut schedule = Schedule::default();
        schedule.add_systems(wave_spawner_system);
        (world, schedule)
    }

    fn zombie_count(world: &mut World) -> usize {
        let mut q = world.query::<&ZombieKind>();
        q.iter(world).count()
    }

    #[test]
    fn test_breakpoint_lookup_follows_elapsed_time() {
        let mut spawner = WaveSpawner::new(1);
        assert_eq!(spawner.current_row().spawn_rate, 1.0);
        spawner.elapsed = 61.0;
        assert_eq!(spawner.current_row().spawn_rate, 1.5);
        spawner.elapsed = 10_000.0;
        assert_eq!(spawner.current_row().spawn_rate, 4.0);
    }

    #[test]
    fn test_budget_crossing_spawns_one_enemy() {
        let (mut world, mut schedule) = spawner_world(WaveSpawner::new(7));
        world.insert_resource(DeltaTime(0.5));

        // rate 1.0: budget 0.5 after one tick, 1.0 after two.
        schedule.run(&mut world);
        assert_eq!(zombie_count(&mut world), 0);
        schedule.run(&mut world);
        assert_eq!(zombie_count(&mut world), 1);
    }

    #[test]
    fn test_early_game_spawns_only_walkers() {
        let (mut world, mut schedule) = spawner_world(WaveSpawner::new(99));
        world.insert_resource(DeltaTime(1.0));

        for _ in 0..20 {
            schedule.run(&mut world);
        }

        let mut q = world.query::<&ZombieKind>();
        assert!(q.iter(&world).count() > 0);
        assert!(q.iter(&world).all(|k| *k == ZombieKind::Walker));
    }

    #[test]
    fn test_enemy_cap_is_never_exceeded() {
        let mut spawner = WaveSpawner::new(3);
        spawner.enemy_cap = 30;
        spawner.elapsed = 950.0; // 15+ minutes: max rate, all kinds.
        let (mut world, mut schedule) = spawner_world(spawner);
        world.insert_resource(DeltaTime(1.0));

        for _ in 0..120 {
            schedule.run(&mut world);
            assert!(zombie_count(&mut world) <= 30);
        }
        assert_eq!(zombie_count(&mut world), 30, "cap reached and held");
    }

    #[test]
    fn test_hp_multiplier_applies_to_spawned_enemies() {
        let mut spawner = WaveSpawner::new(5);
        spawner.elapsed = 70.0; // x1.2 row
        let (mut world, mut schedule) = spawner_world(spawner);
        world.insert_resource(DeltaTime(1.0));

        schedule.run(&mut world);

        let mut q = world.query::<(&ZombieKind, &Health)>();
        for (kind, health) in q.iter(&world) {
            let base = zombie_stats(*kind).max_hp as f32;
            assert_eq!(health.max, (base * 1.2).round() as i32);
        }
    }

    #[test]
    fn test_boss_spawns_on_interval_with_scaled_hp() {
        let mut spawner = WaveSpawner::new(11);
        spawner.boss_interval = 10.0;
        let (mut world, mut schedule) = spawner_world(spawner);
        world.insert_resource(DeltaTime(1.0));

        for _ in 0..10 {
            schedule.run(&mut world);
        }

        let mut q = world.query::<(&BossKind, &Health)>();
        let bosses: Vec<_> = q.iter(&world).collect();
        assert_eq!(bosses.len(), 1);
        // First boss is number 0: base HP unscaled.
        assert_eq!(bosses[0].1.max, boss_stats(*bosses[0].0).base_hp);

        for _ in 0..10 {
            schedule.run(&mut world);
        }
        let mut q = world.query::<&BossKind>();
        assert_eq!(q.iter(&world).count(), 2);
    }

    #[test]
    fn test_rng_is_deterministic_per_seed() {
        let mut a = XorShift64Star::new(42);
        let mut b = XorShift64Star::new(42);
        for _ in 0..32 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let f = a.next_f32();
        assert!((0.0..1.0).contains(&f));
    }
}

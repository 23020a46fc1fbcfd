//! Public API for the simulation.
//!
//! `SimWorld` owns the ECS world and the system schedule and exposes the
//! scheduler's control surface: entity insertion/removal, pause/resume,
//! deferred clear, snapshots and collision-listener registration.
//!
//! ## Fixed Timestep
//!
//! The simulation runs a single logical timeline at 60 Hz. `step(dt)`
//! clamps the measured delta to 50 ms (a stall must not produce a runaway
//! catch-up burst), accumulates it, and runs whole fixed updates as the
//! accumulator allows.
//!
//! ## Frame contract
//!
//! Each fixed update: apply a pending `clear` -> drain queued entity
//! insertions/removals (queued entities become visible this tick, never
//! mid-frame) -> if paused, stop here (snapshots keep publishing the
//! frozen world) -> run the chained system schedule -> dispatch collision
//! events to external listeners. The end-of-frame sweep of inactive
//! entities is the schedule's last system.

use crate::collision::{collision_detect_system, CollisionEvent, CollisionEvents};
use crate::components::*;
use crate::spatial::{spatial_index_system, SpatialGrid};
use crate::systems::*;
use crate::world::{EntitySnapshot, Snapshot};
use bevy_ecs::prelude::*;
use bevy_ecs::schedule::IntoSystemConfigs;

/// Stable cross-thread entity identity (`Entity::to_bits`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

impl EntityId {
    fn entity(self) -> Entity {
        Entity::from_bits(self.0)
    }
}

/// A deferred entity construction request. Factories assemble the full
/// component bundle when the request is drained at tick start.
#[derive(Debug, Clone, Copy)]
pub enum SpawnRequest {
    Player { x: f32, y: f32 },
    Zombie { kind: ZombieKind, x: f32, y: f32, hp_mult: f32 },
    Boss { kind: BossKind, x: f32, y: f32, number: u32 },
    Pickup { kind: PickupKind, x: f32, y: f32 },
    Obstacle { x: f32, y: f32, half_w: f32, half_h: f32 },
    Turret { owner: u64, x: f32, y: f32 },
}

enum PendingOp {
    Spawn(SpawnRequest),
    Despawn(EntityId),
}

/// Simulation tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Fixed timestep in seconds (1/60 = 60 Hz).
    pub fixed_timestep: f32,
    /// Upper bound on one measured frame delta, seconds.
    pub max_delta: f32,
    /// Broad-phase cell size, world units.
    pub cell_size: f32,
    /// Hard cap on simultaneously active enemies.
    pub enemy_cap: usize,
    /// Seed for the spawner RNG.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_delta: 0.05,
            cell_size: 4.0,
            enemy_cap: 100,
            seed: 0x5EED_CAFE,
        }
    }
}

type CollisionListener = Box<dyn FnMut(&CollisionEvent) + Send>;

/// The main simulation world container.
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    config: SimConfig,
    tick: u64,
    time: f32,
    paused: bool,
    accumulator: f32,
    pending: Vec<PendingOp>,
    clear_requested: bool,
    listeners: Vec<CollisionListener>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    pub fn with_config(config: SimConfig) -> Self {
        let mut world = World::new();
        Self::install_resources(&mut world, &config);

        // One chained sequence: ascending priority order, deterministic
        // within a tick.
        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                player_input_system,
                auto_aim_system,
                ai_system,
                buff_system,
                weapon_fire_system,
                turret_fire_system,
                projectile_update_system,
                health_tick_system,
                movement_system,
                spatial_index_system,
                collision_detect_system,
                obstacle_block_system,
                contact_damage_system,
                projectile_impact_system,
                explosion_system,
                pickup_attract_system,
                pickup_collect_system,
                wave_spawner_system,
                lifecycle_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            config,
            tick: 0,
            time: 0.0,
            paused: false,
            accumulator: 0.0,
            pending: Vec::new(),
            clear_requested: false,
            listeners: Vec::new(),
        }
    }

    fn install_resources(world: &mut World, config: &SimConfig) {
        world.insert_resource(DeltaTime(config.fixed_timestep));
        world.insert_resource(SpatialGrid::new(config.cell_size));
        world.insert_resource(CollisionEvents::default());
        world.insert_resource(ExplosionQueue::default());
        world.insert_resource(BuffQueue::default());
        world.insert_resource(PlayerInput::default());
        world.insert_resource(SessionStats::default());
        let mut spawner = WaveSpawner::new(config.seed);
        spawner.enemy_cap = config.enemy_cap;
        world.insert_resource(spawner);
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Advance the simulation by `dt` wall-clock seconds. The delta is
    /// clamped to `max_delta` so a stall recovers locally instead of
    /// producing a catch-up burst.
    pub fn step(&mut self, dt: f32) {
        let dt = dt.clamp(0.0, self.config.max_delta);
        self.accumulator += dt;
        let fixed = self.config.fixed_timestep;
        while self.accumulator >= fixed {
            self.fixed_update(fixed);
            self.accumulator -= fixed;
        }
    }

    fn fixed_update(&mut self, dt: f32) {
        if self.clear_requested {
            self.apply_clear();
        }

        // Queued insertions/removals become visible at tick start, never
        // mid-frame. This runs even while paused so a paused UI can stage
        // the world.
        let ops: Vec<PendingOp> = self.pending.drain(..).collect();
        for op in ops {
            match op {
                PendingOp::Spawn(request) => {
                    Self::apply_spawn(&mut self.world, request);
                }
                PendingOp::Despawn(id) => {
                    if let Some(mut active) = self.world.get_mut::<Active>(id.entity()) {
                        active.0 = false;
                    }
                }
            }
        }

        if self.paused {
            return;
        }

        if let Some(mut dt_res) = self.world.get_resource_mut::<DeltaTime>() {
            dt_res.0 = dt;
        }

        self.schedule.run(&mut self.world);

        self.tick += 1;
        self.time += dt;
        if let Some(mut session) = self.world.get_resource_mut::<SessionStats>() {
            session.survival_time = self.time;
        }

        if !self.listeners.is_empty() {
            let events: Vec<CollisionEvent> = self.world.resource::<CollisionEvents>().0.clone();
            for listener in &mut self.listeners {
                for event in &events {
                    listener(event);
                }
            }
        }
    }

    fn apply_clear(&mut self) {
        log::info!("world cleared after {:.1}s ({} ticks)", self.time, self.tick);
        self.world.clear_entities();
        Self::install_resources(&mut self.world, &self.config);
        self.tick = 0;
        self.time = 0.0;
        self.accumulator = 0.0;
        self.clear_requested = false;
    }

    fn apply_spawn(world: &mut World, request: SpawnRequest) -> Entity {
        match request {
            SpawnRequest::Player { x, y } => world.spawn(PlayerBundle::new(x, y)).id(),
            SpawnRequest::Zombie { kind, x, y, hp_mult } => {
                world.spawn(ZombieBundle::new(kind, x, y, hp_mult)).id()
            }
            SpawnRequest::Boss { kind, x, y, number } => {
                world.spawn(BossBundle::new(kind, x, y, number)).id()
            }
            SpawnRequest::Pickup { kind, x, y } => world.spawn(PickupBundle::new(kind, x, y)).id(),
            SpawnRequest::Obstacle { x, y, half_w, half_h } => {
                world.spawn(ObstacleBundle::new(x, y, half_w, half_h)).id()
            }
            SpawnRequest::Turret { owner, x, y } => world.spawn(TurretBundle::new(owner, x, y)).id(),
        }
    }

    // ------------------------------------------------------------------
    // Control surface
    // ------------------------------------------------------------------

    /// Queue an entity insertion; it becomes visible next tick.
    pub fn queue_spawn(&mut self, request: SpawnRequest) {
        self.pending.push(PendingOp::Spawn(request));
    }

    /// Queue an entity removal: the active flag is flipped at the next
    /// tick start and the body is swept at that frame's end.
    pub fn queue_despawn(&mut self, id: EntityId) {
        self.pending.push(PendingOp::Despawn(id));
    }

    /// Immediately spawn an entity (setup/bootstrap on the sim timeline).
    pub fn spawn_now(&mut self, request: SpawnRequest) -> EntityId {
        EntityId(Self::apply_spawn(&mut self.world, request).to_bits())
    }

    /// Update the movement vector read by the player-input system.
    pub fn set_player_input(&mut self, mx: f32, my: f32) {
        if let Some(mut input) = self.world.get_resource_mut::<PlayerInput>() {
            input.mx = mx;
            input.my = my;
        }
    }

    /// Swap the player's weapon for a fresh one of the given kind.
    pub fn set_player_weapon(&mut self, kind: WeaponKind) {
        let mut query = self
            .world
            .query_filtered::<&mut Weapon, With<PlayerTag>>();
        for mut weapon in query.iter_mut(&mut self.world) {
            *weapon = Weapon::new(kind);
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Request a full reset, applied at the start of the next tick so
    /// state already shared with readers is never torn mid-frame.
    pub fn clear(&mut self) {
        self.clear_requested = true;
    }

    /// Register a synchronous collision listener, called once per event
    /// per frame after the systems have run.
    pub fn add_collision_listener(&mut self, listener: impl FnMut(&CollisionEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Append systems to the end of the schedule.
    pub fn add_systems<M>(&mut self, systems: impl IntoSystemConfigs<M>) -> &mut Self {
        self.schedule.add_systems(systems);
        self
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Build a fresh snapshot of the live entity list.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time, self.paused)
    }

    /// Build a snapshot reusing a pooled entity buffer.
    pub fn snapshot_into(&mut self, mut entities: Vec<EntitySnapshot>) -> Snapshot {
        Snapshot::fill_entities(&mut self.world, &mut entities);
        let session = self
            .world
            .get_resource::<SessionStats>()
            .copied()
            .unwrap_or_default();
        Snapshot {
            tick: self.tick,
            time: self.time,
            paused: self.paused,
            entities,
            session: session.into(),
        }
    }

    pub fn session_stats(&self) -> SessionStats {
        self.world
            .get_resource::<SessionStats>()
            .copied()
            .unwrap_or_default()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn current_time(&self) -> f32 {
        self.time
    }

    /// Direct access to the ECS world (advanced usage, tests).
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    #[test]
    fn test_new_world_starts_at_tick_zero() {
        let sim = SimWorld::new();
        assert_eq!(sim.current_tick(), 0);
    }

    #[test]
    fn test_step_runs_fixed_updates() {
        let mut sim = SimWorld::new();
        for _ in 0..6 {
            sim.step(FRAME);
        }
        assert_eq!(sim.current_tick(), 6, "one whole tick per timestep");
    }

    #[test]
    fn test_delta_clamp_bounds_catch_up() {
        let mut sim = SimWorld::new();
        // A 10 second stall is clamped to 50 ms: at most 3 ticks, not 600.
        sim.step(10.0);
        assert!(sim.current_tick() >= 1);
        assert!(sim.current_tick() <= 3);
    }

    #[test]
    fn test_queued_spawn_visible_next_tick_not_before() {
        let mut sim = SimWorld::new();
        sim.queue_spawn(SpawnRequest::Player { x: 0.0, y: 0.0 });

        assert!(sim.snapshot().entities.is_empty(), "not visible this frame");
        sim.step(FRAME);
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.entities.len(), 1);
        assert_eq!(snapshot.entities[0].kind, "player");
    }

    #[test]
    fn test_queued_despawn_flips_flag_then_sweeps() {
        let mut sim = SimWorld::new();
        let zombie = sim.spawn_now(SpawnRequest::Zombie {
            kind: ZombieKind::Walker,
            x: 100.0,
            y: 0.0,
            hp_mult: 1.0,
        });
        sim.spawn_now(SpawnRequest::Player { x: 0.0, y: 0.0 });

        sim.queue_despawn(zombie);
        sim.step(FRAME);

        let snapshot = sim.snapshot();
        assert!(
            !snapshot.entities.iter().any(|e| e.id == zombie.0),
            "despawned entity swept by end of frame"
        );
    }

    #[test]
    fn test_pause_skips_systems_but_snapshots_continue() {
        let mut sim = SimWorld::new();
        sim.spawn_now(SpawnRequest::Player { x: 0.0, y: 0.0 });
        sim.spawn_now(SpawnRequest::Zombie {
            kind: ZombieKind::Walker,
            x: 10.0,
            y: 0.0,
            hp_mult: 1.0,
        });
        sim.step(FRAME);
        let tick = sim.current_tick();

        sim.pause();
        sim.step(0.05);
        assert_eq!(sim.current_tick(), tick, "no ticks while paused");

        let snapshot = sim.snapshot();
        assert!(snapshot.paused);
        assert_eq!(snapshot.entities.len(), 3, "frozen world still visible");

        sim.resume();
        sim.step(FRAME);
        assert!(sim.current_tick() > tick);
    }

    #[test]
    fn test_clear_is_deferred_to_next_tick() {
        let mut sim = SimWorld::new();
        sim.spawn_now(SpawnRequest::Player { x: 0.0, y: 0.0 });
        sim.step(FRAME);

        sim.clear();
        // Not yet applied: readers keep seeing the old state.
        assert_eq!(sim.snapshot().entities.len(), 1);

        sim.step(FRAME);
        let snapshot = sim.snapshot();
        assert!(snapshot.entities.is_empty());
        assert_eq!(snapshot.session.kills, 0);
    }

    #[test]
    fn test_zombie_chases_player_end_to_end() {
        let mut sim = SimWorld::new();
        sim.spawn_now(SpawnRequest::Player { x: 0.0, y: 0.0 });
        let zombie = sim.spawn_now(SpawnRequest::Zombie {
            kind: ZombieKind::Walker,
            x: 20.0,
            y: 0.0,
            hp_mult: 1.0,
        });

        for _ in 0..30 {
            sim.step(FRAME);
        }

        let snapshot = sim.snapshot();
        let z = snapshot.entities.iter().find(|e| e.id == zombie.0).unwrap();
        assert!(z.x < 20.0, "zombie closed distance toward the player");
    }

    #[test]
    fn test_collision_listener_fires_synchronously() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut sim = SimWorld::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        sim.add_collision_listener(move |event| {
            if event.split(Layer::Player).is_some() {
                seen.fetch_add(1, Ordering::Relaxed);
            }
        });

        sim.spawn_now(SpawnRequest::Player { x: 0.0, y: 0.0 });
        sim.spawn_now(SpawnRequest::Zombie {
            kind: ZombieKind::Walker,
            x: 1.0,
            y: 0.0,
            hp_mult: 1.0,
        });

        sim.step(FRAME);
        assert!(hits.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_player_input_moves_player() {
        let mut sim = SimWorld::new();
        let player = sim.spawn_now(SpawnRequest::Player { x: 0.0, y: 0.0 });
        sim.set_player_input(1.0, 0.0);

        for _ in 0..60 {
            sim.step(FRAME);
        }

        let snapshot = sim.snapshot();
        let p = snapshot.entities.iter().find(|e| e.id == player.0).unwrap();
        assert!(p.x > 5.0, "one second at move_speed 7 covers ~7 units");
    }

    #[test]
    fn test_wave_pressure_respects_enemy_cap_over_a_minute() {
        let mut sim = SimWorld::with_config(SimConfig {
            enemy_cap: 60,
            ..Default::default()
        });
        sim.spawn_now(SpawnRequest::Player { x: 0.0, y: 0.0 });

        // Jump the difficulty clock past the 15-minute breakpoint.
        sim.world_mut().resource_mut::<WaveSpawner>().elapsed = 950.0;

        // One simulated minute at max spawn pressure.
        for _ in 0..(60 * 60) {
            sim.step(FRAME);
            let snapshot = sim.snapshot();
            let enemies = snapshot
                .entities
                .iter()
                .filter(|e| e.kind != "player" && e.kind != "projectile" && e.kind != "pickup")
                .count();
            assert!(enemies <= 60, "active enemy count must never exceed the cap");
        }

        assert!(sim.current_tick() >= 3600);
    }

    #[test]
    fn test_melee_weapon_spawns_sweep_hitbox() {
        let mut sim = SimWorld::new();
        sim.spawn_now(SpawnRequest::Player { x: 0.0, y: 0.0 });
        sim.set_player_weapon(WeaponKind::Melee);
        sim.spawn_now(SpawnRequest::Zombie {
            kind: ZombieKind::Walker,
            x: 4.0,
            y: 0.0,
            hp_mult: 1.0,
        });

        sim.step(FRAME);

        let mut query = sim.world_mut().query::<&Projectile>();
        let sweeps: Vec<_> = query.iter(sim.world()).collect();
        assert_eq!(sweeps.len(), 1);
        assert!(sweeps[0].penetrating, "melee arcs sweep through the horde");
        assert!(sweeps[0].lifetime.is_some(), "bounded by lifetime, not distance");
    }

    #[test]
    fn test_session_stats_track_survival_time() {
        let mut sim = SimWorld::new();
        sim.spawn_now(SpawnRequest::Player { x: 0.0, y: 0.0 });
        for _ in 0..60 {
            sim.step(FRAME);
        }
        let stats = sim.session_stats();
        assert!((stats.survival_time - 1.0).abs() < 0.02);
    }
}

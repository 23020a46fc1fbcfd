//! AI system: per-entity behavior state machine.
//!
//! Each zombie kind is permanently assigned one [`Behavior`] at spawn; what
//! cycles over time are the sub-states within that behavior (a charger
//! alternates between approaching and charging, a shaman between moving and
//! pulsing buffs). Entities missing any required component (Transform,
//! Velocity, Stats) simply fall out of the query and are skipped for the
//! frame; that is not an error.
//!
//! Side-effect spawns (spitter projectiles) go through `Commands`, so the
//! AI system never owns entity storage; detonations and buffs are queued
//! into resources consumed later in the same frame by the combat and buff
//! systems, a gather/apply split that keeps this system's borrows disjoint.

use crate::components::*;
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;

/// RANGED: fixed re-attack interval, seconds.
pub const RANGED_ATTACK_INTERVAL: f32 = 2.0;
/// RANGED: spit projectile tuning.
pub const SPIT_SPEED: f32 = 14.0;
pub const SPIT_RADIUS: f32 = 0.4;
pub const SPIT_MAX_DISTANCE: f32 = 20.0;

/// EXPLODE: blast radius around the detonation point.
pub const EXPLOSION_RADIUS: f32 = 3.5;

/// CHARGE: speed multiple, committed duration, and rest period.
pub const CHARGE_SPEED_MULT: f32 = 3.0;
pub const CHARGE_DURATION: f32 = 0.8;
pub const CHARGE_COOLDOWN: f32 = 4.0;

/// BUFF: pulse interval, buff length, granted multipliers, stand-off range.
pub const BUFF_INTERVAL: f32 = 5.0;
pub const BUFF_DURATION: f32 = 4.0;
pub const BUFF_SPEED_MULT: f32 = 1.5;
pub const BUFF_DAMAGE_MULT: f32 = 1.5;
pub const BUFF_STANDOFF: f32 = 6.0;

/// A pending area damage burst, applied by the combat system this frame.
#[derive(Debug, Clone, Copy)]
pub struct ExplosionRequest {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Raw damage before target armor mitigation.
    pub damage: f32,
}

#[derive(Resource, Debug, Default)]
pub struct ExplosionQueue(pub Vec<ExplosionRequest>);

/// A pending ally buff, applied by [`buff_system`] this frame.
#[derive(Debug, Clone, Copy)]
pub struct BuffRequest {
    pub target: Entity,
    pub speed_mult: f32,
    pub damage_mult: f32,
    pub duration: f32,
}

#[derive(Resource, Debug, Default)]
pub struct BuffQueue(pub Vec<BuffRequest>);

/// System that runs every AI agent's behavior for one frame.
///
/// ## Data Access
/// - Reads: DeltaTime, player Transform
/// - Writes: Velocity, AiAgent, Active (enemies), ExplosionQueue, BuffQueue
pub fn ai_system(
    dt: Res<DeltaTime>,
    mut explosions: ResMut<ExplosionQueue>,
    mut buffs: ResMut<BuffQueue>,
    mut commands: Commands,
    player_q: Query<&Transform, With<PlayerTag>>,
    mut ai_q: Query<
        (
            Entity,
            &Transform,
            &mut Velocity,
            &mut AiAgent,
            &Stats,
            &mut Active,
        ),
        Without<PlayerTag>,
    >,
) {
    let delta = dt.0;
    let Ok(player) = player_q.get_single() else {
        // No player: everyone idles in place.
        for (_, _, mut vel, _, _, active) in ai_q.iter_mut() {
            if active.0 {
                vel.vx = 0.0;
                vel.vy = 0.0;
            }
        }
        return;
    };
    let (px, py) = (player.x, player.y);

    // Snapshot pass for the shaman ally scan; iterating the same query
    // mutably below must not observe half-updated neighbors.
    let allies: Vec<(Entity, f32, f32, Behavior)> = ai_q
        .iter()
        .filter(|(_, _, _, _, _, active)| active.0)
        .map(|(entity, t, _, ai, _, _)| (entity, t.x, t.y, ai.behavior))
        .collect();

    for (entity, t, mut vel, mut ai, stats, mut active) in ai_q.iter_mut() {
        if !active.0 {
            continue;
        }

        let dx = px - t.x;
        let dy = py - t.y;
        let d = (dx * dx + dy * dy).sqrt();
        let (nx, ny) = if d > 1e-4 { (dx / d, dy / d) } else { (0.0, 0.0) };
        let chase = |vel: &mut Velocity| {
            vel.vx = nx * stats.move_speed;
            vel.vy = ny * stats.move_speed;
        };

        match ai.behavior {
            Behavior::Idle => {
                vel.vx = 0.0;
                vel.vy = 0.0;
            }
            Behavior::Chase => chase(&mut *vel),
            Behavior::Flee => {
                vel.vx = -nx * stats.move_speed;
                vel.vy = -ny * stats.move_speed;
            }
            Behavior::Ranged => {
                // Cooldown ticks every frame regardless of range.
                ai.state.attack_cooldown -= delta;
                if d > ai.range {
                    chase(&mut *vel);
                } else {
                    vel.vx = 0.0;
                    vel.vy = 0.0;
                    if ai.state.attack_cooldown <= 0.0 {
                        ai.state.attack_cooldown = RANGED_ATTACK_INTERVAL;
                        commands.spawn(ProjectileBundle::new(
                            Projectile::bullet(
                                ProjectileSource::Enemy,
                                stats.base_damage * stats.damage_mult,
                                SPIT_SPEED,
                                SPIT_MAX_DISTANCE,
                            ),
                            t.x,
                            t.y,
                            nx,
                            ny,
                            SPIT_RADIUS,
                        ));
                    }
                }
            }
            Behavior::Explode => {
                if ai.state.detonated {
                    // Latched: never detonate twice even if the sweep has
                    // not removed us yet.
                    continue;
                }
                if d > ai.range {
                    chase(&mut *vel);
                } else {
                    ai.state.detonated = true;
                    active.0 = false;
                    vel.vx = 0.0;
                    vel.vy = 0.0;
                    explosions.0.push(ExplosionRequest {
                        x: t.x,
                        y: t.y,
                        radius: EXPLOSION_RADIUS,
                        damage: stats.base_damage * stats.damage_mult,
                    });
                    log::debug!("bomber {entity:?} detonated at ({:.1}, {:.1})", t.x, t.y);
                }
            }
            Behavior::Charge => {
                if let Some((tx, ty)) = ai.state.charge_target {
                    // Committed charge toward the locked point.
                    ai.state.charge_timer -= delta;
                    if ai.state.charge_timer <= 0.0 {
                        ai.state.charge_target = None;
                        ai.state.charge_cooldown = CHARGE_COOLDOWN;
                        vel.vx = 0.0;
                        vel.vy = 0.0;
                    } else {
                        let cdx = tx - t.x;
                        let cdy = ty - t.y;
                        let cd = (cdx * cdx + cdy * cdy).sqrt();
                        let speed = stats.move_speed * CHARGE_SPEED_MULT;
                        if cd > 1e-4 {
                            vel.vx = cdx / cd * speed;
                            vel.vy = cdy / cd * speed;
                        } else {
                            vel.vx = 0.0;
                            vel.vy = 0.0;
                        }
                    }
                } else {
                    ai.state.charge_cooldown = (ai.state.charge_cooldown - delta).max(0.0);
                    if d <= ai.range && ai.state.charge_cooldown <= 0.0 {
                        // Lock the player's position at charge start; the
                        // charge does not track them afterwards.
                        ai.state.charge_target = Some((px, py));
                        ai.state.charge_timer = CHARGE_DURATION;
                        let speed = stats.move_speed * CHARGE_SPEED_MULT;
                        vel.vx = nx * speed;
                        vel.vy = ny * speed;
                    } else {
                        chase(&mut *vel);
                    }
                }
            }
            Behavior::Buff => {
                if d > BUFF_STANDOFF {
                    chase(&mut *vel);
                } else {
                    vel.vx = 0.0;
                    vel.vy = 0.0;
                }
                ai.state.buff_timer -= delta;
                if ai.state.buff_timer <= 0.0 {
                    ai.state.buff_timer = BUFF_INTERVAL;
                    let range_sq = ai.range * ai.range;
                    for &(ally, ax, ay, behavior) in &allies {
                        if ally == entity || behavior == Behavior::Buff {
                            continue;
                        }
                        let adx = ax - t.x;
                        let ady = ay - t.y;
                        if adx * adx + ady * ady <= range_sq {
                            buffs.0.push(BuffRequest {
                                target: ally,
                                speed_mult: BUFF_SPEED_MULT,
                                damage_mult: BUFF_DAMAGE_MULT,
                                duration: BUFF_DURATION,
                            });
                        }
                    }
                }
            }
        }
    }
}

/// System that applies and expires ally buffs.
///
/// The pre-buff values are snapshotted on application and written back
/// verbatim on expiry. Re-deriving them by inverse multiplication would
/// drift across repeated buff cycles; restoring the snapshot cannot.
pub fn buff_system(
    dt: Res<DeltaTime>,
    mut queue: ResMut<BuffQueue>,
    mut query: Query<(&mut Stats, &mut Buffed)>,
) {
    let delta = dt.0;

    for request in queue.0.drain(..) {
        let Ok((mut stats, mut buffed)) = query.get_mut(request.target) else {
            continue;
        };
        if !buffed.active {
            buffed.orig_move_speed = stats.move_speed;
            buffed.orig_damage_mult = stats.damage_mult;
            stats.move_speed *= request.speed_mult;
            stats.damage_mult *= request.damage_mult;
            buffed.active = true;
        }
        // Re-buffing an already-buffed ally refreshes the countdown without
        // re-snapshotting (the snapshot still holds the true baseline).
        buffed.timer = request.duration;
    }

    for (mut stats, mut buffed) in query.iter_mut() {
        if !buffed.active {
            continue;
        }
        buffed.timer -= delta;
        if buffed.timer <= 0.0 {
            stats.move_speed = buffed.orig_move_speed;
            stats.damage_mult = buffed.orig_damage_mult;
            buffed.active = false;
            buffed.timer = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::combat::explosion_system;

    fn ai_world() -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0 / 60.0));
        world.insert_resource(ExplosionQueue::default());
        world.insert_resource(BuffQueue::default());
        let mut schedule = Schedule::default();
        schedule.add_systems((ai_system, buff_system, explosion_system).chain());
        (world, schedule)
    }

    fn spawn_player(world: &mut World, x: f32, y: f32) -> Entity {
        world.spawn(PlayerBundle::new(x, y)).id()
    }

    #[test]
    fn test_chase_velocity_points_at_player_with_move_speed() {
        let (mut world, mut schedule) = ai_world();
        spawn_player(&mut world, 0.0, 0.0);

        let zombie = world
            .spawn((
                Transform::new(100.0, 0.0),
                Velocity::default(),
                AiAgent::new(Behavior::Chase, 0.0),
                Stats {
                    move_speed: 10.0,
                    ..Default::default()
                },
                Active(true),
            ))
            .id();

        schedule.run(&mut world);

        let vel = world.get::<Velocity>(zombie).unwrap();
        assert!((vel.vx - (-10.0)).abs() < 0.001);
        assert!(vel.vy.abs() < 0.001);
        assert!((vel.magnitude() - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_flee_velocity_points_away_from_player() {
        let (mut world, mut schedule) = ai_world();
        spawn_player(&mut world, 0.0, 0.0);

        let zombie = world
            .spawn((
                Transform::new(10.0, 0.0),
                Velocity::default(),
                AiAgent::new(Behavior::Flee, 0.0),
                Stats {
                    move_speed: 6.0,
                    ..Default::default()
                },
                Active(true),
            ))
            .id();

        schedule.run(&mut world);

        let vel = world.get::<Velocity>(zombie).unwrap();
        assert!((vel.vx - 6.0).abs() < 0.001);
    }

    #[test]
    fn test_idle_applies_zero_velocity() {
        let (mut world, mut schedule) = ai_world();
        spawn_player(&mut world, 0.0, 0.0);

        let zombie = world
            .spawn((
                Transform::new(5.0, 0.0),
                Velocity::new(3.0, 3.0),
                AiAgent::new(Behavior::Idle, 0.0),
                Stats::default(),
                Active(true),
            ))
            .id();

        schedule.run(&mut world);
        let vel = world.get::<Velocity>(zombie).unwrap();
        assert_eq!((vel.vx, vel.vy), (0.0, 0.0));
    }

    #[test]
    fn test_ranged_in_range_stops_and_fires_exactly_once() {
        let (mut world, mut schedule) = ai_world();
        spawn_player(&mut world, 0.0, 0.0);

        let spitter = world
            .spawn((
                Transform::new(5.0, 0.0),
                Velocity::new(1.0, 0.0),
                AiAgent::new(Behavior::Ranged, 12.0),
                Stats {
                    move_speed: 4.5,
                    base_damage: 7.0,
                    ..Default::default()
                },
                Active(true),
            ))
            .id();

        schedule.run(&mut world);

        let vel = world.get::<Velocity>(spitter).unwrap();
        assert_eq!((vel.vx, vel.vy), (0.0, 0.0));

        let mut projectiles = world.query::<&Projectile>();
        assert_eq!(projectiles.iter(&world).count(), 1);

        // Cooldown is now running: the next frame must not fire again.
        schedule.run(&mut world);
        let mut projectiles = world.query::<&Projectile>();
        assert_eq!(projectiles.iter(&world).count(), 1);
    }

    #[test]
    fn test_ranged_beyond_range_chases() {
        let (mut world, mut schedule) = ai_world();
        spawn_player(&mut world, 0.0, 0.0);

        let spitter = world
            .spawn((
                Transform::new(50.0, 0.0),
                Velocity::default(),
                AiAgent::new(Behavior::Ranged, 12.0),
                Stats {
                    move_speed: 4.5,
                    base_damage: 7.0,
                    ..Default::default()
                },
                Active(true),
            ))
            .id();

        schedule.run(&mut world);

        let vel = world.get::<Velocity>(spitter).unwrap();
        assert!(vel.vx < 0.0, "closing in on the player");
        let mut projectiles = world.query::<&Projectile>();
        assert_eq!(projectiles.iter(&world).count(), 0);
    }

    #[test]
    fn test_explode_detonates_exactly_once() {
        let (mut world, mut schedule) = ai_world();
        let player = spawn_player(&mut world, 0.0, 0.0);

        let bomber = world
            .spawn((
                Transform::new(1.0, 0.0),
                Velocity::default(),
                AiAgent::new(Behavior::Explode, 2.5),
                Stats {
                    move_speed: 5.5,
                    base_damage: 25.0,
                    ..Default::default()
                },
                Active(true),
            ))
            .id();

        schedule.run(&mut world);

        // Player armor 1: 25 raw -> 24 net.
        let hp_after = world.get::<Health>(player).unwrap().current;
        assert_eq!(hp_after, 76);
        assert!(!world.get::<Active>(bomber).unwrap().0);
        assert!(world.get::<AiAgent>(bomber).unwrap().state.detonated);

        // A second frame (sweep not yet run) must not re-detonate.
        schedule.run(&mut world);
        assert_eq!(world.get::<Health>(player).unwrap().current, 76);
    }

    #[test]
    fn test_charge_begins_runs_and_cools_down() {
        let (mut world, mut schedule) = ai_world();
        spawn_player(&mut world, 0.0, 0.0);

        let charger = world
            .spawn((
                Transform::new(5.0, 0.0),
                Velocity::default(),
                AiAgent::new(Behavior::Charge, 10.0),
                Stats {
                    move_speed: 4.0,
                    ..Default::default()
                },
                Active(true),
            ))
            .id();

        // In range with cooldown elapsed: charge starts immediately.
        schedule.run(&mut world);
        {
            let ai = world.get::<AiAgent>(charger).unwrap();
            assert!(ai.state.charge_target.is_some());
            let vel = world.get::<Velocity>(charger).unwrap();
            assert!((vel.magnitude() - 4.0 * CHARGE_SPEED_MULT).abs() < 0.001);
        }

        // Run past the charge duration.
        let frames = (CHARGE_DURATION / (1.0 / 60.0)).ceil() as usize + 1;
        for _ in 0..frames {
            schedule.run(&mut world);
        }
        {
            let ai = world.get::<AiAgent>(charger).unwrap();
            assert!(ai.state.charge_target.is_none(), "charge ended");
            assert!(ai.state.charge_cooldown > 0.0, "cooldown started");
        }

        // With the cooldown running, the next frame is a normal chase.
        schedule.run(&mut world);
        let vel = world.get::<Velocity>(charger).unwrap();
        assert!((vel.magnitude() - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_buff_targets_only_non_buff_allies_and_restores_exactly() {
        let (mut world, mut schedule) = ai_world();
        spawn_player(&mut world, 100.0, 0.0);

        let shaman = world
            .spawn((
                Transform::new(0.0, 0.0),
                Velocity::default(),
                AiAgent::new(Behavior::Buff, 9.0),
                Stats {
                    move_speed: 3.5,
                    ..Default::default()
                },
                Buffed::default(),
                Active(true),
            ))
            .id();
        let walker = world
            .spawn((
                Transform::new(3.0, 0.0),
                Velocity::default(),
                AiAgent::new(Behavior::Chase, 0.0),
                Stats {
                    move_speed: 4.0,
                    ..Default::default()
                },
                Buffed::default(),
                Active(true),
            ))
            .id();
        let other_shaman = world
            .spawn((
                Transform::new(-3.0, 0.0),
                Velocity::default(),
                AiAgent::new(Behavior::Buff, 9.0),
                Stats {
                    move_speed: 3.5,
                    ..Default::default()
                },
                Buffed::default(),
                Active(true),
            ))
            .id();
        let far_walker = world
            .spawn((
                Transform::new(50.0, 0.0),
                Velocity::default(),
                AiAgent::new(Behavior::Chase, 0.0),
                Stats {
                    move_speed: 4.0,
                    ..Default::default()
                },
                Buffed::default(),
                Active(true),
            ))
            .id();

        schedule.run(&mut world);

        let stats = world.get::<Stats>(walker).unwrap();
        assert!((stats.move_speed - 6.0).abs() < 0.001, "walker buffed");
        assert!((stats.damage_mult - 1.5).abs() < 0.001);
        assert!(world.get::<Buffed>(walker).unwrap().active);

        assert!(!world.get::<Buffed>(other_shaman).unwrap().active);
        assert!(!world.get::<Buffed>(far_walker).unwrap().active);
        assert!(!world.get::<Buffed>(shaman).unwrap().active);

        // Run out the buff and confirm a bit-for-bit restore.
        let frames = (BUFF_DURATION / (1.0 / 60.0)).ceil() as usize + 1;
        for _ in 0..frames {
            schedule.run(&mut world);
        }
        let stats = world.get::<Stats>(walker).unwrap();
        assert_eq!(stats.move_speed, 4.0);
        assert_eq!(stats.damage_mult, 1.0);
        assert!(!world.get::<Buffed>(walker).unwrap().active);
    }

    #[test]
    fn test_entity_missing_stats_is_skipped() {
        let (mut world, mut schedule) = ai_world();
        spawn_player(&mut world, 0.0, 0.0);

        // No Stats component: the query does not match, nothing breaks.
        let limping = world
            .spawn((
                Transform::new(10.0, 0.0),
                Velocity::new(1.0, 1.0),
                AiAgent::new(Behavior::Chase, 0.0),
                Active(true),
            ))
            .id();

        schedule.run(&mut world);

        let vel = world.get::<Velocity>(limping).unwrap();
        assert_eq!((vel.vx, vel.vy), (1.0, 1.0), "velocity untouched");
    }
}

//! Snapshot types: the immutable per-frame view of the simulation.
//!
//! Once per frame the scheduler builds a fresh `Snapshot` from the live
//! entity list and publishes it behind an `Arc`; the renderer and UI read
//! it without ever touching components. Snapshots are serde-serializable
//! so a presentation layer in another process (or language) can consume
//! them as JSON.

use crate::components::*;
use crate::systems::lifecycle::SessionStats;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// One entity's render-relevant state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Stable public identity (`Entity::to_bits`).
    pub id: u64,
    /// Role name: "player", a zombie kind, "boss:<kind>", "projectile",
    /// "pickup", "obstacle" or "turret".
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale: f32,
    pub vx: f32,
    pub vy: f32,
    pub hp: i32,
    pub hp_max: i32,
    /// Projectile fade state, 1.0 for everything else.
    pub opacity: f32,
}

/// Session summary mirrored into every snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub kills: u64,
    pub bosses_defeated: u64,
    pub xp: u64,
    pub survival_time: f32,
    pub game_over: bool,
}

impl From<SessionStats> for SessionSummary {
    fn from(stats: SessionStats) -> Self {
        Self {
            kills: stats.kills,
            bosses_defeated: stats.bosses_defeated,
            xp: stats.xp,
            survival_time: stats.survival_time,
            game_over: stats.game_over,
        }
    }
}

/// Complete simulation state snapshot for cross-thread readers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation tick the snapshot was taken on.
    pub tick: u64,
    /// Elapsed simulation time, seconds.
    pub time: f32,
    pub paused: bool,
    pub entities: Vec<EntitySnapshot>,
    pub session: SessionSummary,
}

impl Snapshot {
    /// Build a snapshot from the ECS world into a (possibly recycled)
    /// entity buffer.
    pub fn from_world(world: &mut World, tick: u64, time: f32, paused: bool) -> Self {
        let mut entities = Vec::new();
        Self::fill_entities(world, &mut entities);
        let session = world
            .get_resource::<SessionStats>()
            .copied()
            .unwrap_or_default();
        Self {
            tick,
            time,
            paused,
            entities,
            session: session.into(),
        }
    }

    /// Fill `out` with the live entity list. Separated so callers can
    /// reuse pooled buffers instead of allocating each frame.
    pub fn fill_entities(world: &mut World, out: &mut Vec<EntitySnapshot>) {
        out.clear();

        let mut query = world.query::<(
            Entity,
            &Transform,
            &Active,
            Option<&Velocity>,
            Option<&Health>,
            Option<&PlayerTag>,
            Option<&ZombieKind>,
            Option<&BossKind>,
            Option<&Projectile>,
            Option<&PickupKind>,
            Option<&ObstacleTag>,
            Option<&TurretTag>,
        )>();

        for (entity, transform, active, vel, health, player, zombie, boss, projectile, pickup, obstacle, turret) in
            query.iter(world)
        {
            if !active.0 {
                continue;
            }

            let kind = if player.is_some() {
                "player".to_string()
            } else if let Some(z) = zombie {
                z.name().to_string()
            } else if let Some(b) = boss {
                format!("boss:{}", b.name())
            } else if projectile.is_some() {
                "projectile".to_string()
            } else if pickup.is_some() {
                "pickup".to_string()
            } else if obstacle.is_some() {
                "obstacle".to_string()
            } else if turret.is_some() {
                "turret".to_string()
            } else {
                continue;
            };

            out.push(EntitySnapshot {
                id: entity.to_bits(),
                kind,
                x: transform.x,
                y: transform.y,
                rotation: transform.rotation,
                scale: transform.scale,
                vx: vel.map_or(0.0, |v| v.vx),
                vy: vel.map_or(0.0, |v| v.vy),
                hp: health.map_or(0, |h| h.current),
                hp_max: health.map_or(0, |h| h.max),
                opacity: projectile.map_or(1.0, |p| p.opacity),
            });
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_captures_live_entities_with_kinds() {
        let mut world = World::new();
        world.insert_resource(SessionStats::default());
        world.spawn(PlayerBundle::new(1.0, 2.0));
        world.spawn(ZombieBundle::new(ZombieKind::Runner, 5.0, 5.0, 1.0));
        world.spawn(ObstacleBundle::new(0.0, 0.0, 2.0, 2.0));

        let snapshot = Snapshot::from_world(&mut world, 7, 0.5, false);

        assert_eq!(snapshot.tick, 7);
        assert_eq!(snapshot.entities.len(), 3);
        assert!(snapshot.entities.iter().any(|e| e.kind == "player"));
        assert!(snapshot.entities.iter().any(|e| e.kind == "runner"));
        assert!(snapshot.entities.iter().any(|e| e.kind == "obstacle"));
    }

    #[test]
    fn test_snapshot_excludes_inactive_entities() {
        let mut world = World::new();
        let zombie = world
            .spawn(ZombieBundle::new(ZombieKind::Walker, 0.0, 0.0, 1.0))
            .id();
        world.get_mut::<Active>(zombie).unwrap().0 = false;

        let snapshot = Snapshot::from_world(&mut world, 0, 0.0, false);
        assert!(snapshot.entities.is_empty());
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let mut world = World::new();
        world.insert_resource(SessionStats {
            kills: 12,
            xp: 30,
            ..Default::default()
        });
        world.spawn(PlayerBundle::new(0.0, 0.0));

        let snapshot = Snapshot::from_world(&mut world, 42, 2.1, true);
        let json = snapshot.to_json().unwrap();
        let restored: Snapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.tick, 42);
        assert!(restored.paused);
        assert_eq!(restored.session.kills, 12);
        assert_eq!(restored.entities.len(), 1);
        assert_eq!(restored.entities[0].kind, "player");
    }

    #[test]
    fn test_ids_are_stable_entity_bits() {
        let mut world = World::new();
        let player = world.spawn(PlayerBundle::new(0.0, 0.0)).id();

        let snapshot = Snapshot::from_world(&mut world, 0, 0.0, false);
        assert_eq!(snapshot.entities[0].id, player.to_bits());
    }
}

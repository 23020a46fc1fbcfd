//! End-of-frame lifecycle sweep and session accounting.
//!
//! Systems never despawn entities mid-pass; they flip the `Active` flag or
//! drive `Health` to zero and this sweep removes the bodies in one
//! compacting pass at the end of the frame. Each death is observed exactly
//! once, because the dead entity is gone before the next frame starts.

use crate::components::*;
use bevy_ecs::prelude::*;

/// Session summary consumed by meta-progression at run end.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SessionStats {
    pub kills: u64,
    pub bosses_defeated: u64,
    pub xp: u64,
    /// Seconds survived; the scheduler keeps this in step with sim time.
    pub survival_time: f32,
    pub game_over: bool,
}

/// System that sweeps dead and deactivated entities, tallies kills, and
/// drops XP pickups where zombies fell.
pub fn lifecycle_system(
    mut commands: Commands,
    mut session: ResMut<SessionStats>,
    query: Query<(
        Entity,
        &Active,
        Option<&Health>,
        Option<&Transform>,
        Option<&ZombieKind>,
        Option<&BossKind>,
        Option<&PlayerTag>,
    )>,
) {
    for (entity, active, health, transform, zombie, boss, player) in query.iter() {
        let dead = !active.0 || health.is_some_and(|h| !h.is_alive());
        if !dead {
            continue;
        }

        if let Some(kind) = zombie {
            session.kills += 1;
            if let Some(t) = transform {
                commands.spawn(PickupBundle::new(
                    PickupKind::Xp(zombie_stats(*kind).xp),
                    t.x,
                    t.y,
                ));
            }
        } else if let Some(kind) = boss {
            session.kills += 1;
            session.bosses_defeated += 1;
            log::info!("boss {} defeated", kind.name());
            if let Some(t) = transform {
                commands.spawn(PickupBundle::new(
                    PickupKind::Xp(boss_stats(*kind).xp),
                    t.x,
                    t.y,
                ));
            }
        } else if player.is_some() {
            session.game_over = true;
            log::info!(
                "player down after {:.1}s, {} kills",
                session.survival_time,
                session.kills
            );
        }

        commands.entity(entity).despawn();
    }
}

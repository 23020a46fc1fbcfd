//! Pickup collection and attraction.

use crate::collision::CollisionEvents;
use crate::components::*;
use crate::systems::lifecycle::SessionStats;
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;

/// Base attraction radius, scaled by the player's pickup-radius modifier.
pub const PICKUP_ATTRACT_RADIUS: f32 = 3.0;
/// Drift speed of attracted pickups.
const PICKUP_ATTRACT_SPEED: f32 = 12.0;

/// System that drifts pickups toward the player once they enter the
/// (modifier-scaled) attraction radius.
pub fn pickup_attract_system(
    _dt: Res<DeltaTime>,
    player_q: Query<(&Transform, &Stats), With<PlayerTag>>,
    mut pickup_q: Query<(&Transform, &mut Velocity, &Active), (With<PickupKind>, Without<PlayerTag>)>,
) {
    let Ok((player, stats)) = player_q.get_single() else {
        return;
    };
    let radius = PICKUP_ATTRACT_RADIUS * stats.pickup_radius_mult;
    let radius_sq = radius * radius;

    for (transform, mut vel, active) in pickup_q.iter_mut() {
        if !active.0 {
            continue;
        }
        let dx = player.x - transform.x;
        let dy = player.y - transform.y;
        let dist_sq = dx * dx + dy * dy;
        if dist_sq <= radius_sq && dist_sq > 1e-6 {
            let d = dist_sq.sqrt();
            vel.vx = dx / d * PICKUP_ATTRACT_SPEED;
            vel.vy = dy / d * PICKUP_ATTRACT_SPEED;
        } else {
            vel.vx = 0.0;
            vel.vy = 0.0;
        }
    }
}

/// System that collects pickups the player touched this frame. XP is
/// scaled by the player's XP modifier; health pickups heal immediately.
pub fn pickup_collect_system(
    events: Res<CollisionEvents>,
    mut session: ResMut<SessionStats>,
    mut player_q: Query<(&mut Health, &Stats), With<PlayerTag>>,
    mut pickup_q: Query<(&mut Active, &PickupKind), Without<PlayerTag>>,
) {
    for event in events.0.iter() {
        let Some((pickup, player, other_layer)) = event.split(Layer::Pickup) else {
            continue;
        };
        if other_layer != Layer::Player {
            continue;
        }
        let Ok((mut active, kind)) = pickup_q.get_mut(pickup) else {
            continue;
        };
        if !active.0 {
            continue;
        }
        let Ok((mut health, stats)) = player_q.get_mut(player) else {
            continue;
        };

        match *kind {
            PickupKind::Xp(amount) => {
                session.xp += (amount as f32 * stats.xp_mult).round() as u64;
            }
            PickupKind::Health(amount) => {
                health.heal(amount);
            }
        }
        active.0 = false;
    }
}

//! Combat pipeline: auto-aim, weapon cooldowns, projectile lifecycle, and
//! damage resolution.
//!
//! ## Damage formula
//!
//! One formula everywhere: `net = max(1, round(base * damage_mult) - armor)`.
//! Armor is a flat subtraction and a landed hit always removes at least one
//! HP. Contact damage additionally respects the target's invincibility
//! window (see [`Health::apply_damage`]); projectile and explosion damage
//! bypass it.

use crate::collision::CollisionEvents;
use crate::components::*;
use crate::systems::ai::ExplosionQueue;
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;

/// Auto-aim scan range around the player.
pub const AUTO_AIM_RANGE: f32 = 20.0;

/// Shotgun pellet count and angular spread (radians).
const SHOTGUN_PELLETS: usize = 3;
const SHOTGUN_SPREAD: f32 = 0.18;

/// Sweep hitbox lifetimes.
const MELEE_SWEEP_LIFETIME: f32 = 0.2;
const FLAME_SWEEP_LIFETIME: f32 = 0.3;

/// The single damage mitigation formula: flat armor subtraction, floored
/// at 1 so a landed hit is never a no-op.
#[inline]
pub fn mitigate_damage(base: f32, damage_mult: f32, armor: i32) -> i32 {
    let raw = (base * damage_mult).round() as i32;
    (raw - armor).max(1)
}

/// System that orients the player's weapon toward the strictly nearest
/// living enemy by squared distance (ties: first encountered). With no
/// target in range the previous facing is retained rather than snapping
/// to a default.
pub fn auto_aim_system(
    mut player_q: Query<(&mut Transform, &mut Weapon), With<PlayerTag>>,
    target_q: Query<(&Transform, &Health, &Active), (With<AiAgent>, Without<PlayerTag>)>,
) {
    for (mut transform, mut weapon) in player_q.iter_mut() {
        let mut best: Option<(f32, f32, f32)> = None; // (dist_sq, x, y)
        let max_sq = AUTO_AIM_RANGE * AUTO_AIM_RANGE;

        for (target, health, active) in target_q.iter() {
            if !active.0 || !health.is_alive() {
                continue;
            }
            let dx = target.x - transform.x;
            let dy = target.y - transform.y;
            let dist_sq = dx * dx + dy * dy;
            if dist_sq > max_sq {
                continue;
            }
            // Strictly nearest: the first encountered wins ties.
            if best.map_or(true, |(bd, _, _)| dist_sq < bd) {
                best = Some((dist_sq, target.x, target.y));
            }
        }

        match best {
            Some((_, tx, ty)) => {
                let dx = tx - transform.x;
                let dy = ty - transform.y;
                let d = (dx * dx + dy * dy).sqrt();
                if d > 1e-4 {
                    weapon.facing = (dx / d, dy / d);
                    transform.rotation = dy.atan2(dx);
                }
                weapon.has_target = true;
            }
            None => {
                weapon.has_target = false;
            }
        }
    }
}

/// Spawn the shot(s) for one weapon trigger pull. Bullets travel along the
/// facing; melee and flame place a short-lived sweep hitbox in front of
/// the owner instead.
fn fire_weapon(
    commands: &mut Commands,
    weapon: &Weapon,
    stats: &Stats,
    source: ProjectileSource,
    x: f32,
    y: f32,
) {
    let (fx, fy) = weapon.facing;
    let damage = weapon.damage * stats.damage_mult;
    let table = weapon_stats(weapon.kind);

    match weapon.kind {
        WeaponKind::Pistol => {
            commands.spawn(ProjectileBundle::new(
                Projectile::bullet(source, damage, table.projectile_speed, table.max_distance),
                x,
                y,
                fx,
                fy,
                0.3,
            ));
        }
        WeaponKind::Shotgun => {
            let base_angle = fy.atan2(fx);
            for i in 0..SHOTGUN_PELLETS {
                let offset = (i as f32 - (SHOTGUN_PELLETS as f32 - 1.0) / 2.0) * SHOTGUN_SPREAD;
                let angle = base_angle + offset;
                commands.spawn(ProjectileBundle::new(
                    Projectile::bullet(source, damage, table.projectile_speed, table.max_distance),
                    x,
                    y,
                    angle.cos(),
                    angle.sin(),
                    0.25,
                ));
            }
        }
        WeaponKind::Melee => {
            let reach = table.range * 0.5;
            commands.spawn(ProjectileBundle::new(
                Projectile::sweep(source, damage, MELEE_SWEEP_LIFETIME),
                x + fx * reach,
                y + fy * reach,
                fx,
                fy,
                reach,
            ));
        }
        WeaponKind::Flame => {
            let reach = table.range * 0.6;
            commands.spawn(ProjectileBundle::new(
                Projectile::sweep(source, damage, FLAME_SWEEP_LIFETIME),
                x + fx * reach,
                y + fy * reach,
                fx,
                fy,
                table.range * 0.4,
            ));
        }
    }
}

/// System that ticks the player weapon cooldown and fires when ready.
/// Firing resets the cooldown to `1 / (fire_rate * fire_rate_mult)`.
pub fn weapon_fire_system(
    dt: Res<DeltaTime>,
    mut commands: Commands,
    mut player_q: Query<(&Transform, &mut Weapon, &Stats, &Active), With<PlayerTag>>,
) {
    let delta = dt.0;
    for (transform, mut weapon, stats, active) in player_q.iter_mut() {
        if !active.0 {
            continue;
        }
        weapon.cooldown -= delta;
        if weapon.is_ready() && weapon.has_target {
            fire_weapon(
                &mut commands,
                &weapon,
                stats,
                ProjectileSource::Player,
                transform.x,
                transform.y,
            );
            weapon.cooldown = 1.0 / (weapon.fire_rate * stats.fire_rate_mult);
        }
    }
}

/// System that aims and fires player-placed turrets at the nearest enemy
/// in range, under the same cooldown gate as the player weapon.
pub fn turret_fire_system(
    dt: Res<DeltaTime>,
    mut commands: Commands,
    mut turret_q: Query<(&Transform, &mut Weapon, &Stats, &Active), With<TurretTag>>,
    target_q: Query<(&Transform, &Health, &Active), (With<AiAgent>, Without<TurretTag>)>,
) {
    let delta = dt.0;
    for (transform, mut weapon, stats, active) in turret_q.iter_mut() {
        if !active.0 {
            continue;
        }
        weapon.cooldown -= delta;

        let max_sq = weapon.range * weapon.range;
        let mut best: Option<(f32, f32, f32)> = None;
        for (target, health, target_active) in target_q.iter() {
            if !target_active.0 || !health.is_alive() {
                continue;
            }
            let dx = target.x - transform.x;
            let dy = target.y - transform.y;
            let dist_sq = dx * dx + dy * dy;
            if dist_sq <= max_sq && best.map_or(true, |(bd, _, _)| dist_sq < bd) {
                best = Some((dist_sq, target.x, target.y));
            }
        }

        if let Some((_, tx, ty)) = best {
            let dx = tx - transform.x;
            let dy = ty - transform.y;
            let d = (dx * dx + dy * dy).sqrt();
            if d > 1e-4 {
                weapon.facing = (dx / d, dy / d);
                weapon.has_target = true;
                if weapon.is_ready() {
                    fire_weapon(
                        &mut commands,
                        &weapon,
                        stats,
                        ProjectileSource::Turret,
                        transform.x,
                        transform.y,
                    );
                    weapon.cooldown = 1.0 / (weapon.fire_rate * stats.fire_rate_mult);
                }
            }
        } else {
            weapon.has_target = false;
        }
    }
}

/// System that advances projectile clocks and visual decay, deactivating
/// on distance or lifetime expiry.
pub fn projectile_update_system(
    dt: Res<DeltaTime>,
    mut query: Query<(&mut Projectile, &mut Transform, &mut Active)>,
) {
    let delta = dt.0;
    for (mut projectile, mut transform, mut active) in query.iter_mut() {
        if !active.0 {
            continue;
        }
        projectile.traveled += projectile.speed * delta;
        projectile.age += delta;
        if projectile.growth_rate > 0.0 {
            transform.scale += projectile.growth_rate * delta;
        }
        if projectile.fade_rate > 0.0 {
            projectile.opacity = (projectile.opacity - projectile.fade_rate * delta).max(0.0);
        }
        if projectile.is_expired() {
            active.0 = false;
        }
    }
}

/// System that ticks invincibility windows and applies HP regeneration.
pub fn health_tick_system(dt: Res<DeltaTime>, mut query: Query<(&mut Health, Option<&Stats>)>) {
    let delta = dt.0;
    for (mut health, stats) in query.iter_mut() {
        health.tick(delta);
        if let Some(stats) = stats {
            if stats.hp_regen > 0.0 && health.is_alive() {
                health.regen(stats.hp_regen * delta);
            }
        }
    }
}

/// System that applies queued area bursts (bomber detonations) to every
/// Health-carrying entity inside the blast radius. Proximity is tested
/// directly; the full collision pipeline is not involved.
pub fn explosion_system(
    mut queue: ResMut<ExplosionQueue>,
    mut query: Query<(&Transform, &mut Health, Option<&Stats>, &Active)>,
) {
    for blast in queue.0.drain(..) {
        let radius_sq = blast.radius * blast.radius;
        for (transform, mut health, stats, active) in query.iter_mut() {
            if !active.0 || !health.is_alive() {
                continue;
            }
            let dx = transform.x - blast.x;
            let dy = transform.y - blast.y;
            if dx * dx + dy * dy > radius_sq {
                continue;
            }
            let armor = stats.map_or(0, |s| s.armor);
            health.apply_damage(
                mitigate_damage(blast.damage, 1.0, armor),
                DamageClass::Explosion,
            );
        }
    }
}

/// System that applies player/enemy contact damage from this frame's
/// collision events. The invincibility window makes repeated contact
/// over consecutive frames land only once per window.
pub fn contact_damage_system(
    events: Res<CollisionEvents>,
    mut player_q: Query<(&mut Health, &Stats), With<PlayerTag>>,
    enemy_q: Query<&Stats, (With<AiAgent>, Without<PlayerTag>)>,
) {
    for event in events.0.iter() {
        let Some((player, enemy, other_layer)) = event.split(Layer::Player) else {
            continue;
        };
        if other_layer != Layer::Enemy {
            continue;
        }
        let Ok((mut health, player_stats)) = player_q.get_mut(player) else {
            continue;
        };
        let Ok(enemy_stats) = enemy_q.get(enemy) else {
            continue;
        };
        let net = mitigate_damage(
            enemy_stats.base_damage,
            enemy_stats.damage_mult,
            player_stats.armor,
        );
        health.apply_damage(net, DamageClass::Contact);
    }
}

/// System that resolves projectile hits from this frame's collision
/// events: obstacles stop any projectile; enemies (or the player, for
/// enemy shots) take damage, and non-penetrating projectiles terminate
/// on the first such hit.
pub fn projectile_impact_system(
    events: Res<CollisionEvents>,
    mut proj_q: Query<(&mut Projectile, &mut Active)>,
    mut target_q: Query<(&mut Health, Option<&Stats>, &Active), Without<Projectile>>,
) {
    for event in events.0.iter() {
        let Some((proj_entity, other, other_layer)) = event.split(Layer::Projectile) else {
            continue;
        };
        let Ok((mut projectile, mut proj_active)) = proj_q.get_mut(proj_entity) else {
            continue;
        };
        if !proj_active.0 {
            // Already terminated earlier this frame.
            continue;
        }

        if other_layer == Layer::Obstacle {
            proj_active.0 = false;
            continue;
        }

        let Ok((mut health, stats, target_active)) = target_q.get_mut(other) else {
            continue;
        };
        if !target_active.0 || !health.is_alive() {
            continue;
        }

        let armor = stats.map_or(0, |s| s.armor);
        health.apply_damage(
            mitigate_damage(projectile.damage, 1.0, armor),
            DamageClass::Projectile,
        );
        projectile.hits += 1;
        if !projectile.penetrating {
            proj_active.0 = false;
        }
    }
}

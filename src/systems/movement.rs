//! Movement systems: player input, velocity integration, obstacle blocking.

use crate::collision::CollisionEvents;
use crate::components::*;
use bevy_ecs::prelude::*;

/// Resource containing the delta time for the current tick.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// Latest continuous movement vector from the input layer, read once per
/// frame. Components outside [-1, 1] are clamped by magnitude.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct PlayerInput {
    pub mx: f32,
    pub my: f32,
}

/// System that converts the input vector into player velocity.
pub fn player_input_system(
    input: Res<PlayerInput>,
    mut query: Query<(&mut Velocity, &Stats, &Active), With<PlayerTag>>,
) {
    for (mut vel, stats, active) in query.iter_mut() {
        if !active.0 {
            continue;
        }
        let mag = (input.mx * input.mx + input.my * input.my).sqrt();
        if mag > 1e-4 {
            let scale = if mag > 1.0 { 1.0 / mag } else { 1.0 };
            vel.vx = input.mx * scale * stats.move_speed;
            vel.vy = input.my * scale * stats.move_speed;
        } else {
            vel.vx = 0.0;
            vel.vy = 0.0;
        }
    }
}

/// System that integrates velocity into position. The pre-integration
/// position is recorded so obstacle blocking can restore it on contact.
pub fn movement_system(
    dt: Res<DeltaTime>,
    mut query: Query<(&mut Transform, &mut PrevPosition, &Velocity, &Active)>,
) {
    let delta = dt.0;
    for (mut transform, mut prev, vel, active) in query.iter_mut() {
        if !active.0 {
            continue;
        }
        prev.x = transform.x;
        prev.y = transform.y;
        transform.x += vel.vx * delta;
        transform.y += vel.vy * delta;
    }
}

/// System that stops bodies on obstacle contact. No impulse response:
/// a player or enemy overlapping a blocking obstacle this frame is put
/// back at its pre-integration position.
pub fn obstacle_block_system(
    events: Res<CollisionEvents>,
    mut query: Query<(&mut Transform, &PrevPosition)>,
) {
    for event in events.0.iter() {
        let Some((_, body, body_layer)) = event.split(Layer::Obstacle) else {
            continue;
        };
        if !matches!(body_layer, Layer::Player | Layer::Enemy) {
            continue;
        }
        if let Ok((mut transform, prev)) = query.get_mut(body) {
            transform.x = prev.x;
            transform.y = prev.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::collision_detect_system;
    use crate::spatial::{spatial_index_system, SpatialGrid};

    #[test]
    fn test_movement_applies_velocity() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));

        world.spawn((
            Transform::new(0.0, 0.0),
            PrevPosition::default(),
            Velocity::new(5.0, 3.0),
            Active(true),
        ));

        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);

        let mut query = world.query::<&Transform>();
        let pos = query.single(&world);
        assert!((pos.x - 5.0).abs() < 0.001);
        assert!((pos.y - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_inactive_entities_do_not_move() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));

        world.spawn((
            Transform::new(0.0, 0.0),
            PrevPosition::default(),
            Velocity::new(5.0, 0.0),
            Active(false),
        ));

        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);

        let mut query = world.query::<&Transform>();
        assert_eq!(query.single(&world).x, 0.0);
    }

    #[test]
    fn test_player_input_scales_to_move_speed() {
        let mut world = World::new();
        world.insert_resource(PlayerInput { mx: 0.0, my: 1.0 });

        world.spawn((
            PlayerTag,
            Velocity::default(),
            Stats {
                move_speed: 7.0,
                ..Default::default()
            },
            Active(true),
        ));

        let mut schedule = Schedule::default();
        schedule.add_systems(player_input_system);
        schedule.run(&mut world);

        let mut query = world.query::<&Velocity>();
        let vel = query.single(&world);
        assert!((vel.vx - 0.0).abs() < 0.001);
        assert!((vel.vy - 7.0).abs() < 0.001);
    }

    #[test]
    fn test_diagonal_input_is_not_faster() {
        let mut world = World::new();
        world.insert_resource(PlayerInput { mx: 1.0, my: 1.0 });

        world.spawn((
            PlayerTag,
            Velocity::default(),
            Stats {
                move_speed: 10.0,
                ..Default::default()
            },
            Active(true),
        ));

        let mut schedule = Schedule::default();
        schedule.add_systems(player_input_system);
        schedule.run(&mut world);

        let mut query = world.query::<&Velocity>();
        let vel = query.single(&world);
        assert!((vel.magnitude() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_obstacle_stops_body_on_contact() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));
        world.insert_resource(SpatialGrid::new(4.0));
        world.insert_resource(CollisionEvents::default());

        // Walking right into a wall at x=2.
        world.spawn((
            PlayerTag,
            Transform::new(0.0, 0.0),
            PrevPosition::default(),
            Velocity::new(2.0, 0.0),
            Collider::circle(0.8, Layer::Player),
            Active(true),
        ));
        world.spawn((
            ObstacleTag,
            Transform::new(2.0, 0.0),
            Collider::aabb(0.5, 4.0, Layer::Obstacle),
            Active(true),
        ));

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                movement_system,
                spatial_index_system,
                collision_detect_system,
                obstacle_block_system,
            )
                .chain(),
        );
        schedule.run(&mut world);

        let mut query = world.query_filtered::<&Transform, With<PlayerTag>>();
        let pos = query.single(&world);
        assert_eq!(pos.x, 0.0, "body restored to pre-integration position");
    }
}

//! Horde Survival - Simulation Core
//!
//! A fixed-timestep ECS simulation for an action-survival game: spatial
//! collision, enemy behavior state machines, a projectile/combat pipeline
//! and a time-scaling wave spawner, driven at 60 Hz on a dedicated thread.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod collision;
pub mod components;
pub mod error;
pub mod pool;
pub mod runner;
pub mod spatial;
pub mod systems;
pub mod world;

pub use api::{EntityId, SimConfig, SimWorld, SpawnRequest};
pub use collision::{CollisionEvent, CollisionEvents};
pub use components::*;
pub use error::SimError;
pub use pool::Pool;
pub use runner::{GameLoop, LoopConfig, SimHandle};
pub use spatial::{SpatialEntry, SpatialGrid};
pub use systems::*;
pub use world::{EntitySnapshot, SessionSummary, Snapshot};

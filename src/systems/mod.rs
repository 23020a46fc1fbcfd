//! ECS Systems for the Horde Survival simulation.
//!
//! Systems contain the game logic that operates on components. The
//! scheduler runs them as one chained sequence in ascending priority
//! order each fixed update:
//!
//! 1. `player_input_system` - input vector into player velocity
//! 2. `auto_aim_system` - player weapon facing
//! 3. `ai_system` - behavior state machine
//! 4. `buff_system` - applies/expires shaman buffs
//! 5. `weapon_fire_system` / `turret_fire_system` - cooldown-gated firing
//! 6. `projectile_update_system` - distance/lifetime clocks
//! 7. `health_tick_system` - invincibility windows, HP regen
//! 8. `movement_system` - velocity integration
//! 9. `spatial_index_system` - broad-phase grid rebuild
//! 10. `collision_detect_system` - narrow phase, event emission
//! 11. `obstacle_block_system` - stop-on-contact
//! 12. `contact_damage_system` / `projectile_impact_system` - damage
//! 13. `explosion_system` - queued area bursts
//! 14. `pickup_attract_system` / `pickup_collect_system`
//! 15. `wave_spawner_system` - difficulty-scaled spawning
//! 16. `lifecycle_system` - end-of-frame sweep

pub mod ai;
pub mod combat;
pub mod lifecycle;
pub mod movement;
pub mod pickup;
pub mod spawner;

pub use ai::*;
pub use combat::*;
pub use lifecycle::*;
pub use movement::*;
pub use pickup::*;
pub use spawner::*;

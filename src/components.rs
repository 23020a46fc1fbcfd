//! ECS Components for the Horde Survival simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.
//! Per-type numbers (zombie speed, boss HP, weapon damage) come from the
//! static stat tables at the bottom of this module, keyed by tag enums.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D world transform: position, facing rotation (radians), uniform scale.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale: f32,
}

impl Transform {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            rotation: 0.0,
            scale: 1.0,
        }
    }

    pub fn distance_to(&self, other: &Transform) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn distance_sq(&self, other: &Transform) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Position at the start of the current frame, recorded before integration.
/// Used by obstacle blocking to stop a body on contact.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PrevPosition {
    pub x: f32,
    pub y: f32,
}

/// 2D velocity vector, world units per second.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    pub fn magnitude(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

// ============================================================================
// LIFECYCLE COMPONENTS
// ============================================================================

/// Soft-delete marker. Systems only ever flip this to `false`; the physical
/// despawn happens in the lifecycle sweep at the end of the frame. An
/// inactive entity participates in no system logic except removal.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Active(pub bool);

impl Default for Active {
    fn default() -> Self {
        Self(true)
    }
}

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Classifies a damage source for invincibility-window purposes.
/// Only contact damage triggers and respects the window; projectiles and
/// explosions always land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageClass {
    Contact,
    Projectile,
    Explosion,
}

/// Integer hit points with an invincibility window for contact damage.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
    /// Remaining invincibility, seconds. Ticks down every frame.
    pub invincible_timer: f32,
    /// Window length applied when contact damage lands.
    pub invincible_duration: f32,
    /// Fractional HP accumulated by regeneration, applied once it reaches 1.
    regen_buffer: f32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self {
            current: max,
            max,
            invincible_timer: 0.0,
            invincible_duration: 0.5,
            regen_buffer: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_timer > 0.0
    }

    /// Apply already-mitigated damage. Returns the HP actually removed.
    ///
    /// Contact damage is ignored while the invincibility window is open and
    /// re-opens the window when it lands. Other classes always land.
    pub fn apply_damage(&mut self, amount: i32, class: DamageClass) -> i32 {
        if !self.is_alive() {
            return 0;
        }
        if class == DamageClass::Contact {
            if self.is_invincible() {
                return 0;
            }
            self.invincible_timer = self.invincible_duration;
        }
        let dealt = amount.min(self.current);
        self.current -= dealt;
        dealt
    }

    pub fn heal(&mut self, amount: i32) {
        self.current = (self.current + amount).min(self.max);
    }

    /// Accumulate fractional regeneration; whole points are applied, the
    /// remainder is carried to the next frame.
    pub fn regen(&mut self, amount: f32) {
        self.regen_buffer += amount;
        if self.regen_buffer >= 1.0 {
            let whole = self.regen_buffer.floor();
            self.heal(whole as i32);
            self.regen_buffer -= whole;
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if self.invincible_timer > 0.0 {
            self.invincible_timer = (self.invincible_timer - dt).max(0.0);
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Base stats plus multiplicative modifiers. All modifiers default to
/// neutral (1.0) so an unmodified entity behaves per its stat table entry.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Stats {
    pub move_speed: f32,
    pub base_damage: f32,
    pub armor: i32,
    pub damage_mult: f32,
    pub fire_rate_mult: f32,
    pub pickup_radius_mult: f32,
    pub xp_mult: f32,
    /// HP per second.
    pub hp_regen: f32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            move_speed: 0.0,
            base_damage: 0.0,
            armor: 0,
            damage_mult: 1.0,
            fire_rate_mult: 1.0,
            pickup_radius_mult: 1.0,
            xp_mult: 1.0,
            hp_regen: 0.0,
        }
    }
}

// ============================================================================
// COLLIDER COMPONENTS
// ============================================================================

/// Collision shape. The closed set: circles and axis-aligned boxes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    Aabb { half_w: f32, half_h: f32 },
}

impl Shape {
    /// Bounding half-extents, used for broad-phase cell insertion.
    pub fn half_extents(&self) -> (f32, f32) {
        match *self {
            Shape::Circle { radius } => (radius, radius),
            Shape::Aabb { half_w, half_h } => (half_w, half_h),
        }
    }
}

/// Collision layer. A collider's layer selects its default mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Player,
    Enemy,
    Projectile,
    Obstacle,
    Pickup,
    Turret,
}

impl Layer {
    pub const fn bit(self) -> u8 {
        match self {
            Layer::Player => 1 << 0,
            Layer::Enemy => 1 << 1,
            Layer::Projectile => 1 << 2,
            Layer::Obstacle => 1 << 3,
            Layer::Pickup => 1 << 4,
            Layer::Turret => 1 << 5,
        }
    }

    /// Default mask when the collider does not carry an explicit one.
    pub const fn default_mask(self) -> u8 {
        match self {
            Layer::Player => Layer::Enemy.bit() | Layer::Obstacle.bit() | Layer::Pickup.bit(),
            Layer::Enemy => {
                Layer::Player.bit()
                    | Layer::Projectile.bit()
                    | Layer::Obstacle.bit()
                    | Layer::Turret.bit()
            }
            // Projectiles carry an explicit mask at spawn; the fallback hits
            // everything solid.
            Layer::Projectile => {
                Layer::Player.bit()
                    | Layer::Enemy.bit()
                    | Layer::Obstacle.bit()
                    | Layer::Turret.bit()
            }
            Layer::Obstacle => Layer::Player.bit() | Layer::Enemy.bit() | Layer::Projectile.bit(),
            Layer::Pickup => Layer::Player.bit(),
            Layer::Turret => Layer::Enemy.bit() | Layer::Projectile.bit(),
        }
    }
}

/// Attached to anything the collision system should see.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Collider {
    pub shape: Shape,
    pub layer: Layer,
    /// Trigger colliders produce events but never block movement.
    pub trigger: bool,
    /// Explicit layer mask; `None` falls back to the layer default.
    pub mask: Option<u8>,
}

impl Collider {
    pub fn circle(radius: f32, layer: Layer) -> Self {
        Self {
            shape: Shape::Circle { radius },
            layer,
            trigger: false,
            mask: None,
        }
    }

    pub fn aabb(half_w: f32, half_h: f32, layer: Layer) -> Self {
        Self {
            shape: Shape::Aabb { half_w, half_h },
            layer,
            trigger: false,
            mask: None,
        }
    }

    pub fn as_trigger(mut self) -> Self {
        self.trigger = true;
        self
    }

    pub fn with_mask(mut self, mask: u8) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn effective_mask(&self) -> u8 {
        self.mask.unwrap_or_else(|| self.layer.default_mask())
    }
}

// ============================================================================
// AI COMPONENTS
// ============================================================================

/// The closed set of enemy behaviors. Each zombie kind is permanently
/// assigned one behavior at spawn; there are no transitions between
/// behaviors during play, only sub-state cycling within one.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    Idle,
    Chase,
    Ranged,
    Explode,
    Buff,
    Charge,
    Flee,
}

/// Per-behavior transient state. Fields are meaningful only for the
/// currently-assigned behavior; `reset` clears everything when a behavior
/// is (re)assigned.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BehaviorState {
    /// RANGED: seconds until the next shot is allowed.
    pub attack_cooldown: f32,
    /// CHARGE: remaining seconds of the active charge.
    pub charge_timer: f32,
    /// CHARGE: seconds until the next charge is allowed.
    pub charge_cooldown: f32,
    /// CHARGE: locked target point captured at charge start.
    pub charge_target: Option<(f32, f32)>,
    /// BUFF: seconds until the next ally scan.
    pub buff_timer: f32,
    /// EXPLODE: latched once the bomb has gone off.
    pub detonated: bool,
}

impl BehaviorState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// AI brain: assigned behavior, engagement range, and transient sub-state.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AiAgent {
    pub behavior: Behavior,
    /// Aggro/behavior range in world units (meaning is per-behavior).
    pub range: f32,
    pub state: BehaviorState,
}

impl AiAgent {
    pub fn new(behavior: Behavior, range: f32) -> Self {
        Self {
            behavior,
            range,
            state: BehaviorState::default(),
        }
    }

    /// Reassign the behavior, clearing any stale transient state.
    pub fn set_behavior(&mut self, behavior: Behavior, range: f32) {
        self.behavior = behavior;
        self.range = range;
        self.state.reset();
    }
}

/// Temporary stat buff applied by BUFF-behavior allies. The pre-buff values
/// are snapshotted so expiry restores them exactly, never re-derived by
/// inverse multiplication.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Buffed {
    pub active: bool,
    pub timer: f32,
    pub orig_move_speed: f32,
    pub orig_damage_mult: f32,
}

// ============================================================================
// WEAPON / PROJECTILE COMPONENTS
// ============================================================================

/// Weapon archetype: bullets travel, melee and flame spawn short-lived
/// sweep hitboxes gated by the same cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponKind {
    Pistol,
    Shotgun,
    Melee,
    Flame,
}

/// A firing weapon. Held by the player and by turrets.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Weapon {
    pub kind: WeaponKind,
    pub damage: f32,
    /// Shots per second before the owner's fire-rate modifier.
    pub fire_rate: f32,
    /// Seconds until the weapon is ready; ready when <= 0.
    pub cooldown: f32,
    /// Unit facing vector, retained when no target qualifies.
    pub facing: (f32, f32),
    /// Whether auto-aim found a target in range this frame.
    pub has_target: bool,
    /// Engagement range for auto-aim and turrets.
    pub range: f32,
}

impl Weapon {
    pub fn new(kind: WeaponKind) -> Self {
        let table = weapon_stats(kind);
        Self {
            kind,
            damage: table.damage,
            fire_rate: table.fire_rate,
            cooldown: 0.0,
            facing: (1.0, 0.0),
            has_target: false,
            range: table.range,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown <= 0.0
    }
}

/// Who fired a projectile; selects its collision mask and damage targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileSource {
    Player,
    Enemy,
    Turret,
}

/// In-flight projectile state. Expires on distance, optional lifetime,
/// obstacle contact, or enemy contact when non-penetrating.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Projectile {
    pub source: ProjectileSource,
    pub damage: f32,
    pub speed: f32,
    pub traveled: f32,
    pub max_distance: f32,
    /// Lifetime bound for stationary sweep hitboxes; `None` for bullets.
    pub lifetime: Option<f32>,
    pub age: f32,
    pub penetrating: bool,
    /// Enemies hit so far (penetrating projectiles accumulate).
    pub hits: u32,
    /// Scale growth per second, for expanding sweep visuals.
    pub growth_rate: f32,
    /// Opacity loss per second, for fading sweep visuals.
    pub fade_rate: f32,
    pub opacity: f32,
}

impl Projectile {
    pub fn bullet(source: ProjectileSource, damage: f32, speed: f32, max_distance: f32) -> Self {
        Self {
            source,
            damage,
            speed,
            traveled: 0.0,
            max_distance,
            lifetime: None,
            age: 0.0,
            penetrating: false,
            hits: 0,
            growth_rate: 0.0,
            fade_rate: 0.0,
            opacity: 1.0,
        }
    }

    /// Stationary sweep hitbox (melee arc, flame cone) bounded by lifetime.
    pub fn sweep(source: ProjectileSource, damage: f32, lifetime: f32) -> Self {
        Self {
            source,
            damage,
            speed: 0.0,
            traveled: 0.0,
            max_distance: f32::MAX,
            lifetime: Some(lifetime),
            age: 0.0,
            penetrating: true,
            hits: 0,
            growth_rate: 2.0,
            fade_rate: 1.0 / lifetime,
            opacity: 1.0,
        }
    }

    pub fn penetrating(mut self) -> Self {
        self.penetrating = true;
        self
    }

    pub fn is_expired(&self) -> bool {
        if self.traveled >= self.max_distance {
            return true;
        }
        match self.lifetime {
            Some(limit) => self.age >= limit,
            None => false,
        }
    }
}

// ============================================================================
// TAG COMPONENTS
// ============================================================================

/// Marker for the player entity.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PlayerTag;

/// Zombie archetypes. The kind fixes behavior and base stats at spawn.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZombieKind {
    Walker,
    Runner,
    Brute,
    Spitter,
    Bomber,
    Charger,
    Shaman,
}

impl ZombieKind {
    pub fn name(self) -> &'static str {
        match self {
            ZombieKind::Walker => "walker",
            ZombieKind::Runner => "runner",
            ZombieKind::Brute => "brute",
            ZombieKind::Spitter => "spitter",
            ZombieKind::Bomber => "bomber",
            ZombieKind::Charger => "charger",
            ZombieKind::Shaman => "shaman",
        }
    }
}

/// Boss archetypes.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossKind {
    Butcher,
    Abomination,
}

impl BossKind {
    pub fn name(self) -> &'static str {
        match self {
            BossKind::Butcher => "butcher",
            BossKind::Abomination => "abomination",
        }
    }
}

/// Pickup payloads.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    Xp(u32),
    Health(i32),
}

/// Marker for static blocking obstacles.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ObstacleTag;

/// Marker for player-placed turrets. The owner id is a lookup key back to
/// the player, not ownership.
#[derive(Component, Debug, Clone, Copy)]
pub struct TurretTag {
    pub owner: u64,
}

// ============================================================================
// STATIC STAT TABLES
// ============================================================================

/// Per-kind zombie numbers, before wave HP scaling.
#[derive(Debug, Clone, Copy)]
pub struct ZombieStats {
    pub max_hp: i32,
    pub move_speed: f32,
    pub base_damage: f32,
    pub armor: i32,
    pub radius: f32,
    pub behavior: Behavior,
    pub range: f32,
    pub xp: u32,
}

/// Stat table for zombie kinds. Free data keyed by tag, no dispatch.
pub const fn zombie_stats(kind: ZombieKind) -> ZombieStats {
    match kind {
        ZombieKind::Walker => ZombieStats {
            max_hp: 20,
            move_speed: 4.0,
            base_damage: 8.0,
            armor: 0,
            radius: 0.9,
            behavior: Behavior::Chase,
            range: 0.0,
            xp: 1,
        },
        ZombieKind::Runner => ZombieStats {
            max_hp: 12,
            move_speed: 8.5,
            base_damage: 6.0,
            armor: 0,
            radius: 0.8,
            behavior: Behavior::Chase,
            range: 0.0,
            xp: 2,
        },
        ZombieKind::Brute => ZombieStats {
            max_hp: 120,
            move_speed: 2.5,
            base_damage: 20.0,
            armor: 3,
            radius: 1.6,
            behavior: Behavior::Chase,
            range: 0.0,
            xp: 8,
        },
        ZombieKind::Spitter => ZombieStats {
            max_hp: 18,
            move_speed: 4.5,
            base_damage: 7.0,
            armor: 0,
            radius: 0.9,
            behavior: Behavior::Ranged,
            range: 12.0,
            xp: 3,
        },
        ZombieKind::Bomber => ZombieStats {
            max_hp: 16,
            move_speed: 5.5,
            base_damage: 25.0,
            armor: 0,
            radius: 0.9,
            behavior: Behavior::Explode,
            range: 2.5,
            xp: 3,
        },
        ZombieKind::Charger => ZombieStats {
            max_hp: 45,
            move_speed: 4.0,
            base_damage: 14.0,
            armor: 1,
            radius: 1.2,
            behavior: Behavior::Charge,
            range: 10.0,
            xp: 5,
        },
        ZombieKind::Shaman => ZombieStats {
            max_hp: 30,
            move_speed: 3.5,
            base_damage: 4.0,
            armor: 0,
            radius: 1.0,
            behavior: Behavior::Buff,
            range: 9.0,
            xp: 6,
        },
    }
}

/// Per-kind boss numbers, before the per-boss scaling curve.
#[derive(Debug, Clone, Copy)]
pub struct BossStats {
    pub base_hp: i32,
    pub move_speed: f32,
    pub base_damage: f32,
    pub armor: i32,
    pub radius: f32,
    pub behavior: Behavior,
    pub range: f32,
    pub xp: u32,
}

pub const fn boss_stats(kind: BossKind) -> BossStats {
    match kind {
        BossKind::Butcher => BossStats {
            base_hp: 600,
            move_speed: 3.0,
            base_damage: 30.0,
            armor: 4,
            radius: 2.2,
            behavior: Behavior::Chase,
            range: 0.0,
            xp: 50,
        },
        BossKind::Abomination => BossStats {
            base_hp: 900,
            move_speed: 3.5,
            base_damage: 35.0,
            armor: 6,
            radius: 2.5,
            behavior: Behavior::Charge,
            range: 14.0,
            xp: 80,
        },
    }
}

/// Per-kind weapon numbers.
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    pub damage: f32,
    pub fire_rate: f32,
    pub range: f32,
    pub projectile_speed: f32,
    pub max_distance: f32,
}

pub const fn weapon_stats(kind: WeaponKind) -> WeaponStats {
    match kind {
        WeaponKind::Pistol => WeaponStats {
            damage: 10.0,
            fire_rate: 2.0,
            range: 18.0,
            projectile_speed: 30.0,
            max_distance: 22.0,
        },
        WeaponKind::Shotgun => WeaponStats {
            damage: 6.0,
            fire_rate: 1.2,
            range: 12.0,
            projectile_speed: 26.0,
            max_distance: 14.0,
        },
        WeaponKind::Melee => WeaponStats {
            damage: 14.0,
            fire_rate: 1.5,
            range: 3.0,
            projectile_speed: 0.0,
            max_distance: 0.0,
        },
        WeaponKind::Flame => WeaponStats {
            damage: 4.0,
            fire_rate: 6.0,
            range: 7.0,
            projectile_speed: 0.0,
            max_distance: 0.0,
        },
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning the player.
#[derive(Bundle)]
pub struct PlayerBundle {
    pub tag: PlayerTag,
    pub transform: Transform,
    pub prev: PrevPosition,
    pub velocity: Velocity,
    pub health: Health,
    pub stats: Stats,
    pub collider: Collider,
    pub weapon: Weapon,
    pub active: Active,
}

impl PlayerBundle {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            tag: PlayerTag,
            transform: Transform::new(x, y),
            prev: PrevPosition { x, y },
            velocity: Velocity::default(),
            health: Health::new(100),
            stats: Stats {
                move_speed: 7.0,
                base_damage: 0.0,
                armor: 1,
                ..Default::default()
            },
            collider: Collider::circle(0.8, Layer::Player),
            weapon: Weapon::new(WeaponKind::Pistol),
            active: Active(true),
        }
    }
}

/// Bundle for spawning a zombie of a given kind, with wave HP scaling.
#[derive(Bundle)]
pub struct ZombieBundle {
    pub kind: ZombieKind,
    pub transform: Transform,
    pub prev: PrevPosition,
    pub velocity: Velocity,
    pub health: Health,
    pub stats: Stats,
    pub collider: Collider,
    pub ai: AiAgent,
    pub buffed: Buffed,
    pub active: Active,
}

impl ZombieBundle {
    pub fn new(kind: ZombieKind, x: f32, y: f32, hp_mult: f32) -> Self {
        let table = zombie_stats(kind);
        let max_hp = ((table.max_hp as f32) * hp_mult).round() as i32;
        Self {
            kind,
            transform: Transform::new(x, y),
            prev: PrevPosition { x, y },
            velocity: Velocity::default(),
            health: Health::new(max_hp.max(1)),
            stats: Stats {
                move_speed: table.move_speed,
                base_damage: table.base_damage,
                armor: table.armor,
                ..Default::default()
            },
            collider: Collider::circle(table.radius, Layer::Enemy),
            ai: AiAgent::new(table.behavior, table.range),
            buffed: Buffed::default(),
            active: Active(true),
        }
    }
}

/// Bundle for spawning a boss. HP scales with the boss number:
/// `base_hp * (1 + 0.5 * boss_number)`.
#[derive(Bundle)]
pub struct BossBundle {
    pub kind: BossKind,
    pub transform: Transform,
    pub prev: PrevPosition,
    pub velocity: Velocity,
    pub health: Health,
    pub stats: Stats,
    pub collider: Collider,
    pub ai: AiAgent,
    pub buffed: Buffed,
    pub active: Active,
}

impl BossBundle {
    pub fn new(kind: BossKind, x: f32, y: f32, boss_number: u32) -> Self {
        let table = boss_stats(kind);
        let hp = ((table.base_hp as f32) * (1.0 + 0.5 * boss_number as f32)).round() as i32;
        Self {
            kind,
            transform: Transform::new(x, y),
            prev: PrevPosition { x, y },
            velocity: Velocity::default(),
            health: Health::new(hp),
            stats: Stats {
                move_speed: table.move_speed,
                base_damage: table.base_damage,
                armor: table.armor,
                ..Default::default()
            },
            collider: Collider::circle(table.radius, Layer::Enemy),
            ai: AiAgent::new(table.behavior, table.range),
            buffed: Buffed::default(),
            active: Active(true),
        }
    }
}

/// Bundle for spawning a projectile already aimed along `(dx, dy)`.
#[derive(Bundle)]
pub struct ProjectileBundle {
    pub projectile: Projectile,
    pub transform: Transform,
    pub prev: PrevPosition,
    pub velocity: Velocity,
    pub collider: Collider,
    pub active: Active,
}

impl ProjectileBundle {
    pub fn new(projectile: Projectile, x: f32, y: f32, dx: f32, dy: f32, radius: f32) -> Self {
        let mask = match projectile.source {
            ProjectileSource::Player | ProjectileSource::Turret => {
                Layer::Enemy.bit() | Layer::Obstacle.bit()
            }
            ProjectileSource::Enemy => Layer::Player.bit() | Layer::Obstacle.bit(),
        };
        let speed = projectile.speed;
        let mut transform = Transform::new(x, y);
        transform.rotation = dy.atan2(dx);
        Self {
            projectile,
            transform,
            prev: PrevPosition { x, y },
            velocity: Velocity::new(dx * speed, dy * speed),
            collider: Collider::circle(radius, Layer::Projectile)
                .as_trigger()
                .with_mask(mask),
            active: Active(true),
        }
    }
}

/// Bundle for spawning a pickup (trigger collider, no health).
#[derive(Bundle)]
pub struct PickupBundle {
    pub kind: PickupKind,
    pub transform: Transform,
    pub prev: PrevPosition,
    pub velocity: Velocity,
    pub collider: Collider,
    pub active: Active,
}

impl PickupBundle {
    pub fn new(kind: PickupKind, x: f32, y: f32) -> Self {
        Self {
            kind,
            transform: Transform::new(x, y),
            prev: PrevPosition { x, y },
            velocity: Velocity::default(),
            collider: Collider::circle(0.5, Layer::Pickup).as_trigger(),
            active: Active(true),
        }
    }
}

/// Bundle for spawning a static blocking obstacle.
#[derive(Bundle)]
pub struct ObstacleBundle {
    pub tag: ObstacleTag,
    pub transform: Transform,
    pub collider: Collider,
    pub active: Active,
}

impl ObstacleBundle {
    pub fn new(x: f32, y: f32, half_w: f32, half_h: f32) -> Self {
        Self {
            tag: ObstacleTag,
            transform: Transform::new(x, y),
            collider: Collider::aabb(half_w, half_h, Layer::Obstacle),
            active: Active(true),
        }
    }
}

/// Bundle for spawning a player-placed turret.
#[derive(Bundle)]
pub struct TurretBundle {
    pub tag: TurretTag,
    pub transform: Transform,
    pub health: Health,
    pub stats: Stats,
    pub collider: Collider,
    pub weapon: Weapon,
    pub active: Active,
}

impl TurretBundle {
    pub fn new(owner: u64, x: f32, y: f32) -> Self {
        Self {
            tag: TurretTag { owner },
            transform: Transform::new(x, y),
            health: Health::new(60),
            stats: Stats::default(),
            collider: Collider::circle(0.7, Layer::Turret),
            weapon: Weapon::new(WeaponKind::Pistol),
            active: Active(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_clamps_and_reports_death() {
        let mut hp = Health::new(30);
        assert!(hp.is_alive());

        let dealt = hp.apply_damage(50, DamageClass::Projectile);
        assert_eq!(dealt, 30, "damage is clamped to remaining HP");
        assert_eq!(hp.current, 0);
        assert!(!hp.is_alive());

        // Dead entities take no further damage.
        assert_eq!(hp.apply_damage(10, DamageClass::Projectile), 0);
    }

    #[test]
    fn test_contact_damage_respects_invincibility_window() {
        let mut hp = Health::new(100);
        hp.invincible_duration = 0.5;

        assert_eq!(hp.apply_damage(10, DamageClass::Contact), 10);
        assert!(hp.is_invincible());

        // Second contact hit inside the window is ignored.
        assert_eq!(hp.apply_damage(10, DamageClass::Contact), 0);
        assert_eq!(hp.current, 90);

        // Projectile damage bypasses the window.
        assert_eq!(hp.apply_damage(5, DamageClass::Projectile), 5);
        assert_eq!(hp.current, 85);

        hp.tick(0.6);
        assert!(!hp.is_invincible());
        assert_eq!(hp.apply_damage(10, DamageClass::Contact), 10);
    }

    #[test]
    fn test_regen_accumulates_fractions() {
        let mut hp = Health::new(100);
        hp.current = 50;

        // 0.4 HP/frame: no visible change until the buffer crosses 1.
        hp.regen(0.4);
        assert_eq!(hp.current, 50);
        hp.regen(0.4);
        assert_eq!(hp.current, 50);
        hp.regen(0.4);
        assert_eq!(hp.current, 51);
    }

    #[test]
    fn test_heal_never_exceeds_max() {
        let mut hp = Health::new(40);
        hp.current = 35;
        hp.heal(100);
        assert_eq!(hp.current, 40);
    }

    #[test]
    fn test_behavior_reassignment_resets_transients() {
        let mut ai = AiAgent::new(Behavior::Charge, 10.0);
        ai.state.charge_timer = 0.4;
        ai.state.charge_target = Some((3.0, 4.0));

        ai.set_behavior(Behavior::Chase, 0.0);
        assert_eq!(ai.state.charge_timer, 0.0);
        assert!(ai.state.charge_target.is_none());
    }

    #[test]
    fn test_default_masks_are_symmetric_for_contact_pairs() {
        // Player tests against enemies and vice versa.
        assert_ne!(Layer::Player.default_mask() & Layer::Enemy.bit(), 0);
        assert_ne!(Layer::Enemy.default_mask() & Layer::Player.bit(), 0);
        // Pickups only care about the player.
        assert_eq!(Layer::Pickup.default_mask(), Layer::Player.bit());
    }

    #[test]
    fn test_boss_hp_scaling_curve() {
        let b0 = BossBundle::new(BossKind::Butcher, 0.0, 0.0, 0);
        let b2 = BossBundle::new(BossKind::Butcher, 0.0, 0.0, 2);
        assert_eq!(b0.health.max, 600);
        assert_eq!(b2.health.max, 1200);
    }

    #[test]
    fn test_zombie_hp_wave_scaling() {
        let z = ZombieBundle::new(ZombieKind::Walker, 0.0, 0.0, 1.5);
        assert_eq!(z.health.max, 30);
    }
}

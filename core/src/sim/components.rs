//! Simulation components
//!
//! Every type here is plain data. The [`StateHash`] impls decide which fields
//! take part in desync detection; presentation-only fields are left out.

use bitflags::bitflags;
use glam::Vec2;
use xxhash_rust::xxh3::Xxh3;

use crate::hash::{HashWrite, StateHash};
use crate::input::PlayerInputState;

use super::entity::EntityId;
use super::rng::DeterministicRng;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PlayerFlags: u8 {
        const FACING_LEFT = 1 << 0;
        const GROUNDED = 1 << 1;
        const FAST_FALLING = 1 << 2;
        const TEETERING = 1 << 3;
        /// Set for the tick the player was killed
        const HAS_DIED = 1 << 4;
        /// Set by a rule when a dead player should come back
        const HAS_RESPAWNED = 1 << 5;
        /// Per-tick event flags, cleared after respawn assignment
        const EVENT_FLAGS = Self::HAS_DIED.bits() | Self::HAS_RESPAWNED.bits();
    }
}

/// Core per-player state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerComponent {
    pub player_id: u8,
    pub rng: DeterministicRng,
    pub flags: PlayerFlags,
    pub damage: f32,
    pub default_damage: f32,
    pub stocks: i8,
    pub state_id: u8,
    pub state_tick: u8,
    pub hitstun: u8,
    pub hitlag: u8,
    pub charge: u8,
    pub shield_damage: u16,
    pub shield_recovery_cooldown: u16,
    pub respawn_time_remaining: u16,
    /// Handle of the presentation object bound to this player, if any
    pub view_binding: Option<u32>,
}

impl PlayerComponent {
    /// Fresh player. The RNG seed mixes in the player id so that players never
    /// share a sequence.
    pub fn new(player_id: u8, match_seed: u64, stocks: i8, default_damage: f32) -> Self {
        Self {
            player_id,
            rng: DeterministicRng::new(match_seed ^ (1u64 << player_id)),
            flags: PlayerFlags::empty(),
            damage: default_damage,
            default_damage,
            stocks,
            state_id: 0,
            state_tick: 0,
            hitstun: 0,
            hitlag: 0,
            charge: 0,
            shield_damage: 0,
            shield_recovery_cooldown: 0,
            respawn_time_remaining: 0,
            view_binding: None,
        }
    }

    #[inline]
    pub fn is(&self, mask: PlayerFlags) -> bool {
        self.flags.intersects(mask)
    }

    pub fn set_flags(&mut self, mask: PlayerFlags) {
        self.flags.insert(mask);
    }

    pub fn unset_flags(&mut self, mask: PlayerFlags) {
        self.flags.remove(mask);
    }

    pub fn is_active(&self) -> bool {
        self.stocks > 0
    }

    pub fn is_hit(&self) -> bool {
        self.hitstun > 0
    }

    /// Mark the player dead for this tick, spending a stock if any remain.
    pub fn kill(&mut self) {
        self.set_flags(PlayerFlags::HAS_DIED);
        if self.stocks > 0 {
            self.stocks -= 1;
        }
    }
}

impl StateHash for PlayerComponent {
    fn write_state(&self, out: &mut Xxh3) {
        out.put_u8(self.player_id);
        out.put_u64(self.rng.state());
        out.put_u8(self.flags.bits());
        out.put_f32(self.damage);
        out.put_f32(self.default_damage);
        out.put_u8(self.stocks as u8);
        out.put_u8(self.state_id);
        out.put_u8(self.state_tick);
        out.put_u8(self.hitstun);
        out.put_u8(self.hitlag);
        out.put_u8(self.charge);
        out.put_u16(self.shield_damage);
        out.put_u16(self.shield_recovery_cooldown);
        out.put_u16(self.respawn_time_remaining);
    }
}

impl StateHash for PlayerInputState {
    fn write_state(&self, out: &mut Xxh3) {
        out.update(bytemuck::bytes_of(&self.current));
        out.update(bytemuck::bytes_of(&self.previous));
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub rotation: f32,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec2::ZERO)
    }
}

impl Transform {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
            scale: 1.0,
        }
    }
}

impl StateHash for Transform {
    fn write_state(&self, out: &mut Xxh3) {
        out.put_vec2(self.position);
        out.put_f32(self.rotation);
        out.put_f32(self.scale);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub linear: Vec2,
}

impl StateHash for Velocity {
    fn write_state(&self, out: &mut Xxh3) {
        out.put_vec2(self.linear);
    }
}

/// Per-character movement tuning, in units per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    pub move_speed: f32,
    pub max_speed: f32,
    pub max_fall_speed: f32,
    pub max_fast_fall_speed: f32,
    pub weight: f32,
    pub grounded_friction: f32,
    pub jump_power: f32,
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            move_speed: 0.5,
            max_speed: 6.0,
            max_fall_speed: 8.0,
            max_fast_fall_speed: 14.0,
            weight: 0.5,
            grounded_friction: 0.25,
            jump_power: 10.0,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HitboxFlags: u8 {
        /// Knockback direction follows the attacker's facing
        const MIRROR_DIRECTION = 1 << 0;
        /// Wins priority ties regardless of the numeric priority
        const TRANSCENDENT_PRIORITY = 1 << 1;
    }
}

/// A value that grows linearly with some scale (usually the target's damage).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScalableValue {
    pub base: f32,
    pub scaling: f32,
}

impl ScalableValue {
    pub fn fixed(base: f32) -> Self {
        Self { base, scaling: 0.0 }
    }

    pub fn scaled_to(&self, scale: f32) -> f32 {
        self.base + scale * self.scaling
    }
}

/// Offensive collision volume attached to a player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub owner: EntityId,
    pub player_id: u8,
    pub flags: HitboxFlags,
    pub offset: Vec2,
    pub radius: f32,
    pub priority: u32,
    pub damage: ScalableValue,
    /// Launch angle in radians, measured for a right-facing attacker
    pub knockback_angle: f32,
    pub knockback_force: ScalableValue,
    pub hitstun: ScalableValue,
    pub enabled: bool,
    /// Player ids already struck by this activation
    pub hit_mask: u8,
}

impl Hitbox {
    pub fn new(owner: EntityId, player_id: u8, offset: Vec2, radius: f32) -> Self {
        Self {
            owner,
            player_id,
            flags: HitboxFlags::empty(),
            offset,
            radius,
            priority: 0,
            damage: ScalableValue::fixed(5.0),
            knockback_angle: std::f32::consts::FRAC_PI_4,
            knockback_force: ScalableValue {
                base: 2.0,
                scaling: 0.05,
            },
            hitstun: ScalableValue {
                base: 10.0,
                scaling: 0.1,
            },
            enabled: true,
            hit_mask: 0,
        }
    }

    pub fn is(&self, flags: HitboxFlags) -> bool {
        self.flags.intersects(flags)
    }
}

impl StateHash for Hitbox {
    fn write_state(&self, out: &mut Xxh3) {
        out.put_u64(self.owner.to_bits());
        out.put_u8(self.player_id);
        out.put_u8(self.flags.bits());
        out.put_vec2(self.offset);
        out.put_f32(self.radius);
        out.put_u32(self.priority);
        out.put_f32(self.damage.base);
        out.put_f32(self.damage.scaling);
        out.put_f32(self.knockback_angle);
        out.put_f32(self.knockback_force.base);
        out.put_f32(self.knockback_force.scaling);
        out.put_f32(self.hitstun.base);
        out.put_f32(self.hitstun.scaling);
        out.put_u8(self.enabled as u8);
        out.put_u8(self.hit_mask);
    }
}

/// How a hurtbox reacts to being struck. Higher values take precedence.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum HurtboxKind {
    Inactive = 1,
    #[default]
    Damageable = 2,
    Intangible = 3,
    Invincible = 4,
    Grazing = 5,
    Shield = 6,
}

/// Defensive collision volume attached to a player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hurtbox {
    pub owner: EntityId,
    pub player_id: u8,
    pub offset: Vec2,
    pub radius: f32,
    pub kind: HurtboxKind,
}

impl Hurtbox {
    pub fn new(owner: EntityId, player_id: u8, radius: f32) -> Self {
        Self {
            owner,
            player_id,
            offset: Vec2::ZERO,
            radius,
            kind: HurtboxKind::Damageable,
        }
    }

    pub fn enabled(&self) -> bool {
        self.kind != HurtboxKind::Inactive
    }
}

impl StateHash for Hurtbox {
    fn write_state(&self, out: &mut Xxh3) {
        out.put_u64(self.owner.to_bits());
        out.put_u8(self.player_id);
        out.put_vec2(self.offset);
        out.put_f32(self.radius);
        out.put_u8(self.kind as u8);
    }
}

/// Ticks left before the entity is destroyed. Destroyed on the tick it is seen at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeToLive {
    pub frames_remaining: u32,
}

impl StateHash for TimeToLive {
    fn write_state(&self, out: &mut Xxh3) {
        out.put_u32(self.frames_remaining);
    }
}

/// Marker for entities excluded from gameplay, rules and respawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Disabled;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_seed_mixes_id() {
        let a = PlayerComponent::new(0, 42, 3, 0.0);
        let b = PlayerComponent::new(1, 42, 3, 0.0);
        assert_eq!(a.rng.state(), 42 ^ 1);
        assert_eq!(b.rng.state(), 42 ^ 2);
    }

    #[test]
    fn test_kill_spends_stock() {
        let mut player = PlayerComponent::new(0, 0, 1, 0.0);
        player.kill();
        assert!(player.is(PlayerFlags::HAS_DIED));
        assert_eq!(player.stocks, 0);
        assert!(!player.is_active());

        player.kill();
        assert_eq!(player.stocks, 0);
    }

    #[test]
    fn test_event_flags_mask() {
        let mut player = PlayerComponent::new(0, 0, 3, 0.0);
        player.set_flags(
            PlayerFlags::HAS_DIED | PlayerFlags::HAS_RESPAWNED | PlayerFlags::GROUNDED,
        );
        player.unset_flags(PlayerFlags::EVENT_FLAGS);
        assert_eq!(player.flags, PlayerFlags::GROUNDED);
    }

    #[test]
    fn test_view_binding_not_hashed() {
        let mut a = PlayerComponent::new(2, 5, 3, 0.0);
        let mut b = a.clone();
        a.view_binding = Some(17);
        b.view_binding = None;
        assert_eq!(crate::hash::hash_one(&a), crate::hash::hash_one(&b));

        b.damage = 1.0;
        assert_ne!(crate::hash::hash_one(&a), crate::hash::hash_one(&b));
    }

    #[test]
    fn test_hurtbox_priority_order() {
        assert!(HurtboxKind::Shield > HurtboxKind::Damageable);
        assert!(!Hurtbox {
            kind: HurtboxKind::Inactive,
            ..Hurtbox::new(EntityId { index: 0, generation: 0 }, 0, 1.0)
        }
        .enabled());
    }

    #[test]
    fn test_scalable_value() {
        let value = ScalableValue {
            base: 2.0,
            scaling: 0.5,
        };
        assert_eq!(value.scaled_to(10.0), 7.0);
    }
}

//! Hitbox spawning and hitbox/hurtbox resolution
//!
//! Collisions are gathered against the state as it was when the phase began,
//! then applied, so the result does not depend on which attacker is processed
//! first. When several hitboxes strike the same player in one tick only the
//! highest-precedence collision applies.

use std::cmp::Ordering;

use glam::Vec2;

use crate::input::Buttons;
use crate::sim::{
    EntityId, Hitbox, HitboxFlags, HurtboxKind, PlayerFlags, SimulationState, TimeToLive,
};

/// Lifetime of a basic attack's hitbox, in ticks.
pub const ATTACK_ACTIVE_TICKS: u32 = 3;
/// Reach of a basic attack in front of the attacker.
pub const ATTACK_REACH: f32 = 1.0;
pub const ATTACK_RADIUS: f32 = 0.75;

#[derive(Debug, Clone, Copy)]
struct Collision {
    hitbox_id: EntityId,
    hitbox: Hitbox,
    target: EntityId,
    target_player: u8,
    kind: HurtboxKind,
    attacker_facing_left: bool,
}

impl Collision {
    /// Higher hurtbox kinds first, then transcendent hitboxes, then priority.
    /// Entity id breaks remaining ties so the order is total.
    fn precedence(&self, other: &Self) -> Ordering {
        other
            .kind
            .cmp(&self.kind)
            .then_with(|| {
                let mine = self.hitbox.is(HitboxFlags::TRANSCENDENT_PRIORITY);
                let theirs = other.hitbox.is(HitboxFlags::TRANSCENDENT_PRIORITY);
                theirs.cmp(&mine)
            })
            .then_with(|| other.hitbox.priority.cmp(&self.hitbox.priority))
            .then_with(|| self.hitbox_id.cmp(&other.hitbox_id))
    }
}

/// Spawn a short-lived hitbox in front of every player who just pressed attack.
pub fn spawn_attacks(state: &mut SimulationState) {
    let mut attacks = Vec::new();
    for id in state.players.sorted_ids() {
        if state.disabled.contains(id) {
            continue;
        }
        let (Some(player), Some(input)) = (state.players.get(id), state.inputs.get(id)) else {
            continue;
        };
        if player.is_hit() || !input.was_pressed(Buttons::ATTACK) {
            continue;
        }
        let facing = if player.is(PlayerFlags::FACING_LEFT) { -1.0 } else { 1.0 };
        attacks.push((id, player.player_id, Vec2::new(facing * ATTACK_REACH, 0.0)));
    }

    for (owner, player_id, offset) in attacks {
        let hitbox_id = state.spawn();
        let mut hitbox = Hitbox::new(owner, player_id, offset, ATTACK_RADIUS);
        hitbox.flags.insert(HitboxFlags::MIRROR_DIRECTION);
        state.hitboxes.insert(hitbox_id, hitbox);
        state.lifetimes.insert(
            hitbox_id,
            TimeToLive {
                frames_remaining: ATTACK_ACTIVE_TICKS,
            },
        );
    }
}

fn world_position(state: &SimulationState, owner: EntityId, offset: Vec2) -> Option<Vec2> {
    state.transforms.get(owner).map(|t| t.position + offset)
}

/// Resolve hitbox/hurtbox overlaps and apply damage, knockback and hitstun.
pub fn resolve_hits(state: &mut SimulationState) {
    let mut collisions: Vec<Collision> = Vec::new();

    for hitbox_id in state.hitboxes.sorted_ids() {
        let Some(hitbox) = state.hitboxes.get(hitbox_id).copied() else {
            continue;
        };
        if !hitbox.enabled || !state.is_alive(hitbox.owner) || state.is_disabled(hitbox.owner) {
            continue;
        }
        let Some(origin) = world_position(state, hitbox.owner, hitbox.offset) else {
            continue;
        };
        let attacker_facing_left = state
            .players
            .get(hitbox.owner)
            .is_some_and(|p| p.is(PlayerFlags::FACING_LEFT));

        for hurtbox_id in state.hurtboxes.sorted_ids() {
            let Some(hurtbox) = state.hurtboxes.get(hurtbox_id) else {
                continue;
            };
            if !hurtbox.enabled()
                || hurtbox.owner == hitbox.owner
                || state.is_disabled(hurtbox.owner)
                || hitbox.hit_mask & (1 << hurtbox.player_id) != 0
            {
                continue;
            }
            let Some(target) = world_position(state, hurtbox.owner, hurtbox.offset) else {
                continue;
            };
            let reach = hitbox.radius + hurtbox.radius;
            if origin.distance_squared(target) <= reach * reach {
                collisions.push(Collision {
                    hitbox_id,
                    hitbox,
                    target: hurtbox.owner,
                    target_player: hurtbox.player_id,
                    kind: hurtbox.kind,
                    attacker_facing_left,
                });
            }
        }
    }

    collisions.sort_by(|a, b| a.target.cmp(&b.target).then_with(|| a.precedence(b)));
    collisions.dedup_by_key(|c| c.target);

    for collision in collisions {
        if let Some(hitbox) = state.hitboxes.get_mut(collision.hitbox_id) {
            hitbox.hit_mask |= 1 << collision.target_player;
        }
        apply_hit(state, &collision);
    }
}

/// Unit launch direction for `angle` radians, flipped horizontally when
/// `mirrored`. Computed with `libm` so every target produces the same bits.
pub fn knockback_direction(angle: f32, mirrored: bool) -> Vec2 {
    let (sin, cos) = libm::sincosf(angle);
    let direction = Vec2::new(cos, sin);
    if mirrored {
        Vec2::new(-direction.x, direction.y)
    } else {
        direction
    }
}

fn apply_hit(state: &mut SimulationState, collision: &Collision) {
    let hitbox = &collision.hitbox;
    let (Some(player), Some(velocity)) = (
        state.players.get_mut(collision.target),
        state.velocities.get_mut(collision.target),
    ) else {
        return;
    };
    match collision.kind {
        HurtboxKind::Damageable => {
            player.damage += hitbox.damage.scaled_to(player.damage);
            let force = hitbox.knockback_force.scaled_to(player.damage);
            let mirrored =
                collision.attacker_facing_left && hitbox.is(HitboxFlags::MIRROR_DIRECTION);
            velocity.linear = knockback_direction(hitbox.knockback_angle, mirrored) * force;
            player.hitstun =
                hitbox.hitstun.scaled_to(player.damage).clamp(0.0, u8::MAX as f32) as u8;
            player.unset_flags(PlayerFlags::GROUNDED);
        }
        HurtboxKind::Grazing => {
            player.damage += hitbox.damage.scaled_to(player.damage);
        }
        HurtboxKind::Shield => {
            let amount = hitbox.damage.scaled_to(0.0).max(0.0) as u16;
            player.shield_damage = player.shield_damage.saturating_add(amount);
        }
        HurtboxKind::Inactive | HurtboxKind::Intangible | HurtboxKind::Invincible => {}
    }
}

//! Player movement: walking, friction, gravity, fast fall, jumping, ground contact

use glam::Vec2;

use crate::config::Ground;
use crate::input::{Buttons, DEFAULT_DEAD_ZONE, outside_dead_zone};
use crate::sim::{PlayerFlags, SimulationState, TickContext};

fn axis(value: i8) -> f32 {
    if !outside_dead_zone(value, DEFAULT_DEAD_ZONE) {
        0.0
    } else if value > 0 {
        1.0
    } else {
        -1.0
    }
}

pub fn run(state: &mut SimulationState, ctx: &TickContext, ground: Option<&Ground>) {
    let dt = ctx.delta_secs();
    for id in state.movement.sorted_ids() {
        if state.disabled.contains(id) {
            continue;
        }
        let Some(params) = state.movement.get(id).copied() else {
            continue;
        };
        let input = state.inputs.get(id).copied().unwrap_or_default();
        let (Some(player), Some(velocity), Some(transform)) = (
            state.players.get_mut(id),
            state.velocities.get_mut(id),
            state.transforms.get_mut(id),
        ) else {
            continue;
        };

        let mut v = velocity.linear;
        let grounded = player.is(PlayerFlags::GROUNDED);
        let direction = axis(input.current.move_x);

        if player.hitstun > 0 {
            player.hitstun -= 1;
        } else if direction != 0.0 {
            if (v.x + direction * params.move_speed).abs() >= params.max_speed {
                v.x = direction * params.max_speed;
            } else {
                v.x += direction * params.move_speed;
            }
            player.flags.set(PlayerFlags::FACING_LEFT, direction < 0.0);
        } else if v.x.abs() - params.grounded_friction <= 0.0 {
            v.x = 0.0;
        } else {
            v.x -= v.x.signum() * params.grounded_friction;
        }

        let fast_falling = v.y < 0.0 && axis(input.current.move_y) < 0.0;
        let (pull, terminal) = if fast_falling {
            (params.weight * 2.0, params.max_fast_fall_speed)
        } else {
            (params.weight, params.max_fall_speed)
        };
        v.y = (v.y - pull).max(-terminal);
        player.flags.set(PlayerFlags::FAST_FALLING, fast_falling);

        if grounded && player.hitstun == 0 && input.was_pressed(Buttons::JUMP) {
            v.y = params.jump_power;
        }

        let previous = transform.position;
        let mut next = previous + v * dt;
        let landed = ground.is_some_and(|ground| {
            v.y <= 0.0
                && ground.spans(next.x)
                && previous.y >= ground.height
                && next.y <= ground.height
        });
        if let (true, Some(ground)) = (landed, ground) {
            next.y = ground.height;
            v.y = 0.0;
        }
        player.flags.set(PlayerFlags::GROUNDED, landed);

        velocity.linear = v;
        transform.position = next;
    }
}

/// Zero velocity, used when a player is relocated.
pub fn stop(state: &mut SimulationState, id: crate::sim::EntityId) {
    if let Some(velocity) = state.velocities.get_mut(id) {
        velocity.linear = Vec2::ZERO;
    }
}

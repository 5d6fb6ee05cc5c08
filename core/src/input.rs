//! Per-tick player input
//!
//! [`FrameInput`] is the 5-byte control record sampled once per tick for each
//! player. A tick's input is always [`MAX_PLAYERS`] wide ([`TickInputs`]),
//! regardless of how many players are in the match; unused slots stay zeroed.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::config::MAX_PLAYERS;

/// Default analog dead zone applied by input sources.
pub const DEFAULT_DEAD_ZONE: u8 = 39;

/// Size of one tick's input block in bytes.
pub const TICK_INPUT_BYTES: usize = MAX_PLAYERS * std::mem::size_of::<FrameInput>();

bitflags! {
    /// Button bitfield. Bit order matches the replay format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u8 {
        const ATTACK = 1 << 0;
        const SPECIAL = 1 << 1;
        const JUMP = 1 << 2;
        const SHIELD = 1 << 3;
        const GRAB = 1 << 4;
    }
}

/// One player's input for one tick.
#[repr(C)]
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Pod,
    Zeroable,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct FrameInput {
    /// Raw [`Buttons`] bits
    pub buttons: u8,
    pub move_x: i8,
    pub move_y: i8,
    pub smash_x: i8,
    pub smash_y: i8,
}

/// Full input block for one tick.
pub type TickInputs = [FrameInput; MAX_PLAYERS];

/// An all-zero tick input block.
pub const EMPTY_TICK: TickInputs = [FrameInput {
    buttons: 0,
    move_x: 0,
    move_y: 0,
    smash_x: 0,
    smash_y: 0,
}; MAX_PLAYERS];

impl FrameInput {
    pub fn new(buttons: Buttons, movement: (i8, i8), smash: (i8, i8)) -> Self {
        Self {
            buttons: buttons.bits(),
            move_x: movement.0,
            move_y: movement.1,
            smash_x: smash.0,
            smash_y: smash.1,
        }
    }

    /// Known buttons only; undefined high bits are dropped.
    #[inline]
    pub fn buttons(&self) -> Buttons {
        Buttons::from_bits_truncate(self.buttons)
    }

    #[inline]
    pub fn is_pressed(&self, button: Buttons) -> bool {
        self.buttons().contains(button)
    }

    pub fn set(&mut self, button: Buttons, pressed: bool) {
        let mut buttons = self.buttons();
        buttons.set(button, pressed);
        self.buttons = buttons.bits();
    }

    /// Movement stick scaled to -1.0..=1.0.
    pub fn movement(&self) -> Vec2 {
        stick_to_vec(self.move_x, self.move_y)
    }

    /// Smash stick scaled to -1.0..=1.0.
    pub fn smash(&self) -> Vec2 {
        stick_to_vec(self.smash_x, self.smash_y)
    }

    /// Zero out stick axes that fall inside `dead_zone`.
    pub fn with_dead_zone(mut self, dead_zone: u8) -> Self {
        self.move_x = apply_dead_zone(self.move_x, dead_zone);
        self.move_y = apply_dead_zone(self.move_y, dead_zone);
        self.smash_x = apply_dead_zone(self.smash_x, dead_zone);
        self.smash_y = apply_dead_zone(self.smash_y, dead_zone);
        self
    }
}

fn stick_to_vec(x: i8, y: i8) -> Vec2 {
    Vec2::new(
        (x as f32 / 127.0).clamp(-1.0, 1.0),
        (y as f32 / 127.0).clamp(-1.0, 1.0),
    )
}

/// True if `value` lies strictly outside `-dead_zone..=dead_zone`.
#[inline]
pub fn outside_dead_zone(value: i8, dead_zone: u8) -> bool {
    (value as i16).abs() > dead_zone as i16
}

#[inline]
fn apply_dead_zone(value: i8, dead_zone: u8) -> i8 {
    if outside_dead_zone(value, dead_zone) { value } else { 0 }
}

/// Raw bytes of a tick's input block, in player order.
pub fn tick_bytes(inputs: &TickInputs) -> &[u8] {
    bytemuck::cast_slice(inputs.as_slice())
}

/// Rebuild a tick's input block from exactly [`TICK_INPUT_BYTES`] bytes.
pub fn tick_from_bytes(bytes: &[u8; TICK_INPUT_BYTES]) -> TickInputs {
    let mut inputs = EMPTY_TICK;
    bytemuck::cast_slice_mut::<FrameInput, u8>(&mut inputs).copy_from_slice(bytes);
    inputs
}

/// Current and previous input for one player, used for edge detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInputState {
    pub current: FrameInput,
    pub previous: FrameInput,
}

impl PlayerInputState {
    pub fn update(&mut self, input: FrameInput) {
        self.previous = self.current;
        self.current = input;
    }

    pub fn is_pressed(&self, button: Buttons) -> bool {
        self.current.is_pressed(button)
    }

    pub fn was_pressed(&self, button: Buttons) -> bool {
        self.current.is_pressed(button) && !self.previous.is_pressed(button)
    }

    pub fn was_released(&self, button: Buttons) -> bool {
        !self.current.is_pressed(button) && self.previous.is_pressed(button)
    }
}

/// Device polling collaborator. `local_id` is the player's local device index.
pub trait InputSource {
    fn sample(&mut self, local_id: u8) -> FrameInput;
}

/// Input source that always reports neutral input.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeutralInput;

impl InputSource for NeutralInput {
    fn sample(&mut self, _local_id: u8) -> FrameInput {
        FrameInput::default()
    }
}

impl<F> InputSource for F
where
    F: FnMut(u8) -> FrameInput,
{
    fn sample(&mut self, local_id: u8) -> FrameInput {
        self(local_id)
    }
}

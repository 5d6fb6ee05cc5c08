//! Gameplay systems, run by the match stepper in a fixed order

pub mod blast_zone;
pub mod combat;
pub mod inject;
pub mod lifetime;
pub mod movement;
pub mod respawn;

pub use inject::InputInjector;

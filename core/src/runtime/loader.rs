//! Match initialization collaborators
//!
//! Asset loading and character spawning happen outside the simulation. The
//! match awaits both before its first tick.

use std::future::{self, Future};

use glam::Vec2;
use tokio::sync::watch;

use crate::config::PlayerConfig;
use crate::sim::Movement;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("match data failed to load: {0}")]
pub struct LoadError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SpawnError(pub String);

/// Waits for every asset a match needs.
pub trait MatchDataLoader {
    fn wait_until_loaded(&self) -> impl Future<Output = Result<(), LoadError>> + Send;
}

/// Character data handed back for each spawned player.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedPlayer {
    pub movement: Movement,
    pub hurtbox_radius: f32,
    /// Presentation object to bind to the player; never hashed
    pub view_binding: Option<u32>,
}

impl Default for SpawnedPlayer {
    fn default() -> Self {
        Self {
            movement: Movement::default(),
            hurtbox_radius: 1.0,
            view_binding: None,
        }
    }
}

/// Produces the character for one player at its spawn point.
pub trait PlayerSpawner {
    fn spawn_player(
        &self,
        player: &PlayerConfig,
        spawn_point: Vec2,
    ) -> impl Future<Output = Result<SpawnedPlayer, SpawnError>> + Send;
}

/// Spawns every character with default tuning and no view binding.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSpawner;

impl PlayerSpawner for DefaultSpawner {
    fn spawn_player(
        &self,
        _player: &PlayerConfig,
        _spawn_point: Vec2,
    ) -> impl Future<Output = Result<SpawnedPlayer, SpawnError>> + Send {
        future::ready(Ok(SpawnedPlayer::default()))
    }
}

/// One-shot "assets are ready" signal shared between a loader task and the match.
#[derive(Debug, Clone)]
pub struct LoadBarrier {
    ready: watch::Sender<bool>,
}

impl Default for LoadBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBarrier {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self { ready }
    }

    /// A barrier that is already open.
    pub fn ready() -> Self {
        let barrier = Self::new();
        barrier.mark_loaded();
        barrier
    }

    pub fn mark_loaded(&self) {
        self.ready.send_replace(true);
    }

    pub fn is_loaded(&self) -> bool {
        *self.ready.borrow()
    }
}

impl MatchDataLoader for LoadBarrier {
    fn wait_until_loaded(&self) -> impl Future<Output = Result<(), LoadError>> + Send {
        let mut rx = self.ready.subscribe();
        async move {
            rx.wait_for(|loaded| *loaded)
                .await
                .map(|_| ())
                .map_err(|_| LoadError("loader dropped before completion".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_barrier_resolves() {
        let barrier = LoadBarrier::ready();
        assert!(barrier.is_loaded());
        pollster::block_on(barrier.wait_until_loaded()).unwrap();
    }

    #[tokio::test]
    async fn test_barrier_waits_for_signal() {
        let barrier = LoadBarrier::new();
        assert!(!barrier.is_loaded());

        let signal = barrier.clone();
        let task = tokio::spawn(async move {
            tokio::task::yield_now().await;
            signal.mark_loaded();
        });

        barrier.wait_until_loaded().await.unwrap();
        task.await.unwrap();
        assert!(barrier.is_loaded());
    }

    #[test]
    fn test_default_spawner() {
        let spawned =
            pollster::block_on(DefaultSpawner.spawn_player(&PlayerConfig::local(0), Vec2::ZERO))
                .unwrap();
        assert_eq!(spawned, SpawnedPlayer::default());
    }
}

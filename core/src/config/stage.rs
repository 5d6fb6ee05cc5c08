//! Stage layout: spawn points, respawn points, blast zones and ground

use std::collections::HashSet;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Axis-aligned rectangle in stage space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds2D {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds2D {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// A position with a unique name within its list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint {
    pub name: String,
    pub position: Vec2,
}

impl NamedPoint {
    pub fn new(name: impl Into<String>, position: Vec2) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// Flat floor spanning `min_x..=max_x` at `height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ground {
    pub height: f32,
    pub min_x: f32,
    pub max_x: f32,
}

impl Ground {
    /// Whether `x` lies above the floor's horizontal span.
    pub fn spans(&self, x: f32) -> bool {
        x >= self.min_x && x <= self.max_x
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Spawn,
    Respawn,
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointKind::Spawn => write!(f, "spawn"),
            PointKind::Respawn => write!(f, "respawn"),
        }
    }
}

/// Stage description as authored (`stage.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StageSettings {
    #[serde(default)]
    pub spawn_points: Vec<NamedPoint>,
    #[serde(default)]
    pub respawn_points: Vec<NamedPoint>,
    /// A player outside every zone is eliminated. No zones means no elimination.
    #[serde(default)]
    pub blast_zones: Vec<Bounds2D>,
    #[serde(default)]
    pub ground: Option<Ground>,
}

impl StageSettings {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// A small flat stage with one spawn and respawn point per player slot.
    pub fn flat(players: usize) -> Self {
        let points = |prefix: &str, y: f32| {
            (0..players.max(1))
                .map(|i| {
                    NamedPoint::new(format!("{prefix}{i}"), Vec2::new(i as f32 * 4.0 - 6.0, y))
                })
                .collect::<Vec<_>>()
        };
        Self {
            spawn_points: points("spawn", 0.0),
            respawn_points: points("respawn", 10.0),
            blast_zones: vec![Bounds2D::new(Vec2::new(-50.0, -30.0), Vec2::new(50.0, 40.0))],
            ground: Some(Ground {
                height: 0.0,
                min_x: -20.0,
                max_x: 20.0,
            }),
        }
    }

    /// Validate names and order points by name.
    pub fn resolve(&self) -> Result<StageLayout, ConfigError> {
        let spawn_points = sorted_positions(&self.spawn_points, PointKind::Spawn)?;
        let respawn_points = sorted_positions(&self.respawn_points, PointKind::Respawn)?;
        if spawn_points.is_empty() {
            return Err(ConfigError::NoSpawnPoints);
        }
        if respawn_points.is_empty() {
            return Err(ConfigError::NoRespawnPoints);
        }
        Ok(StageLayout {
            spawn_points,
            respawn_points,
            blast_zones: self.blast_zones.clone(),
            ground: self.ground,
        })
    }
}

fn sorted_positions(points: &[NamedPoint], kind: PointKind) -> Result<Vec<Vec2>, ConfigError> {
    let mut names = HashSet::with_capacity(points.len());
    for point in points {
        if !names.insert(point.name.as_str()) {
            return Err(ConfigError::DuplicatePointName {
                kind,
                name: point.name.clone(),
            });
        }
    }
    let mut ordered: Vec<&NamedPoint> = points.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ordered.into_iter().map(|p| p.position).collect())
}

/// Validated stage data used by the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct StageLayout {
    pub spawn_points: Vec<Vec2>,
    pub respawn_points: Vec<Vec2>,
    pub blast_zones: Vec<Bounds2D>,
    pub ground: Option<Ground>,
}

impl StageLayout {
    /// Spawn point for the `index`-th configured player, wrapping around.
    pub fn spawn_point(&self, index: usize) -> Vec2 {
        self.spawn_points[index % self.spawn_points.len()]
    }

    /// True if `point` is inside any blast zone, or if the stage has none.
    pub fn in_bounds(&self, point: Vec2) -> bool {
        self.blast_zones.is_empty() || self.blast_zones.iter().any(|zone| zone.contains(point))
    }
}

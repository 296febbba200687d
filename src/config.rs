use std::path::Path;

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::storage::{self, StorageError};

const CONFIG_PATH: &str = "assets/config/game.ron";

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        // Tuning is static for the lifetime of the app, so it goes in at build
        // time and every later plugin can read it from Startup onwards.
        app.insert_resource(load_or_default(Path::new(CONFIG_PATH)));
    }
}

/// All gameplay tuning in one place.
///
/// Every section and field falls back to its Default when missing from the
/// file, so a config only needs to mention what it changes.
#[derive(Resource, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub session: SessionConfig,
    pub astronaut: AstronautConfig,
    pub falling: FallingConfig,
    pub spawner: SpawnerConfig,
    pub arena: ArenaConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub max_health: f32,
    pub debris_damage: f32,
    pub max_water: f32,
    pub snow_water: f32,
    pub snow_points: u32,
    /// Seconds of survival per passive score point.
    pub score_interval: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            debris_damage: 10.0,
            max_water: 100.0,
            snow_water: 20.0,
            snow_points: 5,
            score_interval: 1.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AstronautConfig {
    pub move_speed: f32,
    /// Hard limit on |x| for the astronaut's center.
    pub horizontal_boundary: f32,
    pub jump_force: f32,
    pub leap_force: f32,
    pub jump_duration: f32,
    pub gravity: f32,
    /// Scales leap_force into horizontal speed while leaping.
    pub horizontal_multiplier: f32,
    pub bob_amount: f32,
    pub bob_speed: f32,
    pub body_size: Vec2,
    pub spawn_x: f32,
}

impl Default for AstronautConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            horizontal_boundary: 8.0,
            jump_force: 7.0,
            leap_force: 5.0,
            jump_duration: 0.5,
            gravity: 15.0,
            horizontal_multiplier: 2.5,
            bob_amount: 0.1,
            bob_speed: 5.0,
            body_size: Vec2::new(1.0, 1.8),
            spawn_x: 0.0,
        }
    }
}

/// Per-kind tuning for a falling object template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FallingTuning {
    pub name: String,
    pub fall_speed: f32,
    /// Degrees per second before randomization.
    pub spin: f32,
    pub size: Vec2,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FallingConfig {
    pub snow: FallingTuning,
    pub debris: FallingTuning,
    /// Spin speed is scaled by a random factor in [1/variance, variance].
    pub rotation_variance: f32,
    /// Objects whose center drops below this y are removed.
    pub bottom_boundary: f32,
    pub drift_degrees: f32,
}

impl Default for FallingConfig {
    fn default() -> Self {
        Self {
            snow: FallingTuning {
                name: "Snowflake".to_string(),
                fall_speed: 1.5,
                spin: 50.0,
                size: Vec2::splat(0.6),
            },
            debris: FallingTuning {
                name: "Asteroid".to_string(),
                fall_speed: 4.0,
                spin: 70.0,
                size: Vec2::splat(0.8),
            },
            rotation_variance: 1.5,
            bottom_boundary: -6.0,
            drift_degrees: 20.0,
        }
    }
}

/// How a spawn point picks the fall speed of what it spawns.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum FallSpeed {
    Fixed(f32),
    Between(f32, f32),
}

impl FallSpeed {
    pub fn sample(&self, rng: &mut impl Rng) -> f32 {
        match *self {
            FallSpeed::Fixed(speed) => speed,
            FallSpeed::Between(a, b) if a == b => a,
            FallSpeed::Between(a, b) => rng.gen_range(a.min(b)..=a.max(b)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpawnPointConfig {
    pub position: Vec2,
    pub speed: FallSpeed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpawnerConfig {
    pub points: Vec<SpawnPointConfig>,
    pub auto_spawn: bool,
    pub min_delay: f32,
    pub max_delay: f32,
    /// Probability that a chance spawn picks snow over debris.
    pub snow_chance: f32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        let points = [-6.0, -2.0, 2.0, 6.0]
            .into_iter()
            .map(|x| SpawnPointConfig {
                position: Vec2::new(x, 7.0),
                speed: FallSpeed::Fixed(1.5),
            })
            .collect();

        Self {
            points,
            auto_spawn: true,
            min_delay: 1.0,
            max_delay: 3.0,
            snow_chance: 0.7,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ArenaConfig {
    /// World units visible vertically; the camera scales to fit.
    pub view_height: f32,
    /// y of the floor surface the astronaut stands on.
    pub floor_y: f32,
    /// x of the inner face of each side wall.
    pub wall_x: f32,
    pub wall_thickness: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            view_height: 12.0,
            floor_y: -4.0,
            wall_x: 8.5,
            wall_thickness: 0.5,
        }
    }
}

impl GameConfig {
    /// Where the astronaut's center rests while standing on the floor.
    pub fn astronaut_rest_y(&self) -> f32 {
        self.arena.floor_y + self.astronaut.body_size.y / 2.0
    }

    pub fn astronaut_spawn(&self) -> Vec2 {
        Vec2::new(self.astronaut.spawn_x, self.astronaut_rest_y())
    }
}

pub fn load(path: &Path) -> Result<Option<GameConfig>, StorageError> {
    storage::read_ron(path)
}

fn load_or_default(path: &Path) -> GameConfig {
    match load(path) {
        Ok(Some(config)) => {
            info!("Loaded game config from {:?}", path);
            config
        }
        Ok(None) => {
            info!("No game config at {:?}. Using defaults.", path);
            GameConfig::default()
        }
        Err(e) => {
            error!("{}. Using default config.", e);
            GameConfig::default()
        }
    }
}

//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::game::snapshot::SyncTolerance;
use crate::player::MovementSettings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// World directory; player files live in `<world_dir>/players`
    pub world_dir: PathBuf,

    /// Simulation ticks per second
    pub simulation_tps: u32,
    /// State-update checks per second
    pub snapshot_tps: u32,
    /// Seconds between autosaves (0 disables autosave)
    pub autosave_interval_secs: u64,

    /// Drift tolerated before a player counts as changed
    pub sync_tolerance: SyncTolerance,
    /// Whether aux1 grants the fast movement speed
    pub fast_move: bool,
    /// Radius around the origin new players spawn in, in nodes
    pub spawn_radius: f32,
    /// Seed for spawn placement
    pub world_seed: u64,

    /// Movement constants sent to every player
    pub movement: MovementSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let simulation_tps: u32 = parse_var("SIMULATION_TPS", 30)?;
        let snapshot_tps: u32 = parse_var("SNAPSHOT_TPS", 10)?;
        if simulation_tps == 0 {
            return Err(ConfigError::Invalid {
                var: "SIMULATION_TPS",
                value: "0".to_string(),
            });
        }
        if snapshot_tps == 0 || snapshot_tps > simulation_tps {
            return Err(ConfigError::Invalid {
                var: "SNAPSHOT_TPS",
                value: snapshot_tps.to_string(),
            });
        }

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            world_dir: env::var("WORLD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./world")),

            simulation_tps,
            snapshot_tps,
            autosave_interval_secs: parse_var("AUTOSAVE_INTERVAL_SECS", 60)?,

            sync_tolerance: SyncTolerance {
                position: non_negative_var("SYNC_POSITION_EPSILON", 0.0)?,
                angle: non_negative_var("SYNC_ANGLE_EPSILON", 0.0)?,
            },
            fast_move: parse_var("FAST_MOVE", false)?,
            spawn_radius: non_negative_var("SPAWN_RADIUS", 5.0)?,
            world_seed: parse_var("WORLD_SEED", 0)?,

            movement: movement_from_env()?,
        })
    }

    /// Simulation ticks between state-update checks
    pub fn snapshot_interval(&self) -> u32 {
        (self.simulation_tps / self.snapshot_tps).max(1)
    }
}

fn movement_from_env() -> Result<MovementSettings, ConfigError> {
    let d = MovementSettings::default();
    Ok(MovementSettings {
        acceleration_default: positive_var("MOVEMENT_ACCELERATION_DEFAULT", d.acceleration_default)?,
        acceleration_air: positive_var("MOVEMENT_ACCELERATION_AIR", d.acceleration_air)?,
        acceleration_fast: positive_var("MOVEMENT_ACCELERATION_FAST", d.acceleration_fast)?,
        speed_walk: positive_var("MOVEMENT_SPEED_WALK", d.speed_walk)?,
        speed_crouch: positive_var("MOVEMENT_SPEED_CROUCH", d.speed_crouch)?,
        speed_fast: positive_var("MOVEMENT_SPEED_FAST", d.speed_fast)?,
        speed_climb: positive_var("MOVEMENT_SPEED_CLIMB", d.speed_climb)?,
        speed_jump: positive_var("MOVEMENT_SPEED_JUMP", d.speed_jump)?,
        liquid_fluidity: positive_var("MOVEMENT_LIQUID_FLUIDITY", d.liquid_fluidity)?,
        liquid_fluidity_smooth: positive_var(
            "MOVEMENT_LIQUID_FLUIDITY_SMOOTH",
            d.liquid_fluidity_smooth,
        )?,
        liquid_sink: positive_var("MOVEMENT_LIQUID_SINK", d.liquid_sink)?,
        gravity: positive_var("MOVEMENT_GRAVITY", d.gravity)?,
    })
}

/// Read and parse an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::Invalid {
            var,
            value: "<non-unicode>".to_string(),
        }),
    }
}

/// Finite and strictly positive; movement math divides by some of these
fn positive_var(var: &'static str, default: f32) -> Result<f32, ConfigError> {
    checked_f32(var, default, |v| v > 0.0)
}

fn non_negative_var(var: &'static str, default: f32) -> Result<f32, ConfigError> {
    checked_f32(var, default, |v| v >= 0.0)
}

fn checked_f32(
    var: &'static str,
    default: f32,
    accept: impl Fn(f32) -> bool,
) -> Result<f32, ConfigError> {
    let value = parse_var(var, default)?;
    if value.is_finite() && accept(value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

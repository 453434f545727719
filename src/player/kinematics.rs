//! Physical state of a player and the movement constants that drive it

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// World units per node
pub const BS: f32 = 10.0;

pub const PLAYER_MAX_HP: u16 = 20;
pub const PLAYER_MAX_BREATH: u16 = 11;

/// Movement constants, in world units (per second / per second squared)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementSettings {
    pub acceleration_default: f32,
    pub acceleration_air: f32,
    pub acceleration_fast: f32,
    pub speed_walk: f32,
    pub speed_crouch: f32,
    pub speed_fast: f32,
    pub speed_climb: f32,
    pub speed_jump: f32,
    pub liquid_fluidity: f32,
    pub liquid_fluidity_smooth: f32,
    pub liquid_sink: f32,
    pub gravity: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            acceleration_default: 3.0 * BS,
            acceleration_air: 2.0 * BS,
            acceleration_fast: 10.0 * BS,
            speed_walk: 4.0 * BS,
            speed_crouch: 1.35 * BS,
            speed_fast: 20.0 * BS,
            speed_climb: 2.0 * BS,
            speed_jump: 6.5 * BS,
            liquid_fluidity: 1.0 * BS,
            liquid_fluidity_smooth: 0.5 * BS,
            liquid_sink: 10.0 * BS,
            gravity: 9.81 * BS,
        }
    }
}

/// Script-settable multipliers on the base movement constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsOverride {
    pub speed: f32,
    pub jump: f32,
    pub gravity: f32,
}

impl Default for PhysicsOverride {
    fn default() -> Self {
        Self {
            speed: 1.0,
            jump: 1.0,
            gravity: 1.0,
        }
    }
}

/// What the player is touching, as reported by the last collision step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvironmentFlags {
    pub touching_ground: bool,
    /// Oscillates while swimming so the player bobs above the surface
    pub in_liquid: bool,
    /// Steadier than `in_liquid`; decides the speed limits
    pub in_liquid_stable: bool,
    /// Viscosity of the surrounding liquid, 0..=7
    pub liquid_viscosity: u8,
    pub is_climbing: bool,
    pub swimming_vertical: bool,
    pub camera_barely_in_ceiling: bool,
}

impl EnvironmentFlags {
    pub fn in_any_liquid(&self) -> bool {
        self.in_liquid || self.in_liquid_stable
    }
}

/// Axis-aligned box relative to the player's feet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for CollisionBox {
    fn default() -> Self {
        Self {
            min: Vec3::new(-BS * 0.30, 0.0, -BS * 0.30),
            max: Vec3::new(BS * 0.30, BS * 1.75, BS * 0.30),
        }
    }
}

/// Mutable physical state of a player
///
/// `hp` and `breath` are kept in range by the owning [`Player`](super::Player)
/// setters, not by this struct.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub hp: u16,
    pub breath: u16,
    pub env: EnvironmentFlags,
    pub physics_override: PhysicsOverride,
    pub movement: MovementSettings,
    pub collision_box: CollisionBox,
}

impl Default for KinematicState {
    fn default() -> Self {
        Self::new(MovementSettings::default())
    }
}

impl KinematicState {
    pub fn new(movement: MovementSettings) -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            pitch: 0.0,
            yaw: 0.0,
            hp: PLAYER_MAX_HP,
            breath: PLAYER_MAX_BREATH,
            env: EnvironmentFlags::default(),
            physics_override: PhysicsOverride::default(),
            movement,
            collision_box: CollisionBox::default(),
        }
    }

    /// Offset from the feet to the camera.
    ///
    /// Drops to a lower fixed height while the camera is wedged against a
    /// ceiling; there is no interpolation between the two.
    pub fn eye_offset(&self) -> Vec3 {
        if self.env.camera_barely_in_ceiling {
            Vec3::new(0.0, BS * 1.5, 0.0)
        } else {
            Vec3::new(0.0, BS * 1.625, 0.0)
        }
    }

    pub fn eye_position(&self) -> Vec3 {
        self.position + self.eye_offset()
    }

    /// Pitch in radians, positive looking up
    pub fn rad_pitch(&self) -> f32 {
        -self.pitch.to_radians()
    }

    /// Yaw in radians, rotated so 0 faces +X
    pub fn rad_yaw(&self) -> f32 {
        (self.yaw + 90.0).to_radians()
    }

    /// Node used to sample the light level at the player's head
    pub fn light_position(&self) -> IVec3 {
        float_to_node(self.position + Vec3::new(0.0, BS + BS / 2.0, 0.0))
    }
}

/// Convert a world position to the node containing it (rounding half away
/// from zero).
pub fn float_to_node(p: Vec3) -> IVec3 {
    let axis = |v: f32| {
        let half = if v > 0.0 { BS / 2.0 } else { -BS / 2.0 };
        ((v + half) / BS) as i32
    };
    IVec3::new(axis(p.x), axis(p.y), axis(p.z))
}

//! Boundary to world collision
//!
//! The movement code hands position, velocity and a displacement bound to a
//! [`CollisionWorld`] and takes back the resolved state together with what
//! the player ended up touching. [`FlatWorld`] is a minimal world used by
//! the headless host and tests.

use glam::Vec3;

use crate::player::kinematics::{CollisionBox, EnvironmentFlags, BS};

/// Head closer to the ceiling than this counts as "camera in ceiling"
const CEILING_MARGIN: f32 = 0.15 * BS;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    pub position: Vec3,
    pub velocity: Vec3,
    pub dtime: f32,
    /// Upper bound on displacement for this step; zero disables the bound
    pub pos_max_d: f32,
    pub collision_box: CollisionBox,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    pub position: Vec3,
    pub velocity: Vec3,
    /// `swimming_vertical` is input-driven and ignored by callers
    pub env: EnvironmentFlags,
}

pub trait CollisionWorld {
    fn advance(&self, request: &MoveRequest) -> MoveOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidLayer {
    pub surface_y: f32,
    pub viscosity: u8,
}

/// Infinite flat floor with an optional liquid layer and ceiling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatWorld {
    pub ground_y: f32,
    pub liquid: Option<LiquidLayer>,
    pub ceiling_y: Option<f32>,
}

impl Default for FlatWorld {
    fn default() -> Self {
        Self {
            ground_y: 0.0,
            liquid: None,
            ceiling_y: None,
        }
    }
}

impl CollisionWorld for FlatWorld {
    fn advance(&self, request: &MoveRequest) -> MoveOutcome {
        let mut displacement = request.velocity * request.dtime;
        let length = displacement.length();
        if request.pos_max_d > 0.0 && length > request.pos_max_d {
            displacement *= request.pos_max_d / length;
        }

        let mut position = request.position + displacement;
        let mut velocity = request.velocity;
        let mut env = EnvironmentFlags::default();

        if position.y <= self.ground_y {
            position.y = self.ground_y;
            velocity.y = velocity.y.max(0.0);
            env.touching_ground = true;
        }

        if let Some(ceiling) = self.ceiling_y {
            let head = request.collision_box.max.y;
            if position.y + head > ceiling {
                position.y = (ceiling - head).max(self.ground_y);
                velocity.y = velocity.y.min(0.0);
            }
            env.camera_barely_in_ceiling = position.y + head >= ceiling - CEILING_MARGIN;
        }

        if let Some(liquid) = self.liquid {
            env.in_liquid = position.y + BS * 0.5 < liquid.surface_y;
            env.in_liquid_stable = position.y + BS * 0.1 < liquid.surface_y;
            if env.in_any_liquid() {
                env.liquid_viscosity = liquid.viscosity;
            }
        }

        MoveOutcome {
            position,
            velocity,
            env,
        }
    }
}

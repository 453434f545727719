//! Player movement integration
//!
//! Velocity only ever approaches its target linearly: each call moves it by
//! at most the given cap and lands exactly on the target once it is within
//! reach. Which target and cap apply on a given tick is decided by
//! [`MovementIntegrator::apply_control`] from the player's input and
//! surroundings.

use glam::Vec3;

use crate::player::kinematics::{KinematicState, BS};
use crate::player::PlayerControl;

/// How strongly liquid viscosity damps movement, 0..1
const VISCOSITY_FACTOR: f32 = 0.3;

/// Jumps are refused while falling faster than this
const JUMP_MIN_VERTICAL_SPEED: f32 = -0.5 * BS;

/// Movement system for player velocities
pub struct MovementIntegrator;

impl MovementIntegrator {
    /// Move the X/Z components of `velocity` toward `target` by at most
    /// `max_increase`. Y is neither read from `target` nor changed.
    pub fn accelerate_horizontal(velocity: &mut Vec3, target: Vec3, max_increase: f32) {
        if max_increase.is_nan() || max_increase <= 0.0 {
            return;
        }
        if !target.x.is_finite() || !target.z.is_finite() {
            return;
        }

        let wanted = Vec3::new(target.x - velocity.x, 0.0, target.z - velocity.z);
        let distance = wanted.length();

        if distance <= max_increase {
            velocity.x = target.x;
            velocity.z = target.z;
            return;
        }

        let step = wanted * (max_increase / distance);
        velocity.x += step.x;
        velocity.z += step.z;
    }

    /// Move the Y component of `velocity` toward `target_y` by at most
    /// `max_increase`.
    pub fn accelerate_vertical(velocity: &mut Vec3, target_y: f32, max_increase: f32) {
        if max_increase.is_nan() || max_increase <= 0.0 || !target_y.is_finite() {
            return;
        }

        let wanted = target_y - velocity.y;
        if wanted.abs() <= max_increase {
            velocity.y = target_y;
        } else {
            velocity.y += max_increase.copysign(wanted);
        }
    }

    /// Turn this tick's input into target speeds and caps and apply them.
    ///
    /// `fast_move` is the server-granted permission to use the fast speed
    /// with the aux1 key. Returns true if the player jumped.
    pub fn apply_control(
        state: &mut KinematicState,
        control: &PlayerControl,
        fast_move: bool,
        dtime: f32,
    ) -> bool {
        state.env.swimming_vertical = false;
        state.pitch = control.pitch;
        state.yaw = control.yaw;

        let env = state.env;
        let movement = state.movement;
        let overrides = state.physics_override;
        let can_jump = env.touching_ground && !env.in_liquid;

        // Forward is +Z at yaw 0, rotating toward -X as yaw grows
        let yaw = state.yaw.to_radians();
        let forward = Vec3::new(-yaw.sin(), 0.0, yaw.cos());
        let leftward = forward.cross(Vec3::Y);

        let superspeed = control.aux1 && fast_move && !env.is_climbing;

        let mut speed_h = Vec3::ZERO;
        let mut speed_v = 0.0;

        if control.sneak {
            if env.in_any_liquid() {
                speed_v = -movement.speed_walk;
                state.env.swimming_vertical = true;
            } else if env.is_climbing {
                speed_v = -movement.speed_climb;
            }
        }

        if control.up {
            speed_h += forward;
        }
        if control.down {
            speed_h -= forward;
        }
        if control.left {
            speed_h += leftward;
        }
        if control.right {
            speed_h -= leftward;
        }

        let mut jumped = false;
        if control.jump {
            if can_jump {
                if state.velocity.y >= JUMP_MIN_VERTICAL_SPEED {
                    state.velocity.y = movement.speed_jump * overrides.jump;
                    jumped = true;
                }
            } else if env.in_liquid {
                speed_v = movement.speed_walk;
                state.env.swimming_vertical = true;
            } else if env.is_climbing {
                speed_v = movement.speed_climb;
            }
        }

        let direction = speed_h.normalize_or_zero();
        let speed_h = if superspeed {
            direction * movement.speed_fast
        } else if control.sneak && !env.in_any_liquid() {
            direction * movement.speed_crouch
        } else {
            direction * movement.speed_walk
        };

        let airborne = !env.touching_ground && !env.is_climbing && !env.in_liquid;
        let (inc_h, inc_v) = if airborne || (can_jump && control.jump) {
            // No vertical acceleration while jumping or falling
            let accel = if superspeed {
                movement.acceleration_fast
            } else {
                movement.acceleration_air
            };
            (accel * dtime, 0.0)
        } else if superspeed {
            let inc = movement.acceleration_fast * dtime;
            (inc, inc)
        } else {
            let inc = movement.acceleration_default * dtime;
            (inc, inc)
        };

        Self::accelerate_horizontal(
            &mut state.velocity,
            speed_h * overrides.speed,
            inc_h * overrides.speed,
        );
        Self::accelerate_vertical(
            &mut state.velocity,
            speed_v * overrides.speed,
            inc_v * overrides.speed,
        );

        jumped
    }

    /// Gravity, liquid sinking and liquid drag for one step
    pub fn apply_environment(state: &mut KinematicState, dtime: f32) {
        if state.env.is_climbing {
            return;
        }

        let movement = state.movement;

        if !state.env.in_liquid {
            state.velocity.y -= movement.gravity * state.physics_override.gravity * dtime;
        }

        if state.env.in_liquid && !state.env.swimming_vertical {
            state.velocity.y -= movement.liquid_sink * dtime;
        }

        if state.env.in_any_liquid() {
            let wanted = -state.velocity / movement.liquid_fluidity;
            let viscosity = f32::from(state.env.liquid_viscosity);
            let length = wanted.length().min(movement.liquid_fluidity_smooth)
                * (viscosity * VISCOSITY_FACTOR + (1.0 - VISCOSITY_FACTOR));
            state.velocity += wanted.normalize_or_zero() * length;
        }
    }
}

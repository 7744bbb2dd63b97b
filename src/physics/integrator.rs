use super::{body::DegreesOfFreedom, Velocity};
use crate::math::{self as m, Transform};

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationError {
    #[error("integration produced a non-finite {quantity}")]
    NonFinite { quantity: &'static str },
    #[error("elapsed time must be finite and non-negative")]
    InvalidTimestep,
}

/// The parts of a body's state the integrator reads and writes besides its transform.
#[derive(Clone, Copy, Debug, Default)]
pub struct Motion {
    pub velocity: Velocity,
    pub torque: f64,
    /// Zero for bodies that can't rotate.
    pub inverse_inertia: f64,
    /// Rate of change of scale per second.
    pub scale_factor: m::Vec2,
    pub locked: DegreesOfFreedom,
}

/// Advance a transform and its motion by `elapsed_ms` milliseconds
/// using semi-implicit Euler integration.
///
/// Locked axes of velocity and acceleration are zeroed before integrating.
/// If any resulting quantity would be NaN or infinite,
/// nothing is modified and an error naming the quantity is returned.
pub fn integrate(
    transform: &mut Transform,
    motion: &mut Motion,
    total_acceleration: m::Vec2,
    elapsed_ms: f64,
) -> Result<(), IntegrationError> {
    if !elapsed_ms.is_finite() || elapsed_ms < 0.0 {
        return Err(IntegrationError::InvalidTimestep);
    }
    let dt = elapsed_ms / 1000.0;
    let locked = motion.locked;

    let acc = locked.mask_linear(total_acceleration);
    let vel = locked.mask_linear(motion.velocity.linear);
    let new_vel = vel + acc * dt;
    let new_pos = transform.pos + vel * dt + acc * (0.5 * dt * dt);

    let angular_acc = locked.mask_angular(motion.torque * motion.inverse_inertia);
    let new_angular = locked.mask_angular(motion.velocity.angular + angular_acc * dt);
    let new_rotation = transform.rotation + new_angular * dt;

    let new_scale = transform.scale + motion.scale_factor * dt;

    let checks = [
        ("velocity", m::is_valid(new_vel)),
        ("position", m::is_valid(new_pos)),
        ("angular velocity", new_angular.is_finite()),
        ("rotation", new_rotation.is_finite()),
        ("scale", m::is_valid(new_scale)),
    ];
    if let Some(&(quantity, _)) = checks.iter().find(|(_, ok)| !ok) {
        return Err(IntegrationError::NonFinite { quantity });
    }

    motion.velocity = Velocity {
        linear: new_vel,
        angular: new_angular,
    };
    transform.pos = new_pos;
    transform.rotation = new_rotation;
    transform.scale = new_scale;
    Ok(())
}

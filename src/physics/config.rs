//! Tunable parameters of the physics world.
//!
//! Every struct here has sensible defaults and deserializes with missing fields
//! filled in from those defaults, so partial config files are fine.

use crate::{collision::AABB, math as m};

use thiserror::Error;

/// Problems found when validating a [`PhysicsConfig`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("`{name}` must be at least 1")]
    ZeroCount { name: &'static str },
    #[error("`{name}` was {value}, expected a value in {min}..={max}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("`{name}` is not a finite number")]
    NonFinite { name: &'static str },
}

/// Which broad phase implementation finds candidate pairs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub enum BroadphaseStrategy {
    /// Checks every body against every other body. Only useful for testing.
    Naive,
    #[default]
    DynamicAabbTree,
}

/// Which solver resolves contacts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub enum SolverStrategy {
    /// Pushes bodies apart and removes velocity into each other. No rotation or bounce.
    #[default]
    Arcade,
    /// Sequential impulses with friction, restitution and rotation.
    Realistic,
}

/// Order in which contacts are resolved.
///
/// Solving all contacts along one axis first avoids bodies catching on the seams
/// between adjacent tiles, e.g. a platformer character running over a tiled floor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub enum ContactSolveBias {
    /// Closest contacts first.
    #[default]
    None,
    /// Contacts whose separation is mostly vertical first, then by distance.
    VerticalFirst,
    /// Contacts whose separation is mostly horizontal first, then by distance.
    HorizontalFirst,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct PhysicsConfig {
    /// Acceleration applied to every Active body with gravity enabled.
    pub gravity: m::Vec2,
    /// How many times per substep contacts are detected and solved.
    pub collision_passes: usize,
    /// Number of integration steps per tick.
    pub substeps: usize,
    pub broadphase_strategy: BroadphaseStrategy,
    pub solver_strategy: SolverStrategy,
    /// Relative normal velocity below which restitution is ignored.
    pub restitution_slop: f64,
    /// Fraction of remaining overlap corrected per position iteration.
    pub position_bias: f64,
    /// Whether to sweep bodies moving further than half their size in a step.
    pub check_fast_bodies: bool,
    pub continuous: ContinuousConfig,
    pub bodies: BodyConfig,
    pub dynamic_tree: DynamicTreeConfig,
    pub arcade: ArcadeConfig,
    pub realistic: RealisticConfig,
    /// Bodies leaving this area are removed from the broad phase.
    pub world_bounds: Option<AABB>,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: m::Vec2::zero(),
            collision_passes: 2,
            substeps: 1,
            broadphase_strategy: BroadphaseStrategy::default(),
            solver_strategy: SolverStrategy::default(),
            restitution_slop: 0.1,
            position_bias: 0.2,
            check_fast_bodies: true,
            continuous: ContinuousConfig::default(),
            bodies: BodyConfig::default(),
            dynamic_tree: DynamicTreeConfig::default(),
            arcade: ArcadeConfig::default(),
            realistic: RealisticConfig::default(),
            world_bounds: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct ContinuousConfig {
    /// Sweep every moving body regardless of its speed.
    pub disable_minimum_speed_for_fast_body: bool,
    /// Distance fast bodies are backed up by before sweeping
    /// and left away from what they hit.
    pub surface_epsilon: f64,
}

impl Default for ContinuousConfig {
    fn default() -> Self {
        Self {
            disable_minimum_speed_for_fast_body: false,
            surface_epsilon: 0.1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct BodyConfig {
    /// Value of `can_sleep` given to bodies created by the world.
    pub can_sleep_by_default: bool,
    /// Motion below which a body falls asleep.
    pub sleep_epsilon: f64,
    /// Motion a body needs to wake a sleeping body it touches.
    pub wake_threshold: f64,
    /// Weight of previous motion in the running motion estimate.
    pub sleep_bias: f64,
    /// Mass given to bodies created by the world.
    pub default_mass: f64,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            can_sleep_by_default: false,
            sleep_epsilon: 0.07,
            wake_threshold: 0.07 * 3.0,
            sleep_bias: 0.9,
            default_mass: 10.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct DynamicTreeConfig {
    /// Extra space around every leaf box so small movements don't cause reinsertion.
    pub bounds_padding: f64,
    /// How far ahead of a moving body its leaf box reaches, in frames at 32ms.
    pub velocity_multiplier: f64,
}

impl Default for DynamicTreeConfig {
    fn default() -> Self {
        Self {
            bounds_padding: 5.0,
            velocity_multiplier: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct ArcadeConfig {
    pub contact_solve_bias: ContactSolveBias,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct RealisticConfig {
    pub contact_solve_bias: ContactSolveBias,
    pub position_iterations: usize,
    pub velocity_iterations: usize,
    /// Overlap allowed to remain after position correction.
    pub slop: f64,
    /// Largest position correction applied in one iteration.
    pub max_correction: f64,
}

impl Default for RealisticConfig {
    fn default() -> Self {
        Self {
            contact_solve_bias: ContactSolveBias::None,
            position_iterations: 3,
            velocity_iterations: 8,
            slop: 1.0,
            max_correction: 5.0,
        }
    }
}

fn check_finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { name })
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    check_finite(name, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

fn check_count(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroCount { name })
    } else {
        Ok(())
    }
}

impl PhysicsConfig {
    /// Check that every parameter is something the world can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("gravity.x", self.gravity.x)?;
        check_finite("gravity.y", self.gravity.y)?;
        check_count("collision_passes", self.collision_passes)?;
        check_count("substeps", self.substeps)?;
        check_range("restitution_slop", self.restitution_slop, 0.0, f64::MAX)?;
        check_range("position_bias", self.position_bias, 0.0, 1.0)?;
        check_range(
            "continuous.surface_epsilon",
            self.continuous.surface_epsilon,
            0.0,
            f64::MAX,
        )?;

        let b = &self.bodies;
        check_range("bodies.sleep_epsilon", b.sleep_epsilon, 0.0, f64::MAX)?;
        check_range("bodies.wake_threshold", b.wake_threshold, 0.0, f64::MAX)?;
        check_range("bodies.sleep_bias", b.sleep_bias, 0.0, 1.0)?;
        check_range(
            "bodies.default_mass",
            b.default_mass,
            f64::MIN_POSITIVE,
            f64::MAX,
        )?;

        let t = &self.dynamic_tree;
        check_range("dynamic_tree.bounds_padding", t.bounds_padding, 0.0, f64::MAX)?;
        check_range(
            "dynamic_tree.velocity_multiplier",
            t.velocity_multiplier,
            0.0,
            f64::MAX,
        )?;

        let r = &self.realistic;
        check_count("realistic.position_iterations", r.position_iterations)?;
        check_count("realistic.velocity_iterations", r.velocity_iterations)?;
        check_range("realistic.slop", r.slop, 0.0, f64::MAX)?;
        check_range("realistic.max_correction", r.max_correction, 0.0, f64::MAX)?;

        if let Some(bounds) = &self.world_bounds {
            if !bounds.is_valid() {
                return Err(ConfigError::NonFinite {
                    name: "world_bounds",
                });
            }
        }
        Ok(())
    }
}

use super::{
    collision::{Collider, Shape, AABB},
    config::BodyConfig,
    integrator::{self, IntegrationError, Motion},
    Velocity,
};
use crate::math::{self as m, Transform};

use bitflags::bitflags;

/// How a body takes part in collision detection and response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub enum CollisionType {
    /// Never collides with anything and is not tracked by the broad phase.
    #[default]
    PreventCollision,
    /// Reports collisions through events but is never pushed by them.
    Passive,
    /// Collides with and is pushed by other Active and Fixed bodies.
    Active,
    /// Collides with Active bodies but never moves in response, as if infinitely heavy.
    Fixed,
}

/// Bit masks deciding which bodies are allowed to collide.
///
/// Two groups collide if each one's category is in the other's mask.
/// The default group collides with everything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub struct CollisionGroup {
    pub category: u32,
    pub mask: u32,
}

impl Default for CollisionGroup {
    fn default() -> Self {
        Self::ALL
    }
}

impl CollisionGroup {
    /// Collides with every group, including itself.
    pub const ALL: Self = Self {
        category: u32::MAX,
        mask: u32::MAX,
    };

    pub const fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    /// A group with a single category bit that collides with everything except itself.
    /// Returns `None` if `bit` is 32 or more.
    pub fn single(bit: u32) -> Option<Self> {
        let category = 1u32.checked_shl(bit)?;
        Some(Self {
            category,
            mask: !category,
        })
    }

    #[inline]
    pub fn can_collide(&self, other: &Self) -> bool {
        (self.category & other.mask) != 0 && (other.category & self.mask) != 0
    }

    /// A group that collides with exactly the groups this one doesn't.
    pub fn invert(&self) -> Self {
        Self {
            category: !self.category,
            mask: !self.mask,
        }
    }

    /// A group that belongs to all of the given groups' categories
    /// and collides with none of them.
    pub fn combine(groups: &[Self]) -> Self {
        let category = groups.iter().fold(0, |acc, g| acc | g.category);
        Self {
            category,
            mask: !category,
        }
    }

    /// A group that only collides with the given groups.
    pub fn collides_with(groups: &[Self]) -> Self {
        let mask = groups.iter().fold(0, |acc, g| acc | g.category);
        Self {
            category: !mask,
            mask,
        }
    }
}

bitflags! {
    /// Degrees of freedom that can be locked on a body.
    /// A locked degree of freedom is never changed by forces or collisions.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DegreesOfFreedom: u8 {
        const X = 1;
        const Y = 1 << 1;
        const ROTATION = 1 << 2;
    }
}

impl DegreesOfFreedom {
    /// Zero the components of a linear vector that are locked.
    #[inline]
    pub fn mask_linear(&self, mut v: m::Vec2) -> m::Vec2 {
        if self.contains(DegreesOfFreedom::X) {
            v.x = 0.0;
        }
        if self.contains(DegreesOfFreedom::Y) {
            v.y = 0.0;
        }
        v
    }

    /// Zero an angular quantity if rotation is locked.
    #[inline]
    pub fn mask_angular(&self, a: f64) -> f64 {
        if self.contains(DegreesOfFreedom::ROTATION) {
            0.0
        } else {
            a
        }
    }
}

/// Determines how the surface of a body responds to collisions.
///
/// Using a simplified model where each body has its own coefficients
/// and a pair of bodies combines them with a fixed rule.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub struct SurfaceMaterial {
    /// Friction coefficient in the range 0..=1.
    pub friction: f64,
    /// Restitution coefficient in the range 0..=1.
    pub bounciness: f64,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        SurfaceMaterial {
            friction: 0.99,
            bounciness: 0.2,
        }
    }
}

impl SurfaceMaterial {
    /// Get the friction coefficient between this material and another.
    ///
    /// It is the smaller of the two coefficients.
    pub fn friction_with(&self, other: &Self) -> f64 {
        self.friction.min(other.friction)
    }

    /// Get the restitution coefficient between this material and another.
    ///
    /// It is the larger of the two coefficients.
    pub fn restitution_with(&self, other: &Self) -> f64 {
        self.bounciness.max(other.bounciness).max(0.0)
    }
}

/// Mass or moment of inertia of a body, which can be infinite.
///
/// This stores both a mass value and its inverse, because calculating inverse mass
/// is expensive and needed a lot in physics calculations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mass {
    Finite { mass: f64, inverse: f64 },
    Infinite,
}

impl From<f64> for Mass {
    /// Non-positive and non-finite values become infinite mass.
    #[inline]
    fn from(mass: f64) -> Self {
        if mass.is_finite() && mass > 0.0 {
            Mass::Finite {
                mass,
                inverse: 1.0 / mass,
            }
        } else {
            Mass::Infinite
        }
    }
}

impl Mass {
    /// Get the inverse of the mass, which is zero if the mass is infinite.
    #[inline]
    pub fn inv(&self) -> f64 {
        match self {
            Mass::Finite { inverse, .. } => *inverse,
            Mass::Infinite => 0.0,
        }
    }
}

/// A body is something that moves and collides.
/// Every body owns exactly one [`Collider`][super::Collider];
/// use a composite collider for bodies made of several shapes.
#[derive(Clone, Debug)]
pub struct Body {
    pub transform: Transform,
    /// Position at the start of the last integration step.
    pub old_pos: m::Vec2,
    pub velocity: Velocity,
    /// Velocity at the start of the last integration step.
    pub old_velocity: Velocity,
    /// Acceleration applied during the next step. Reset after every tick.
    pub acceleration: m::Vec2,
    pub torque: f64,
    /// Rate of change of the transform's scale per second.
    pub scale_factor: m::Vec2,
    pub mass: Mass,
    pub moment_of_inertia: Mass,
    pub material: SurfaceMaterial,
    pub collision_type: CollisionType,
    pub group: CollisionGroup,
    pub locked: DegreesOfFreedom,
    pub use_gravity: bool,
    pub can_sleep: bool,
    pub(crate) collider: Collider,
    pub(crate) sleeping: bool,
    pub(crate) sleep_motion: f64,
    // back-reference into the dynamic tree, owned by the tree
    pub(crate) proxy: Option<usize>,
}

impl Body {
    /// Create a body with the given collider, collision type and mass.
    /// Moment of inertia is computed from the collider shape.
    pub fn new(collider: Collider, collision_type: CollisionType, mass: f64) -> Self {
        let moment_of_inertia = Mass::from(collider.inertia(mass));
        Self {
            transform: Transform::default(),
            old_pos: m::Vec2::zero(),
            velocity: Velocity::default(),
            old_velocity: Velocity::default(),
            acceleration: m::Vec2::zero(),
            torque: 0.0,
            scale_factor: m::Vec2::zero(),
            mass: Mass::from(mass),
            moment_of_inertia,
            material: SurfaceMaterial::default(),
            collision_type,
            group: CollisionGroup::ALL,
            locked: DegreesOfFreedom::empty(),
            use_gravity: true,
            can_sleep: false,
            collider,
            sleeping: false,
            sleep_motion: BodyConfig::default().sleep_epsilon * 5.0,
            proxy: None,
        }
    }

    /// Active bodies collide with everything and respond to collisions.
    pub fn new_active(collider: Collider, mass: f64) -> Self {
        Self::new(collider, CollisionType::Active, mass)
    }

    /// Fixed bodies never move in response to collisions.
    pub fn new_fixed(collider: Collider) -> Self {
        let mut body = Self::new(collider, CollisionType::Fixed, 0.0);
        body.use_gravity = false;
        body
    }

    /// Passive bodies only report collisions.
    pub fn new_passive(collider: Collider) -> Self {
        Self::new(collider, CollisionType::Passive, BodyConfig::default().default_mass)
    }

    /// Set the position of the body in a builder-like chain.
    pub fn with_position(mut self, pos: m::Vec2) -> Self {
        self.transform.pos = pos;
        self.old_pos = pos;
        self
    }

    /// Set the whole transform of the body in a builder-like chain.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self.old_pos = transform.pos;
        self
    }

    /// Set the velocity of the body in a builder-like chain.
    pub fn with_velocity(mut self, vel: Velocity) -> Self {
        self.velocity = vel;
        self.old_velocity = vel;
        self
    }

    pub fn with_material(mut self, material: SurfaceMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn with_group(mut self, group: CollisionGroup) -> Self {
        self.group = group;
        self
    }

    pub fn with_locked(mut self, locked: DegreesOfFreedom) -> Self {
        self.locked = locked;
        self
    }

    pub fn with_gravity(mut self, use_gravity: bool) -> Self {
        self.use_gravity = use_gravity;
        self
    }

    pub fn with_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    #[inline]
    pub fn collider(&self) -> &Collider {
        &self.collider
    }

    /// Replace the collider, recomputing moment of inertia for finite mass bodies.
    pub fn set_collider(&mut self, collider: Collider) {
        if let Mass::Finite { mass, .. } = self.mass {
            self.moment_of_inertia = Mass::from(collider.inertia(mass));
        }
        self.collider = collider;
    }

    #[inline]
    pub fn pos(&self) -> m::Vec2 {
        self.transform.pos
    }

    /// Inverse mass as seen by the solver.
    /// Zero for bodies that can't be moved by collisions.
    #[inline]
    pub fn inverse_mass(&self) -> f64 {
        match self.collision_type {
            CollisionType::Active | CollisionType::Passive => self.mass.inv(),
            CollisionType::Fixed | CollisionType::PreventCollision => 0.0,
        }
    }

    /// Inverse moment of inertia as seen by the solver.
    #[inline]
    pub fn inverse_inertia(&self) -> f64 {
        match self.collision_type {
            CollisionType::Active | CollisionType::Passive => self.moment_of_inertia.inv(),
            CollisionType::Fixed | CollisionType::PreventCollision => 0.0,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.collision_type == CollisionType::Active
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.collision_type == CollisionType::Fixed
    }

    #[inline]
    pub fn is_passive(&self) -> bool {
        self.collision_type == CollisionType::Passive
    }

    /// World-space geometry of the collider at the current transform.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.collider.world(&self.transform)
    }

    /// World-space bounding box of the collider at the current transform.
    #[inline]
    pub fn bounds(&self) -> AABB {
        self.collider.aabb(&self.transform)
    }

    /// Apply an impulse at a world-space point, changing linear and angular velocity.
    ///
    /// Only Active bodies respond, and locked degrees of freedom are left untouched.
    pub fn apply_impulse(&mut self, point: m::Vec2, impulse: m::Vec2) {
        if self.collision_type != CollisionType::Active {
            return;
        }
        let linear = self.locked.mask_linear(impulse * self.inverse_mass());
        self.velocity.linear += linear;
        if !self.locked.contains(DegreesOfFreedom::ROTATION) {
            let offset = point - self.transform.pos;
            self.velocity.angular += self.inverse_inertia() * m::cross(offset, impulse);
        }
    }

    /// Advance the body by one semi-implicit Euler step.
    ///
    /// On failure the body is left as it was.
    pub fn integrate(
        &mut self,
        total_acceleration: m::Vec2,
        elapsed_ms: f64,
    ) -> Result<(), IntegrationError> {
        self.old_pos = self.transform.pos;
        self.old_velocity = self.velocity;
        let mut motion = Motion {
            velocity: self.velocity,
            torque: self.torque,
            inverse_inertia: self.moment_of_inertia.inv(),
            scale_factor: self.scale_factor,
            locked: self.locked,
        };
        integrator::integrate(&mut self.transform, &mut motion, total_acceleration, elapsed_ms)?;
        self.velocity = motion.velocity;
        Ok(())
    }

    //
    // Sleeping
    //

    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    #[inline]
    pub fn sleep_motion(&self) -> f64 {
        self.sleep_motion
    }

    /// Put the body to sleep or wake it up.
    ///
    /// Sleeping clears all motion. Waking restarts the motion estimate
    /// high enough that the body won't immediately fall asleep again.
    pub fn set_sleeping(&mut self, sleeping: bool, cfg: &BodyConfig) {
        self.sleeping = sleeping;
        if sleeping {
            self.sleep_motion = 0.0;
            self.velocity = Velocity::default();
            self.acceleration = m::Vec2::zero();
            self.torque = 0.0;
        } else {
            self.sleep_motion = cfg.sleep_epsilon * 5.0;
        }
    }

    #[inline]
    pub fn wake(&mut self, cfg: &BodyConfig) {
        if self.sleeping {
            self.set_sleeping(false, cfg);
        }
    }

    /// Update the running estimate of how much the body is moving
    /// and put it to sleep if it has been still for long enough.
    pub fn update_motion(&mut self, cfg: &BodyConfig) {
        if self.sleeping {
            self.set_sleeping(true, cfg);
            return;
        }
        let current = self.velocity.linear.mag_sq() + self.velocity.angular.powi(2);
        let bias = cfg.sleep_bias;
        self.sleep_motion = bias * self.sleep_motion + (1.0 - bias) * current;
        self.sleep_motion = self.sleep_motion.clamp(0.0, 10.0 * cfg.sleep_epsilon);
        if self.can_sleep && self.sleep_motion < cfg.sleep_epsilon {
            self.set_sleeping(true, cfg);
        }
    }
}

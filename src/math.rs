//! Types, aliases and helper operations for doing math with `ultraviolet`.
use std::f64::consts::PI;
pub use ultraviolet as uv;

pub type Vec2 = uv::DVec2;

/// An angle in either degrees or radians.
/// Default conversion from f64 is in degrees.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub enum Angle {
    Rad(f64),
    Deg(f64),
}
impl Angle {
    /// Get the angle as degrees.
    #[inline]
    pub fn deg(&self) -> f64 {
        match self {
            Angle::Rad(rad) => rad * 180.0 / PI,
            Angle::Deg(deg) => *deg,
        }
    }

    /// Get the angle as radians.
    #[inline]
    pub fn rad(&self) -> f64 {
        match self {
            Angle::Rad(rad) => *rad,
            Angle::Deg(deg) => deg * PI / 180.0,
        }
    }
}
impl Default for Angle {
    fn default() -> Self {
        Angle::Rad(0.0)
    }
}

/// Position, rotation and scale of a body.
///
/// Rotation is stored as a plain angle in radians so that it can be integrated
/// directly from angular velocity. Scale is applied per axis before rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct Transform {
    pub pos: Vec2,
    pub rotation: f64,
    pub scale: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            pos: Vec2::zero(),
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
        }
    }
}

impl Transform {
    #[inline]
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_rotation(mut self, angle: Angle) -> Self {
        self.rotation = angle.rad();
        self
    }

    #[inline]
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Transform a point from local space to world space, scaling included.
    #[inline]
    pub fn apply(&self, point: Vec2) -> Vec2 {
        rotate(Vec2::new(point.x * self.scale.x, point.y * self.scale.y), self.rotation) + self.pos
    }

    /// Transform a point from local space to world space ignoring scale.
    ///
    /// Contact points are stored in this space because the solver
    /// only ever changes position and rotation.
    #[inline]
    pub fn apply_rigid(&self, point: Vec2) -> Vec2 {
        rotate(point, self.rotation) + self.pos
    }

    /// Inverse of [`apply_rigid`][Self::apply_rigid].
    #[inline]
    pub fn apply_rigid_inverse(&self, point: Vec2) -> Vec2 {
        rotate(point - self.pos, -self.rotation)
    }

    /// True if the scale flips the handedness of local geometry.
    #[inline]
    pub fn is_mirrored(&self) -> bool {
        self.scale.x * self.scale.y < 0.0
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        is_valid(self.pos) && self.rotation.is_finite() && is_valid(self.scale)
    }
}

/// A wrapper type to indicate a vector should always be normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Unit<T>(T);

impl Unit<Vec2> {
    pub fn new_normalize(v: Vec2) -> Self {
        Unit(v.normalized())
    }

    /// Normalize a vector, returning None if it has no usable direction.
    pub fn try_new(v: Vec2) -> Option<Self> {
        let mag = v.mag();
        if mag > f64::EPSILON && mag.is_finite() {
            Some(Unit(v / mag))
        } else {
            None
        }
    }

    pub const fn new_unchecked(v: Vec2) -> Self {
        Unit(v)
    }

    pub fn unit_x() -> Self {
        Unit(Vec2::unit_x())
    }

    pub fn unit_y() -> Self {
        Unit(Vec2::unit_y())
    }

    #[inline]
    pub fn into_inner(self) -> Vec2 {
        self.0
    }
}

impl<T> std::ops::Deref for Unit<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::Neg for Unit<T>
where
    T: std::ops::Neg,
{
    type Output = Unit<<T as std::ops::Neg>::Output>;

    fn neg(self) -> Self::Output {
        Unit(-self.0)
    }
}

/// The range of values a shape covers when projected onto an axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub min: f64,
    pub max: f64,
}

impl Projection {
    #[inline]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Project a set of points onto an axis.
    /// Returns None for an empty set.
    pub fn of_points(points: impl IntoIterator<Item = Vec2>, axis: Vec2) -> Option<Self> {
        points.into_iter().fold(None, |proj: Option<Projection>, p| {
            let d = p.dot(axis);
            Some(match proj {
                Some(proj) => Projection::new(proj.min.min(d), proj.max.max(d)),
                None => Projection::new(d, d),
            })
        })
    }

    #[inline]
    pub fn overlaps(&self, other: &Projection) -> bool {
        self.max > other.min && other.max > self.min
    }

    /// Amount of overlap between the two ranges, zero if they don't overlap.
    #[inline]
    pub fn overlap(&self, other: &Projection) -> f64 {
        if self.overlaps(other) {
            (self.max - other.min).min(other.max - self.min)
        } else {
            0.0
        }
    }

    #[inline]
    pub fn union(&self, other: &Projection) -> Projection {
        Projection::new(self.min.min(other.min), self.max.max(other.max))
    }
}

// Vec2 utils

#[inline]
pub fn left_normal(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
#[inline]
pub fn right_normal(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}
#[inline]
pub fn unit_left_normal(u: Unit<Vec2>) -> Unit<Vec2> {
    Unit::new_unchecked(left_normal(*u))
}
#[inline]
pub fn unit_right_normal(u: Unit<Vec2>) -> Unit<Vec2> {
    Unit::new_unchecked(right_normal(*u))
}

/// Rotate a vector counterclockwise by an angle in radians.
#[inline]
pub fn rotate(v: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(cos * v.x - sin * v.y, sin * v.x + cos * v.y)
}

/// Rotate a point around another point.
#[inline]
pub fn rotate_about(point: Vec2, angle: f64, anchor: Vec2) -> Vec2 {
    rotate(point - anchor, angle) + anchor
}

/// Scalar 2D cross product, `a.x * b.y - a.y * b.x`.
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f64 {
    a.wedge(b).xy
}

/// Check that neither component of a vector is NaN or infinite.
#[inline]
pub fn is_valid(v: Vec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

use crate::math::{self as m, Unit};

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub struct AABB {
    pub min: m::Vec2,
    pub max: m::Vec2,
}

impl AABB {
    #[inline]
    pub fn new(min: m::Vec2, max: m::Vec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn zero() -> Self {
        Self {
            min: m::Vec2::zero(),
            max: m::Vec2::zero(),
        }
    }

    /// Create a box from the positions of its sides.
    /// Uses screen coordinates, so `top` is the smaller y value.
    #[inline]
    pub fn from_sides(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            min: m::Vec2::new(left, top),
            max: m::Vec2::new(right, bottom),
        }
    }

    /// Create a box centered on a point.
    #[inline]
    pub fn from_center(center: m::Vec2, half_extents: m::Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box containing every point, or None if there are no points.
    pub fn from_points(points: impl IntoIterator<Item = m::Vec2>) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<AABB>, p| {
            Some(match acc {
                Some(aabb) => AABB {
                    min: aabb.min.min_by_component(p),
                    max: aabb.max.max_by_component(p),
                },
                None => AABB { min: p, max: p },
            })
        })
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.max.x
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.max.y
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> m::Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Perimeter of the box, used as the cost metric when building the dynamic tree.
    #[inline]
    pub fn perimeter(&self) -> f64 {
        2.0 * (self.width() + self.height())
    }

    #[inline]
    pub fn union(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.min_by_component(other.min),
            max: self.max.max_by_component(other.max),
        }
    }

    /// Get the intersection of two AABBs, or None if they don't intersect.
    pub fn intersection(&self, other: &AABB) -> Option<AABB> {
        let min = self.min.max_by_component(other.min);
        let max = self.max.min_by_component(other.max);
        if min.x <= max.x && min.y <= max.y {
            Some(AABB { min, max })
        } else {
            None
        }
    }

    /// Check whether two boxes overlap, treating boxes within `epsilon` of touching
    /// as overlapping. Touching edges count as overlap.
    #[inline]
    pub fn overlaps(&self, other: &AABB, epsilon: f64) -> bool {
        self.min.x <= other.max.x + epsilon
            && other.min.x <= self.max.x + epsilon
            && self.min.y <= other.max.y + epsilon
            && other.min.y <= self.max.y + epsilon
    }

    /// Check whether another box is entirely inside this one.
    #[inline]
    pub fn contains(&self, other: &AABB) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    #[inline]
    pub fn contains_point(&self, point: m::Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Grow the box by the given amount in every direction.
    #[inline]
    pub fn padded(&self, amount: f64) -> AABB {
        let pad = m::Vec2::new(amount, amount);
        AABB {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    #[inline]
    pub fn translated(&self, offset: m::Vec2) -> AABB {
        AABB {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Grow the box so that it also covers itself moved by `dir`.
    #[inline]
    pub fn extended(&self, dir: m::Vec2) -> AABB {
        self.union(&self.translated(dir))
    }

    /// The box bounding this box rotated by `angle` radians around `about`.
    pub fn rotated(&self, angle: f64, about: m::Vec2) -> AABB {
        let corners = [
            self.min,
            m::Vec2::new(self.max.x, self.min.y),
            self.max,
            m::Vec2::new(self.min.x, self.max.y),
        ];
        // corners is never empty
        AABB::from_points(corners.map(|c| m::rotate_about(c, angle, about))).unwrap_or(*self)
    }

    /// True if both corners are finite and min is not past max.
    #[inline]
    pub fn is_valid(&self) -> bool {
        m::is_valid(self.min)
            && m::is_valid(self.max)
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
    }
}

/// A ray with a starting point and a direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub start: m::Vec2,
    pub dir: Unit<m::Vec2>,
}

impl Ray {
    #[inline]
    pub fn new(start: m::Vec2, dir: Unit<m::Vec2>) -> Self {
        Self { start, dir }
    }

    #[inline]
    pub fn point_at(&self, t: f64) -> m::Vec2 {
        self.start + *self.dir * t
    }
}

/// Find the distance along a ray where it enters a box,
/// zero if the ray starts inside, or None if it never hits.
pub fn ray_aabb(ray: Ray, aabb: AABB) -> Option<f64> {
    let mut t_min = 0.0_f64;
    let mut t_max = f64::INFINITY;
    for (start, dir, min, max) in [
        (ray.start.x, ray.dir.x, aabb.min.x, aabb.max.x),
        (ray.start.y, ray.dir.y, aabb.min.y, aabb.max.y),
    ] {
        if dir.abs() < f64::EPSILON {
            // parallel to this slab, must already be inside it
            if start < min || start > max {
                return None;
            }
            continue;
        }
        let inv = 1.0 / dir;
        let mut t0 = (min - start) * inv;
        let mut t1 = (max - start) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }
    Some(t_min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn union_and_intersection() {
        let a = AABB::from_sides(0.0, 0.0, 10.0, 10.0);
        let b = AABB::from_sides(5.0, 5.0, 20.0, 12.0);
        assert_eq!(a.union(&b), AABB::from_sides(0.0, 0.0, 20.0, 12.0));
        assert_eq!(
            a.intersection(&b),
            Some(AABB::from_sides(5.0, 5.0, 10.0, 10.0))
        );
        let c = AABB::from_sides(11.0, 0.0, 12.0, 1.0);
        assert_eq!(a.intersection(&c), None);
        assert!(!a.overlaps(&c, 0.0));
        assert!(a.overlaps(&c, 1.0));
    }

    #[test]
    fn containment() {
        let outer = AABB::from_sides(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains(&AABB::from_sides(1.0, 1.0, 9.0, 9.0)));
        assert!(!outer.contains(&AABB::from_sides(1.0, 1.0, 11.0, 9.0)));
        assert!(outer.padded(1.0).contains(&AABB::from_sides(-1.0, -1.0, 11.0, 11.0)));
    }

    #[test]
    fn extension_covers_motion() {
        let a = AABB::from_sides(0.0, 0.0, 1.0, 1.0);
        let e = a.extended(m::Vec2::new(5.0, -2.0));
        assert_eq!(e, AABB::from_sides(0.0, -2.0, 6.0, 1.0));
        assert_relative_eq!(e.perimeter(), 2.0 * (6.0 + 3.0));
    }

    #[test]
    fn ray_hits_box() {
        let aabb = AABB::from_sides(5.0, -1.0, 7.0, 1.0);
        let ray = Ray::new(m::Vec2::zero(), Unit::unit_x());
        assert_relative_eq!(ray_aabb(ray, aabb).unwrap(), 5.0);

        let missing = Ray::new(m::Vec2::new(0.0, 5.0), Unit::unit_x());
        assert_eq!(ray_aabb(missing, aabb), None);

        let backwards = Ray::new(m::Vec2::zero(), -Unit::unit_x());
        assert_eq!(ray_aabb(backwards, aabb), None);

        let inside = Ray::new(m::Vec2::new(6.0, 0.0), Unit::unit_y());
        assert_eq!(ray_aabb(inside, aabb), Some(0.0));
    }
}

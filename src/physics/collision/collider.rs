use super::{Ray, AABB};
use crate::math::{self as m, Projection, Transform, Unit};

use thiserror::Error;

/// Reasons a polygon collider can't be constructed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    #[error("a polygon needs at least 3 points, got {count}")]
    TooFewPoints { count: usize },
    #[error("polygon points do not describe a convex hull")]
    NotConvex,
    #[error("polygon has zero area")]
    ZeroArea,
    #[error("shape contains a NaN or infinite coordinate")]
    NonFinite,
}

/// A convex polygon with counter-clockwise winding, in body-local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    points: Vec<m::Vec2>,
}

impl Polygon {
    /// Validate a list of points and reorder them counter-clockwise if needed.
    pub fn new(points: impl Into<Vec<m::Vec2>>) -> Result<Self, ShapeError> {
        let mut points = points.into();
        if points.iter().any(|p| !m::is_valid(*p)) {
            return Err(ShapeError::NonFinite);
        }
        if points.len() < 3 {
            return Err(ShapeError::TooFewPoints {
                count: points.len(),
            });
        }
        let area = signed_area(&points);
        if area.abs() < f64::EPSILON {
            return Err(ShapeError::ZeroArea);
        }
        if area < 0.0 {
            points.reverse();
        }
        let n = points.len();
        let turns_right = (0..n).any(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            let c = points[(i + 2) % n];
            m::cross(b - a, c - b) < -f64::EPSILON
        });
        if turns_right {
            return Err(ShapeError::NotConvex);
        }
        Ok(Self { points })
    }

    #[inline]
    pub fn points(&self) -> &[m::Vec2] {
        &self.points
    }
}

fn signed_area(points: &[m::Vec2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| m::cross(points[i], points[(i + 1) % n]))
        .sum::<f64>()
        / 2.0
}

/// The physical shape of a collider.
#[derive(Clone, Debug, PartialEq)]
pub enum ColliderShape {
    Circle { r: f64 },
    Polygon(Polygon),
    /// A line segment.
    Edge { begin: m::Vec2, end: m::Vec2 },
    /// Several colliders sharing the same body.
    Composite(Vec<Collider>),
}

/// The shape of a body, positioned relative to the body's origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
    pub offset: m::Vec2,
}

impl Collider {
    /// Create a circle collider from a radius.
    pub fn new_circle(r: f64) -> Self {
        Self {
            shape: ColliderShape::Circle { r },
            offset: m::Vec2::zero(),
        }
    }

    /// Create a rect collider centered on the body with two different side lengths.
    pub fn new_rect(width: f64, height: f64) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        // already counter-clockwise, bypasses validation
        let points = vec![
            m::Vec2::new(-hw, -hh),
            m::Vec2::new(hw, -hh),
            m::Vec2::new(hw, hh),
            m::Vec2::new(-hw, hh),
        ];
        Self {
            shape: ColliderShape::Polygon(Polygon { points }),
            offset: m::Vec2::zero(),
        }
    }

    /// Create a rect collider with both sides set to the same length.
    pub fn new_square(side_length: f64) -> Self {
        Self::new_rect(side_length, side_length)
    }

    /// Create a convex polygon collider. Winding is normalized to counter-clockwise.
    pub fn new_polygon(points: impl Into<Vec<m::Vec2>>) -> Result<Self, ShapeError> {
        Ok(Self {
            shape: ColliderShape::Polygon(Polygon::new(points)?),
            offset: m::Vec2::zero(),
        })
    }

    pub fn new_edge(begin: m::Vec2, end: m::Vec2) -> Self {
        Self {
            shape: ColliderShape::Edge { begin, end },
            offset: m::Vec2::zero(),
        }
    }

    pub fn new_composite(children: impl Into<Vec<Collider>>) -> Self {
        Self {
            shape: ColliderShape::Composite(children.into()),
            offset: m::Vec2::zero(),
        }
    }

    pub fn with_offset(mut self, offset: m::Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn area(&self) -> f64 {
        match &self.shape {
            ColliderShape::Circle { r } => std::f64::consts::PI * r * r,
            ColliderShape::Polygon(poly) => signed_area(&poly.points).abs(),
            ColliderShape::Edge { .. } => 0.0,
            ColliderShape::Composite(children) => children.iter().map(Collider::area).sum(),
        }
    }

    /// Moment of inertia around the body's origin for the given mass.
    ///
    /// The mass of a composite is shared between its children by area,
    /// or evenly if none of them has any.
    pub fn inertia(&self, mass: f64) -> f64 {
        // from https://en.wikipedia.org/wiki/List_of_moments_of_inertia
        let around_center = match &self.shape {
            ColliderShape::Circle { r } => mass * r * r / 2.0,
            ColliderShape::Polygon(poly) => {
                let pts = &poly.points;
                let n = pts.len();
                let (num, denom) = (0..n).fold((0.0, 0.0), |(num, denom), i| {
                    let a = pts[i];
                    let b = pts[(i + 1) % n];
                    let cross = m::cross(a, b).abs();
                    (
                        num + cross * (a.dot(a) + a.dot(b) + b.dot(b)),
                        denom + cross,
                    )
                });
                if denom > 0.0 {
                    mass / 6.0 * num / denom
                } else {
                    0.0
                }
            }
            ColliderShape::Edge { begin, end } => {
                let half_len = (*end - *begin).mag() / 2.0;
                mass * half_len * half_len
            }
            ColliderShape::Composite(children) => {
                let total_area = self.area();
                children
                    .iter()
                    .map(|child| {
                        let share = if total_area > 0.0 {
                            child.area() / total_area
                        } else {
                            1.0 / children.len() as f64
                        };
                        child.inertia(mass * share)
                    })
                    .sum()
            }
        };
        around_center + mass * self.offset.mag_sq()
    }

    /// Compute the world-space geometry of this collider on a body with the given transform.
    pub fn world(&self, tr: &Transform) -> Shape {
        let tr = Transform {
            pos: tr.apply(self.offset),
            ..*tr
        };
        match &self.shape {
            ColliderShape::Circle { r } => Shape::Circle {
                center: tr.pos,
                r: r * tr.scale.x.abs().min(tr.scale.y.abs()),
            },
            ColliderShape::Polygon(poly) => {
                let mut points: Vec<m::Vec2> = poly.points.iter().map(|p| tr.apply(*p)).collect();
                if tr.is_mirrored() {
                    points.reverse();
                }
                Shape::Polygon { points }
            }
            ColliderShape::Edge { begin, end } => Shape::Edge {
                begin: tr.apply(*begin),
                end: tr.apply(*end),
            },
            ColliderShape::Composite(children) => {
                Shape::Composite(children.iter().map(|c| c.world(&tr)).collect())
            }
        }
    }

    #[inline]
    pub fn aabb(&self, tr: &Transform) -> AABB {
        self.world(tr).aabb()
    }
}

//
// World-space shapes
//

/// A collider placed in the world, ready for intersection tests.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Circle { center: m::Vec2, r: f64 },
    /// Counter-clockwise convex polygon.
    Polygon { points: Vec<m::Vec2> },
    Edge { begin: m::Vec2, end: m::Vec2 },
    Composite(Vec<Shape>),
}

impl Shape {
    pub fn center(&self) -> m::Vec2 {
        match self {
            Shape::Circle { center, .. } => *center,
            Shape::Polygon { points } => average(points.iter().copied()),
            Shape::Edge { begin, end } => (*begin + *end) * 0.5,
            Shape::Composite(children) => average(children.iter().map(Shape::center)),
        }
    }

    pub fn aabb(&self) -> AABB {
        match self {
            Shape::Circle { center, r } => AABB::from_center(*center, m::Vec2::new(*r, *r)),
            Shape::Polygon { points } => {
                AABB::from_points(points.iter().copied()).unwrap_or_else(AABB::zero)
            }
            Shape::Edge { begin, end } => AABB::from_points([*begin, *end]).unwrap_or_else(AABB::zero),
            Shape::Composite(children) => children
                .iter()
                .map(Shape::aabb)
                .reduce(|acc, b| acc.union(&b))
                .unwrap_or_else(AABB::zero),
        }
    }

    /// The point of the shape furthest along a direction.
    pub fn furthest_point(&self, dir: m::Vec2) -> m::Vec2 {
        match self {
            Shape::Circle { center, r } => match Unit::try_new(dir) {
                Some(dir) => *center + *dir * *r,
                None => *center,
            },
            Shape::Polygon { points } => furthest_of(points.iter().copied(), dir),
            Shape::Edge { begin, end } => furthest_of([*begin, *end], dir),
            Shape::Composite(children) => {
                furthest_of(children.iter().map(|c| c.furthest_point(dir)), dir)
            }
        }
    }

    /// Candidate separating axes of the shape. Circles have none of their own.
    pub fn axes(&self) -> Vec<Unit<m::Vec2>> {
        match self {
            Shape::Circle { .. } => Vec::new(),
            Shape::Polygon { points } => {
                let n = points.len();
                (0..n)
                    .filter_map(|i| Unit::try_new(m::right_normal(points[(i + 1) % n] - points[i])))
                    .collect()
            }
            Shape::Edge { begin, end } => {
                let dir = *end - *begin;
                [m::right_normal(dir), dir]
                    .into_iter()
                    .filter_map(Unit::try_new)
                    .collect()
            }
            Shape::Composite(children) => children.iter().flat_map(Shape::axes).collect(),
        }
    }

    /// Check whether a point is inside the shape. Edges contain nothing.
    pub fn contains(&self, point: m::Vec2) -> bool {
        match self {
            Shape::Circle { center, r } => (point - *center).mag_sq() <= r * r,
            Shape::Polygon { points } => {
                let n = points.len();
                n >= 3
                    && (0..n).all(|i| {
                        m::cross(points[(i + 1) % n] - points[i], point - points[i]) >= 0.0
                    })
            }
            Shape::Edge { .. } => false,
            Shape::Composite(children) => children.iter().any(|c| c.contains(point)),
        }
    }

    /// Distance along a ray to its first intersection with the shape's boundary,
    /// if it is no further than `max_distance`.
    pub fn ray_cast(&self, ray: Ray, max_distance: f64) -> Option<f64> {
        let hit = match self {
            Shape::Circle { center, r } => {
                let to_start = ray.start - *center;
                let b = ray.dir.dot(to_start);
                let c = to_start.mag_sq() - r * r;
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let sqrt_disc = disc.sqrt();
                [-b - sqrt_disc, -b + sqrt_disc]
                    .into_iter()
                    .find(|t| *t >= 0.0)
            }
            Shape::Polygon { points } => {
                let n = points.len();
                (0..n)
                    .filter_map(|i| ray_segment(ray, points[i], points[(i + 1) % n]))
                    .reduce(f64::min)
            }
            Shape::Edge { begin, end } => ray_segment(ray, *begin, *end),
            Shape::Composite(children) => children
                .iter()
                .filter_map(|c| c.ray_cast(ray, max_distance))
                .reduce(f64::min),
        };
        hit.filter(|t| *t <= max_distance)
    }

    /// Project the shape onto an axis.
    pub fn project(&self, axis: m::Vec2) -> Projection {
        match self {
            Shape::Circle { center, r } => {
                let c = center.dot(axis);
                let r = r * axis.mag();
                Projection::new(c - r, c + r)
            }
            Shape::Polygon { points } => {
                Projection::of_points(points.iter().copied(), axis).unwrap_or(Projection::new(0.0, 0.0))
            }
            Shape::Edge { begin, end } => {
                let (a, b) = (begin.dot(axis), end.dot(axis));
                Projection::new(a.min(b), a.max(b))
            }
            Shape::Composite(children) => children
                .iter()
                .map(|c| c.project(axis))
                .reduce(|a, b| a.union(&b))
                .unwrap_or(Projection::new(0.0, 0.0)),
        }
    }

    /// Shapes that can't take part in collisions: non-positive radius,
    /// polygons with less than three points, zero-length edges,
    /// or anything with a non-finite coordinate.
    pub fn is_degenerate(&self) -> bool {
        match self {
            Shape::Circle { center, r } => *r <= 0.0 || !r.is_finite() || !m::is_valid(*center),
            Shape::Polygon { points } => {
                points.len() < 3 || points.iter().any(|p| !m::is_valid(*p))
            }
            Shape::Edge { begin, end } => {
                !m::is_valid(*begin)
                    || !m::is_valid(*end)
                    || (*end - *begin).mag_sq() <= f64::EPSILON
            }
            Shape::Composite(children) => children.is_empty(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Polygon { .. } => ShapeKind::Polygon,
            Shape::Edge { .. } => ShapeKind::Edge,
            Shape::Composite(_) => ShapeKind::Composite,
        }
    }

    /// The smallest of the bounding box's width and height.
    #[inline]
    pub fn min_dimension(&self) -> f64 {
        let aabb = self.aabb();
        aabb.width().min(aabb.height())
    }
}

/// Discriminant of [`Shape`], ordered the way the narrow phase dispatches pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeKind {
    Circle,
    Polygon,
    Edge,
    Composite,
}

fn average(points: impl Iterator<Item = m::Vec2>) -> m::Vec2 {
    let (sum, count) = points.fold((m::Vec2::zero(), 0usize), |(sum, n), p| (sum + p, n + 1));
    if count == 0 {
        sum
    } else {
        sum / count as f64
    }
}

fn furthest_of(points: impl IntoIterator<Item = m::Vec2>, dir: m::Vec2) -> m::Vec2 {
    points
        .into_iter()
        .fold(None, |best: Option<(f64, m::Vec2)>, p| {
            let d = p.dot(dir);
            match best {
                Some((best_d, _)) if best_d >= d => best,
                _ => Some((d, p)),
            }
        })
        .map(|(_, p)| p)
        .unwrap_or_else(m::Vec2::zero)
}

/// Distance along a ray to a line segment.
fn ray_segment(ray: Ray, p: m::Vec2, q: m::Vec2) -> Option<f64> {
    let edge = q - p;
    let denom = m::cross(*ray.dir, edge);
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let w = p - ray.start;
    let t = m::cross(w, edge) / denom;
    let u = m::cross(w, *ray.dir) / denom;
    if t >= 0.0 && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}

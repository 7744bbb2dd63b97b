use crate::{
    event::Side,
    math::{self as m, Unit},
    physics::{Body, BodyKey, CollisionType},
};

use std::fmt;

/// Identifier of an unordered pair of bodies.
///
/// The same two bodies always produce the same id regardless of order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairId([u64; 2]);

impl PairId {
    pub fn new(a: BodyKey, b: BodyKey) -> Self {
        let (a, b) = (a.to_bits(), b.to_bits());
        if a <= b {
            Self([a, b])
        } else {
            Self([b, a])
        }
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0[0], self.0[1])
    }
}

/// Two bodies the broad phase found to be potentially touching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pair {
    pub a: BodyKey,
    pub b: BodyKey,
    pub id: PairId,
}

impl Pair {
    #[inline]
    pub fn new(a: BodyKey, b: BodyKey) -> Self {
        Self {
            a,
            b,
            id: PairId::new(a, b),
        }
    }

    /// Check whether two bodies should be tested against each other at all.
    ///
    /// Neither can have collisions disabled, their collision groups must accept each other,
    /// two Fixed bodies never collide, and two sleeping bodies are left alone.
    /// Passive bodies pair with anything so that their overlaps are reported.
    pub fn can_collide(a_key: BodyKey, a: &Body, b_key: BodyKey, b: &Body) -> bool {
        a_key != b_key
            && a.collision_type != CollisionType::PreventCollision
            && b.collision_type != CollisionType::PreventCollision
            && !(a.is_fixed() && b.is_fixed())
            && a.group.can_collide(&b.group)
            && !(a.is_sleeping() && b.is_sleeping())
    }
}

/// 1-2 points of contact can occur between two 2D objects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ContactPoints<T> {
    One(T),
    Two(T, T),
}

impl<T> ContactPoints<T> {
    pub fn iter(&self) -> ContactPointIter<'_, T> {
        ContactPointIter {
            points: self,
            idx: 0,
        }
    }

    /// Execute a function on every point.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ContactPoints<U> {
        match self {
            ContactPoints::One(p) => ContactPoints::One(f(p)),
            ContactPoints::Two(p1, p2) => {
                let p1 = f(p1);
                ContactPoints::Two(p1, f(p2))
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            ContactPoints::One(_) => 1,
            ContactPoints::Two(..) => 2,
        }
    }

    #[inline]
    pub fn first(&self) -> &T {
        match self {
            ContactPoints::One(p) | ContactPoints::Two(p, _) => p,
        }
    }
}

/// An iterator over the points in a ContactPoints.
pub struct ContactPointIter<'a, T> {
    points: &'a ContactPoints<T>,
    idx: u8,
}

impl<'a, T> Iterator for ContactPointIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.idx += 1;
        use ContactPoints::*;
        match (self.points, self.idx - 1) {
            (One(p), 0) => Some(p),
            (One(_), _) => None,
            (Two(p1, _), 0) => Some(p1),
            (Two(_, p2), 1) => Some(p2),
            (Two(_, _), _) => None,
        }
    }
}

/// Raw result of testing two shapes against each other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Manifold {
    /// Direction B must move to separate from A.
    pub normal: Unit<m::Vec2>,
    /// Penetration depth along the normal, always positive.
    pub depth: f64,
    /// For each point of contact, the matching points on the surfaces of A and B in world space.
    pub points: ContactPoints<[m::Vec2; 2]>,
}

impl Manifold {
    /// The same manifold seen from the other shape.
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            depth: self.depth,
            points: self.points.map(|[a, b]| [b, a]),
        }
    }

    /// Minimum translation vector, the displacement of B that resolves the overlap.
    #[inline]
    pub fn mtv(&self) -> m::Vec2 {
        *self.normal * self.depth
    }
}

/// A point where two bodies touch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactPoint {
    /// World-space point between the two surfaces at the time of detection.
    pub point: m::Vec2,
    /// The surface points of each body in body-local space,
    /// used to re-measure penetration after bodies have been moved.
    pub offsets: [m::Vec2; 2],
}

/// An intersection between two bodies, ready to be solved.
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    pub id: PairId,
    pub body_a: BodyKey,
    pub body_b: BodyKey,
    /// Direction body B must move to separate from A, scaled by depth.
    pub mtv: m::Vec2,
    /// Unit normal pointing away from A.
    pub normal: Unit<m::Vec2>,
    pub tangent: Unit<m::Vec2>,
    pub depth: f64,
    pub points: ContactPoints<ContactPoint>,
    /// Set by the solver when a contact turns out to need no resolution.
    pub canceled: bool,
}

impl Contact {
    /// Build a contact from a manifold and the bodies it was computed for.
    pub fn new(pair: Pair, body_a: &Body, body_b: &Body, manifold: Manifold) -> Self {
        let (tr_a, tr_b) = (&body_a.transform, &body_b.transform);
        Self {
            id: pair.id,
            body_a: pair.a,
            body_b: pair.b,
            mtv: manifold.mtv(),
            normal: manifold.normal,
            tangent: m::unit_left_normal(manifold.normal),
            depth: manifold.depth,
            points: manifold.points.map(|[on_a, on_b]| ContactPoint {
                point: (on_a + on_b) * 0.5,
                offsets: [
                    tr_a.apply_rigid_inverse(on_a),
                    tr_b.apply_rigid_inverse(on_b),
                ],
            }),
            canceled: false,
        }
    }

    /// The side of body A that body B touched.
    #[inline]
    pub fn side(&self) -> Side {
        Side::from_direction(self.mtv)
    }

    /// Penetration at a contact point given where the bodies are now.
    /// Positive values mean the bodies still overlap.
    #[inline]
    pub fn current_depth(&self, point: &ContactPoint, body_a: &Body, body_b: &Body) -> f64 {
        let on_a = body_a.transform.apply_rigid(point.offsets[0]);
        let on_b = body_b.transform.apply_rigid(point.offsets[1]);
        (on_a - on_b).dot(*self.normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{Collider, CollisionGroup, EntitySet};

    #[test]
    fn pair_id_ignores_order() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(Body::new_active(Collider::new_circle(1.0), 1.0));
        let b = bodies.insert(Body::new_active(Collider::new_circle(1.0), 1.0));
        assert_eq!(PairId::new(a, b), PairId::new(b, a));
        assert_ne!(PairId::new(a, a), PairId::new(a, b));
        assert!(PairId::new(a, b).to_string().contains(':'));
    }

    #[test]
    fn pair_filtering() {
        let mut bodies = EntitySet::new();
        let active = bodies.insert(Body::new_active(Collider::new_circle(1.0), 1.0));
        let fixed = bodies.insert(Body::new_fixed(Collider::new_circle(1.0)));
        let fixed2 = bodies.insert(Body::new_fixed(Collider::new_circle(1.0)));
        let passive = bodies.insert(Body::new_passive(Collider::new_circle(1.0)));
        let passive2 = bodies.insert(Body::new_passive(Collider::new_circle(1.0)));
        let off = bodies.insert(Body::new(
            Collider::new_circle(1.0),
            CollisionType::PreventCollision,
            1.0,
        ));
        let check = |a: BodyKey, b: BodyKey| {
            Pair::can_collide(a, bodies.get(a).unwrap(), b, bodies.get(b).unwrap())
        };
        assert!(check(active, fixed));
        assert!(check(active, passive));
        assert!(check(passive, passive2));
        assert!(check(passive, fixed));
        assert!(!check(fixed, fixed2));
        assert!(!check(active, off));
        assert!(!check(passive, off));
        assert!(!check(active, active));
    }

    #[test]
    fn collision_groups_filter_pairs() {
        let player = CollisionGroup::single(0).unwrap();
        let enemy = CollisionGroup::single(1).unwrap();
        let mut bodies = EntitySet::new();
        let p1 = bodies.insert(Body::new_active(Collider::new_circle(1.0), 1.0).with_group(player));
        let p2 = bodies.insert(Body::new_active(Collider::new_circle(1.0), 1.0).with_group(player));
        let e = bodies.insert(Body::new_active(Collider::new_circle(1.0), 1.0).with_group(enemy));
        let wall = bodies.insert(Body::new_fixed(Collider::new_circle(1.0)));
        let check = |a: BodyKey, b: BodyKey| {
            Pair::can_collide(a, bodies.get(a).unwrap(), b, bodies.get(b).unwrap())
        };
        assert!(!check(p1, p2));
        assert!(check(p1, e));
        assert!(check(p2, wall));
    }

    #[test]
    fn points_iterate_in_order() {
        let two = ContactPoints::Two(1, 2);
        assert_eq!(two.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(ContactPoints::One(5).map(|x| x * 2), ContactPoints::One(10));
        assert_eq!(two.len(), 2);
    }

    #[test]
    fn flipping_swaps_surfaces() {
        let manifold = Manifold {
            normal: Unit::unit_x(),
            depth: 1.0,
            points: ContactPoints::One([m::Vec2::new(1.0, 0.0), m::Vec2::new(0.0, 0.0)]),
        };
        let flipped = manifold.flipped();
        assert_eq!(*flipped.normal, m::Vec2::new(-1.0, 0.0));
        assert_eq!(
            flipped.points,
            ContactPoints::One([m::Vec2::new(0.0, 0.0), m::Vec2::new(1.0, 0.0)])
        );
    }
}

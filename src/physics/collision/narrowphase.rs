//! Turning candidate pairs from the broad phase into solvable contacts.

use super::{shape_shape, Contact, Pair};
use crate::physics::EntitySet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Test a single pair, returning a contact if the bodies' shapes overlap.
///
/// Pairs referring to bodies that no longer exist are discarded.
pub fn test_pair(bodies: &EntitySet, pair: Pair) -> Option<Contact> {
    let (body_a, body_b) = (bodies.get(pair.a)?, bodies.get(pair.b)?);
    let manifold = shape_shape::collide(&body_a.shape(), &body_b.shape())?;
    Some(Contact::new(pair, body_a, body_b, manifold))
}

/// Test every pair, keeping the order of the pairs in the output.
pub fn find_contacts(bodies: &EntitySet, pairs: &[Pair]) -> Vec<Contact> {
    let _span = tracy_span!("narrow phase", "find_contacts");

    #[cfg(feature = "parallel")]
    let iter = pairs.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = pairs.iter();

    iter.filter_map(|pair| test_pair(bodies, *pair)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math as m,
        physics::{Body, Collider},
    };

    #[test]
    fn contacts_only_for_overlapping_pairs() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(Body::new_active(Collider::new_circle(10.0), 1.0));
        let b = bodies.insert(
            Body::new_active(Collider::new_circle(10.0), 1.0).with_position(m::Vec2::new(19.0, 0.0)),
        );
        let c = bodies.insert(
            Body::new_active(Collider::new_circle(10.0), 1.0).with_position(m::Vec2::new(100.0, 0.0)),
        );
        let contacts = find_contacts(&bodies, &[Pair::new(a, b), Pair::new(a, c)]);
        assert_eq!(contacts.len(), 1);
        let contact = &contacts[0];
        assert_eq!((contact.body_a, contact.body_b), (a, b));
        assert!((contact.depth - 1.0).abs() < 1e-9);
        // the surface points are stored relative to each body
        let point = contact.points.first();
        assert!((point.offsets[0].x - 10.0).abs() < 1e-9);
        assert!((point.offsets[1].x + 10.0).abs() < 1e-9);
        assert!((contact.current_depth(point, bodies.get(a).unwrap(), bodies.get(b).unwrap()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn removed_bodies_are_skipped() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(Body::new_active(Collider::new_circle(1.0), 1.0));
        let b = bodies.insert(Body::new_active(Collider::new_circle(1.0), 1.0));
        bodies.remove(b);
        assert!(test_pair(&bodies, Pair::new(a, b)).is_none());
    }
}

//! Collision response. Solvers take the contacts found by the narrow phase
//! and move bodies so they stop overlapping.

use super::{
    collision::{shape_shape::OVERLAP_EPSILON, Contact},
    config::ContactSolveBias,
    Body, EntitySet,
};
use crate::event::{EventKind, EventSink};

mod arcade;
pub use arcade::ArcadeSolver;

mod realistic;
pub use realistic::RealisticSolver;

/// A strategy for resolving contacts.
pub trait CollisionSolver {
    /// Resolve every contact, marking the ones that turned out not to need it as canceled.
    ///
    /// Pre- and post-collision events are pushed into `events`.
    fn solve(&mut self, bodies: &mut EntitySet, contacts: &mut Vec<Contact>, events: &mut EventSink);
}

impl<S: CollisionSolver + ?Sized> CollisionSolver for Box<S> {
    fn solve(&mut self, bodies: &mut EntitySet, contacts: &mut Vec<Contact>, events: &mut EventSink) {
        (**self).solve(bodies, contacts, events)
    }
}

//
// Shared steps
//

/// Cancel contacts too shallow to matter and announce the rest.
pub(super) fn cancel_and_announce(contacts: &mut [Contact], events: &mut EventSink) {
    for contact in contacts {
        if contact.mtv.x.abs() < OVERLAP_EPSILON && contact.mtv.y.abs() < OVERLAP_EPSILON {
            contact.canceled = true;
            continue;
        }
        events.push_pair(
            EventKind::PreCollision,
            contact.body_a,
            contact.body_b,
            contact.mtv,
        );
    }
}

/// Whether the solver should move anything in response to a contact between these bodies.
/// Passive bodies only get events.
#[inline]
pub(super) fn resolves(a: &Body, b: &Body) -> bool {
    !a.is_passive() && !b.is_passive() && (a.is_active() || b.is_active())
}

/// Order contacts according to the configured bias,
/// breaking ties by penetration depth, shallowest first.
pub(super) fn sort_contacts(contacts: &mut [Contact], bias: ContactSolveBias) {
    let rank = |contact: &Contact| {
        let horizontal = contact.side().is_horizontal();
        match bias {
            ContactSolveBias::None => 0,
            ContactSolveBias::VerticalFirst => horizontal as u8,
            ContactSolveBias::HorizontalFirst => !horizontal as u8,
        }
    };
    contacts.sort_by(|c1, c2| {
        rank(c1)
            .cmp(&rank(c2))
            .then_with(|| c1.depth.abs().total_cmp(&c2.depth.abs()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math as m,
        physics::{collision::narrowphase, Collider, Pair},
    };

    #[test]
    fn vertical_contacts_first() {
        let mut bodies = EntitySet::new();
        let player = bodies.insert(Body::new_active(Collider::new_square(10.0), 1.0));
        // a wall to the right overlapping by 1, the floor below by 0.5
        let wall = bodies.insert(
            Body::new_fixed(Collider::new_square(10.0)).with_position(m::Vec2::new(9.0, 0.0)),
        );
        let floor = bodies.insert(
            Body::new_fixed(Collider::new_rect(40.0, 10.0)).with_position(m::Vec2::new(0.0, 9.5)),
        );
        let pairs = [Pair::new(player, wall), Pair::new(player, floor)];
        let mut contacts = narrowphase::find_contacts(&bodies, &pairs);
        assert_eq!(contacts.len(), 2);

        sort_contacts(&mut contacts, ContactSolveBias::None);
        assert_eq!(contacts[0].body_b, floor);
        sort_contacts(&mut contacts, ContactSolveBias::HorizontalFirst);
        assert_eq!(contacts[0].body_b, wall);
        sort_contacts(&mut contacts, ContactSolveBias::VerticalFirst);
        assert_eq!(contacts[0].body_b, floor);
    }

    #[test]
    fn shallow_contacts_are_solved_first() {
        let mut bodies = EntitySet::new();
        let player = bodies.insert(Body::new_active(Collider::new_square(10.0), 1.0));
        // deep overlap with a small box close by, shallow overlap with a big box far away
        let near = bodies.insert(
            Body::new_fixed(Collider::new_square(10.0)).with_position(m::Vec2::new(7.0, 0.0)),
        );
        let far = bodies.insert(
            Body::new_fixed(Collider::new_rect(10.0, 100.0)).with_position(m::Vec2::new(-9.0, 40.0)),
        );
        let pairs = [Pair::new(player, near), Pair::new(player, far)];
        let mut contacts = narrowphase::find_contacts(&bodies, &pairs);
        assert_eq!(contacts.len(), 2);

        sort_contacts(&mut contacts, ContactSolveBias::None);
        assert_eq!(contacts[0].body_b, far);
        assert!((contacts[0].depth - 1.0).abs() < 1e-9);
        assert!((contacts[1].depth - 3.0).abs() < 1e-9);
    }

    #[test]
    fn shallow_contacts_are_canceled() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(Body::new_active(Collider::new_circle(10.0), 1.0));
        let b = bodies.insert(
            Body::new_active(Collider::new_circle(10.0), 1.0).with_position(m::Vec2::new(19.0, 0.0)),
        );
        let mut contacts = narrowphase::find_contacts(&bodies, &[Pair::new(a, b)]);
        contacts.push(Contact {
            mtv: m::Vec2::new(1e-5, -1e-5),
            ..contacts[0]
        });
        let mut events = EventSink::new();
        cancel_and_announce(&mut contacts, &mut events);
        assert!(!contacts[0].canceled);
        assert!(contacts[1].canceled);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == EventKind::PreCollision));
    }
}

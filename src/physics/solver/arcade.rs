use super::{cancel_and_announce, resolves, sort_contacts, CollisionSolver};
use crate::{
    event::{EventKind, EventSink},
    physics::{
        collision::{shape_shape, Contact},
        config::{ArcadeConfig, BodyConfig},
        EntitySet,
    },
};

/// Resolves contacts by pushing bodies directly out of each other
/// and removing the velocity that points into the contact.
///
/// There is no bounce, friction or rotation, which makes this a good fit
/// for platformers and other games where bodies should stop dead on contact.
#[derive(Clone, Debug, Default)]
pub struct ArcadeSolver {
    pub config: ArcadeConfig,
    pub bodies: BodyConfig,
}

impl ArcadeSolver {
    pub fn new(config: ArcadeConfig, bodies: BodyConfig) -> Self {
        Self { config, bodies }
    }

    fn solve_position(&self, bodies: &mut EntitySet, contact: &mut Contact) {
        let (Some(a), Some(b)) = bodies.get2_mut(contact.body_a, contact.body_b) else {
            contact.canceled = true;
            return;
        };
        // stacked tiles may already have been pushed apart by an earlier contact
        if !a.bounds().overlaps(&b.bounds(), 0.0) {
            contact.canceled = true;
            return;
        }
        if !resolves(a, b) {
            return;
        }
        let Some(manifold) = shape_shape::collide(&a.shape(), &b.shape()) else {
            return;
        };
        let mtv = manifold.mtv();

        let weight_a = if a.is_active() { a.inverse_mass() } else { 0.0 };
        let weight_b = if b.is_active() { b.inverse_mass() } else { 0.0 };
        let total = weight_a + weight_b;
        if total <= 0.0 {
            return;
        }
        a.transform.pos -= a.locked.mask_linear(mtv * (weight_a / total));
        b.transform.pos += b.locked.mask_linear(mtv * (weight_b / total));
    }

    fn solve_velocity(&self, bodies: &mut EntitySet, contact: &Contact) {
        if contact.canceled {
            return;
        }
        let (Some(a), Some(b)) = bodies.get2_mut(contact.body_a, contact.body_b) else {
            return;
        };
        if !resolves(a, b) {
            return;
        }
        let normal = *contact.normal;

        if a.is_active() {
            let into = a.velocity.linear.dot(normal);
            if into > 0.0 {
                a.velocity.linear -= a.locked.mask_linear(normal * into);
            }
        }
        if b.is_active() {
            let into = b.velocity.linear.dot(normal);
            if into < 0.0 {
                b.velocity.linear -= b.locked.mask_linear(normal * into);
            }
        }
    }

    fn post_solve(&self, bodies: &mut EntitySet, contacts: &[Contact], events: &mut EventSink) {
        for contact in contacts.iter().filter(|c| !c.canceled) {
            let (Some(a), Some(b)) = bodies.get2_mut(contact.body_a, contact.body_b) else {
                continue;
            };
            if a.is_passive() || b.is_passive() {
                continue;
            }
            for body in [a, b] {
                if body.is_active() {
                    body.update_motion(&self.bodies);
                }
            }
            events.push_pair(
                EventKind::PostCollision,
                contact.body_a,
                contact.body_b,
                contact.mtv,
            );
        }
    }
}

impl CollisionSolver for ArcadeSolver {
    fn solve(&mut self, bodies: &mut EntitySet, contacts: &mut Vec<Contact>, events: &mut EventSink) {
        let _span = tracy_span!("arcade solve", "solve");

        cancel_and_announce(contacts, events);
        sort_contacts(contacts, self.config.contact_solve_bias);

        for contact in contacts.iter_mut().filter(|c| !c.canceled) {
            self.solve_position(bodies, contact);
            self.solve_velocity(bodies, contact);
        }

        self.post_solve(bodies, contacts, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math as m,
        physics::{collision::narrowphase, Body, BodyKey, Collider, Pair, Velocity},
    };
    use approx::assert_relative_eq;

    fn solve_once(bodies: &mut EntitySet, pairs: &[Pair]) -> (Vec<Contact>, EventSink) {
        let mut contacts = narrowphase::find_contacts(bodies, pairs);
        let mut events = EventSink::new();
        ArcadeSolver::default().solve(bodies, &mut contacts, &mut events);
        (contacts, events)
    }

    fn circle_at(x: f64, vel_x: f64) -> Body {
        Body::new_active(Collider::new_circle(10.0), 1.0)
            .with_position(m::Vec2::new(x, 0.0))
            .with_velocity(Velocity {
                linear: m::Vec2::new(vel_x, 0.0),
                angular: 0.0,
            })
    }

    #[test]
    fn overlap_is_split_evenly_between_equal_bodies() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(circle_at(0.0, 5.0));
        let b = bodies.insert(circle_at(19.0, -5.0));
        let (contacts, events) = solve_once(&mut bodies, &[Pair::new(a, b)]);
        assert_eq!(contacts.len(), 1);

        let (body_a, body_b) = (bodies.get(a).unwrap(), bodies.get(b).unwrap());
        assert_relative_eq!(body_a.pos().x, -0.5, epsilon = 1e-9);
        assert_relative_eq!(body_b.pos().x, 19.5, epsilon = 1e-9);
        assert!(body_a.velocity.linear.x <= 0.0);
        assert!(body_b.velocity.linear.x >= 0.0);
        // pre and post for both bodies
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn heavier_bodies_move_less() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(circle_at(0.0, 0.0));
        let mut heavy = circle_at(19.0, 0.0);
        heavy.mass = 3.0_f64.into();
        let b = bodies.insert(heavy);
        solve_once(&mut bodies, &[Pair::new(a, b)]);
        assert_relative_eq!(bodies.get(a).unwrap().pos().x, -0.75, epsilon = 1e-9);
        assert_relative_eq!(bodies.get(b).unwrap().pos().x, 19.25, epsilon = 1e-9);
    }

    #[test]
    fn fixed_bodies_never_move() {
        let mut bodies = EntitySet::new();
        let ground = bodies.insert(
            Body::new_fixed(Collider::new_rect(100.0, 10.0)).with_position(m::Vec2::new(0.0, 10.0)),
        );
        let falling: Vec<BodyKey> = (0..5)
            .map(|i| {
                let body = Body::new_active(Collider::new_circle(3.0), 1.0)
                    .with_position(m::Vec2::new(i as f64 * 10.0 - 20.0, 3.0))
                    .with_velocity(Velocity {
                        linear: m::Vec2::new(0.0, 50.0),
                        angular: 0.0,
                    });
                bodies.insert(body)
            })
            .collect();
        let pairs: Vec<Pair> = falling.iter().map(|k| Pair::new(*k, ground)).collect();

        for _ in 0..3 {
            solve_once(&mut bodies, &pairs);
        }
        let ground_body = bodies.get(ground).unwrap();
        assert_eq!(ground_body.pos(), m::Vec2::new(0.0, 10.0));
        assert_eq!(ground_body.velocity, Velocity::default());
        for key in falling {
            let body = bodies.get(key).unwrap();
            // resting on top of the ground at y = 5
            assert_relative_eq!(body.pos().y, 2.0, epsilon = 1e-9);
            assert!(body.velocity.linear.y <= 0.0);
        }
    }

    #[test]
    fn passive_bodies_only_get_events() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(circle_at(0.0, 5.0));
        let trigger = bodies.insert(
            Body::new_passive(Collider::new_circle(10.0)).with_position(m::Vec2::new(19.0, 0.0)),
        );
        let (_, events) = solve_once(&mut bodies, &[Pair::new(a, trigger)]);
        assert_eq!(bodies.get(a).unwrap().pos().x, 0.0);
        assert_eq!(bodies.get(a).unwrap().velocity.linear.x, 5.0);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == EventKind::PreCollision));
    }

    #[test]
    fn locked_axes_are_not_pushed() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(
            circle_at(0.0, 5.0).with_locked(crate::physics::DegreesOfFreedom::X),
        );
        let b = bodies.insert(circle_at(19.0, -5.0));
        solve_once(&mut bodies, &[Pair::new(a, b)]);
        assert_eq!(bodies.get(a).unwrap().pos().x, 0.0);
        assert_eq!(bodies.get(a).unwrap().velocity.linear.x, 5.0);
        assert_relative_eq!(bodies.get(b).unwrap().pos().x, 19.5, epsilon = 1e-9);
    }
}

use super::{cancel_and_announce, resolves, sort_contacts, CollisionSolver};
use crate::{
    event::{EventKind, EventSink},
    math as m,
    physics::{
        collision::{Contact, ContactPoint},
        config::{BodyConfig, RealisticConfig},
        Body, DegreesOfFreedom, EntitySet,
    },
};

/// Solver data for one point of a contact, rebuilt every time the solver runs.
#[derive(Clone, Copy, Debug)]
struct PointConstraint {
    point: ContactPoint,
    /// Offsets of the contact point from the centers of both bodies.
    r_a: m::Vec2,
    r_b: m::Vec2,
    normal_mass: f64,
    tangent_mass: f64,
    normal_impulse: f64,
    tangent_impulse: f64,
    /// Normal velocity the bodies should separate with, from restitution.
    bounce_velocity: f64,
}

#[derive(Clone, Debug)]
struct ContactConstraint {
    /// Index into the contact list being solved.
    contact: usize,
    friction: f64,
    points: Vec<PointConstraint>,
}

/// Resolves contacts with sequential impulses,
/// taking friction, restitution and rotation into account.
#[derive(Clone, Debug)]
pub struct RealisticSolver {
    pub config: RealisticConfig,
    /// Fraction of remaining overlap corrected per position iteration.
    pub position_bias: f64,
    /// Approach speed below which bodies don't bounce.
    pub restitution_slop: f64,
    pub bodies: BodyConfig,
    constraints: Vec<ContactConstraint>,
}

impl Default for RealisticSolver {
    fn default() -> Self {
        Self::new(RealisticConfig::default(), 0.2, 0.1, BodyConfig::default())
    }
}

#[inline]
fn effective_inverse_inertia(body: &Body) -> f64 {
    body.locked.mask_angular(body.inverse_inertia())
}

/// Velocity of the point at offset `r` from the body's center.
#[inline]
fn point_velocity(body: &Body, r: m::Vec2) -> m::Vec2 {
    body.velocity.point_velocity(r)
}

/// Inverse of the combined resistance of both bodies to an impulse along `dir`.
fn effective_mass(a: &Body, b: &Body, r_a: m::Vec2, r_b: m::Vec2, dir: m::Vec2) -> f64 {
    let ra_cross = m::cross(r_a, dir);
    let rb_cross = m::cross(r_b, dir);
    let k = a.inverse_mass()
        + b.inverse_mass()
        + effective_inverse_inertia(a) * ra_cross * ra_cross
        + effective_inverse_inertia(b) * rb_cross * rb_cross;
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

impl RealisticSolver {
    pub fn new(
        config: RealisticConfig,
        position_bias: f64,
        restitution_slop: f64,
        bodies: BodyConfig,
    ) -> Self {
        Self {
            config,
            position_bias,
            restitution_slop,
            bodies,
            constraints: Vec::new(),
        }
    }

    fn pre_solve(&mut self, bodies: &mut EntitySet, contacts: &[Contact]) {
        self.constraints.clear();
        for (idx, contact) in contacts.iter().enumerate() {
            if contact.canceled {
                continue;
            }
            let (Some(a), Some(b)) = bodies.get2_mut(contact.body_a, contact.body_b) else {
                continue;
            };
            self.match_awake(a, b);
            if !resolves(a, b) {
                continue;
            }
            let (a, b): (&Body, &Body) = (a, b);

            let normal = *contact.normal;
            let tangent = *contact.tangent;
            let restitution = a.material.restitution_with(&b.material);
            let points = contact
                .points
                .iter()
                .map(|point| {
                    let r_a = point.point - a.pos();
                    let r_b = point.point - b.pos();
                    let relative = point_velocity(b, r_b) - point_velocity(a, r_a);
                    let approach = relative.dot(normal);
                    PointConstraint {
                        point: *point,
                        r_a,
                        r_b,
                        normal_mass: effective_mass(a, b, r_a, r_b, normal),
                        tangent_mass: effective_mass(a, b, r_a, r_b, tangent),
                        normal_impulse: 0.0,
                        tangent_impulse: 0.0,
                        bounce_velocity: if approach < -self.restitution_slop {
                            -restitution * approach
                        } else {
                            0.0
                        },
                    }
                })
                .collect();

            self.constraints.push(ContactConstraint {
                contact: idx,
                friction: a.material.friction_with(&b.material),
                points,
            });
        }
    }

    /// Wake a sleeping body when an awake one bumps into it hard enough.
    fn match_awake(&self, a: &mut Body, b: &mut Body) {
        if a.is_sleeping() == b.is_sleeping() {
            return;
        }
        let (sleeper, other) = if a.is_sleeping() { (a, b) } else { (b, a) };
        if !sleeper.is_fixed()
            && other.is_active()
            && other.sleep_motion() >= self.bodies.wake_threshold
        {
            sleeper.wake(&self.bodies);
        }
    }

    fn solve_velocity(&mut self, bodies: &mut EntitySet, contacts: &[Contact]) {
        for constraint in &mut self.constraints {
            let contact = &contacts[constraint.contact];
            let (Some(a), Some(b)) = bodies.get2_mut(contact.body_a, contact.body_b) else {
                continue;
            };
            let normal = *contact.normal;
            let tangent = *contact.tangent;

            for point in &mut constraint.points {
                let relative = point_velocity(b, point.r_b) - point_velocity(a, point.r_a);
                let tangent_vel = relative.dot(tangent);
                let max_friction = constraint.friction * point.normal_impulse;
                let new_impulse = (point.tangent_impulse - point.tangent_mass * tangent_vel)
                    .clamp(-max_friction, max_friction);
                let delta = new_impulse - point.tangent_impulse;
                point.tangent_impulse = new_impulse;

                apply_pair_impulse(a, b, point, tangent * delta);
            }

            for point in &mut constraint.points {
                let relative = point_velocity(b, point.r_b) - point_velocity(a, point.r_a);
                let normal_vel = relative.dot(normal);
                let new_impulse = (point.normal_impulse
                    - point.normal_mass * (normal_vel - point.bounce_velocity))
                    .max(0.0);
                let delta = new_impulse - point.normal_impulse;
                point.normal_impulse = new_impulse;

                apply_pair_impulse(a, b, point, normal * delta);
            }
        }
    }

    fn solve_position(&mut self, bodies: &mut EntitySet, contacts: &[Contact]) {
        for constraint in &self.constraints {
            let contact = &contacts[constraint.contact];
            let (Some(a), Some(b)) = bodies.get2_mut(contact.body_a, contact.body_b) else {
                continue;
            };
            let normal = *contact.normal;

            for point in &constraint.points {
                let depth = contact.current_depth(&point.point, a, b);
                let steering = (self.position_bias * (depth - self.config.slop))
                    .clamp(0.0, self.config.max_correction);
                if steering <= 0.0 {
                    continue;
                }
                let impulse = normal * (steering * point.normal_mass);
                nudge(a, point.r_a, -impulse);
                nudge(b, point.r_b, impulse);
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

/// Apply equal and opposite impulses at a contact point.
#[inline]
fn apply_pair_impulse(a: &mut Body, b: &mut Body, point: &PointConstraint, impulse: m::Vec2) {
    let (pos_a, pos_b) = (a.pos(), b.pos());
    a.apply_impulse(pos_a + point.r_a, -impulse);
    b.apply_impulse(pos_b + point.r_b, impulse);
}

/// Move a body directly by a pseudo-impulse at offset `r` from its center.
fn nudge(body: &mut Body, r: m::Vec2, impulse: m::Vec2) {
    if !body.is_active() {
        return;
    }
    body.transform.pos += body.locked.mask_linear(impulse * body.inverse_mass());
    if !body.locked.contains(DegreesOfFreedom::ROTATION) {
        body.transform.rotation += m::cross(r, impulse) * body.inverse_inertia();
    }
}

impl CollisionSolver for RealisticSolver {
    fn solve(&mut self, bodies: &mut EntitySet, contacts: &mut Vec<Contact>, events: &mut EventSink) {
        let _span = tracy_span!("realistic solve", "solve");

        cancel_and_announce(contacts, events);
        sort_contacts(contacts, self.config.contact_solve_bias);
        self.pre_solve(bodies, contacts);

        for _ in 0..self.config.velocity_iterations {
            self.solve_velocity(bodies, contacts);
        }
        for _ in 0..self.config.position_iterations {
            self.solve_position(bodies, contacts);
        }

        self.post_solve(bodies, contacts, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{
        collision::narrowphase, BodyKey, Collider, Pair, SurfaceMaterial, Velocity,
    };
    use approx::assert_relative_eq;

    fn solver_with_slop(slop: f64) -> RealisticSolver {
        RealisticSolver::new(
            RealisticConfig {
                slop,
                ..Default::default()
            },
            0.2,
            0.1,
            BodyConfig::default(),
        )
    }

    fn circle(x: f64, vel_x: f64, bounciness: f64) -> Body {
        Body::new_active(Collider::new_circle(10.0), 1.0)
            .with_position(m::Vec2::new(x, 0.0))
            .with_velocity(Velocity {
                linear: m::Vec2::new(vel_x, 0.0),
                angular: 0.0,
            })
            .with_material(SurfaceMaterial {
                friction: 0.5,
                bounciness,
            })
    }

    fn solve(solver: &mut RealisticSolver, bodies: &mut EntitySet, pairs: &[Pair]) -> EventSink {
        let mut contacts = narrowphase::find_contacts(bodies, pairs);
        let mut events = EventSink::new();
        solver.solve(bodies, &mut contacts, &mut events);
        events
    }

    #[test]
    fn elastic_collision_swaps_velocities() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(circle(0.0, 10.0, 1.0));
        let b = bodies.insert(circle(19.0, -10.0, 1.0));
        let events = solve(&mut RealisticSolver::default(), &mut bodies, &[Pair::new(a, b)]);

        let (body_a, body_b) = (bodies.get(a).unwrap(), bodies.get(b).unwrap());
        assert_relative_eq!(body_a.velocity.linear.x, -10.0, epsilon = 1e-9);
        assert_relative_eq!(body_b.velocity.linear.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(body_a.velocity.angular, 0.0, epsilon = 1e-12);
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn inelastic_collision_comes_to_rest_touching() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(circle(0.0, 10.0, 0.0));
        let b = bodies.insert(circle(19.0, -10.0, 0.0));
        let mut solver = solver_with_slop(0.0);
        for _ in 0..30 {
            solve(&mut solver, &mut bodies, &[Pair::new(a, b)]);
        }

        let (body_a, body_b) = (bodies.get(a).unwrap(), bodies.get(b).unwrap());
        assert_relative_eq!(body_a.velocity.linear.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(body_b.velocity.linear.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(body_a.pos().x, -0.5, epsilon = 1e-3);
        assert_relative_eq!(body_b.pos().x, 19.5, epsilon = 1e-3);
    }

    #[test]
    fn default_slop_leaves_shallow_overlap() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(circle(0.0, 0.0, 0.0));
        let b = bodies.insert(circle(19.0, 0.0, 0.0));
        solve(&mut RealisticSolver::default(), &mut bodies, &[Pair::new(a, b)]);
        assert_eq!(bodies.get(a).unwrap().pos().x, 0.0);
        assert_eq!(bodies.get(b).unwrap().pos().x, 19.0);
    }

    #[test]
    fn locked_rotation_stays_put() {
        let mut bodies = EntitySet::new();
        let a = bodies.insert(
            Body::new_active(Collider::new_square(10.0), 1.0).with_velocity(Velocity {
                linear: m::Vec2::new(10.0, 0.0),
                angular: 0.0,
            }),
        );
        let b = bodies.insert(
            Body::new_active(Collider::new_square(10.0), 1.0)
                .with_position(m::Vec2::new(9.5, 7.0))
                .with_locked(DegreesOfFreedom::ROTATION)
                .with_material(SurfaceMaterial {
                    friction: 0.5,
                    bounciness: 0.0,
                }),
        );
        solve(&mut solver_with_slop(0.0), &mut bodies, &[Pair::new(a, b)]);

        let (body_a, body_b) = (bodies.get(a).unwrap(), bodies.get(b).unwrap());
        assert_eq!(body_b.velocity.angular, 0.0);
        assert_eq!(body_b.transform.rotation, 0.0);
        assert!(body_a.velocity.angular.abs() > 1e-6);
        assert!(body_a.transform.rotation.abs() > 1e-9);
        // B was still pushed along the normal
        assert!(body_b.velocity.linear.x > 0.0);
    }

    #[test]
    fn fixed_bodies_never_move() {
        let mut bodies = EntitySet::new();
        let wall = bodies.insert(
            Body::new_fixed(Collider::new_rect(10.0, 100.0)).with_position(m::Vec2::new(20.0, 0.0)),
        );
        let balls: Vec<BodyKey> = (0..4)
            .map(|i| {
                bodies.insert(
                    circle(6.0, 30.0, 0.5).with_position(m::Vec2::new(6.0, i as f64 * 22.0 - 33.0)),
                )
            })
            .collect();
        let pairs: Vec<Pair> = balls.iter().map(|k| Pair::new(*k, wall)).collect();

        let mut solver = solver_with_slop(0.0);
        for _ in 0..10 {
            solve(&mut solver, &mut bodies, &pairs);
        }
        let wall_body = bodies.get(wall).unwrap();
        assert_eq!(wall_body.pos(), m::Vec2::new(20.0, 0.0));
        assert_eq!(wall_body.transform.rotation, 0.0);
        assert_eq!(wall_body.velocity, Velocity::default());
        for key in balls {
            assert!(bodies.get(key).unwrap().velocity.linear.x <= 0.0);
        }
    }

    #[test]
    fn contact_wakes_sleeping_body() {
        let mut bodies = EntitySet::new();
        let cfg = BodyConfig::default();
        let mut sleeper = circle(19.0, 0.0, 0.0);
        sleeper.set_sleeping(true, &cfg);
        let b = bodies.insert(sleeper);
        let a = bodies.insert(circle(0.0, 10.0, 0.0));
        bodies.get_mut(a).unwrap().sleep_motion = cfg.wake_threshold * 2.0;

        solve(&mut RealisticSolver::default(), &mut bodies, &[Pair::new(a, b)]);
        assert!(!bodies.get(b).unwrap().is_sleeping());
    }
}

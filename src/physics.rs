use crate::{
    event::{EventKind, EventSink},
    math as m,
};

use instant::Instant;
use std::collections::HashSet;

//

pub mod body;
pub use body::{Body, CollisionGroup, CollisionType, DegreesOfFreedom, Mass, SurfaceMaterial};

pub mod collision;
use collision::{broadphase::fast_body_pairs, narrowphase, BroadPhase, Ray, AABB};
pub use collision::{Collider, ColliderShape, Contact, Pair, PairId};

pub mod config;
use config::{BroadphaseStrategy, ConfigError, PhysicsConfig, SolverStrategy};

mod entity_set;
pub use entity_set::{BodyKey, EntitySet};

pub mod hecs_sync;

pub mod integrator;

pub mod solver;
use solver::{ArcadeSolver, CollisionSolver, RealisticSolver};

pub mod stats;
pub use stats::FrameStats;

//

/// Velocity of an object.
///
// Equivalent to a Vec3 but with names for the translational and rotational part.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    /// Linear velocity in pixels per second.
    pub linear: m::Vec2,
    /// Angular velocity in radians per second.
    pub angular: f64,
}

impl Velocity {
    /// Get the linear velocity of a point offset from the center of mass.
    #[inline]
    pub fn point_velocity(&self, offset: m::Vec2) -> m::Vec2 {
        let tangent = m::left_normal(offset) * self.angular;
        self.linear + tangent
    }
}

impl std::ops::Add for Velocity {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            linear: self.linear + other.linear,
            angular: self.angular + other.angular,
        }
    }
}
impl std::ops::AddAssign for Velocity {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}
impl std::ops::Mul<f64> for Velocity {
    type Output = Velocity;

    fn mul(self, rhs: f64) -> Self::Output {
        Velocity {
            linear: self.linear * rhs,
            angular: self.angular * rhs,
        }
    }
}

/// The closest body hit by a ray cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CastHit {
    pub body: BodyKey,
    /// Distance along the ray.
    pub t: f64,
    pub point: m::Vec2,
}

/// A contact that survived solving, remembered to detect when it ends.
#[derive(Clone, Copy, Debug)]
struct ContactRecord {
    id: PairId,
    a: BodyKey,
    b: BodyKey,
    mtv: m::Vec2,
}

fn make_broadphase(config: &PhysicsConfig) -> Box<dyn BroadPhase> {
    match config.broadphase_strategy {
        BroadphaseStrategy::Naive => Box::new(collision::NaiveBroadPhase::new()),
        BroadphaseStrategy::DynamicAabbTree => Box::new(collision::DynamicTree::new(
            config.dynamic_tree,
            config.world_bounds,
        )),
    }
}

fn make_solver(config: &PhysicsConfig) -> Box<dyn CollisionSolver> {
    match config.solver_strategy {
        SolverStrategy::Arcade => Box::new(ArcadeSolver::new(config.arcade, config.bodies)),
        SolverStrategy::Realistic => Box::new(RealisticSolver::new(
            config.realistic,
            config.position_bias,
            config.restitution_slop,
            config.bodies,
        )),
    }
}

/// Owns every body and runs collision detection and response on them.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    entity_set: EntitySet,
    broadphase: Box<dyn BroadPhase>,
    solver: Box<dyn CollisionSolver>,
    contacts: Vec<Contact>,
    last_contacts: Vec<ContactRecord>,
    events: EventSink,
    // events from collision passes after the first are thrown away
    scratch_events: EventSink,
    stats: FrameStats,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::with_valid_config(PhysicsConfig::default())
    }
}

impl PhysicsWorld {
    /// Create a world after checking the config is usable.
    pub fn new(config: PhysicsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: PhysicsConfig) -> Self {
        Self {
            broadphase: make_broadphase(&config),
            solver: make_solver(&config),
            config,
            entity_set: EntitySet::new(),
            contacts: Vec::new(),
            last_contacts: Vec::new(),
            events: EventSink::new(),
            scratch_events: EventSink::new(),
            stats: FrameStats::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Replace the config, rebuilding the broad phase and solver to match it.
    /// The old config is kept if the new one doesn't validate.
    pub fn set_config(&mut self, config: PhysicsConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.broadphase.clear(&mut self.entity_set);
        self.broadphase = make_broadphase(&config);
        self.solver = make_solver(&config);
        self.config = config;
        for (key, body) in self.entity_set.iter_mut() {
            self.broadphase.track(key, body);
        }
        Ok(())
    }

    //
    // Bodies
    //

    /// Add a body to the world and start tracking it for collisions.
    pub fn insert_body(&mut self, mut body: Body) -> BodyKey {
        // a body cloned out of the world still points at the original's tree leaf
        body.proxy = None;
        let key = self.entity_set.insert(body);
        if let Some(body) = self.entity_set.get_mut(key) {
            self.broadphase.track(key, body);
        }
        key
    }

    /// Add a body with the world's default mass and sleep settings.
    pub fn new_body(&mut self, collider: Collider, collision_type: CollisionType) -> BodyKey {
        let defaults = self.config.bodies;
        let mut body = Body::new(collider, collision_type, defaults.default_mass);
        body.can_sleep = defaults.can_sleep_by_default;
        if collision_type == CollisionType::Fixed {
            body.use_gravity = false;
        }
        self.insert_body(body)
    }

    #[inline]
    pub fn get_body(&self, key: BodyKey) -> Option<&Body> {
        self.entity_set.get(key)
    }

    #[inline]
    pub fn get_body_mut(&mut self, key: BodyKey) -> Option<&mut Body> {
        self.entity_set.get_mut(key)
    }

    /// Remove a body, returning it if it still existed.
    pub fn remove_body(&mut self, key: BodyKey) -> Option<Body> {
        let body = self.entity_set.get_mut(key)?;
        self.broadphase.untrack(key, body);
        self.entity_set.remove(key)
    }

    #[inline]
    pub fn bodies(&self) -> &EntitySet {
        &self.entity_set
    }

    pub fn wake(&mut self, key: BodyKey) {
        if let Some(body) = self.entity_set.get_mut(key) {
            body.wake(&self.config.bodies);
        }
    }

    /// Remove every body and forget all contacts and events.
    pub fn clear(&mut self) {
        self.broadphase.clear(&mut self.entity_set);
        self.entity_set.clear();
        self.contacts.clear();
        self.last_contacts.clear();
        self.events.clear();
    }

    //
    // Results of the last tick
    //

    /// Contacts resolved during the last tick.
    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Events produced by the last tick. Cleared at the start of every tick.
    #[inline]
    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = crate::event::CollisionEvent> + '_ {
        self.events.drain()
    }

    #[inline]
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    //
    // Queries
    //

    /// Every body whose bounds overlap the given box.
    pub fn query_aabb(&mut self, aabb: AABB) -> Vec<BodyKey> {
        let bodies = &self.entity_set;
        let mut found = Vec::new();
        self.broadphase.query(bodies, aabb, &mut |key| {
            if matches!(bodies.get(key), Some(body) if body.bounds().overlaps(&aabb, 0.0)) {
                found.push(key);
            }
            false
        });
        found
    }

    /// Find the closest collidable body hit by a ray within `max_distance`.
    pub fn ray_cast(&mut self, ray: Ray, max_distance: f64) -> Option<CastHit> {
        let bodies = &self.entity_set;
        let mut candidates = Vec::new();
        self.broadphase
            .ray_cast_query(bodies, ray, max_distance, &mut |key| {
                candidates.push(key);
                false
            });

        candidates
            .into_iter()
            .filter_map(|key| {
                let body = bodies.get(key)?;
                if body.collision_type == CollisionType::PreventCollision {
                    return None;
                }
                let t = body.shape().ray_cast(ray, max_distance)?;
                Some(CastHit {
                    body: key,
                    t,
                    point: ray.point_at(t),
                })
            })
            .min_by(|h1, h2| h1.t.total_cmp(&h2.t))
    }

    //
    // Simulation
    //

    /// Move every body forward by `dt_ms` milliseconds
    /// and resolve the collisions that result.
    pub fn tick(&mut self, dt_ms: f64) {
        let _span = tracy_span!("physics tick", "tick");

        if !dt_ms.is_finite() || dt_ms < 0.0 {
            log::warn!("ignoring physics tick with invalid timestep {dt_ms}");
            return;
        }

        self.events.clear();
        let mut stats = FrameStats {
            frame: self.stats.frame + 1,
            bodies: self.entity_set.len(),
            ..FrameStats::default()
        };

        let substeps = self.config.substeps.max(1);
        let step_ms = dt_ms / substeps as f64;
        let mut current: Vec<ContactRecord> = Vec::new();

        for _ in 0..substeps {
            let start = Instant::now();
            self.integrate_bodies(step_ms, &mut stats);
            stats.integrate_time += start.elapsed();

            let start = Instant::now();
            stats.broadphase_updates += self.broadphase.update(&mut self.entity_set);
            let mut pairs = self.broadphase.pairs(&self.entity_set);
            if self.config.check_fast_bodies {
                let fast = fast_body_pairs(
                    &mut *self.broadphase,
                    &mut self.entity_set,
                    step_ms,
                    &self.config.continuous,
                    &mut stats,
                );
                for pair in fast {
                    if !pairs.iter().any(|p| p.id == pair.id) {
                        pairs.push(pair);
                    }
                }
            }
            stats.pairs += pairs.len();
            stats.broadphase_time += start.elapsed();

            for pass in 0..self.config.collision_passes {
                let start = Instant::now();
                let mut contacts = narrowphase::find_contacts(&self.entity_set, &pairs);
                stats.narrowphase_time += start.elapsed();

                let start = Instant::now();
                let events = if pass == 0 {
                    &mut self.events
                } else {
                    &mut self.scratch_events
                };
                self.solver.solve(&mut self.entity_set, &mut contacts, events);
                stats.solve_time += start.elapsed();

                if pass == 0 {
                    contacts.retain(|c| !c.canceled);
                    for contact in &contacts {
                        let record = ContactRecord {
                            id: contact.id,
                            a: contact.body_a,
                            b: contact.body_b,
                            mtv: contact.mtv,
                        };
                        match current.iter_mut().find(|r| r.id == contact.id) {
                            Some(existing) => *existing = record,
                            None => current.push(record),
                        }
                    }
                    self.contacts = contacts;
                }
            }
            self.scratch_events.clear();
        }

        stats.collisions = current.len();
        self.emit_start_end(current);

        for (_, body) in self.entity_set.iter_mut() {
            body.acceleration = m::Vec2::zero();
        }
        self.stats = stats;
    }

    fn integrate_bodies(&mut self, step_ms: f64, stats: &mut FrameStats) {
        let _span = tracy_span!("integrate", "integrate_bodies");
        let gravity = self.config.gravity;
        for (key, body) in self.entity_set.iter_mut() {
            if body.is_sleeping() || body.is_fixed() {
                continue;
            }
            let mut acc = body.acceleration;
            if body.is_active() && body.use_gravity {
                acc += gravity;
            }
            if let Err(err) = body.integrate(acc, step_ms) {
                log::warn!("body {key:?} was not moved: {err}");
                stats.integrate_failures += 1;
            }
        }
    }

    /// Compare this tick's contacts with the last tick's
    /// to find collisions that started or ended.
    fn emit_start_end(&mut self, current: Vec<ContactRecord>) {
        let current_ids: HashSet<PairId> = current.iter().map(|r| r.id).collect();
        let last_ids: HashSet<PairId> = self.last_contacts.iter().map(|r| r.id).collect();

        for record in current.iter().filter(|r| !last_ids.contains(&r.id)) {
            self.events
                .push_pair(EventKind::CollisionStart, record.a, record.b, record.mtv);
        }
        for record in self.last_contacts.iter().filter(|r| !current_ids.contains(&r.id)) {
            self.events
                .push_pair(EventKind::CollisionEnd, record.a, record.b, record.mtv);
            for key in [record.a, record.b] {
                if let Some(body) = self.entity_set.get_mut(key) {
                    body.wake(&self.config.bodies);
                }
            }
        }
        self.last_contacts = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Side;
    use approx::assert_relative_eq;

    fn world(solver: SolverStrategy, gravity: m::Vec2) -> PhysicsWorld {
        PhysicsWorld::new(PhysicsConfig {
            gravity,
            solver_strategy: solver,
            ..Default::default()
        })
        .unwrap()
    }

    fn count(world: &PhysicsWorld, kind: EventKind) -> usize {
        world.events().iter().filter(|e| e.kind == kind).count()
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let config = PhysicsConfig {
            collision_passes: 0,
            ..Default::default()
        };
        assert!(PhysicsWorld::new(config).is_err());

        let mut world = PhysicsWorld::default();
        let bad = PhysicsConfig {
            position_bias: 2.0,
            ..Default::default()
        };
        assert!(world.set_config(bad).is_err());
        assert_eq!(world.config().position_bias, 0.2);
    }

    #[test]
    fn gravity_accelerates_active_bodies_only() {
        let mut world = world(SolverStrategy::Arcade, m::Vec2::new(0.0, 100.0));
        let falling = world.insert_body(Body::new_active(Collider::new_circle(1.0), 1.0));
        let floating = world.insert_body(
            Body::new_active(Collider::new_circle(1.0), 1.0)
                .with_position(m::Vec2::new(50.0, 0.0))
                .with_gravity(false),
        );
        let fixed = world.insert_body(
            Body::new_fixed(Collider::new_circle(1.0)).with_position(m::Vec2::new(-50.0, 0.0)),
        );
        world.tick(100.0);

        let body = world.get_body(falling).unwrap();
        assert_relative_eq!(body.velocity.linear.y, 10.0, epsilon = 1e-9);
        assert_relative_eq!(body.pos().y, 0.5, epsilon = 1e-9);
        assert_eq!(body.acceleration, m::Vec2::zero());
        assert_eq!(world.get_body(floating).unwrap().pos().y, 0.0);
        assert_eq!(world.get_body(fixed).unwrap().pos().y, 0.0);
        assert_eq!(world.stats().frame, 1);
        assert_eq!(world.stats().bodies, 3);
    }

    #[test]
    fn collision_start_and_end_are_reported_once() {
        let mut world = world(SolverStrategy::Arcade, m::Vec2::zero());
        let a = world.insert_body(Body::new_active(Collider::new_square(10.0), 1.0));
        // passive bodies aren't pushed out, so the overlap persists between ticks
        let b = world.insert_body(
            Body::new_passive(Collider::new_square(10.0)).with_position(m::Vec2::new(9.0, 0.0)),
        );

        world.tick(16.0);
        assert_eq!(count(&world, EventKind::CollisionStart), 2);
        assert_eq!(count(&world, EventKind::PreCollision), 2);
        assert_eq!(count(&world, EventKind::CollisionEnd), 0);
        let start = world
            .events()
            .iter()
            .find(|e| e.kind == EventKind::CollisionStart && e.this == a)
            .unwrap();
        assert_eq!(start.other, b);
        assert_eq!(start.side, Side::Right);
        assert_eq!(world.get_body(a).unwrap().pos(), m::Vec2::zero());
        assert_eq!(world.contacts().len(), 1);

        world.tick(16.0);
        assert_eq!(count(&world, EventKind::CollisionStart), 0);

        world.get_body_mut(a).unwrap().transform.pos.x = -50.0;
        world.tick(16.0);
        assert_eq!(count(&world, EventKind::CollisionEnd), 2);
        assert!(world.contacts().is_empty());

        world.tick(16.0);
        assert!(world.events().is_empty());
    }

    #[test]
    fn every_collision_type_pairing_reports_events() {
        use CollisionType::*;
        let cases = [
            (Active, Active, true),
            (Active, Fixed, true),
            (Active, Passive, true),
            (Passive, Passive, true),
            (Passive, Fixed, true),
            (Fixed, Fixed, false),
            (PreventCollision, Active, false),
            (PreventCollision, Passive, false),
        ];
        for strategy in [BroadphaseStrategy::DynamicAabbTree, BroadphaseStrategy::Naive] {
            for (type_a, type_b, reported) in cases {
                let mut world = PhysicsWorld::new(PhysicsConfig {
                    broadphase_strategy: strategy,
                    ..Default::default()
                })
                .unwrap();
                world.insert_body(Body::new(Collider::new_square(10.0), type_a, 1.0));
                world.insert_body(
                    Body::new(Collider::new_square(10.0), type_b, 1.0)
                        .with_position(m::Vec2::new(9.0, 0.0)),
                );
                world.tick(16.0);
                let expected = if reported { 2 } else { 0 };
                assert_eq!(
                    count(&world, EventKind::CollisionStart),
                    expected,
                    "{strategy:?}: {type_a:?} vs {type_b:?}"
                );
            }
        }
    }

    #[test]
    fn passive_overlaps_with_fixed_and_passive_bodies() {
        let mut world = world(SolverStrategy::Realistic, m::Vec2::zero());
        let a = world.insert_body(Body::new_passive(Collider::new_square(10.0)));
        let b = world.insert_body(
            Body::new_passive(Collider::new_square(10.0)).with_position(m::Vec2::new(9.0, 0.0)),
        );
        let wall = world.insert_body(
            Body::new_fixed(Collider::new_square(10.0)).with_position(m::Vec2::new(-9.0, 0.0)),
        );
        world.tick(16.0);
        assert_eq!(world.stats().pairs, 2);
        assert_eq!(count(&world, EventKind::CollisionStart), 4);
        let mut ids: Vec<PairId> = world.contacts().iter().map(|c| c.id).collect();
        ids.sort();
        let mut expected = vec![PairId::new(a, b), PairId::new(a, wall)];
        expected.sort();
        assert_eq!(ids, expected);
        // nothing was pushed
        assert_eq!(world.get_body(a).unwrap().pos(), m::Vec2::zero());
        assert_eq!(world.get_body(b).unwrap().pos(), m::Vec2::new(9.0, 0.0));

        world.get_body_mut(b).unwrap().transform.pos.x = 100.0;
        world.tick(16.0);
        assert_eq!(count(&world, EventKind::CollisionEnd), 2);
    }

    #[test]
    fn cloned_bodies_are_tracked_separately() {
        for strategy in [BroadphaseStrategy::DynamicAabbTree, BroadphaseStrategy::Naive] {
            let mut world = PhysicsWorld::new(PhysicsConfig {
                broadphase_strategy: strategy,
                ..Default::default()
            })
            .unwrap();
            let original = world.insert_body(Body::new_fixed(Collider::new_square(10.0)));
            let copy = world
                .get_body(original)
                .unwrap()
                .clone()
                .with_position(m::Vec2::new(100.0, 0.0));
            let copy = world.insert_body(copy);
            let active = world.insert_body(
                Body::new_active(Collider::new_square(10.0), 1.0)
                    .with_position(m::Vec2::new(108.0, 0.0)),
            );
            world.tick(16.0);
            assert_eq!(world.contacts().len(), 1, "{strategy:?}");
            assert_eq!(world.contacts()[0].id, PairId::new(copy, active));
            assert!(world.get_body(original).is_some());
        }
    }

    #[test]
    fn arcade_pushes_out_of_fixed_bodies() {
        let mut world = world(SolverStrategy::Arcade, m::Vec2::zero());
        let a = world.insert_body(Body::new_active(Collider::new_square(10.0), 1.0));
        world.insert_body(
            Body::new_fixed(Collider::new_square(10.0)).with_position(m::Vec2::new(9.0, 0.0)),
        );
        world.tick(16.0);
        assert_relative_eq!(world.get_body(a).unwrap().pos().x, -1.0, epsilon = 1e-9);
        assert_eq!(count(&world, EventKind::PostCollision), 2);
    }

    #[test]
    fn resting_body_falls_asleep() {
        let mut world = world(SolverStrategy::Realistic, m::Vec2::zero());
        let ground = world.insert_body(
            Body::new_fixed(Collider::new_rect(100.0, 10.0)).with_position(m::Vec2::new(0.0, 9.5)),
        );
        let resting = world.insert_body(
            Body::new_active(Collider::new_square(10.0), 1.0).with_sleep(true),
        );
        for _ in 0..30 {
            world.tick(16.0);
        }
        let body = world.get_body(resting).unwrap();
        assert!(body.is_sleeping());
        assert_eq!(body.velocity, Velocity::default());

        // sleeping bodies ignore gravity
        let mut config = *world.config();
        config.gravity = m::Vec2::new(0.0, 100.0);
        world.set_config(config).unwrap();
        world.tick(16.0);
        assert_eq!(world.get_body(resting).unwrap().pos(), m::Vec2::zero());

        world.wake(resting);
        assert!(!world.get_body(resting).unwrap().is_sleeping());
        assert!(world.get_body(ground).is_some());
    }

    #[test]
    fn box_lands_on_ground() {
        for strategy in [BroadphaseStrategy::DynamicAabbTree, BroadphaseStrategy::Naive] {
            let mut world = PhysicsWorld::new(PhysicsConfig {
                gravity: m::Vec2::new(0.0, 400.0),
                broadphase_strategy: strategy,
                ..Default::default()
            })
            .unwrap();
            world.insert_body(
                Body::new_fixed(Collider::new_rect(200.0, 20.0))
                    .with_position(m::Vec2::new(0.0, 100.0)),
            );
            let falling = world.insert_body(Body::new_active(Collider::new_square(10.0), 1.0));
            for _ in 0..120 {
                world.tick(16.0);
            }
            let body = world.get_body(falling).unwrap();
            // ground top is at y = 90
            assert!((body.pos().y - 85.0).abs() < 0.5, "{strategy:?}: {:?}", body.pos());
            assert_eq!(world.stats().collisions, 1);
        }
    }

    #[test]
    fn nan_velocity_is_refused() {
        let mut world = PhysicsWorld::default();
        let key = world.insert_body(
            Body::new_active(Collider::new_circle(1.0), 1.0)
                .with_position(m::Vec2::new(3.0, 4.0))
                .with_velocity(Velocity {
                    linear: m::Vec2::new(f64::NAN, 0.0),
                    angular: 0.0,
                }),
        );
        world.tick(16.0);
        assert_eq!(world.stats().integrate_failures, 1);
        assert_eq!(world.get_body(key).unwrap().pos(), m::Vec2::new(3.0, 4.0));
    }

    #[test]
    fn queries_find_bodies() {
        let mut world = PhysicsWorld::default();
        let near = world.insert_body(
            Body::new_fixed(Collider::new_square(10.0)).with_position(m::Vec2::new(20.0, 0.0)),
        );
        let far = world.insert_body(
            Body::new_fixed(Collider::new_square(10.0)).with_position(m::Vec2::new(60.0, 0.0)),
        );
        world.insert_body(
            Body::new_fixed(Collider::new_square(10.0)).with_position(m::Vec2::new(0.0, 60.0)),
        );

        let hit = world
            .ray_cast(Ray::new(m::Vec2::zero(), m::Unit::unit_x()), 100.0)
            .unwrap();
        assert_eq!(hit.body, near);
        assert_relative_eq!(hit.t, 15.0, epsilon = 1e-9);
        assert!(world
            .ray_cast(Ray::new(m::Vec2::zero(), m::Unit::unit_x()), 10.0)
            .is_none());

        let mut found = world.query_aabb(AABB::from_sides(50.0, -10.0, 70.0, 10.0));
        found.sort_by_key(|k| k.index().to_bits());
        assert_eq!(found, vec![far]);
    }

    #[test]
    fn removed_bodies_stop_colliding() {
        let mut world = PhysicsWorld::default();
        let a = world.insert_body(Body::new_active(Collider::new_circle(10.0), 1.0));
        let b = world.insert_body(
            Body::new_active(Collider::new_circle(10.0), 1.0).with_position(m::Vec2::new(5.0, 0.0)),
        );
        assert!(world.remove_body(b).is_some());
        assert!(world.remove_body(b).is_none());
        world.tick(16.0);
        assert!(world.contacts().is_empty());
        assert_eq!(world.get_body(a).unwrap().pos(), m::Vec2::zero());

        world.clear();
        assert!(world.bodies().is_empty());
    }
}

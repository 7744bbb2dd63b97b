//! Broad phase collision detection algorithms
//! are responsible for detecting pairs of possibly intersecting objects
//! for further, more accurate narrow phase inspection.

use super::{ray_aabb, DynamicTree, Pair, PairId, Ray, AABB};
use crate::{
    math::{self as m, Unit},
    physics::{config::ContinuousConfig, Body, BodyKey, EntitySet, FrameStats},
};

use itertools::Itertools;
use std::collections::HashSet;

/// A broad phase algorithm.
pub trait BroadPhase {
    /// Start considering a body for collisions.
    fn track(&mut self, key: BodyKey, body: &mut Body);

    /// Stop considering a body for collisions.
    fn untrack(&mut self, key: BodyKey, body: &mut Body);

    /// Refresh the broad phase's knowledge of where a body is.
    /// Returns true if internal structures had to change.
    fn update_body(&mut self, key: BodyKey, body: &mut Body) -> bool;

    /// Call `callback` for every tracked body that may overlap the box,
    /// until it returns true.
    fn query(
        &mut self,
        bodies: &EntitySet,
        aabb: AABB,
        callback: &mut dyn FnMut(BodyKey) -> bool,
    );

    /// Call `callback` for every tracked body the ray may hit within `max_distance`,
    /// until it returns true.
    fn ray_cast_query(
        &mut self,
        bodies: &EntitySet,
        ray: Ray,
        max_distance: f64,
        callback: &mut dyn FnMut(BodyKey) -> bool,
    );

    /// Returns pairs of potentially intersecting bodies.
    fn pairs(&mut self, bodies: &EntitySet) -> Vec<Pair>;

    /// Forget every tracked body.
    fn clear(&mut self, bodies: &mut EntitySet);

    /// Update every tracked body, returning how many needed changes.
    fn update(&mut self, bodies: &mut EntitySet) -> usize {
        let _span = tracy_span!("update broad phase", "update");
        bodies
            .iter_mut()
            .map(|(key, body)| self.update_body(key, body))
            .filter(|moved| *moved)
            .count()
    }
}

//
// Naive
//

/// The simplest possible broad phase algorithm,
/// which pairs every object with every other object.
/// Very inefficient, but can work for small systems.
#[derive(Clone, Debug, Default)]
pub struct NaiveBroadPhase {
    tracked: Vec<BodyKey>,
}

impl NaiveBroadPhase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BroadPhase for NaiveBroadPhase {
    fn track(&mut self, key: BodyKey, _body: &mut Body) {
        if !self.tracked.contains(&key) {
            self.tracked.push(key);
        }
    }

    fn untrack(&mut self, key: BodyKey, _body: &mut Body) {
        self.tracked.retain(|k| *k != key);
    }

    fn update_body(&mut self, _key: BodyKey, _body: &mut Body) -> bool {
        false
    }

    fn query(
        &mut self,
        bodies: &EntitySet,
        aabb: AABB,
        callback: &mut dyn FnMut(BodyKey) -> bool,
    ) {
        for key in &self.tracked {
            let Some(body) = bodies.get(*key) else { continue };
            if body.bounds().overlaps(&aabb, 0.0) && callback(*key) {
                return;
            }
        }
    }

    fn ray_cast_query(
        &mut self,
        bodies: &EntitySet,
        ray: Ray,
        max_distance: f64,
        callback: &mut dyn FnMut(BodyKey) -> bool,
    ) {
        for key in &self.tracked {
            let Some(body) = bodies.get(*key) else { continue };
            let hit = ray_aabb(ray, body.bounds());
            if matches!(hit, Some(t) if t <= max_distance) && callback(*key) {
                return;
            }
        }
    }

    fn pairs(&mut self, bodies: &EntitySet) -> Vec<Pair> {
        let _span = tracy_span!("naive pairs", "pairs");

        let tracked: Vec<(BodyKey, &Body, AABB)> = self
            .tracked
            .iter()
            .filter_map(|key| bodies.get(*key).map(|b| (*key, b, b.bounds())))
            .collect();

        let mut seen: HashSet<PairId> = HashSet::new();
        tracked
            .iter()
            .tuple_combinations()
            .filter(|((key_a, a, bounds_a), (key_b, b, bounds_b))| {
                Pair::can_collide(*key_a, a, *key_b, b) && bounds_a.overlaps(bounds_b, 0.0)
            })
            .map(|((key_a, ..), (key_b, ..))| Pair::new(*key_a, *key_b))
            .filter(|pair| seen.insert(pair.id))
            .collect()
    }

    fn clear(&mut self, _bodies: &mut EntitySet) {
        self.tracked.clear();
    }
}

//
// Dynamic tree
//

impl BroadPhase for DynamicTree {
    fn track(&mut self, key: BodyKey, body: &mut Body) {
        DynamicTree::track(self, key, body);
    }

    fn untrack(&mut self, _key: BodyKey, body: &mut Body) {
        DynamicTree::untrack(self, body);
    }

    fn update_body(&mut self, key: BodyKey, body: &mut Body) -> bool {
        DynamicTree::update_body(self, key, body)
    }

    fn query(
        &mut self,
        _bodies: &EntitySet,
        aabb: AABB,
        callback: &mut dyn FnMut(BodyKey) -> bool,
    ) {
        DynamicTree::query(self, aabb, None, callback);
    }

    fn ray_cast_query(
        &mut self,
        _bodies: &EntitySet,
        ray: Ray,
        max_distance: f64,
        callback: &mut dyn FnMut(BodyKey) -> bool,
    ) {
        DynamicTree::ray_cast_query(self, ray, max_distance, callback);
    }

    fn pairs(&mut self, bodies: &EntitySet) -> Vec<Pair> {
        DynamicTree::pairs(self, bodies)
    }

    fn clear(&mut self, bodies: &mut EntitySet) {
        DynamicTree::clear(self);
        for (_, body) in bodies.iter_mut() {
            body.proxy = None;
        }
    }
}

//
// Fast bodies
//

/// A fast body found to hit something during the last step.
#[derive(Clone, Copy, Debug)]
struct FastHit {
    body: BodyKey,
    other: BodyKey,
    /// Where the body's center ends up, just inside the surface it hit.
    new_center: m::Vec2,
}

/// Catch Active bodies that moved far enough in one step to pass through others.
///
/// A ray is cast from where the body's leading point was at the start of the step
/// along its velocity. If it hits something within the distance travelled,
/// the body is moved back to the point of impact and the pair is returned
/// so the narrow phase and solver can handle it.
pub fn fast_body_pairs(
    broadphase: &mut dyn BroadPhase,
    bodies: &mut EntitySet,
    elapsed_ms: f64,
    cfg: &ContinuousConfig,
    stats: &mut FrameStats,
) -> Vec<Pair> {
    let _span = tracy_span!("fast bodies", "fast_body_pairs");

    let seconds = elapsed_ms / 1000.0;
    let eps = cfg.surface_epsilon;
    let mut hits = Vec::new();

    for (key, body) in bodies.iter() {
        if !body.is_active() || body.is_sleeping() {
            continue;
        }
        let travel = body.velocity.linear.mag() * seconds
            + body.acceleration.mag() * 0.5 * seconds * seconds;
        let shape = body.shape();
        if !cfg.disable_minimum_speed_for_fast_body && travel <= shape.min_dimension() / 2.0 {
            continue;
        }
        let Some(dir) = Unit::try_new(body.velocity.linear) else { continue };
        stats.fast_bodies += 1;

        // start from the leading point as it was before this step's motion
        let furthest = shape.furthest_point(*dir);
        let origin = furthest - (body.pos() - body.old_pos);
        let ray = Ray::new(origin - *dir * (2.0 * eps), dir);

        let mut candidates = Vec::new();
        broadphase.ray_cast_query(bodies, ray, travel + 2.0 * eps, &mut |other| {
            candidates.push(other);
            false
        });

        let nearest = candidates
            .into_iter()
            .filter_map(|other_key| {
                let other = bodies.get(other_key)?;
                if !Pair::can_collide(key, body, other_key, other) {
                    return None;
                }
                let t = other.shape().ray_cast(ray, travel + 10.0 * eps)?;
                Some((other_key, t))
            })
            .min_by(|(_, t1), (_, t2)| t1.total_cmp(t2));

        if let Some((other, t)) = nearest {
            let point = ray.point_at(t);
            let translate = point - origin;
            let shift = shape.center() - furthest;
            hits.push(FastHit {
                body: key,
                other,
                new_center: origin + shift + translate + *dir * (10.0 * eps),
            });
        }
    }

    let mut pairs = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(body) = bodies.get_mut(hit.body) else { continue };
        let center = body.shape().center();
        body.transform.pos += hit.new_center - center;
        log::debug!(
            "fast body {:?} hit {:?}, moved to {:?}",
            hit.body,
            hit.other,
            body.transform.pos
        );
        stats.fast_body_collisions += 1;
        pairs.push(Pair::new(hit.body, hit.other));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{config::DynamicTreeConfig, Collider, Velocity};
    use rand::{Rng, SeedableRng};

    fn random_scene(rng: &mut rand::rngs::StdRng, count: usize) -> EntitySet {
        let mut bodies = EntitySet::new();
        for i in 0..count {
            let pos = m::Vec2::new(rng.gen_range(0.0..500.0), rng.gen_range(0.0..500.0));
            let collider = if rng.gen_bool(0.5) {
                Collider::new_circle(rng.gen_range(2.0..30.0))
            } else {
                Collider::new_rect(rng.gen_range(2.0..40.0), rng.gen_range(2.0..40.0))
            };
            let body = if i % 4 == 0 {
                Body::new_fixed(collider)
            } else {
                Body::new_active(collider, 1.0)
            };
            bodies.insert(body.with_position(pos));
        }
        bodies
    }

    fn sorted_ids(pairs: &[Pair]) -> Vec<PairId> {
        let mut ids: Vec<PairId> = pairs.iter().map(|p| p.id).collect();
        ids.sort();
        ids
    }

    fn track_all(bp: &mut dyn BroadPhase, bodies: &mut EntitySet) {
        for (key, body) in bodies.iter_mut() {
            bp.track(key, body);
        }
    }

    #[test]
    fn tree_and_naive_agree_on_random_scenes() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..5 {
            let mut bodies = random_scene(&mut rng, 80);
            let mut naive = NaiveBroadPhase::new();
            let mut tree = DynamicTree::new(DynamicTreeConfig::default(), None);
            track_all(&mut naive, &mut bodies);
            track_all(&mut tree, &mut bodies);

            let naive_pairs = BroadPhase::pairs(&mut naive, &bodies);
            let tree_pairs = BroadPhase::pairs(&mut tree, &bodies);
            assert!(!naive_pairs.is_empty());
            assert_eq!(sorted_ids(&naive_pairs), sorted_ids(&tree_pairs));
        }
    }

    #[test]
    fn updating_twice_is_idempotent() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let mut bodies = random_scene(&mut rng, 40);
        let mut tree = DynamicTree::new(DynamicTreeConfig::default(), None);
        track_all(&mut tree, &mut bodies);

        for (_, body) in bodies.iter_mut() {
            body.transform.pos += m::Vec2::new(25.0, -10.0);
        }
        let first = BroadPhase::update(&mut tree, &mut bodies);
        assert!(first > 0);
        let pairs_after_first = sorted_ids(&BroadPhase::pairs(&mut tree, &bodies));
        assert_eq!(BroadPhase::update(&mut tree, &mut bodies), 0);
        assert_eq!(
            sorted_ids(&BroadPhase::pairs(&mut tree, &bodies)),
            pairs_after_first
        );
    }

    #[test]
    fn fixed_pairs_are_filtered() {
        let mut bodies = EntitySet::new();
        let f1 = bodies.insert(Body::new_fixed(Collider::new_square(10.0)));
        let f2 = bodies.insert(
            Body::new_fixed(Collider::new_square(10.0)).with_position(m::Vec2::new(5.0, 0.0)),
        );
        let mut naive = NaiveBroadPhase::new();
        track_all(&mut naive, &mut bodies);
        assert!(naive.pairs(&bodies).is_empty());

        let a = bodies.insert(
            Body::new_active(Collider::new_square(10.0), 1.0).with_position(m::Vec2::new(2.0, 0.0)),
        );
        naive.track(a, bodies.get_mut(a).unwrap());
        let ids = sorted_ids(&naive.pairs(&bodies));
        let mut expected = vec![PairId::new(a, f1), PairId::new(a, f2)];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn fast_body_is_stopped_at_wall() {
        let mut bodies = EntitySet::new();
        let mut tree = DynamicTree::new(DynamicTreeConfig::default(), None);
        let wall = bodies.insert(
            Body::new_fixed(Collider::new_rect(10.0, 200.0)).with_position(m::Vec2::new(100.0, 0.0)),
        );
        // a bullet that moved from x = 0 to x = 200 in one 100ms step
        let mut bullet = Body::new_active(Collider::new_circle(2.0), 1.0).with_velocity(Velocity {
            linear: m::Vec2::new(2000.0, 0.0),
            angular: 0.0,
        });
        bullet.transform.pos = m::Vec2::new(200.0, 0.0);
        bullet.old_pos = m::Vec2::zero();
        let bullet = bodies.insert(bullet);
        track_all(&mut tree, &mut bodies);

        let mut stats = FrameStats::default();
        let pairs = fast_body_pairs(
            &mut tree,
            &mut bodies,
            100.0,
            &ContinuousConfig::default(),
            &mut stats,
        );
        assert_eq!(pairs, vec![Pair::new(bullet, wall)]);
        assert_eq!(stats.fast_bodies, 1);
        assert_eq!(stats.fast_body_collisions, 1);
        // leading point pushed just past the wall's surface at x = 95
        let pos = bodies.get(bullet).unwrap().pos();
        assert!((pos.x - (95.0 - 2.0 + 1.0)).abs() < 1e-9, "{pos:?}");
    }
}

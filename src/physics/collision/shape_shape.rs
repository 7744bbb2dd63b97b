//! Intersection tests between pairs of world-space shapes.
//!
//! Every test is written for one canonical order of shape kinds
//! (circle, then polygon, then edge). Calls in the opposite order
//! are dispatched to the same test and the result is flipped.

use super::{
    contact::{ContactPoints, Manifold},
    Shape,
};
use crate::math::{self as m, Unit};

/// Overlaps shallower than this are not considered collisions.
pub const OVERLAP_EPSILON: f64 = 1e-4;

/// How much deeper the second polygon's best face must be
/// before it is picked as the reference face instead of the first one's.
const REFERENCE_FACE_TOLERANCE: f64 = 5e-4;

/// Checks two shapes for intersection.
///
/// The returned normal points away from `a`.
/// Degenerate shapes never collide.
pub fn collide(a: &Shape, b: &Shape) -> Option<Manifold> {
    if a.is_degenerate() || b.is_degenerate() {
        log::warn!(
            "skipping collision test between {:?} and {:?}, one of them is degenerate",
            a.kind(),
            b.kind()
        );
        return None;
    }

    use Shape::*;
    let manifold = match (a, b) {
        (Composite(children), _) => deepest(children.iter().filter_map(|child| collide(child, b))),
        (_, Composite(children)) => deepest(children.iter().filter_map(|child| collide(a, child))),
        (
            Circle {
                center: c1,
                r: r1,
            },
            Circle {
                center: c2,
                r: r2,
            },
        ) => circle_circle(*c1, *r1, *c2, *r2),
        (Circle { center, r }, Polygon { points }) => circle_polygon(*center, *r, points),
        (Polygon { points }, Circle { center, r }) => {
            circle_polygon(*center, *r, points).map(Manifold::flipped)
        }
        (Circle { center, r }, Edge { begin, end }) => circle_edge(*center, *r, *begin, *end),
        (Edge { begin, end }, Circle { center, r }) => {
            circle_edge(*center, *r, *begin, *end).map(Manifold::flipped)
        }
        (Polygon { points: p1 }, Polygon { points: p2 }) => polygon_polygon(p1, p2),
        (Polygon { points }, Edge { begin, end }) => polygon_polygon(points, &[*begin, *end]),
        (Edge { begin, end }, Polygon { points }) => {
            polygon_polygon(points, &[*begin, *end]).map(Manifold::flipped)
        }
        (
            Edge {
                begin: b1,
                end: e1,
            },
            Edge {
                begin: b2,
                end: e2,
            },
        ) => polygon_polygon(&[*b1, *e1], &[*b2, *e2]),
    };
    manifold.filter(|mf| mf.depth > OVERLAP_EPSILON)
}

/// Pick the deepest of several manifolds. The first one wins ties.
fn deepest(manifolds: impl Iterator<Item = Manifold>) -> Option<Manifold> {
    manifolds.fold(None, |best, mf| match best {
        Some(best) if best.depth >= mf.depth => Some(best),
        _ => Some(mf),
    })
}

//
// CIRCLE <-> CIRCLE
//

fn circle_circle(c1: m::Vec2, r1: f64, c2: m::Vec2, r2: f64) -> Option<Manifold> {
    let dist = c2 - c1;
    let dist_mag = dist.mag();
    let r_sum = r1 + r2;
    if dist_mag >= r_sum {
        return None;
    }

    let normal = if dist_mag < f64::EPSILON {
        // same position, consider penetration to be on x axis
        Unit::unit_x()
    } else {
        Unit::new_unchecked(dist / dist_mag)
    };

    Some(Manifold {
        normal,
        depth: r_sum - dist_mag,
        points: ContactPoints::One([c1 + *normal * r1, c2 - *normal * r2]),
    })
}

//
// CIRCLE <-> POLYGON
//

fn circle_polygon(center: m::Vec2, r: f64, points: &[m::Vec2]) -> Option<Manifold> {
    // the polygon's face normals plus the axis towards the closest vertex
    // are the only axes that can separate a circle from a polygon
    let closest = points
        .iter()
        .copied()
        .min_by(|p1, p2| (*p1 - center).mag_sq().total_cmp(&(*p2 - center).mag_sq()))?;
    let n = points.len();
    let axes = (0..n)
        .filter_map(|i| Unit::try_new(m::right_normal(points[(i + 1) % n] - points[i])))
        .chain(Unit::try_new(center - closest));

    let mut best: Option<(f64, Unit<m::Vec2>)> = None;
    for axis in axes {
        let poly_proj = m::Projection::of_points(points.iter().copied(), *axis)?;
        let c = center.dot(*axis);
        let circle_proj = m::Projection::new(c - r, c + r);
        if !poly_proj.overlaps(&circle_proj) {
            return None;
        }
        let overlap = poly_proj.overlap(&circle_proj);
        if best.map_or(true, |(depth, _)| overlap < depth) {
            best = Some((overlap, axis));
        }
    }
    let (depth, axis) = best?;

    // orient from the circle towards the polygon
    let poly_center = points.iter().fold(m::Vec2::zero(), |acc, p| acc + *p) / n as f64;
    let normal = if (poly_center - center).dot(*axis) < 0.0 {
        -axis
    } else {
        axis
    };

    let on_circle = center + *normal * r;
    Some(Manifold {
        normal,
        depth,
        points: ContactPoints::One([on_circle, on_circle - *normal * depth]),
    })
}

//
// CIRCLE <-> EDGE
//

fn circle_edge(center: m::Vec2, r: f64, begin: m::Vec2, end: m::Vec2) -> Option<Manifold> {
    let e = end - begin;
    let u = e.dot(end - center);
    let v = e.dot(center - begin);

    // find the voronoi region of the edge the circle center is in
    let closest = if v <= 0.0 {
        begin
    } else if u <= 0.0 {
        end
    } else {
        begin + e * (v / e.mag_sq())
    };

    let to_closest = closest - center;
    let dist = to_closest.mag();
    if dist >= r {
        return None;
    }

    let normal = match Unit::try_new(to_closest) {
        Some(n) => n,
        // center exactly on the edge, push out along the edge normal
        None => Unit::try_new(m::right_normal(e))?,
    };

    Some(Manifold {
        normal,
        depth: r - dist,
        points: ContactPoints::One([center + *normal * r, closest]),
    })
}

//
// POLYGON <-> POLYGON
//

// Edges are handled as polygons with two points,
// which have two faces pointing in opposite directions.

/// Outward unit normal of the face starting at vertex `i`.
fn face_normal(points: &[m::Vec2], i: usize) -> Option<Unit<m::Vec2>> {
    let next = points[(i + 1) % points.len()];
    Unit::try_new(m::right_normal(next - points[i]))
}

/// Find the face of `poly1` that `poly2` is furthest in front of.
/// Returns the separation (negative when overlapping) and the face index.
fn max_separation(poly1: &[m::Vec2], poly2: &[m::Vec2]) -> Option<(f64, usize)> {
    let mut best: Option<(f64, usize)> = None;
    for i in 0..poly1.len() {
        let Some(normal) = face_normal(poly1, i) else { continue };
        let v1 = poly1[i];
        let sep = poly2
            .iter()
            .map(|v2| normal.dot(*v2 - v1))
            .fold(f64::INFINITY, f64::min);
        if best.map_or(true, |(best_sep, _)| sep > best_sep) {
            best = Some((sep, i));
        }
    }
    best
}

/// Clip a segment to the half-plane `normal . x <= offset`.
fn clip_segment_to_line(v: [m::Vec2; 2], normal: m::Vec2, offset: f64) -> Option<[m::Vec2; 2]> {
    let d0 = normal.dot(v[0]) - offset;
    let d1 = normal.dot(v[1]) - offset;
    match (d0 <= 0.0, d1 <= 0.0) {
        (true, true) => Some(v),
        (false, false) => None,
        (inside_0, _) => {
            let cut = v[0] + (v[1] - v[0]) * (d0 / (d0 - d1));
            Some(if inside_0 { [v[0], cut] } else { [cut, v[1]] })
        }
    }
}

fn polygon_polygon(poly_a: &[m::Vec2], poly_b: &[m::Vec2]) -> Option<Manifold> {
    let (sep_a, face_a) = max_separation(poly_a, poly_b)?;
    if sep_a > 0.0 {
        return None;
    }
    let (sep_b, face_b) = max_separation(poly_b, poly_a)?;
    if sep_b > 0.0 {
        return None;
    }

    // reference face is on the polygon with the shallowest penetration,
    // preferring A unless B is clearly better
    let flip = sep_b > sep_a + REFERENCE_FACE_TOLERANCE;
    let (reference, incident, face, sep) = if flip {
        (poly_b, poly_a, face_b, sep_b)
    } else {
        (poly_a, poly_b, face_a, sep_a)
    };

    let v1 = reference[face];
    let v2 = reference[(face + 1) % reference.len()];
    let tangent = Unit::try_new(v2 - v1)?;
    let ref_normal = m::unit_right_normal(tangent);

    // incident face is the one most opposed to the reference normal
    let incident_face = (0..incident.len())
        .filter_map(|i| face_normal(incident, i).map(|n| (i, n.dot(*ref_normal))))
        .min_by(|(_, d1), (_, d2)| d1.total_cmp(d2))
        .map(|(i, _)| i)?;
    let incident_edge = [
        incident[incident_face],
        incident[(incident_face + 1) % incident.len()],
    ];

    let front_offset = ref_normal.dot(v1);
    let separation_of = |p: m::Vec2| ref_normal.dot(p) - front_offset;

    let clipped = clip_segment_to_line(incident_edge, -*tangent, -tangent.dot(v1))
        .and_then(|edge| clip_segment_to_line(edge, *tangent, tangent.dot(v2)));
    let mut points: Vec<m::Vec2> = clipped
        .map(|edge| edge.into_iter().filter(|p| separation_of(*p) <= 0.0).collect())
        .unwrap_or_default();
    if points.is_empty() {
        // clipping can miss when only a corner pokes through,
        // fall back to the deepest incident vertex
        let deepest = incident_edge
            .into_iter()
            .min_by(|p1, p2| separation_of(*p1).total_cmp(&separation_of(*p2)))?;
        if separation_of(deepest) > 0.0 {
            return None;
        }
        points.push(deepest);
    }

    // each point is on the incident polygon,
    // its partner on the reference face is found by projecting it there
    let surface_pair = |p: m::Vec2| {
        let on_reference = p - *ref_normal * separation_of(p);
        if flip {
            [p, on_reference]
        } else {
            [on_reference, p]
        }
    };
    let points = match points.as_slice() {
        [p] => ContactPoints::One(surface_pair(*p)),
        [p1, p2, ..] => ContactPoints::Two(surface_pair(*p1), surface_pair(*p2)),
        [] => return None,
    };

    Some(Manifold {
        normal: if flip { -ref_normal } else { ref_normal },
        depth: -sep,
        points,
    })
}

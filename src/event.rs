use crate::{math::Vec2, physics::BodyKey};

/// The side of a body that another body touched.
///
/// Uses screen coordinates: `Top` is towards negative y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    None,
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    /// The side facing most in the given direction.
    /// Horizontal sides win ties, and a zero vector maps to `Left`.
    pub fn from_direction(dir: Vec2) -> Self {
        let candidates = [
            (Vec2::new(-1.0, 0.0), Side::Left),
            (Vec2::new(1.0, 0.0), Side::Right),
            (Vec2::new(0.0, -1.0), Side::Top),
            (Vec2::new(0.0, 1.0), Side::Bottom),
        ];
        let mut best = (f64::MIN, Side::None);
        for (axis, side) in candidates {
            let d = axis.dot(dir);
            if d > best.0 {
                best = (d, side);
            }
        }
        best.1
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::None => Side::None,
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// True for `Left` and `Right`.
    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Emitted by the solver for every contact before it is resolved.
    PreCollision,
    /// Emitted by the solver after a contact has been resolved.
    PostCollision,
    /// Two bodies that were not touching last frame are touching now.
    CollisionStart,
    /// Two bodies that were touching last frame are no longer touching.
    CollisionEnd,
}

/// Events produced by the physics system when two bodies collide,
/// as seen from the point of view of `this`.
#[derive(Clone, Copy, Debug)]
pub struct CollisionEvent {
    pub kind: EventKind,
    pub this: BodyKey,
    pub other: BodyKey,
    /// The side of `this` that `other` touched.
    pub side: Side,
    /// The translation that moves `this` out of `other`.
    pub intersection: Vec2,
}

/// Gathers the events produced during physics ticks until they are drained.
#[derive(Debug, Default)]
pub struct EventSink {
    pub(self) events: Vec<CollisionEvent>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, evt: CollisionEvent) {
        self.events.push(evt);
    }

    /// Push an event for both participants of a contact.
    ///
    /// `mtv` points from `a` towards `b`, in the direction `b` must move to separate.
    pub fn push_pair(&mut self, kind: EventKind, a: BodyKey, b: BodyKey, mtv: Vec2) {
        let side = Side::from_direction(mtv);
        self.events.push(CollisionEvent {
            kind,
            this: a,
            other: b,
            side,
            intersection: -mtv,
        });
        self.events.push(CollisionEvent {
            kind,
            this: b,
            other: a,
            side: side.opposite(),
            intersection: mtv,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.events.iter()
    }

    /// Remove and return every event gathered so far.
    pub fn drain(&mut self) -> impl Iterator<Item = CollisionEvent> + '_ {
        self.events.drain(..)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

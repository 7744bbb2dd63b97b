use super::Body;

use thunderdome as td;

/// Key type to look up a body stored in the physics world.
///
/// When using a [`hecs`][crate::hecs] World, this type should be stored
/// in the world instead of [`Body`][super::Body].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyKey(pub(crate) td::Index);

impl BodyKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    /// Useful for creating your own mappings from bodies to other things
    /// such as [`hecs`][hecs] entities.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }

    /// A value uniquely identifying this key, stable for the lifetime of the body.
    #[inline]
    pub(crate) fn to_bits(self) -> u64 {
        self.0.to_bits()
    }
}

/// Storage for every body in the physics world.
#[derive(Default)]
pub struct EntitySet {
    pub(crate) bodies: td::Arena<Body>,
}

impl EntitySet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Access a [`Body`][super::Body] in the physics world, if it still exists.
    #[inline]
    pub fn get(&self, body: BodyKey) -> Option<&Body> {
        self.bodies.get(body.0)
    }

    /// Mutably access a [`Body`][super::Body] in the physics world, if it still exists.
    #[inline]
    pub fn get_mut(&mut self, body: BodyKey) -> Option<&mut Body> {
        self.bodies.get_mut(body.0)
    }

    /// Mutably access two different bodies at once.
    ///
    /// Returns None for either body that doesn't exist,
    /// and for both if the keys are the same.
    #[inline]
    pub fn get2_mut(
        &mut self,
        a: BodyKey,
        b: BodyKey,
    ) -> (Option<&mut Body>, Option<&mut Body>) {
        if a == b {
            return (None, None);
        }
        self.bodies.get2_mut(a.0, b.0)
    }

    #[inline]
    pub fn contains(&self, body: BodyKey) -> bool {
        self.bodies.contains(body.0)
    }

    pub fn insert(&mut self, body: Body) -> BodyKey {
        BodyKey(self.bodies.insert(body))
    }

    /// Remove a [`Body`][super::Body] from the set, returning it if it still existed.
    #[inline]
    pub fn remove(&mut self, body: BodyKey) -> Option<Body> {
        self.bodies.remove(body.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyKey, &Body)> {
        self.bodies.iter().map(|(k, b)| (BodyKey(k), b))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyKey, &mut Body)> {
        self.bodies.iter_mut().map(|(k, b)| (BodyKey(k), b))
    }

    pub fn keys(&self) -> impl Iterator<Item = BodyKey> + '_ {
        self.bodies.iter().map(|(k, _)| BodyKey(k))
    }

    // not exposed to users, must use through PhysicsWorld::clear
    pub(super) fn clear(&mut self) {
        self.bodies.clear();
    }
}

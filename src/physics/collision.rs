//! Collision detection: shapes, broad phase, narrow phase and contacts.

mod aabb;
pub use aabb::{ray_aabb, Ray, AABB};

mod collider;
pub use collider::{Collider, ColliderShape, Polygon, Shape, ShapeError, ShapeKind};

mod contact;
pub use contact::{Contact, ContactPoint, ContactPointIter, ContactPoints, Manifold, Pair, PairId};

pub mod shape_shape;

pub mod narrowphase;

pub mod dynamic_tree;
pub use dynamic_tree::DynamicTree;

pub mod broadphase;
pub use broadphase::{BroadPhase, NaiveBroadPhase};

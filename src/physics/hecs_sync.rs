//! Mirroring bodies from a [`hecs`] world.
//!
//! An entity with a [`Transform`][m::Transform] and a [`Collider`] component
//! gets a body of its own the first time it is synced. The body's [`BodyKey`]
//! is then attached to the entity as another component.
//! Optional [`CollisionType`], [`Velocity`], [`SurfaceMaterial`] and
//! [`CollisionGroup`] components set up the body and are kept in sync with it.

use crate::{
    math as m,
    physics::{
        Body, BodyKey, Collider, CollisionGroup, CollisionType, PhysicsWorld, SurfaceMaterial,
        Velocity,
    },
};

use thunderdome as td;

/// Which way data flows between an entity and its body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// The entity sets up the body and the body's motion is written back to the entity.
    #[default]
    Both,
    /// Components are copied into the body every frame, nothing is written back.
    /// Useful for bodies moved by game logic, like moving platforms.
    ToPhysics,
    /// The body is the only source of truth after creation.
    FromPhysics,
}

impl SyncMode {
    #[inline]
    fn to_physics(self) -> bool {
        matches!(self, SyncMode::Both | SyncMode::ToPhysics)
    }

    #[inline]
    fn from_physics(self) -> bool {
        matches!(self, SyncMode::Both | SyncMode::FromPhysics)
    }
}

#[derive(Clone, Copy, Debug)]
struct Link {
    entity: hecs::Entity,
    mode: SyncMode,
    /// Bodies created by the manager are removed along with their entity.
    owned: bool,
}

/// Keeps a [`PhysicsWorld`] in sync with the entities of a [`hecs::World`].
#[derive(Default, Debug)]
pub struct HecsSyncManager {
    /// Mode used for bodies created from entities
    /// and for entities found with an unregistered [`BodyKey`].
    pub default_mode: SyncMode,
    links: td::Arena<Link>,
}

impl HecsSyncManager {
    #[inline]
    pub fn new(default_mode: SyncMode) -> Self {
        Self {
            default_mode,
            links: td::Arena::new(),
        }
    }

    /// Link a body that was inserted by hand to an entity.
    /// The body stays in the physics world if the entity is despawned.
    pub fn link(&mut self, body: BodyKey, entity: hecs::Entity, mode: SyncMode) {
        self.links.insert_at(
            body.0,
            Link {
                entity,
                mode,
                owned: false,
            },
        );
    }

    /// Stop syncing a body, returning the entity it was linked to.
    pub fn unlink(&mut self, body: BodyKey) -> Option<hecs::Entity> {
        self.links.remove(body.0).map(|link| link.entity)
    }

    #[inline]
    pub fn entity_of(&self, body: BodyKey) -> Option<hecs::Entity> {
        self.links.get(body.0).map(|link| link.entity)
    }

    /// Number of bodies currently linked to an entity.
    #[inline]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Create bodies for new entities, drop bodies of despawned ones
    /// and copy entity state into the remaining bodies.
    /// Call before [`PhysicsWorld::tick`].
    pub fn sync_hecs_to_physics(&mut self, physics: &mut PhysicsWorld, world: &mut hecs::World) {
        let _span = tracy_span!("hecs to physics", "sync_hecs_to_physics");

        self.spawn_bodies(physics, world);

        // bodies carried by entities that were never linked
        for (entity, key) in world.query_mut::<&BodyKey>() {
            if !self.links.contains(key.0) && physics.get_body(*key).is_some() {
                self.links.insert_at(
                    key.0,
                    Link {
                        entity,
                        mode: self.default_mode,
                        owned: false,
                    },
                );
            }
        }

        self.links.retain(|index, link| {
            let key = BodyKey(index);
            if !world.contains(link.entity) {
                if link.owned {
                    log::debug!("entity {:?} despawned, removing body {key:?}", link.entity);
                    physics.remove_body(key);
                }
                return false;
            }
            let Some(body) = physics.get_body_mut(key) else {
                // removed from the physics world directly
                return false;
            };
            if !link.mode.to_physics() {
                return true;
            }
            let Ok((tr, vel, ty)) = world.query_one_mut::<(
                &m::Transform,
                Option<&Velocity>,
                Option<&CollisionType>,
            )>(link.entity) else {
                return true;
            };
            body.transform = *tr;
            if let Some(vel) = vel {
                body.velocity = *vel;
            }
            if let Some(ty) = ty {
                body.collision_type = *ty;
            }
            true
        });
    }

    fn spawn_bodies(&mut self, physics: &mut PhysicsWorld, world: &mut hecs::World) {
        let mut spawned = Vec::new();
        for (entity, (tr, collider, ty, vel, material, group, key)) in world.query_mut::<(
            &m::Transform,
            &Collider,
            Option<&CollisionType>,
            Option<&Velocity>,
            Option<&SurfaceMaterial>,
            Option<&CollisionGroup>,
            Option<&BodyKey>,
        )>() {
            if key.is_some() {
                continue;
            }
            let ty = ty.copied().unwrap_or(CollisionType::Active);
            let mut body = Body::new(collider.clone(), ty, physics.config().bodies.default_mass)
                .with_transform(*tr);
            body.can_sleep = physics.config().bodies.can_sleep_by_default;
            body.use_gravity = ty != CollisionType::Fixed;
            if let Some(vel) = vel {
                body = body.with_velocity(*vel);
            }
            if let Some(material) = material {
                body.material = *material;
            }
            if let Some(group) = group {
                body.group = *group;
            }
            spawned.push((entity, body));
        }

        for (entity, body) in spawned {
            let key = physics.insert_body(body);
            if world.insert_one(entity, key).is_err() {
                physics.remove_body(key);
                continue;
            }
            self.links.insert_at(
                key.0,
                Link {
                    entity,
                    mode: self.default_mode,
                    owned: true,
                },
            );
        }
    }

    /// Write body state back to the entities.
    /// Call after [`PhysicsWorld::tick`].
    pub fn sync_physics_to_hecs(&mut self, physics: &PhysicsWorld, world: &mut hecs::World) {
        let _span = tracy_span!("physics to hecs", "sync_physics_to_hecs");

        for (index, link) in self.links.iter() {
            if !link.mode.from_physics() {
                continue;
            }
            let Some(body) = physics.get_body(BodyKey(index)) else { continue };
            let Ok((tr, vel)) =
                world.query_one_mut::<(&mut m::Transform, Option<&mut Velocity>)>(link.entity)
            else {
                continue;
            };
            *tr = body.transform;
            if let Some(vel) = vel {
                *vel = body.velocity;
            }
        }
    }
}

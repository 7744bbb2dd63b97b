/// Open a profiling span that lasts until the returned guard is dropped.
/// Does nothing unless the `tracy` feature is enabled and a client is running.
macro_rules! tracy_span {
    ($name:literal, $fn_name:literal) => {
        tracy_client::Client::running()
            .map(|client| client.span_alloc(Some($name), $fn_name, file!(), line!(), 0))
    };
}

pub mod event;
pub use event::{CollisionEvent, EventKind, EventSink, Side};

pub mod math;
pub use math::{uv, Angle, Projection, Transform, Unit, Vec2};

pub mod physics;
pub use physics::{
    body::{Body, CollisionGroup, CollisionType, DegreesOfFreedom, Mass, SurfaceMaterial},
    collision::{
        self, BroadPhase, Collider, ColliderShape, Contact, ContactPoints, Pair, PairId, Ray,
        Shape, ShapeError, AABB,
    },
    config::{
        ArcadeConfig, BodyConfig, BroadphaseStrategy, ConfigError, ContactSolveBias,
        ContinuousConfig, DynamicTreeConfig, PhysicsConfig, RealisticConfig, SolverStrategy,
    },
    hecs_sync::{HecsSyncManager, SyncMode},
    integrator::{integrate, IntegrationError, Motion},
    solver::{ArcadeSolver, CollisionSolver, RealisticSolver},
    stats::FrameStats,
    BodyKey, CastHit, EntitySet, PhysicsWorld, Velocity,
};

pub use hecs;

//! Rigid body physics behind a narrow engine contract, plus the fixed step driver.

pub mod arena;
pub mod body;
pub mod joint;
pub mod simulation;
pub mod world;

use std::sync::Arc;

use geom::{EntityId, Scene};
use na::{Isometry3, UnitQuaternion, Vector3};
use parry3d::shape::Cuboid;
use sync::PhysicsLock;

use arena::Handle;

pub use body::{BodyDesc, RigidBody};
pub use joint::{FixedJoint, JointDesc};
pub use simulation::Simulation;
pub use world::World;

pub type BodyHandle = Handle<RigidBody>;
pub type JointHandle = Handle<FixedJoint>;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("body {0:?} is stale or was never created")]
    StaleBody(BodyHandle),
    #[error("joint {0:?} is stale or was never created")]
    StaleJoint(JointHandle),
    #[error(transparent)]
    Sync(#[from] sync::SyncError),
}

pub type SimResult<T> = Result<T, SimError>;

/// Contact impulse delivered to a body during a step.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Impact {
    pub entity: EntityId,
    pub body: BodyHandle,
    pub impulse: Vector3<f32>,
}

/// What happened since the previous step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub broken_joints: Vec<JointHandle>,
    pub impacts: Vec<Impact>,
}
impl StepReport {
    pub fn is_empty(&self) -> bool {
        self.broken_joints.is_empty() && self.impacts.is_empty()
    }
}

/// Everything the destruction layer needs from a physics engine.
///
/// Bodies carry the id of the entity they belong to, and every overlap query answers in
/// those ids.
pub trait PhysicsEngine: Send + Sync + 'static {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;
    fn destroy_body(&mut self, body: BodyHandle) -> SimResult<RigidBody>;
    fn body(&self, body: BodyHandle) -> SimResult<&RigidBody>;
    fn body_mut(&mut self, body: BodyHandle) -> SimResult<&mut RigidBody>;

    fn create_joint(&mut self, desc: JointDesc, a: BodyHandle, b: BodyHandle) -> SimResult<JointHandle>;
    fn destroy_joint(&mut self, joint: JointHandle) -> SimResult<FixedJoint>;
    fn joint(&self, joint: JointHandle) -> SimResult<&FixedJoint>;
    fn joint_mut(&mut self, joint: JointHandle) -> SimResult<&mut FixedJoint>;
    fn is_joint_broken(&self, joint: JointHandle) -> SimResult<bool> {
        Ok(self.joint(joint)?.is_broken())
    }

    fn overlap_sphere(&self, center: &Vector3<f32>, radius: f32) -> Vec<EntityId>;
    fn overlap_box(
        &self,
        center: &Vector3<f32>,
        half_extents: &Vector3<f32>,
        rotation: &UnitQuaternion<f32>,
    ) -> Vec<EntityId>;

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vector3<f32>) -> SimResult<()>;
    fn step(&mut self, dt: f32) -> StepReport;
}

/// The scene plus the physics engine, threaded explicitly through every destruction call.
pub struct Stage<P = World> {
    pub scene: Scene,
    pub physics: P,
}
impl<P: PhysicsEngine> Stage<P> {
    pub fn new(physics: P) -> Self {
        Self {
            scene: Scene::new(),
            physics,
        }
    }

    pub fn into_lock(self) -> Arc<PhysicsLock<Self>> {
        Arc::new(PhysicsLock::new(self))
    }

    /// Collider box of `body` and where it sits in world space.
    pub fn collider_box(&self, body: BodyHandle) -> SimResult<(Isometry3<f32>, Cuboid)> {
        Ok(self.physics.body(body)?.collider_box())
    }
}
impl Default for Stage<World> {
    fn default() -> Self {
        Self::new(World::default())
    }
}

use std::sync::Arc;

use geom::{
    geom::{mass_properties, Bounds, MassProperties, TriMesh},
    AffineTransform, EntityId,
};
use na::{Isometry3, Matrix3, Translation3, Vector3};
use parry3d::shape::Cuboid;

use crate::JointHandle;

pub struct BodyDesc {
    pub transform: AffineTransform,
    pub collider: Arc<TriMesh>,
    pub mass: f32,
    pub kinematic: bool,
    pub frozen: bool,
    pub user_data: EntityId,
}

/// Solver iteration counts, position first.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SolverIterations {
    pub position: u32,
    pub velocity: u32,
}
impl Default for SolverIterations {
    fn default() -> Self {
        Self {
            position: 4,
            velocity: 1,
        }
    }
}

pub struct RigidBody {
    user_data: EntityId,
    pose: AffineTransform,
    collider: Arc<TriMesh>,
    local_bounds: Bounds,
    /// Shape of the collider at unit density.
    unit_props: MassProperties,

    mass: f32,
    inertia: Matrix3<f32>,
    cmass_local_pose: Vector3<f32>,

    linear_velocity: Vector3<f32>,
    angular_velocity: Vector3<f32>,
    max_linear_velocity: f32,
    max_angular_velocity: f32,
    linear_damping: f32,
    angular_damping: f32,
    force: Vector3<f32>,
    torque: Vector3<f32>,
    solver_iterations: SolverIterations,

    kinematic: bool,
    frozen: bool,
    pub(crate) joints: Vec<JointHandle>,
}

impl RigidBody {
    pub fn new(desc: BodyDesc) -> Self {
        let unit_props = mass_properties(&desc.collider, 1.);
        let local_bounds = desc.collider.aabb();
        let mut body = Self {
            user_data: desc.user_data,
            pose: desc.transform,
            collider: desc.collider,
            local_bounds,
            unit_props,
            mass: 0.,
            inertia: Matrix3::zeros(),
            cmass_local_pose: Vector3::zeros(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            max_linear_velocity: f32::MAX,
            max_angular_velocity: 100.,
            linear_damping: 0.,
            angular_damping: 0.05,
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
            solver_iterations: SolverIterations::default(),
            kinematic: desc.kinematic,
            frozen: desc.frozen,
            joints: vec![],
        };
        body.update_mass_and_inertia(desc.mass);
        body
    }

    pub fn user_data(&self) -> EntityId {
        self.user_data
    }

    pub fn collider(&self) -> &Arc<TriMesh> {
        &self.collider
    }

    pub fn local_bounds(&self) -> &Bounds {
        &self.local_bounds
    }

    /// Box around the collider, and where it sits in world space.
    pub fn collider_box(&self) -> (Isometry3<f32>, Cuboid) {
        let center = self.pose.transform_point(&self.local_bounds.center);
        let half_extents = self.local_bounds.extents.component_mul(&self.pose.scaling).abs();
        (
            Isometry3::from_parts(Translation3::from(center), self.pose.ori),
            Cuboid::new(half_extents),
        )
    }

    pub fn global_pose(&self) -> &AffineTransform {
        &self.pose
    }

    pub fn set_global_pose(&mut self, pose: AffineTransform) {
        self.pose = pose;
    }

    pub fn joints(&self) -> &[JointHandle] {
        &self.joints
    }

    // mass

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inertia(&self) -> &Matrix3<f32> {
        &self.inertia
    }

    /// Takes the collider's shape as parry measures it and rescales it to `mass`, moving the
    /// centre of mass back to the collider's centroid.
    pub fn update_mass_and_inertia(&mut self, mass: f32) {
        let props = self.unit_props.with_mass(mass.max(f32::EPSILON));
        self.mass = props.mass;
        self.inertia = props.inertia;
        self.cmass_local_pose = props.center_of_mass;
    }

    pub fn cmass_local_pose(&self) -> &Vector3<f32> {
        &self.cmass_local_pose
    }

    pub fn set_cmass_local_pose(&mut self, pose: Vector3<f32>) {
        self.cmass_local_pose = pose;
    }

    // velocity

    pub fn linear_velocity(&self) -> &Vector3<f32> {
        &self.linear_velocity
    }

    pub fn set_linear_velocity(&mut self, v: Vector3<f32>) {
        self.linear_velocity = v;
    }

    pub fn angular_velocity(&self) -> &Vector3<f32> {
        &self.angular_velocity
    }

    pub fn set_angular_velocity(&mut self, v: Vector3<f32>) {
        self.angular_velocity = v;
    }

    pub fn max_linear_velocity(&self) -> f32 {
        self.max_linear_velocity
    }

    pub fn set_max_linear_velocity(&mut self, v: f32) {
        self.max_linear_velocity = v.max(0.);
    }

    pub fn max_angular_velocity(&self) -> f32 {
        self.max_angular_velocity
    }

    pub fn set_max_angular_velocity(&mut self, v: f32) {
        self.max_angular_velocity = v.max(0.);
    }

    pub fn damping(&self) -> (f32, f32) {
        (self.linear_damping, self.angular_damping)
    }

    pub fn set_linear_damping(&mut self, d: f32) {
        self.linear_damping = d.max(0.);
    }

    pub fn set_angular_damping(&mut self, d: f32) {
        self.angular_damping = d.max(0.);
    }

    pub fn solver_iterations(&self) -> SolverIterations {
        self.solver_iterations
    }

    pub fn set_solver_iteration_counts(&mut self, position: u32, velocity: u32) {
        self.solver_iterations = SolverIterations { position, velocity };
    }

    // forces

    pub fn add_force(&mut self, f: Vector3<f32>) {
        self.force += f;
    }

    pub fn add_torque(&mut self, t: Vector3<f32>) {
        self.torque += t;
    }

    pub fn clear_force(&mut self) {
        self.force = Vector3::zeros();
    }

    pub fn clear_torque(&mut self) {
        self.torque = Vector3::zeros();
    }

    pub(crate) fn accumulated(&self) -> (Vector3<f32>, Vector3<f32>) {
        (self.force, self.torque)
    }

    // state

    pub fn is_kinematic(&self) -> bool {
        self.kinematic
    }

    pub fn set_kinematic(&mut self, kinematic: bool) {
        self.kinematic = kinematic;
        if kinematic {
            self.linear_velocity = Vector3::zeros();
            self.angular_velocity = Vector3::zeros();
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Moved by the integrator.
    pub fn is_dynamic(&self) -> bool {
        !self.kinematic && !self.frozen
    }

    /// Velocity change from an instantaneous impulse through the centre of mass.
    pub(crate) fn apply_linear_impulse(&mut self, impulse: &Vector3<f32>) {
        if self.is_dynamic() {
            self.linear_velocity += impulse / self.mass;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geom::{geom::unit_cube, Scene};

    fn cube_body(mass: f32) -> RigidBody {
        RigidBody::new(BodyDesc {
            transform: AffineTransform::from_position(Vector3::new(0., 2., 0.)),
            collider: Arc::new(unit_cube()),
            mass,
            kinematic: false,
            frozen: false,
            user_data: Scene::new().create_entity("cube", AffineTransform::identity()),
        })
    }

    #[test]
    fn mass_update_rescales_inertia() {
        let mut body = cube_body(1.);
        assert!((body.inertia()[(0, 0)] - 1. / 6.).abs() < 1e-4);
        body.update_mass_and_inertia(3.);
        assert!((body.mass() - 3.).abs() < 1e-5);
        assert!((body.inertia()[(0, 0)] - 0.5).abs() < 1e-4);
        assert!(body.cmass_local_pose().norm() < 1e-5);
    }

    #[test]
    fn collider_box_follows_the_pose() {
        let body = cube_body(1.);
        let (pose, cuboid) = body.collider_box();
        assert!((pose.translation.vector - Vector3::new(0., 2., 0.)).norm() < 1e-6);
        assert_eq!(cuboid.half_extents, Vector3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn only_dynamic_bodies_take_impulses() {
        let mut body = cube_body(2.);
        body.set_frozen(true);
        body.apply_linear_impulse(&Vector3::new(4., 0., 0.));
        assert_eq!(*body.linear_velocity(), Vector3::zeros());
        body.set_frozen(false);
        body.apply_linear_impulse(&Vector3::new(4., 0., 0.));
        assert!((body.linear_velocity().x - 2.).abs() < 1e-5);
    }
}

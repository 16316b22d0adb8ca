use geom::EntityId;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Isometry3, Translation3, UnitQuaternion, Vector3};
use parry3d::{
    query,
    shape::{Ball, Cuboid, Shape},
};

use crate::{
    arena::Arena,
    BodyDesc, BodyHandle, FixedJoint, Impact, JointDesc, JointHandle, PhysicsEngine, RigidBody, SimError, SimResult,
    StepReport,
};

/// Small reference engine: semi-implicit Euler, no contact solving, joints that only break.
pub struct World {
    bodies: Arena<RigidBody>,
    joints: Arena<FixedJoint>,
    gravity: Vector3<f32>,
    broken: Vec<JointHandle>,
    impacts: Vec<Impact>,
}

impl World {
    pub fn new(gravity: Vector3<f32>) -> Self {
        Self {
            bodies: Arena::new(),
            joints: Arena::new(),
            gravity,
            broken: vec![],
            impacts: vec![],
        }
    }

    pub fn gravity(&self) -> &Vector3<f32> {
        &self.gravity
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter()
    }

    /// Snaps `joint` as if it had been overloaded. Already broken joints are left alone.
    pub fn break_joint(&mut self, joint: JointHandle) -> SimResult<()> {
        let j = self.joints.get_mut(joint).ok_or(SimError::StaleJoint(joint))?;
        if j.snap() {
            debug!("Joint {:?} broke.", joint);
            self.broken.push(joint);
        }
        Ok(())
    }

    /// User data of every body whose collider box touches `shape` placed at `pose`. Touching
    /// counts.
    fn overlapping(&self, pose: &Isometry3<f32>, shape: &dyn Shape) -> Vec<EntityId> {
        self.bodies
            .iter()
            .filter(|(_, body)| {
                let (body_pose, cuboid) = body.collider_box();
                query::intersection_test(&body_pose, &cuboid, pose, shape).unwrap_or(false)
            })
            .map(|(_, body)| body.user_data())
            .collect()
    }

    /// Pushes every body touching the sphere away from `center`, falling off with the square
    /// of the distance. Returns how many bodies were hit.
    pub fn explode(&mut self, center: &Vector3<f32>, radius: f32, impulse: f32) -> usize {
        let blast_pose = Isometry3::from_parts(Translation3::from(*center), UnitQuaternion::identity());
        let blast = Ball::new(radius);
        let hits: Vec<(BodyHandle, Vector3<f32>)> = self
            .bodies
            .iter()
            .filter_map(|(handle, body)| {
                let (body_pose, cuboid) = body.collider_box();
                if !query::intersection_test(&body_pose, &cuboid, &blast_pose, &blast).unwrap_or(false) {
                    return None;
                }
                let offset = body_pose.translation.vector - center;
                let falloff = (1. - offset.norm_squared() / (radius * radius)).max(0.);
                let dir = offset.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::y);
                Some((handle, dir * impulse * falloff))
            })
            .collect();
        for (handle, push) in hits.iter() {
            // handles were just read out of the arena
            let _ = self.apply_impulse(*handle, *push);
        }
        trace!("Explosion at {:?} hit {} bodies.", center, hits.len());
        hits.len()
    }

    fn detach_joint(&mut self, joint: JointHandle, j: &FixedJoint) {
        let (a, b) = j.bodies();
        for body in [a, b] {
            if let Some(body) = self.bodies.get_mut(body) {
                body.joints.retain(|h| *h != joint);
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Vector3::new(0., -9.81, 0.))
    }
}

impl PhysicsEngine for World {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        self.bodies.insert(RigidBody::new(desc))
    }

    fn destroy_body(&mut self, body: BodyHandle) -> SimResult<RigidBody> {
        let removed = self.bodies.remove(body).ok_or(SimError::StaleBody(body))?;
        for joint in removed.joints() {
            if let Some(j) = self.joints.remove(*joint) {
                self.detach_joint(*joint, &j);
            }
        }
        trace!("Destroyed body {:?} and {} joints.", body, removed.joints().len());
        Ok(removed)
    }

    fn body(&self, body: BodyHandle) -> SimResult<&RigidBody> {
        self.bodies.get(body).ok_or(SimError::StaleBody(body))
    }

    fn body_mut(&mut self, body: BodyHandle) -> SimResult<&mut RigidBody> {
        self.bodies.get_mut(body).ok_or(SimError::StaleBody(body))
    }

    fn create_joint(&mut self, desc: JointDesc, a: BodyHandle, b: BodyHandle) -> SimResult<JointHandle> {
        self.body(a)?;
        self.body(b)?;
        let joint = self.joints.insert(FixedJoint::new(desc, a, b));
        self.body_mut(a)?.joints.push(joint);
        self.body_mut(b)?.joints.push(joint);
        Ok(joint)
    }

    fn destroy_joint(&mut self, joint: JointHandle) -> SimResult<FixedJoint> {
        let removed = self.joints.remove(joint).ok_or(SimError::StaleJoint(joint))?;
        self.detach_joint(joint, &removed);
        Ok(removed)
    }

    fn joint(&self, joint: JointHandle) -> SimResult<&FixedJoint> {
        self.joints.get(joint).ok_or(SimError::StaleJoint(joint))
    }

    fn joint_mut(&mut self, joint: JointHandle) -> SimResult<&mut FixedJoint> {
        self.joints.get_mut(joint).ok_or(SimError::StaleJoint(joint))
    }

    fn overlap_sphere(&self, center: &Vector3<f32>, radius: f32) -> Vec<EntityId> {
        let pose = Isometry3::from_parts(Translation3::from(*center), UnitQuaternion::identity());
        self.overlapping(&pose, &Ball::new(radius))
    }

    fn overlap_box(
        &self,
        center: &Vector3<f32>,
        half_extents: &Vector3<f32>,
        rotation: &UnitQuaternion<f32>,
    ) -> Vec<EntityId> {
        let pose = Isometry3::from_parts(Translation3::from(*center), *rotation);
        self.overlapping(&pose, &Cuboid::new(half_extents.abs()))
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vector3<f32>) -> SimResult<()> {
        let b = self.bodies.get_mut(body).ok_or(SimError::StaleBody(body))?;
        b.apply_linear_impulse(&impulse);
        let entity = b.user_data();
        let joints = b.joints().to_vec();
        self.impacts.push(Impact { entity, body, impulse });

        let magnitude = impulse.norm();
        for joint in joints {
            let overloaded = self
                .joints
                .get(joint)
                .map_or(false, |j| !j.is_broken() && j.break_force() < magnitude);
            if overloaded {
                self.break_joint(joint)?;
            }
        }
        Ok(())
    }

    fn step(&mut self, dt: f32) -> StepReport {
        let gravity = self.gravity;
        for (_, body) in self.bodies.iter_mut() {
            if body.is_dynamic() {
                let (force, torque) = body.accumulated();
                let (linear_damping, angular_damping) = body.damping();

                let mut v = body.linear_velocity() + (gravity + force / body.mass()) * dt;
                v /= 1. + dt * linear_damping;
                let v = v.cap_magnitude(body.max_linear_velocity());

                let inv_inertia = body.inertia().try_inverse().unwrap_or_else(na::Matrix3::zeros);
                let mut w = body.angular_velocity() + inv_inertia * torque * dt;
                w /= 1. + dt * angular_damping;
                let w = w.cap_magnitude(body.max_angular_velocity());

                let mut pose = *body.global_pose();
                pose.pos += v * dt;
                pose.ori = UnitQuaternion::from_scaled_axis(w * dt) * pose.ori;
                body.set_global_pose(pose);
                body.set_linear_velocity(v);
                body.set_angular_velocity(w);
            }
            body.clear_force();
            body.clear_torque();
        }
        StepReport {
            broken_joints: std::mem::take(&mut self.broken),
            impacts: std::mem::take(&mut self.impacts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stage;
    use geom::{geom::unit_cube, AffineTransform};
    use std::{f32::consts::FRAC_PI_4, sync::Arc};

    /// A unit cube at `x`, owned by a fresh entity of the stage's scene.
    fn cube(stage: &mut Stage<World>, x: f32, frozen: bool) -> BodyHandle {
        let transform = AffineTransform::from_position(Vector3::new(x, 0., 0.));
        let entity = stage.scene.create_entity("cube", transform);
        stage.physics.create_body(BodyDesc {
            transform,
            collider: Arc::new(unit_cube()),
            mass: 1.,
            kinematic: false,
            frozen,
            user_data: entity,
        })
    }

    fn owner(stage: &Stage<World>, body: BodyHandle) -> EntityId {
        stage.physics.body(body).unwrap().user_data()
    }

    #[test]
    fn overloaded_joint_breaks_and_is_reported_once() {
        let mut stage = Stage::default();
        let a = cube(&mut stage, 0., true);
        let b = cube(&mut stage, 1., true);
        let world = &mut stage.physics;
        let strong = world
            .create_joint(JointDesc { break_force: 50., ..Default::default() }, a, b)
            .unwrap();
        let weak = world
            .create_joint(JointDesc { break_force: 5., ..Default::default() }, a, b)
            .unwrap();

        world.apply_impulse(a, Vector3::new(10., 0., 0.)).unwrap();
        world.apply_impulse(a, Vector3::new(10., 0., 0.)).unwrap();
        let report = world.step(0.1);
        assert_eq!(report.broken_joints, vec![weak]);
        assert_eq!(report.impacts.len(), 2);
        assert!(!world.is_joint_broken(strong).unwrap());
        assert!(world.step(0.1).is_empty());
    }

    #[test]
    fn frozen_bodies_stay_put() {
        let mut stage = Stage::default();
        let frozen = cube(&mut stage, 0., true);
        let loose = cube(&mut stage, 5., false);
        stage.physics.step(0.5);
        assert_eq!(stage.physics.body(frozen).unwrap().global_pose().pos, Vector3::zeros());
        assert!(stage.physics.body(loose).unwrap().global_pose().pos.y < 0.);
    }

    #[test]
    fn destroying_a_body_takes_its_joints() {
        let mut stage = Stage::default();
        let a = cube(&mut stage, 0., true);
        let b = cube(&mut stage, 1., true);
        let world = &mut stage.physics;
        let j = world.create_joint(JointDesc::default(), a, b).unwrap();
        world.destroy_body(a).unwrap();
        assert!(matches!(world.joint(j), Err(SimError::StaleJoint(_))));
        assert!(matches!(world.body(a), Err(SimError::StaleBody(_))));
        assert!(world.body(b).unwrap().joints().is_empty());
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn overlap_queries_report_user_data() {
        let mut stage = Stage::default();
        let a = cube(&mut stage, 0., true);
        let b = cube(&mut stage, 1., true);
        let c = cube(&mut stage, 3., true);
        // shared face between the first two cubes
        let hits = stage.physics.overlap_sphere(&Vector3::new(0.5, 0., 0.), 0.01);
        assert_eq!(hits, vec![owner(&stage, a), owner(&stage, b)]);
        let hits = stage.physics.overlap_sphere(&Vector3::new(2.02, 0., 0.), 0.01);
        assert!(hits.is_empty());
        let hits = stage
            .physics
            .overlap_box(&Vector3::new(3.5, 0., 0.), &Vector3::new(0.01, 1., 1.), &UnitQuaternion::identity());
        assert_eq!(hits, vec![owner(&stage, c)]);
    }

    #[test]
    fn rotated_query_box_reaches_further() {
        let mut stage = Stage::default();
        let a = cube(&mut stage, 0., true);
        // a 45 degree turn stretches the reach along x from 0.5 to ~0.71
        let turned = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_4);
        let half = Vector3::new(0.5, 0.5, 0.5);
        assert_eq!(stage.physics.overlap_box(&Vector3::new(1.15, 0., 0.), &half, &turned), vec![owner(&stage, a)]);
        assert!(stage.physics.overlap_box(&Vector3::new(1.15, 0., 0.), &half, &UnitQuaternion::identity()).is_empty());

        let (pose, cuboid) = stage.collider_box(a).unwrap();
        assert_eq!(pose.translation.vector, Vector3::zeros());
        assert_eq!(cuboid.half_extents, half);
    }

    #[test]
    fn explosion_pushes_dynamic_bodies_outward() {
        let mut stage = Stage::new(World::new(Vector3::zeros()));
        let near = cube(&mut stage, 1., false);
        let far = cube(&mut stage, 10., false);
        let world = &mut stage.physics;
        assert_eq!(world.explode(&Vector3::zeros(), 3., 20.), 1);
        assert!(world.body(near).unwrap().linear_velocity().x > 0.);
        assert_eq!(*world.body(far).unwrap().linear_velocity(), Vector3::zeros());
        assert_eq!(world.step(0.1).impacts.len(), 1);
    }
}

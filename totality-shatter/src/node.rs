use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use model::{geom::TriMesh, AffineTransform, EntityId};
use na::Vector3;
use sim::{BodyHandle, JointHandle, PhysicsEngine, Stage};
use sync::UnfreezeQueue;

use crate::{ConnectivityGraph, Fracture, ShatterConfig, ShatterResult};

/// The rigid body simulating a chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChunkBody {
    pub body: BodyHandle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Materials {
    pub inside: Option<String>,
    pub outside: Option<String>,
}

/// Geometry of a chunk, in the chunk's local space.
#[derive(Debug, Clone)]
pub struct ChunkMesh {
    pub render: Arc<TriMesh>,
    pub internal: TriMesh,
    pub materials: Materials,
}

/// A chunk's place in its connectivity graph.
///
/// Lives as a component on the chunk entity. Operations that have to reach other chunks are
/// associated functions taking the stage and the entity instead of `&mut self`.
#[derive(Debug, Clone)]
pub struct ChunkNode {
    entity: EntityId,
    neighbours: HashSet<EntityId>,
    joint_to_chunk: HashMap<JointHandle, EntityId>,
    chunk_to_joint: HashMap<EntityId, JointHandle>,
    has_broken_links: bool,
    frozen: bool,
    kinematic: bool,
    frozen_pose: AffineTransform,
    generation: u32,
}

impl ChunkNode {
    pub fn new(entity: EntityId, generation: u32, kinematic: bool) -> Self {
        Self {
            entity,
            neighbours: HashSet::new(),
            joint_to_chunk: HashMap::new(),
            chunk_to_joint: HashMap::new(),
            has_broken_links: false,
            frozen: true,
            kinematic,
            frozen_pose: AffineTransform::identity(),
            generation,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn neighbours(&self) -> &HashSet<EntityId> {
        &self.neighbours
    }

    pub fn contains(&self, chunk: &EntityId) -> bool {
        self.neighbours.contains(chunk)
    }

    pub fn joint_to(&self, chunk: &EntityId) -> Option<JointHandle> {
        self.chunk_to_joint.get(chunk).copied()
    }

    pub fn joint_count(&self) -> usize {
        self.joint_to_chunk.len()
    }

    pub fn has_broken_links(&self) -> bool {
        self.has_broken_links
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_kinematic(&self) -> bool {
        self.kinematic
    }

    pub fn set_kinematic(&mut self, kinematic: bool) {
        self.kinematic = kinematic;
    }

    pub fn frozen_pose(&self) -> &AffineTransform {
        &self.frozen_pose
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn on_joint_break(&mut self) {
        self.has_broken_links = true;
    }

    /// Queues this chunk for activation. Only the caller that actually queued it flips
    /// `frozen`; the body is left for whoever drains the queue.
    pub fn unfreeze(&mut self, queue: &UnfreezeQueue<EntityId>) -> bool {
        let inserted = queue.insert(self.entity);
        if inserted {
            self.frozen = false;
        }
        inserted
    }

    /// Forgets `chunk` without looking at the joint between us.
    pub fn remove(&mut self, chunk: &EntityId) {
        self.neighbours.remove(chunk);
        if let Some(joint) = self.chunk_to_joint.remove(chunk) {
            self.joint_to_chunk.remove(&joint);
        }
    }

    pub fn should_shatter(&self, impulse: &Vector3<f32>, config: &ShatterConfig) -> bool {
        self.generation < config.max_generation && impulse.norm() > config.damage_threshold
    }

    /// Re-fractures the chunk if `impulse` was hard enough and it still has generations to
    /// spare. The chunk itself is left for the caller to retire.
    pub fn process_damage<P: PhysicsEngine>(
        stage: &mut Stage<P>,
        entity: EntityId,
        impulse: &Vector3<f32>,
        fracture: &mut Fracture<'_>,
    ) -> ShatterResult<Option<ConnectivityGraph>> {
        if !stage.scene.component::<ChunkNode>(entity)?.should_shatter(impulse, fracture.config()) {
            return Ok(None);
        }
        debug!("Chunk {:?} took {:?} and shatters.", entity, impulse);
        fracture.refracture(stage, entity)
    }

    /// Freezes the chunk and records the joints it originated (`joints`) in the joint maps of
    /// both ends, so either chunk can notice the link breaking.
    pub fn setup<P: PhysicsEngine>(
        stage: &mut Stage<P>,
        entity: EntityId,
        joints: &[JointHandle],
        config: &ShatterConfig,
    ) -> ShatterResult<()> {
        Self::freeze(stage, entity, config)?;

        let body = stage.scene.component::<ChunkBody>(entity)?.body;
        let mut links = Vec::with_capacity(joints.len());
        for joint in joints {
            let other = match stage.physics.joint(*joint).map(|j| j.other(body)) {
                Ok(Some(other)) => other,
                Ok(None) => {
                    warn!("Joint {:?} recorded under {:?} is not attached to it.", joint, entity);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping joint of {:?}: {}", entity, e);
                    continue;
                }
            };
            match stage.physics.body(other) {
                Ok(b) => links.push((*joint, b.user_data())),
                Err(e) => warn!("Skipping joint {:?} of {:?}: {}", joint, entity, e),
            }
        }

        let node = stage.scene.component_mut::<ChunkNode>(entity)?;
        for (joint, chunk) in links.iter() {
            node.joint_to_chunk.insert(*joint, *chunk);
            node.chunk_to_joint.insert(*chunk, *joint);
            node.neighbours.insert(*chunk);
        }

        for (joint, chunk) in links {
            match stage.scene.try_component_mut::<ChunkNode>(chunk) {
                Some(other) => {
                    other.joint_to_chunk.insert(joint, entity);
                    other.chunk_to_joint.insert(entity, joint);
                    other.neighbours.insert(entity);
                }
                None => {
                    warn!("Neighbour {:?} of {:?} has no chunk node, dropping the edge.", chunk, entity);
                    stage.scene.component_mut::<ChunkNode>(entity)?.remove(&chunk);
                }
            }
        }
        trace!("Set up chunk {:?} with {} joints.", entity, joints.len());
        Ok(())
    }

    /// Puts the body to rest with the fixed frozen mass and remembers where it was frozen.
    pub fn freeze<P: PhysicsEngine>(stage: &mut Stage<P>, entity: EntityId, config: &ShatterConfig) -> ShatterResult<()> {
        let body = stage.scene.component::<ChunkBody>(entity)?.body;
        let rb = stage.physics.body_mut(body)?;
        rb.set_max_angular_velocity(config.max_velocity);
        rb.set_max_linear_velocity(config.max_velocity);
        rb.set_angular_damping(config.damping);
        rb.set_linear_damping(config.damping);
        rb.set_solver_iteration_counts(config.solver_position_iterations, config.solver_velocity_iterations);
        rb.set_cmass_local_pose(Vector3::zeros());
        rb.clear_torque();
        rb.clear_force();
        rb.set_linear_velocity(Vector3::zeros());
        rb.set_angular_velocity(Vector3::zeros());
        rb.update_mass_and_inertia(config.frozen_mass);
        rb.set_frozen(true);
        let pose = *rb.global_pose();

        let node = stage.scene.component_mut::<ChunkNode>(entity)?;
        node.frozen = true;
        node.frozen_pose = pose;
        Ok(())
    }

    /// Drops every joint that broke (or vanished) from both ends of the link. Returns whether
    /// any neighbour was lost.
    pub fn clean_broken_links<P: PhysicsEngine>(stage: &mut Stage<P>, entity: EntityId) -> ShatterResult<bool> {
        let broken: Vec<(JointHandle, EntityId)> = {
            let node = stage.scene.component::<ChunkNode>(entity)?;
            node.joint_to_chunk
                .iter()
                .filter(|(joint, _)| stage.physics.is_joint_broken(**joint).unwrap_or(true))
                .map(|(joint, chunk)| (*joint, *chunk))
                .collect()
        };

        for (joint, chunk) in broken.iter() {
            match stage.physics.joint_mut(*joint) {
                Ok(j) => j.set_inv_inertia_scales(0., 0.),
                Err(_) => trace!("Joint {:?} is already gone.", joint),
            }
            let node = stage.scene.component_mut::<ChunkNode>(entity)?;
            node.joint_to_chunk.remove(joint);
            node.chunk_to_joint.remove(chunk);
            node.neighbours.remove(chunk);
            if let Some(other) = stage.scene.try_component_mut::<ChunkNode>(*chunk) {
                other.remove(&entity);
            }
            debug!("Link {:?} <-> {:?} broke.", entity, chunk);
        }

        stage.scene.component_mut::<ChunkNode>(entity)?.has_broken_links = false;
        Ok(!broken.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Scene;

    #[test]
    fn unfreeze_only_flips_for_the_first_caller() {
        let queue = UnfreezeQueue::new();
        let entity = Scene::new().create_entity("chunk", AffineTransform::identity());
        let mut a = ChunkNode::new(entity, 0, false);
        let mut b = a.clone();
        assert!(a.unfreeze(&queue));
        assert!(!a.is_frozen());
        assert!(!b.unfreeze(&queue));
        assert!(b.is_frozen());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn shatter_needs_headroom_and_force() {
        let config = ShatterConfig::default();
        let mut scene = Scene::new();
        let young = ChunkNode::new(scene.create_entity("young", AffineTransform::identity()), 2, false);
        let old = ChunkNode::new(scene.create_entity("old", AffineTransform::identity()), 3, false);
        let hard = Vector3::new(0., 6., 0.);
        assert!(young.should_shatter(&hard, &config));
        assert!(!young.should_shatter(&Vector3::new(0., 5., 0.), &config));
        assert!(!old.should_shatter(&hard, &config));
    }
}

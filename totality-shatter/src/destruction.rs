use std::{collections::BTreeMap, sync::Arc};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use model::EntityId;
use na::Vector3;
use sim::{PhysicsEngine, SimError, Stage, StepReport};
use sync::{PhysicsLock, UnfreezeQueue};

use crate::{
    ChunkBody, ChunkNode, ConnectivityGraph, Fracture, FractureKernel, FractureRequest, ShatterConfig, ShatterError,
    ShatterResult,
};

/// What one tick did.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub flagged: usize,
    pub refractured: usize,
    pub queued: usize,
    pub activated: usize,
    pub retired: usize,
}

/// Observable state of one chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChunkState {
    pub entity: EntityId,
    pub root: EntityId,
    pub generation: u32,
    pub frozen: bool,
    pub kinematic: bool,
}

/// Owns every connectivity graph and drives them once per physics step.
pub struct Destruction {
    graphs: BTreeMap<EntityId, ConnectivityGraph>,
    queue: Arc<UnfreezeQueue<EntityId>>,
    kernel: Box<dyn FractureKernel>,
    config: ShatterConfig,
    pending_damage: Vec<(EntityId, Vector3<f32>)>,
}

impl Destruction {
    pub fn new(kernel: Box<dyn FractureKernel>, config: ShatterConfig) -> Self {
        Self::with_queue(kernel, config, Arc::new(UnfreezeQueue::new()))
    }

    pub fn with_queue(kernel: Box<dyn FractureKernel>, config: ShatterConfig, queue: Arc<UnfreezeQueue<EntityId>>) -> Self {
        Self {
            graphs: BTreeMap::new(),
            queue,
            kernel,
            config,
            pending_damage: vec![],
        }
    }

    pub fn config(&self) -> &ShatterConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<UnfreezeQueue<EntityId>> {
        &self.queue
    }

    pub fn graph(&self, root: &EntityId) -> Option<&ConnectivityGraph> {
        self.graphs.get(root)
    }

    pub fn graphs(&self) -> impl Iterator<Item = &ConnectivityGraph> {
        self.graphs.values()
    }

    fn register(&mut self, graph: ConnectivityGraph) -> EntityId {
        let root = graph.root();
        self.queue.reserve(graph.nodes().len() * 5);
        self.graphs.insert(root, graph);
        root
    }

    /// Fractures an object and starts tracking it. Returns the new fracture root.
    pub fn fracture<P: PhysicsEngine>(
        &mut self,
        stage: &mut Stage<P>,
        request: &FractureRequest,
    ) -> ShatterResult<Option<EntityId>> {
        let graph = Fracture::new(self.kernel.as_ref(), &self.config).fracture_game_object(stage, request)?;
        Ok(graph.map(|g| self.register(g)))
    }

    /// Flags both ends of every broken joint and remembers impacts hard enough to re-fracture.
    /// Returns how many nodes were flagged.
    pub fn on_step_report<P: PhysicsEngine>(&mut self, stage: &mut Stage<P>, report: &StepReport) -> usize {
        let mut flagged = 0;
        for joint in report.broken_joints.iter() {
            let Ok(j) = stage.physics.joint(*joint) else {
                trace!("Broken joint {:?} is already gone.", joint);
                continue;
            };
            let (a, b) = j.bodies();
            let ends: Vec<EntityId> = [a, b]
                .iter()
                .filter_map(|body| stage.physics.body(*body).ok().map(|b| b.user_data()))
                .collect();
            for entity in ends {
                if let Some(node) = stage.scene.try_component_mut::<ChunkNode>(entity) {
                    node.on_joint_break();
                    flagged += 1;
                }
            }
        }

        for impact in report.impacts.iter() {
            let Some(node) = stage.scene.try_component::<ChunkNode>(impact.entity) else {
                continue;
            };
            if node.should_shatter(&impact.impulse, &self.config)
                && !self.pending_damage.iter().any(|(e, _)| *e == impact.entity)
            {
                self.pending_damage.push((impact.entity, impact.impulse));
            }
        }
        flagged
    }

    /// Re-fractures every chunk damaged since the last call, replacing it with its pieces.
    /// Chunks whose body has gone stale are left whole.
    pub fn process_damage<P: PhysicsEngine>(&mut self, stage: &mut Stage<P>) -> ShatterResult<usize> {
        let mut refractured = 0;
        for (chunk, impulse) in std::mem::take(&mut self.pending_damage) {
            let Some(body) = stage.scene.try_component::<ChunkBody>(chunk).map(|b| b.body) else {
                continue;
            };
            let mut fracture = Fracture::new(self.kernel.as_ref(), &self.config);
            let graph = match ChunkNode::process_damage(stage, chunk, &impulse, &mut fracture) {
                Ok(Some(graph)) => graph,
                Ok(None) => continue,
                Err(ShatterError::Sim(SimError::StaleBody(stale))) => {
                    warn!("Damaged chunk {:?} lost its body {:?}, leaving it whole.", chunk, stale);
                    continue;
                }
                Err(e) => return Err(e),
            };

            match stage.physics.destroy_body(body) {
                Ok(_) => {}
                Err(SimError::StaleBody(_)) => warn!("Body {:?} of {:?} was already gone.", body, chunk),
                Err(e) => return Err(e.into()),
            }
            if let Some(old) = stage.scene.parent(chunk).and_then(|root| self.graphs.get_mut(&root)) {
                old.remove_node(&mut stage.scene, chunk);
            }
            stage.scene.delete_entity(chunk)?;
            self.register(graph);
            refractured += 1;
        }
        Ok(refractured)
    }

    /// Cleans and searches every graph. Returns how many chunks were queued for activation.
    pub fn update<P: PhysicsEngine>(&mut self, stage: &mut Stage<P>) -> ShatterResult<usize> {
        let mut queued = 0;
        for graph in self.graphs.values_mut() {
            queued += graph.update(stage, &self.queue)?;
        }
        Ok(queued)
    }

    /// Turns every queued chunk's body dynamic. Anchored bodies and chunks that disappeared in
    /// the meantime are skipped.
    pub fn drain_unfreeze_queue<P: PhysicsEngine>(&self, stage: &mut Stage<P>) -> usize {
        let mut activated = 0;
        for chunk in self.queue.drain() {
            let Some(body) = stage.scene.try_component::<ChunkBody>(chunk).map(|b| b.body) else {
                trace!("Queued chunk {:?} is gone.", chunk);
                continue;
            };
            match stage.physics.body_mut(body) {
                Ok(rb) if !rb.is_kinematic() => {
                    rb.set_frozen(false);
                    activated += 1;
                }
                Ok(_) => {}
                Err(e) => warn!("Cannot activate {:?}: {}", chunk, e),
            }
        }
        activated
    }

    /// Copies body poses back onto the chunk entities. A chunk whose body went stale loses its
    /// `ChunkBody` and keeps its last transform.
    pub fn sync_transforms<P: PhysicsEngine>(&self, stage: &mut Stage<P>) -> ShatterResult<()> {
        for chunk in self.graphs.values().flat_map(|g| g.nodes().iter()) {
            let Some(body) = stage.scene.try_component::<ChunkBody>(*chunk).map(|b| b.body) else {
                continue;
            };
            let pose = match stage.physics.body(body) {
                Ok(rb) => *rb.global_pose(),
                Err(SimError::StaleBody(_)) => {
                    warn!("Chunk {:?} lost its body {:?}, dropping the handle.", chunk, body);
                    stage.scene.remove_component::<ChunkBody>(*chunk);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            *stage.scene.transform_mut(*chunk)? = pose;
        }
        Ok(())
    }

    /// Drops graphs with no chunks left, along with their roots.
    pub fn retire_empty_graphs<P: PhysicsEngine>(&mut self, stage: &mut Stage<P>) -> ShatterResult<usize> {
        let empty: Vec<EntityId> = self
            .graphs
            .iter()
            .filter(|(_, g)| g.is_empty())
            .map(|(root, _)| *root)
            .collect();
        for root in empty.iter() {
            self.graphs.remove(root);
            if stage.scene.is_alive(*root) {
                stage.scene.delete_entity(*root)?;
            }
            debug!("Retired empty graph {:?}.", root);
        }
        Ok(empty.len())
    }

    /// Everything that has to happen between two physics steps, in order.
    pub fn step_stage<P: PhysicsEngine>(&mut self, stage: &mut Stage<P>, report: &StepReport) -> ShatterResult<TickSummary> {
        let flagged = self.on_step_report(stage, report);
        let refractured = self.process_damage(stage)?;
        let queued = self.update(stage)?;
        let activated = self.drain_unfreeze_queue(stage);
        self.sync_transforms(stage)?;
        let retired = self.retire_empty_graphs(stage)?;
        Ok(TickSummary {
            flagged,
            refractured,
            queued,
            activated,
            retired,
        })
    }

    /// `step_stage` under a single write lock.
    pub fn tick<P: PhysicsEngine>(&mut self, lock: &PhysicsLock<Stage<P>>, report: &StepReport) -> ShatterResult<TickSummary> {
        let mut stage = lock.write()?;
        let summary = self.step_stage(&mut stage, report)?;
        if summary != TickSummary::default() {
            debug!("Tick: {:?}", summary);
        }
        Ok(summary)
    }

    pub fn chunk_states<P: PhysicsEngine>(&self, stage: &Stage<P>) -> Vec<ChunkState> {
        self.graphs
            .iter()
            .flat_map(|(root, g)| g.nodes().iter().map(move |n| (*root, *n)))
            .filter_map(|(root, entity)| {
                stage.scene.try_component::<ChunkNode>(entity).map(|node| ChunkState {
                    entity,
                    root,
                    generation: node.generation(),
                    frozen: node.is_frozen(),
                    kinematic: node.is_kinematic(),
                })
            })
            .collect()
    }
}

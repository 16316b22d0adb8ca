use std::collections::{HashMap, HashSet};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use model::{EntityId, Scene};
use sim::{JointHandle, PhysicsEngine, Stage};
use sync::UnfreezeQueue;

use crate::{ChunkBody, ChunkNode, ShatterConfig, ShatterResult};

/// One fractured object: its chunks, the joints gluing them, and the bookkeeping that decides
/// which chunks are still held up by an anchor.
#[derive(Debug, Clone)]
pub struct ConnectivityGraph {
    root: EntityId,
    nodes: Vec<EntityId>,
    /// Joints keyed by the chunk that created them. Each joint appears exactly once.
    joints: HashMap<EntityId, Vec<JointHandle>>,
    generation: u32,
    needs_search: bool,
}

impl ConnectivityGraph {
    pub fn new(root: EntityId, generation: u32) -> Self {
        Self {
            root,
            nodes: vec![],
            joints: HashMap::new(),
            generation,
            needs_search: false,
        }
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    pub fn nodes(&self) -> &[EntityId] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn record_joint(&mut self, chunk: EntityId, joint: JointHandle) {
        self.joints.entry(chunk).or_default().push(joint);
    }

    pub fn joints_of(&self, chunk: &EntityId) -> &[JointHandle] {
        self.joints.get(chunk).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn joint_count(&self) -> usize {
        self.joints.values().map(Vec::len).sum()
    }

    /// Runs a full search on the next `update`, whether or not anything broke.
    pub fn request_search(&mut self) {
        self.needs_search = true;
    }

    /// Attaches a node to every chunk that lacks one, then sets each up exactly once.
    pub fn setup<P: PhysicsEngine>(
        &mut self,
        stage: &mut Stage<P>,
        chunks: &[EntityId],
        config: &ShatterConfig,
    ) -> ShatterResult<()> {
        self.nodes.reserve(chunks.len());
        for chunk in chunks {
            if !stage.scene.has_component::<ChunkNode>(*chunk) {
                let body = stage.scene.component::<ChunkBody>(*chunk)?.body;
                let kinematic = stage.physics.body(body)?.is_kinematic();
                stage
                    .scene
                    .insert_component(*chunk, ChunkNode::new(*chunk, self.generation, kinematic))?;
            }
        }
        for chunk in chunks {
            ChunkNode::setup(stage, *chunk, self.joints_of(chunk), config)?;
            self.nodes.push(*chunk);
        }
        debug_assert!(self.check_symmetry(&stage.scene), "asymmetric adjacency after setup");
        debug!(
            "Graph {:?} set up with {} chunks and {} joints at generation {}.",
            self.root,
            self.nodes.len(),
            self.joint_count(),
            self.generation
        );
        Ok(())
    }

    /// Cleans every node with broken links, then searches if anything changed. Cleaning is
    /// finished for all nodes before the search starts. Returns how many chunks were queued.
    pub fn update<P: PhysicsEngine>(
        &mut self,
        stage: &mut Stage<P>,
        queue: &UnfreezeQueue<EntityId>,
    ) -> ShatterResult<usize> {
        let before = self.nodes.len();
        self.nodes
            .retain(|n| stage.scene.is_alive(*n) && stage.scene.has_component::<ChunkNode>(*n));
        if self.nodes.len() != before {
            warn!("Graph {:?} lost {} chunks it did not remove itself.", self.root, before - self.nodes.len());
            self.needs_search = true;
        }

        let mut changed = false;
        for i in 0..self.nodes.len() {
            let chunk = self.nodes[i];
            if stage.scene.component::<ChunkNode>(chunk)?.has_broken_links() {
                changed |= ChunkNode::clean_broken_links(stage, chunk)?;
            }
        }

        if changed || self.needs_search {
            self.needs_search = false;
            Ok(self.search_graph(&mut stage.scene, queue))
        } else {
            Ok(0)
        }
    }

    /// Unfreezes every chunk that no anchor can reach.
    pub fn search_graph(&self, scene: &mut Scene, queue: &UnfreezeQueue<EntityId>) -> usize {
        let mut search: HashSet<EntityId> = HashSet::with_capacity(self.nodes.len());
        let mut anchors = vec![];
        for chunk in self.nodes.iter() {
            if let Some(node) = scene.try_component::<ChunkNode>(*chunk) {
                if node.is_kinematic() {
                    anchors.push(*chunk);
                }
                search.insert(*chunk);
            }
        }

        for anchor in anchors {
            if search.contains(&anchor) {
                let mut visited = HashSet::new();
                Self::traverse(scene, anchor, &search, &mut visited);
                search.retain(|c| !visited.contains(c));
            }
        }

        let mut unfrozen = 0;
        for chunk in self.nodes.iter().filter(|c| search.contains(*c)) {
            if let Some(node) = scene.try_component_mut::<ChunkNode>(*chunk) {
                if node.is_frozen() && node.unfreeze(queue) {
                    unfrozen += 1;
                }
            }
        }
        if unfrozen > 0 {
            debug!("Graph {:?} let go of {} chunks.", self.root, unfrozen);
        }
        unfrozen
    }

    /// Marks everything reachable from `start` through `search`.
    pub fn traverse(scene: &Scene, start: EntityId, search: &HashSet<EntityId>, visited: &mut HashSet<EntityId>) {
        let mut stack = vec![start];
        while let Some(chunk) = stack.pop() {
            if !search.contains(&chunk) || !visited.insert(chunk) {
                continue;
            }
            if let Some(node) = scene.try_component::<ChunkNode>(chunk) {
                stack.extend(node.neighbours().iter().filter(|n| !visited.contains(*n)));
            }
        }
    }

    /// Takes `chunk` out of the graph, unlinking it from every neighbour first.
    pub fn remove_node(&mut self, scene: &mut Scene, chunk: EntityId) -> bool {
        let Some(pos) = self.nodes.iter().position(|n| *n == chunk) else {
            return false;
        };
        self.nodes.remove(pos);
        self.joints.remove(&chunk);
        let neighbours: Vec<EntityId> = scene
            .try_component::<ChunkNode>(chunk)
            .map(|n| n.neighbours().iter().copied().collect())
            .unwrap_or_default();
        for neighbour in neighbours {
            if let Some(node) = scene.try_component_mut::<ChunkNode>(neighbour) {
                node.remove(&chunk);
            }
        }
        self.needs_search = true;
        true
    }

    /// Every edge has its reverse. Neighbours without a node are ignored.
    pub fn check_symmetry(&self, scene: &Scene) -> bool {
        self.nodes.iter().all(|chunk| {
            scene.try_component::<ChunkNode>(*chunk).map_or(true, |node| {
                node.neighbours().iter().all(|n| {
                    scene
                        .try_component::<ChunkNode>(*n)
                        .map_or(true, |other| other.contains(chunk))
                })
            })
        })
    }
}

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use model::{AffineTransform, EntityId};
use sim::{PhysicsEngine, Stage};

use crate::{ChunkBody, ChunkMesh, ChunkNode, ConnectivityGraph, Fracture, ShatterResult};

impl<'a> Fracture<'a> {
    /// Breaks a damaged chunk into a new graph one generation younger. The old chunk is left
    /// in place for the caller to dispose of. `None` when the chunk may not split any further.
    pub fn refracture<P: PhysicsEngine>(
        &mut self,
        stage: &mut Stage<P>,
        chunk: EntityId,
    ) -> ShatterResult<Option<ConnectivityGraph>> {
        if stage.scene.is_empty() {
            return Ok(None);
        }
        let config = self.config();
        let generation = stage.scene.component::<ChunkNode>(chunk)?.generation();
        if generation >= config.max_generation {
            return Ok(None);
        }

        let body = stage.scene.component::<ChunkBody>(chunk)?.body;
        let transform: AffineTransform = *stage.physics.body(body)?.global_pose();
        let (fragments, materials) = {
            let mesh = stage.scene.component::<ChunkMesh>(chunk)?;
            let seed = u64::from(chunk.to_bits()) ^ generation as u64;
            let fragments = self.kernel().fracture(&mesh.internal, config.refracture_chunk_count, seed, true);
            (fragments, mesh.materials.clone())
        };
        if fragments.is_empty() {
            return Ok(None);
        }

        self.reset_pairs();
        let root = stage.scene.create_entity("Fracture", AffineTransform::identity());
        let mut graph = ConnectivityGraph::new(root, generation + 1);
        let children = self.build_chunks(stage, &transform, &materials, fragments, config.refracture_chunk_mass)?;
        for child in children.iter() {
            self.connect_touching_chunks(stage, &mut graph, *child, &children, config.refracture_joint_break_force)?;
        }
        for child in children.iter() {
            stage.scene.set_parent(*child, root)?;
        }
        graph.setup(stage, &children, config)?;
        // nothing anchors the pieces, so they all let go on the first update
        graph.request_search();

        debug!(
            "Chunk {:?} at generation {} split into {} pieces.",
            chunk,
            generation,
            children.len()
        );
        Ok(Some(graph))
    }
}

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use model::{
    geom::{volume_of_mesh, Bounds, TriMesh},
    AffineTransform, EntityId,
};
use na::Vector3;
use sim::{BodyDesc, PhysicsEngine, Stage};

use crate::{
    anchor::face_region, AnchorMask, ChunkBody, ChunkMesh, ChunkNode, ConnectivityGraph, Fragment, FractureKernel,
    Materials, ShatterConfig, ShatterResult,
};

/// Unordered pair of chunks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct ChunkPair(EntityId, EntityId);
impl ChunkPair {
    fn new(a: EntityId, b: EntityId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

#[derive(Debug, Clone)]
pub struct FractureRequest {
    pub mesh: Arc<TriMesh>,
    /// Entity whose transform the chunks inherit.
    pub target: EntityId,
    pub anchor: AnchorMask,
    pub seed: u64,
    /// Zero or less does nothing. One keeps the mesh whole.
    pub total_chunks: i32,
    pub materials: Materials,
    pub joint_break_force: f32,
    pub density: f32,
}

impl FractureRequest {
    /// Even share of the mesh's mass. Chunks are built with it, but freezing swaps it for the
    /// configured frozen mass, so it only holds until the graph is set up.
    pub fn chunk_mass(&self) -> f32 {
        volume_of_mesh(&self.mesh) * self.density / self.total_chunks.max(1) as f32
    }
}

/// Turns meshes into frozen chunks glued together by breakable joints.
pub struct Fracture<'a> {
    kernel: &'a dyn FractureKernel,
    config: &'a ShatterConfig,
    joint_pairs: HashSet<ChunkPair>,
}

impl<'a> Fracture<'a> {
    pub fn new(kernel: &'a dyn FractureKernel, config: &'a ShatterConfig) -> Self {
        Self {
            kernel,
            config,
            joint_pairs: HashSet::new(),
        }
    }

    pub(crate) fn kernel(&self) -> &'a dyn FractureKernel {
        self.kernel
    }

    pub(crate) fn config(&self) -> &'a ShatterConfig {
        self.config
    }

    /// Pairs are only tracked within one batch of chunks.
    pub(crate) fn reset_pairs(&mut self) {
        self.joint_pairs.clear();
    }

    /// Fractures `request.mesh` in place of `request.target`. The chunks end up under a new
    /// "Fracture" root, which is also the returned graph's root. Bad input gives `None`.
    pub fn fracture_game_object<P: PhysicsEngine>(
        &mut self,
        stage: &mut Stage<P>,
        request: &FractureRequest,
    ) -> ShatterResult<Option<ConnectivityGraph>> {
        if !validate_mesh(&request.mesh) {
            return Ok(None);
        }
        if request.total_chunks <= 0 {
            debug!("Asked for {} chunks, nothing to do.", request.total_chunks);
            return Ok(None);
        }
        let transform = stage.scene.transform(request.target)?;

        let fragments = if request.total_chunks == 1 {
            vec![Fragment::passthrough(Arc::clone(&request.mesh))]
        } else {
            self.kernel
                .fracture(&request.mesh, request.total_chunks as u32, request.seed, false)
        };
        if fragments.is_empty() {
            warn!("Kernel produced no fragments for {:?}.", request.target);
            return Ok(None);
        }

        self.reset_pairs();
        let chunk_mass = request.chunk_mass();
        let root = stage.scene.create_entity("Fracture", AffineTransform::identity());
        let mut graph = ConnectivityGraph::new(root, 0);

        let chunks = self.build_chunks(stage, &transform, &request.materials, fragments, chunk_mass)?;
        for chunk in chunks.iter() {
            self.connect_touching_chunks(stage, &mut graph, *chunk, &chunks, request.joint_break_force)?;
        }
        for chunk in chunks.iter() {
            stage.scene.set_parent(*chunk, root)?;
        }
        self.anchor_chunks(stage, root, request.anchor)?;
        graph.setup(stage, &chunks, self.config)?;

        info!(
            "Fractured {:?} into {} chunks held by {} joints.",
            request.target,
            chunks.len(),
            graph.joint_count()
        );
        Ok(Some(graph))
    }

    pub fn build_chunks<P: PhysicsEngine>(
        &self,
        stage: &mut Stage<P>,
        transform: &AffineTransform,
        materials: &Materials,
        fragments: Vec<Fragment>,
        mass: f32,
    ) -> ShatterResult<Vec<EntityId>> {
        fragments
            .into_iter()
            .map(|fragment| self.build_chunk(stage, transform, materials, fragment, mass))
            .collect()
    }

    /// One frozen body carrying the fragment, at `transform`.
    pub fn build_chunk<P: PhysicsEngine>(
        &self,
        stage: &mut Stage<P>,
        transform: &AffineTransform,
        materials: &Materials,
        fragment: Fragment,
        mass: f32,
    ) -> ShatterResult<EntityId> {
        let entity = stage.scene.create_entity("Chunk", *transform);
        let body = stage.physics.create_body(BodyDesc {
            transform: *transform,
            collider: Arc::clone(&fragment.render),
            mass,
            kinematic: false,
            frozen: true,
            user_data: entity,
        });
        stage.scene.insert_component(entity, ChunkBody { body })?;
        stage.scene.insert_component(
            entity,
            ChunkMesh {
                render: fragment.render,
                internal: fragment.internal,
                materials: materials.clone(),
            },
        )?;
        Ok(entity)
    }

    /// Glues `chunk` to every chunk of `batch` its surface touches. Each pair gets at most one
    /// joint, owned by whichever chunk found the other first. Returns how many were made.
    pub fn connect_touching_chunks<P: PhysicsEngine>(
        &mut self,
        stage: &mut Stage<P>,
        graph: &mut ConnectivityGraph,
        chunk: EntityId,
        batch: &[EntityId],
        break_force: f32,
    ) -> ShatterResult<usize> {
        let transform = stage.scene.transform(chunk)?;
        let samples = surface_samples(&stage.scene.component::<ChunkMesh>(chunk)?.internal, self.config.touch_subdivisions);

        let mut overlaps = BTreeSet::new();
        for sample in samples.iter() {
            let world = transform.transform_point(sample);
            overlaps.extend(stage.physics.overlap_sphere(&world, self.config.touch_radius));
        }
        trace!("{:?}: {} samples touched {} chunks.", chunk, samples.len(), overlaps.len());

        let own_body = stage.scene.component::<ChunkBody>(chunk)?.body;
        let mut made = 0;
        for other in overlaps {
            if other == chunk || !batch.contains(&other) {
                continue;
            }
            if !self.joint_pairs.insert(ChunkPair::new(chunk, other)) {
                continue;
            }
            let other_body = stage.scene.component::<ChunkBody>(other)?.body;
            let joint = stage
                .physics
                .create_joint(self.config.joint_desc(break_force), own_body, other_body)?;
            graph.record_joint(chunk, joint);
            made += 1;
        }
        Ok(made)
    }

    /// Pins every chunk under `root` that touches one of the faces in `mask`. Anchoring is a
    /// union, so running it again changes nothing. Returns how many chunks are pinned.
    pub fn anchor_chunks<P: PhysicsEngine>(
        &self,
        stage: &mut Stage<P>,
        root: EntityId,
        mask: AnchorMask,
    ) -> ShatterResult<usize> {
        if mask.is_empty() {
            return Ok(0);
        }
        let chunks: Vec<EntityId> = stage
            .scene
            .descendants(root)
            .into_iter()
            .filter(|c| stage.scene.has_component::<ChunkMesh>(*c))
            .collect();
        let Some(first) = chunks.first() else {
            return Ok(0);
        };
        let transform = stage.scene.transform(*first)?;
        let all_bounds: Vec<Bounds> = chunks
            .iter()
            .filter_map(|c| stage.scene.try_component::<ChunkMesh>(*c))
            .map(|m| m.internal.aabb())
            .collect();
        let Some(bounds) = Bounds::composite(all_bounds.iter()) else {
            return Ok(0);
        };

        let mut anchored = BTreeSet::new();
        for face in mask.faces() {
            let region = face_region(face, &transform, &bounds, self.config.anchor_frame_width);
            let hits = stage
                .physics
                .overlap_box(&region.center, &region.half_extents, &region.rotation);
            anchored.extend(hits.into_iter().filter(|h| chunks.contains(h)));
        }

        for chunk in anchored.iter() {
            let body = stage.scene.component::<ChunkBody>(*chunk)?.body;
            stage.physics.body_mut(body)?.set_kinematic(true);
            if let Some(node) = stage.scene.try_component_mut::<ChunkNode>(*chunk) {
                node.set_kinematic(true);
            }
        }
        debug!("Anchored {} of {} chunks to {:?}.", anchored.len(), chunks.len(), mask);
        Ok(anchored.len())
    }
}

/// Logs and rejects meshes that cannot be fractured.
pub fn validate_mesh(mesh: &TriMesh) -> bool {
    if mesh.positions.is_empty() {
        error!("Mesh does not have any vertices.");
        return false;
    }
    if mesh.uvs.is_empty() {
        error!("Mesh does not have any uvs.");
        return false;
    }
    true
}

/// Points on the mesh surface used to look for touching chunks. Vertices always; with more
/// than one subdivision, also a barycentric grid over every triangle, so faces that touch
/// without sharing a vertex are still found.
pub fn surface_samples(mesh: &TriMesh, subdivisions: u32) -> Vec<Vector3<f32>> {
    let mut samples = mesh.positions.clone();
    if subdivisions > 1 {
        let d = subdivisions as f32;
        for [a, b, c] in mesh.triangles() {
            let (ab, bc) = ((b - a) / d, (c - b) / d);
            for i in 0..=subdivisions {
                for j in 0..=i {
                    samples.push(a + ab * i as f32 + bc * j as f32);
                }
            }
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::geom::unit_cube;

    #[test]
    fn meshes_need_vertices_and_uvs() {
        assert!(validate_mesh(&unit_cube()));
        assert!(!validate_mesh(&TriMesh::default()));
        let mut bare = unit_cube();
        bare.uvs.clear();
        assert!(!validate_mesh(&bare));
    }

    #[test]
    fn subdivided_samples_stay_on_the_triangle() {
        let mesh = TriMesh::new(
            vec![Vector3::zeros(), Vector3::new(4., 0., 0.), Vector3::new(4., 4., 0.)],
            vec![],
            vec![],
            vec![[0, 1, 2]],
        );
        assert_eq!(surface_samples(&mesh, 1).len(), 3);
        let samples = surface_samples(&mesh, 4);
        // 3 vertices + 15 grid points
        assert_eq!(samples.len(), 18);
        assert!(samples.iter().all(|p| p.y <= p.x + 1e-6 && p.x <= 4. + 1e-6 && p.y >= -1e-6));
        assert!(samples.contains(&Vector3::new(2., 1., 0.)));
    }

    #[test]
    fn chunk_pairs_ignore_order() {
        let mut scene = model::Scene::new();
        let a = scene.create_entity("a", AffineTransform::identity());
        let b = scene.create_entity("b", AffineTransform::identity());
        assert_eq!(ChunkPair::new(a, b), ChunkPair::new(b, a));
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use nalgebra::Vector3;
use totality_model::{geom::TriMesh, AffineTransform, EntityId, Ref};
use totality_shatter::{
    AnchorMask, ChunkBody, ChunkNode, Fragment, FractureKernel, FractureRequest, Materials,
};
use totality_sim::{JointHandle, PhysicsEngine, Stage, World};

/// Splits the source bounds into an `nx * ny * nz` grid, x varying fastest.
pub struct GridKernel {
    pub nx: u32,
    pub ny: u32,
    pub nz: u32,
}

impl FractureKernel for GridKernel {
    fn fracture(&self, source: &TriMesh, _: u32, _: u64, _: bool) -> Vec<Fragment> {
        let bounds = source.aabb();
        let (min, size) = (bounds.min(), bounds.size());
        let cell = Vector3::new(
            size.x / self.nx as f32,
            size.y / self.ny as f32,
            size.z / self.nz as f32,
        );
        let mut out = vec![];
        for iz in 0..self.nz {
            for iy in 0..self.ny {
                for ix in 0..self.nx {
                    let lo = min + Vector3::new(ix as f32, iy as f32, iz as f32).component_mul(&cell);
                    out.push(Fragment::new(TriMesh::cuboid(lo, lo + cell)));
                }
            }
        }
        out
    }
}

/// Hands back the same meshes whatever it is asked.
pub struct FixedKernel(pub Vec<TriMesh>);

impl FractureKernel for FixedKernel {
    fn fracture(&self, _: &TriMesh, _: u32, _: u64, _: bool) -> Vec<Fragment> {
        self.0.iter().cloned().map(Fragment::new).collect()
    }
}

/// For paths that must never reach the kernel.
pub struct NoKernel;

impl FractureKernel for NoKernel {
    fn fracture(&self, _: &TriMesh, _: u32, _: u64, _: bool) -> Vec<Fragment> {
        panic!("kernel should not have been called");
    }
}

pub fn cuboid(min: [f32; 3], max: [f32; 3]) -> Arc<TriMesh> {
    Arc::new(TriMesh::cuboid(min.into(), max.into()))
}

/// A fresh stage with one entity to fracture, at the origin.
pub fn stage() -> (Stage<World>, EntityId) {
    let mut stage = Stage::new(World::default());
    let target = stage.scene.create_entity("Wall", AffineTransform::identity());
    (stage, target)
}

pub fn request(mesh: Arc<TriMesh>, target: EntityId, total_chunks: i32, anchor: AnchorMask) -> FractureRequest {
    FractureRequest {
        mesh,
        target,
        anchor,
        seed: 7,
        total_chunks,
        materials: Materials::default(),
        joint_break_force: 2000.,
        density: 1.,
    }
}

pub fn node(stage: &Stage<World>, chunk: EntityId) -> Ref<'_, ChunkNode> {
    stage.scene.component::<ChunkNode>(chunk).unwrap()
}

/// The joint between two chunks, whichever of them created it.
pub fn joint_between(stage: &Stage<World>, a: EntityId, b: EntityId) -> JointHandle {
    node(stage, a)
        .joint_to(&b)
        .or_else(|| node(stage, b).joint_to(&a))
        .unwrap()
}

pub fn body_of(stage: &Stage<World>, chunk: EntityId) -> &totality_sim::RigidBody {
    let body = stage.scene.component::<ChunkBody>(chunk).unwrap().body;
    stage.physics.body(body).unwrap()
}

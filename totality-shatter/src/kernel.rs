use std::sync::Arc;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use model::geom::TriMesh;

/// One piece of a fractured mesh: what gets drawn, and the closed mesh used for colliders,
/// mass and any later re-fracture.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub render: Arc<TriMesh>,
    pub internal: TriMesh,
}

impl Fragment {
    pub fn new(mesh: TriMesh) -> Self {
        Self {
            render: Arc::new(mesh.clone()),
            internal: mesh,
        }
    }

    /// The source itself, as a single unbroken fragment.
    pub fn passthrough(mesh: Arc<TriMesh>) -> Self {
        Self {
            internal: (*mesh).clone(),
            render: mesh,
        }
    }
}

/// Splits a closed mesh into pieces. Must be deterministic for a given seed, and every
/// fragment must be expressed in the source's local space.
pub trait FractureKernel: Send + Sync {
    /// `replace` is set when the fragments take the place of an existing chunk rather than
    /// starting a new hierarchy. Kernels without a chunk hierarchy may ignore it.
    fn fracture(&self, source: &TriMesh, chunk_count: u32, seed: u64, replace: bool) -> Vec<Fragment>;
}

/// Cuts the source's bounding box into slabs along its longest axis.
///
/// Every slab is a box. The source's own surface is not cut, so only box-shaped sources come
/// out as a true partition; anything else is replaced by slabs of its bounding box, which
/// overhang the original shape.
///
/// Cut planes sit at even spacing, nudged by up to `jitter / 2` of a slab width.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SlabKernel {
    jitter: f32,
}

impl SlabKernel {
    pub fn new(jitter: f32) -> Self {
        Self {
            jitter: jitter.clamp(0., 0.9),
        }
    }

    pub fn jitter(&self) -> f32 {
        self.jitter
    }
}

impl Default for SlabKernel {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl FractureKernel for SlabKernel {
    fn fracture(&self, source: &TriMesh, chunk_count: u32, seed: u64, replace: bool) -> Vec<Fragment> {
        if chunk_count == 0 || source.is_empty() {
            return vec![];
        }
        let bounds = source.aabb();
        let (min, max) = (bounds.min(), bounds.max());
        let axis = bounds.extents.imax();

        let mut rng = fastrand::Rng::with_seed(seed);
        let n = chunk_count as f32;
        let mut cuts = Vec::with_capacity(chunk_count as usize + 1);
        cuts.push(min[axis]);
        for i in 1..chunk_count {
            let t = (i as f32 + self.jitter * (rng.f32() - 0.5)) / n;
            cuts.push(min[axis] + (max[axis] - min[axis]) * t);
        }
        cuts.push(max[axis]);
        trace!(
            "Slicing along axis {} at {:?} (seed {}, replace {}).",
            axis,
            cuts,
            seed,
            replace
        );

        cuts.windows(2)
            .map(|w| {
                let (mut lo, mut hi) = (min, max);
                lo[axis] = w[0];
                hi[axis] = w[1];
                Fragment::new(TriMesh::cuboid(lo, hi))
            })
            .collect()
    }
}

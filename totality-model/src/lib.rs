pub mod geom;
pub mod scene;

use na::{Matrix4, UnitQuaternion, Vector3};
use std::ops::Mul;

pub use scene::{Children, EntityId, Name, Parent, Ref, Scene};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("entity {0:?} is stale or was never created")]
    StaleEntity(EntityId),
    #[error("entity {entity:?} has no {component} component")]
    MissingComponent {
        entity: EntityId,
        component: &'static str,
    },
    #[error("cannot parent {child:?} under {parent:?}, it would form a cycle")]
    InvalidParent { child: EntityId, parent: EntityId },
}

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AffineTransform {
    pub pos: Vector3<f32>,
    pub ori: UnitQuaternion<f32>,
    pub scaling: Vector3<f32>,
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            pos: Vector3::zeros(),
            ori: UnitQuaternion::identity(),
            scaling: Vector3::new(1., 1., 1.),
        }
    }

    pub fn new(pos: Vector3<f32>, ori: UnitQuaternion<f32>, scaling: Vector3<f32>) -> Self {
        Self { pos, ori, scaling }
    }

    pub fn from_position(pos: Vector3<f32>) -> Self {
        Self {
            pos,
            ..Self::identity()
        }
    }

    /// Translation * rotation * scale, as a homogeneous matrix.
    pub fn mat(&self) -> Matrix4<f32> {
        let mut t_mat = self.ori.to_homogeneous() * Matrix4::new_nonuniform_scaling(&self.scaling);
        t_mat.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.pos);
        t_mat
    }

    /// Local space to world space.
    pub fn transform_point(&self, local: &Vector3<f32>) -> Vector3<f32> {
        self.pos + self.ori * self.scaling.component_mul(local)
    }

    /// Rotates a direction. Scale is ignored, so unit vectors stay unit.
    pub fn transform_vector(&self, dir: &Vector3<f32>) -> Vector3<f32> {
        self.ori * dir
    }

    pub fn inverse_transform_point(&self, world: &Vector3<f32>) -> Vector3<f32> {
        (self.ori.inverse() * (world - self.pos)).component_div(&self.scaling)
    }

    /// Scale of `self` when nested under `parent`. Lossy under rotation + non-uniform scale.
    pub fn world_lossy_scale(&self, parent: &AffineTransform) -> Vector3<f32> {
        self.scaling.component_mul(&parent.scaling)
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Nests `rhs` under `self`. Scale is combined lossily.
impl Mul for AffineTransform {
    type Output = AffineTransform;
    fn mul(self, rhs: AffineTransform) -> AffineTransform {
        AffineTransform {
            pos: self.transform_point(&rhs.pos),
            ori: self.ori * rhs.ori,
            scaling: rhs.world_lossy_scale(&self),
        }
    }
}

use std::ops::{BitOr, BitOrAssign};

use arrayvec::ArrayVec;
use model::{geom::Bounds, AffineTransform};
use na::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Face of a chunk's bounding box.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    Left,
    Right,
    Bottom,
    Top,
    /// -Z
    Front,
    /// +Z
    Back,
}

impl Face {
    pub const ALL: [Face; 6] = [Face::Left, Face::Right, Face::Bottom, Face::Top, Face::Front, Face::Back];

    const fn bit(self) -> u8 {
        match self {
            Face::Left => 1,
            Face::Right => 2,
            Face::Bottom => 4,
            Face::Top => 8,
            Face::Front => 16,
            Face::Back => 32,
        }
    }

    /// Local axis index and which end of it the face sits on.
    fn axis(self) -> (usize, f32) {
        match self {
            Face::Left => (0, -1.),
            Face::Right => (0, 1.),
            Face::Bottom => (1, -1.),
            Face::Top => (1, 1.),
            Face::Front => (2, -1.),
            Face::Back => (2, 1.),
        }
    }
}

/// Set of faces whose chunks are pinned in place.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AnchorMask(u8);

impl AnchorMask {
    pub const NONE: AnchorMask = AnchorMask(0);
    pub const LEFT: AnchorMask = AnchorMask(Face::Left.bit());
    pub const RIGHT: AnchorMask = AnchorMask(Face::Right.bit());
    pub const BOTTOM: AnchorMask = AnchorMask(Face::Bottom.bit());
    pub const TOP: AnchorMask = AnchorMask(Face::Top.bit());
    pub const FRONT: AnchorMask = AnchorMask(Face::Front.bit());
    pub const BACK: AnchorMask = AnchorMask(Face::Back.bit());

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, face: Face) -> bool {
        self.0 & face.bit() != 0
    }

    pub fn faces(&self) -> ArrayVec<Face, 6> {
        Face::ALL.iter().copied().filter(|f| self.contains(*f)).collect()
    }
}

impl From<Face> for AnchorMask {
    fn from(face: Face) -> Self {
        AnchorMask(face.bit())
    }
}

impl BitOr for AnchorMask {
    type Output = AnchorMask;
    fn bitor(self, rhs: AnchorMask) -> AnchorMask {
        AnchorMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for AnchorMask {
    fn bitor_assign(&mut self, rhs: AnchorMask) {
        self.0 |= rhs.0;
    }
}

/// World space box handed to the physics overlap query.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FaceRegion {
    pub center: Vector3<f32>,
    pub half_extents: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

/// Thin box lying on `face` of `bounds` (local space of `transform`), `width` thick on
/// either side of the face plane and spanning the other two extents.
pub fn face_region(face: Face, transform: &AffineTransform, bounds: &Bounds, width: f32) -> FaceRegion {
    let (axis, sign) = face.axis();
    let world_center = transform.transform_point(&bounds.center);
    let world_extents = bounds.extents.component_mul(&transform.scaling).abs();

    let mut local_dir = Vector3::zeros();
    local_dir[axis] = 1.;
    let dir = transform.transform_vector(&local_dir);

    let mut half_extents = world_extents;
    half_extents[axis] = width;
    FaceRegion {
        center: world_center + dir * (sign * world_extents[axis]),
        half_extents,
        rotation: transform.ori,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_keeps_every_face() {
        let mask = AnchorMask::LEFT | AnchorMask::TOP;
        assert!(mask.contains(Face::Left));
        assert!(mask.contains(Face::Top));
        assert!(!mask.contains(Face::Right));
        assert_eq!(mask.faces().as_slice(), &[Face::Left, Face::Top]);
        assert_eq!(mask | mask, mask);
        assert!(AnchorMask::NONE.faces().is_empty());
    }

    #[test]
    fn face_region_sits_on_the_face_plane() {
        let bounds = Bounds::from_min_max(Vector3::zeros(), Vector3::new(4., 2., 1.));
        let region = face_region(Face::Right, &AffineTransform::identity(), &bounds, 0.01);
        assert_eq!(region.center, Vector3::new(4., 1., 0.5));
        assert_eq!(region.half_extents, Vector3::new(0.01, 1., 0.5));

        let region = face_region(Face::Front, &AffineTransform::identity(), &bounds, 0.01);
        assert_eq!(region.center, Vector3::new(2., 1., 0.));
    }
}

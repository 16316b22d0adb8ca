pub mod bounds;
pub mod mass;

use na::{Vector2, Vector3};

pub use bounds::Bounds;
pub use mass::{mass_properties, volume_of_mesh, MassProperties};

/// Indexed triangle mesh. Everything lives in the owning object's local space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriMesh {
    pub positions: Vec<Vector3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub uvs: Vec<Vector2<f32>>,
    pub indices: Vec<[u32; 3]>,
}

impl TriMesh {
    pub fn new(
        positions: Vec<Vector3<f32>>,
        normals: Vec<Vector3<f32>>,
        uvs: Vec<Vector2<f32>>,
        indices: Vec<[u32; 3]>,
    ) -> Self {
        Self {
            positions,
            normals,
            uvs,
            indices,
        }
    }

    /// Axis aligned box spanning `min..max`, four vertices per face so normals stay flat.
    pub fn cuboid(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        let (x0, y0, z0) = (min.x, min.y, min.z);
        let (x1, y1, z1) = (max.x, max.y, max.z);
        #[rustfmt::skip]
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([-1., 0., 0.], [[x0, y0, z0], [x0, y0, z1], [x0, y1, z1], [x0, y1, z0]]), // left
            ([ 1., 0., 0.], [[x1, y0, z0], [x1, y1, z0], [x1, y1, z1], [x1, y0, z1]]), // right
            ([0., -1., 0.], [[x0, y0, z0], [x1, y0, z0], [x1, y0, z1], [x0, y0, z1]]), // bottom
            ([0.,  1., 0.], [[x0, y1, z0], [x0, y1, z1], [x1, y1, z1], [x1, y1, z0]]), // top
            ([0., 0., -1.], [[x0, y0, z0], [x0, y1, z0], [x1, y1, z0], [x1, y0, z0]]), // front
            ([0., 0.,  1.], [[x0, y0, z1], [x1, y0, z1], [x1, y1, z1], [x0, y1, z1]]), // back
        ];
        let quad_uvs = [[0f32, 0f32], [1f32, 0f32], [1f32, 1f32], [0f32, 1f32]];

        let mut mesh = TriMesh::default();
        for (norm, corners) in faces.iter() {
            let base = mesh.positions.len() as u32;
            for (corner, uv) in corners.iter().zip(quad_uvs.iter()) {
                mesh.positions.push(Vector3::from(*corner));
                mesh.normals.push(Vector3::from(*norm));
                mesh.uvs.push(Vector2::from(*uv));
            }
            mesh.indices.push([base, base + 1, base + 2]);
            mesh.indices.push([base, base + 2, base + 3]);
        }
        mesh
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    pub fn aabb(&self) -> Bounds {
        Bounds::from_points(&self.positions)
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vector3<f32>; 3]> + '_ {
        self.indices.iter().map(move |[a, b, c]| {
            [
                self.positions[*a as usize],
                self.positions[*b as usize],
                self.positions[*c as usize],
            ]
        })
    }

    /// Raw bytes of the position buffer, for upload or for exact comparisons.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }
}

/// Generates the mesh of a unit cube, centered on the origin.
pub fn unit_cube() -> TriMesh {
    TriMesh::cuboid(Vector3::new(-0.5, -0.5, -0.5), Vector3::new(0.5, 0.5, 0.5))
}

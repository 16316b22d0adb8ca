//! Volume, centre of mass and inertia of closed triangle meshes, taken from parry.

use super::TriMesh;

use na::{Matrix3, Point3, Vector3};
use parry3d::mass_properties::MassProperties as ParryMassProperties;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MassProperties {
    pub mass: f32,
    pub volume: f32,
    pub center_of_mass: Vector3<f32>,
    /// About the centre of mass.
    pub inertia: Matrix3<f32>,
}

impl MassProperties {
    /// Fallback for meshes that enclose no volume.
    pub fn point(mass: f32) -> Self {
        Self {
            mass,
            volume: 0.,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::identity() * mass,
        }
    }

    /// Same shape, different mass.
    pub fn with_mass(&self, mass: f32) -> Self {
        let ratio = if self.mass > f32::EPSILON { mass / self.mass } else { 1. };
        Self {
            mass,
            volume: self.volume,
            center_of_mass: self.center_of_mass,
            inertia: self.inertia * ratio,
        }
    }
}

fn parry_props(mesh: &TriMesh, density: f32) -> ParryMassProperties {
    let vertices: Vec<Point3<f32>> = mesh.positions.iter().map(|p| Point3::from(*p)).collect();
    ParryMassProperties::from_trimesh(density, &vertices, &mesh.indices)
}

/// Enclosed volume. Open meshes give a meaningless but finite answer.
pub fn volume_of_mesh(mesh: &TriMesh) -> f32 {
    if mesh.is_empty() {
        return 0.;
    }
    parry_props(mesh, 1.).mass().abs()
}

pub fn mass_properties(mesh: &TriMesh, density: f32) -> MassProperties {
    if mesh.is_empty() {
        return MassProperties::point(1.);
    }
    let props = parry_props(mesh, 1.);
    let volume = props.mass();
    if volume.abs() < 1e-9 {
        return MassProperties::point(1.);
    }
    MassProperties {
        mass: volume * density,
        volume,
        center_of_mass: props.local_com.coords,
        inertia: props.reconstruct_inertia_matrix() * density,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn box_volume() {
        let mesh = TriMesh::cuboid(Vector3::new(0., 0., 0.), Vector3::new(2., 3., 4.));
        assert!(close(volume_of_mesh(&mesh), 24.));
    }

    #[test]
    fn unit_cube_mass_properties() {
        let mesh = TriMesh::cuboid(Vector3::zeros(), Vector3::new(1., 1., 1.));
        let props = mass_properties(&mesh, 2.);
        assert!(close(props.volume, 1.));
        assert!(close(props.mass, 2.));
        assert!((props.center_of_mass - Vector3::new(0.5, 0.5, 0.5)).norm() < 1e-4);
        // m * (a² + b²) / 12 on the diagonal, nothing off it
        for i in 0..3 {
            assert!(close(props.inertia[(i, i)], 2. * 2. / 12.), "{}", props.inertia);
        }
        assert!(close(props.inertia[(0, 1)], 0.));
        assert!(close(props.inertia[(1, 2)], 0.));
    }

    #[test]
    fn rescaling_mass_scales_inertia() {
        let mesh = TriMesh::cuboid(Vector3::zeros(), Vector3::new(1., 2., 1.));
        let props = mass_properties(&mesh, 1.).with_mass(3.);
        let reference = mass_properties(&mesh, 1.5);
        assert!(close(props.mass, reference.mass));
        assert!((props.inertia - reference.inertia).norm() < 1e-3);
    }

    #[test]
    fn flat_mesh_falls_back_to_a_point() {
        let mesh = TriMesh::new(
            vec![Vector3::zeros(), Vector3::new(1., 0., 0.), Vector3::new(0., 1., 0.)],
            vec![],
            vec![],
            vec![[0, 1, 2]],
        );
        let props = mass_properties(&mesh, 1.);
        assert_eq!(props.volume, 0.);
        assert_eq!(props.mass, 1.);
    }
}

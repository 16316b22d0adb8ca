use serde::{Deserialize, Serialize};
use sim::JointDesc;

/// Tuning for fracturing and for how chunks behave once they exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShatterConfig {
    /// Chunks at this generation no longer re-fracture.
    pub max_generation: u32,
    /// Impulse magnitude a chunk must exceed to re-fracture.
    pub damage_threshold: f32,
    pub refracture_chunk_count: u32,
    pub refracture_chunk_mass: f32,
    pub refracture_joint_break_force: f32,
    /// Mass every chunk is given while frozen.
    pub frozen_mass: f32,
    pub touch_radius: f32,
    /// Barycentric subdivisions per triangle when sampling for touching chunks. 1 means
    /// vertices only.
    pub touch_subdivisions: u32,
    pub anchor_frame_width: f32,
    pub joint_break_torque: f32,
    pub max_velocity: f32,
    pub damping: f32,
    pub solver_position_iterations: u32,
    pub solver_velocity_iterations: u32,
}

impl Default for ShatterConfig {
    fn default() -> Self {
        Self {
            max_generation: 3,
            damage_threshold: 5.,
            refracture_chunk_count: 5,
            refracture_chunk_mass: 7.5,
            refracture_joint_break_force: 2000.,
            frozen_mass: 3.,
            touch_radius: 0.01,
            touch_subdivisions: 1,
            anchor_frame_width: 0.01,
            joint_break_torque: 1000.,
            max_velocity: 1000.,
            damping: 0.01,
            solver_position_iterations: 4,
            solver_velocity_iterations: 16,
        }
    }
}

impl ShatterConfig {
    /// Joints between chunks never collide internally and never transmit inertia.
    pub fn joint_desc(&self, break_force: f32) -> JointDesc {
        JointDesc {
            break_force,
            break_torque: self.joint_break_torque,
            collision_enabled: false,
            inv_inertia_scales: (0., 0.),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: ShatterConfig = serde_json::from_str(r#"{ "max_generation": 1, "touch_subdivisions": 4 }"#).unwrap();
        assert_eq!(config.max_generation, 1);
        assert_eq!(config.touch_subdivisions, 4);
        assert_eq!(config.damage_threshold, 5.);
        assert_eq!(config.refracture_chunk_count, 5);
    }
}

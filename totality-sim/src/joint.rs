use crate::BodyHandle;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct JointDesc {
    pub break_force: f32,
    pub break_torque: f32,
    pub collision_enabled: bool,
    /// Inverse inertia scales of the first and second body.
    pub inv_inertia_scales: (f32, f32),
}
impl Default for JointDesc {
    fn default() -> Self {
        Self {
            break_force: f32::MAX,
            break_torque: f32::MAX,
            collision_enabled: true,
            inv_inertia_scales: (1., 1.),
        }
    }
}

/// Glues two bodies together until a large enough impulse snaps it. Once broken it stays
/// broken, and stays in the world until destroyed.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedJoint {
    bodies: (BodyHandle, BodyHandle),
    break_force: f32,
    break_torque: f32,
    collision_enabled: bool,
    inv_inertia_scales: (f32, f32),
    broken: bool,
}

impl FixedJoint {
    pub(crate) fn new(desc: JointDesc, a: BodyHandle, b: BodyHandle) -> Self {
        Self {
            bodies: (a, b),
            break_force: desc.break_force,
            break_torque: desc.break_torque,
            collision_enabled: desc.collision_enabled,
            inv_inertia_scales: desc.inv_inertia_scales,
            broken: false,
        }
    }

    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        self.bodies
    }

    /// The body on the far side from `body`, if `body` is attached at all.
    pub fn other(&self, body: BodyHandle) -> Option<BodyHandle> {
        match self.bodies {
            (a, b) if a == body => Some(b),
            (a, b) if b == body => Some(a),
            _ => None,
        }
    }

    pub fn break_force(&self) -> f32 {
        self.break_force
    }

    pub fn break_torque(&self) -> f32 {
        self.break_torque
    }

    pub fn is_collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    pub fn inv_inertia_scales(&self) -> (f32, f32) {
        self.inv_inertia_scales
    }

    pub fn set_inv_inertia_scales(&mut self, first: f32, second: f32) {
        self.inv_inertia_scales = (first, second);
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Returns whether this call did the breaking.
    pub(crate) fn snap(&mut self) -> bool {
        !std::mem::replace(&mut self.broken, true)
    }
}

use glam::Vec3;

/// A camera as decoded from the source file.
///
/// Placement is relative to the node of the same name; `position`, `up`, and
/// `look_at` are in that node's local space.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: String,
    pub position: Vec3,
    pub up: Vec3,
    pub look_at: Vec3,
    /// Horizontal field of view, in radians.
    pub horizontal_fov: f32,
    pub clip_plane_near: f32,
    pub clip_plane_far: f32,
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: Vec3::ZERO,
            up: Vec3::Y,
            look_at: -Vec3::Z,
            horizontal_fov: 0.25 * std::f32::consts::PI,
            clip_plane_near: 0.1,
            clip_plane_far: 1000.0,
            aspect: 0.0,
        }
    }
}

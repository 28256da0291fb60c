use glam::Vec3;

/// Kind-specific light parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point {
        /// Effective range of the falloff.
        range: f32,
    },
    Spot {
        range: f32,
        /// Inner cone angle, in radians.
        inner_cone: f32,
        /// Outer cone angle, in radians.
        outer_cone: f32,
    },
}

/// A light source as decoded from the source file.
///
/// Placement is relative to the node of the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: String,
    pub kind: LightKind,
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Light {
    #[must_use]
    pub fn new_directional(name: impl Into<String>, color: Vec3, intensity: f32) -> Self {
        Self {
            name: name.into(),
            kind: LightKind::Directional,
            position: Vec3::ZERO,
            direction: -Vec3::Z,
            color,
            intensity,
        }
    }

    #[must_use]
    pub fn new_point(name: impl Into<String>, color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            name: name.into(),
            kind: LightKind::Point { range },
            position: Vec3::ZERO,
            direction: -Vec3::Z,
            color,
            intensity,
        }
    }
}

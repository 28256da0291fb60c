use glam::{Quat, Vec3};

/// Ticks-per-second value assumed when an animation carries the `0` sentinel.
pub const DEFAULT_TICKS_PER_SECOND: f64 = 25.0;

/// A time-value pair holding a 3D vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorKey {
    /// Key time, in ticks.
    pub time: f64,
    pub value: Vec3,
}

/// A time-value pair holding a rotation quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuatKey {
    /// Key time, in ticks.
    pub time: f64,
    pub value: Quat,
}

/// Per-node animation track.
///
/// Targets the node whose name matches `node_name` and carries three
/// independent key arrays. Key times are non-decreasing within each array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeChannel {
    pub node_name: String,
    pub position_keys: Vec<VectorKey>,
    pub rotation_keys: Vec<QuatKey>,
    pub scaling_keys: Vec<VectorKey>,
}

impl NodeChannel {
    /// Largest key time across the three key arrays, in ticks.
    #[must_use]
    pub fn max_key_time(&self) -> f64 {
        let pos = self.position_keys.last().map_or(0.0, |k| k.time);
        let rot = self.rotation_keys.last().map_or(0.0, |k| k.time);
        let scl = self.scaling_keys.last().map_or(0.0, |k| k.time);
        pos.max(rot).max(scl)
    }
}

/// A named animation built from per-node channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    pub name: String,
    /// Duration in ticks. `-1.0` is a loader sentinel meaning "derive from
    /// the longest channel"; the scene preprocessor resolves it.
    pub duration: f64,
    /// Ticks per second. `0.0` means "use the default of 25"; see
    /// [`Animation::effective_ticks_per_second`].
    pub ticks_per_second: f64,
    pub channels: Vec<NodeChannel>,
}

impl Animation {
    /// Ticks-per-second with the `0` sentinel resolved to
    /// [`DEFAULT_TICKS_PER_SECOND`].
    #[must_use]
    pub fn effective_ticks_per_second(&self) -> f64 {
        if self.ticks_per_second == 0.0 {
            DEFAULT_TICKS_PER_SECOND
        } else {
            self.ticks_per_second
        }
    }
}

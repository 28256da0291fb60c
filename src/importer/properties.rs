//! Typed, string-keyed configuration store.
//!
//! Loaders and post-processing stages snapshot their configuration from the
//! dispatcher's store via `setup_properties` just before running. Getters
//! take a caller-supplied default returned when the key is absent.

use rustc_hash::FxHashMap;

/// Well-known configuration keys.
pub mod config {
    /// Maximum smoothing angle for smooth normal generation, in degrees
    /// (float, default 175).
    pub const PP_GSN_MAX_SMOOTHING_ANGLE: &str = "pp.gsn.max_smoothing_angle";
    /// Maximum smoothing angle for tangent generation, in degrees
    /// (float, default 45).
    pub const PP_CT_MAX_SMOOTHING_ANGLE: &str = "pp.ct.max_smoothing_angle";
    /// Maximum bone influences per vertex (int, default 4).
    pub const PP_LBW_MAX_WEIGHTS: &str = "pp.lbw.max_weights";
    /// Triangle count above which a mesh is split (int, default 1000000).
    pub const PP_SLM_TRIANGLE_LIMIT: &str = "pp.slm.triangle_limit";
    /// Vertex count above which a mesh is split (int, default 1000000).
    pub const PP_SLM_VERTEX_LIMIT: &str = "pp.slm.vertex_limit";
    /// Simulated post-transform cache size for the locality optimizer
    /// (int, default 12).
    pub const PP_ICL_CACHE_SIZE: &str = "pp.icl.cache_size";
    /// `PrimitiveTypes` bits to drop entirely during sort-by-primitive-type
    /// (int bitmask, default 0).
    pub const PP_SBP_REMOVE: &str = "pp.sbp.remove";
    /// Remove degenerate faces instead of demoting them to lines/points
    /// (int treated as bool, default 0).
    pub const PP_FD_REMOVE: &str = "pp.fd.remove";
    /// `ComponentFlags` bits stripped by remove-vertex-components
    /// (int bitmask, default 0).
    pub const PP_RVC_FLAGS: &str = "pp.rvc.flags";
}

/// Three parallel typed mappings: int, float, and string.
///
/// Lives as long as the owning dispatcher and is copied when the dispatcher
/// is cloned; loaded scene data never is.
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    ints: FxHashMap<String, i32>,
    floats: FxHashMap<String, f32>,
    strings: FxHashMap<String, String>,
}

impl PropertyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i32) {
        self.ints.insert(key.into(), value);
    }

    pub fn set_float(&mut self, key: impl Into<String>, value: f32) {
        self.floats.insert(key.into(), value);
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.ints.get(key).copied().unwrap_or(default)
    }

    #[must_use]
    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.floats.get(key).copied().unwrap_or(default)
    }

    #[must_use]
    pub fn get_string<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.strings.get(key).map_or(default, String::as_str)
    }
}

//! Scene Preprocessor
//!
//! Fixed normalization applied to every freshly decoded scene, between the
//! loader and the post-processing pipeline, regardless of requested steps:
//!
//! - infer per-mesh primitive types where the loader left them unset
//! - default the meaningful-component count of populated UV sets to 2
//! - synthesize a default material when meshes exist but no material does
//! - resolve the `-1` animation duration sentinel from the longest channel

use crate::scene::material::{keys, Material};
use crate::scene::Scene;

/// Name given to the synthesized fallback material.
pub const DEFAULT_MATERIAL_NAME: &str = "DefaultMaterial";

/// Runs the full preprocessor over `scene`. The dispatcher calls this
/// between decode and pipeline; it is exposed for callers assembling scenes
/// by hand.
pub fn preprocess_scene(scene: &mut Scene) {
    for mesh in &mut scene.meshes {
        if mesh.primitive_types.is_empty() {
            mesh.update_primitive_types();
        }
        for set in 0..crate::scene::MAX_UV_SETS {
            if !mesh.uvs[set].is_empty() && mesh.uv_components[set] == 0 {
                mesh.uv_components[set] = 2;
            }
        }
    }

    if scene.materials.is_empty() && !scene.meshes.is_empty() {
        let mut material = Material::new();
        material.set_string(keys::NAME, DEFAULT_MATERIAL_NAME);
        material.set_floats(keys::COLOR_DIFFUSE, [0.6, 0.6, 0.6]);
        scene.materials.push(material);
        for mesh in &mut scene.meshes {
            mesh.material_index = 0;
        }
        log::debug!("Preprocessor: no materials present, created {DEFAULT_MATERIAL_NAME}");
    }

    for animation in &mut scene.animations {
        if animation.duration < 0.0 {
            animation.duration = animation
                .channels
                .iter()
                .map(crate::scene::NodeChannel::max_key_time)
                .fold(0.0, f64::max);
            log::debug!(
                "Preprocessor: derived duration {} for animation '{}'",
                animation.duration,
                animation.name
            );
        }
    }
}

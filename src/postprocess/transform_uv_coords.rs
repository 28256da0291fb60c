//! Texture coordinate transform baking.
//!
//! Materials may carry a UV transform (offset, scale, rotation) for texture
//! coordinate set 0. This stage bakes that transform into the coordinates
//! of every mesh using the material and removes the property, so downstream
//! consumers never have to evaluate it at sample time.

use glam::Vec3;

use crate::errors::Result;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::material::keys;
use crate::scene::Scene;

pub struct TransformUvCoords;

impl PostProcessStage for TransformUvCoords {
    fn name(&self) -> &'static str {
        "transform-uv-coords"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::TRANSFORM_UV_COORDS)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        for (material_index, material) in scene.materials.iter_mut().enumerate() {
            let Some(values) = material.get_floats(keys::UV_TRANSFORM) else {
                continue;
            };
            if values.len() != 5 {
                log::warn!(
                    "TransformUvCoords: malformed UV transform on material {material_index}"
                );
                continue;
            }
            let [offset_u, offset_v, scale_u, scale_v, rotation] =
                [values[0], values[1], values[2], values[3], values[4]];
            let (sin, cos) = rotation.sin_cos();

            for mesh in &mut scene.meshes {
                if mesh.material_index as usize != material_index || !mesh.has_uv_set(0) {
                    continue;
                }
                for uv in &mut mesh.uvs[0] {
                    // Scale, then rotate around the set center, then offset.
                    let mut u = uv.x * scale_u;
                    let mut v = uv.y * scale_v;
                    if rotation != 0.0 {
                        let (cu, cv) = (u - 0.5, v - 0.5);
                        u = 0.5 + cu * cos - cv * sin;
                        v = 0.5 + cu * sin + cv * cos;
                    }
                    *uv = Vec3::new(u + offset_u, v + offset_v, uv.z);
                }
            }
            material.remove(keys::UV_TRANSFORM);
        }
        Ok(())
    }
}

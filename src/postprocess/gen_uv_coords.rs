//! UV coordinate generation.
//!
//! Meshes without texture coordinate set 0 receive a spherical mapping
//! derived from the vertex direction relative to the mesh centroid. The
//! source formats this crate handles carry no mapping description, so the
//! projection choice is fixed rather than per-material.

use glam::Vec3;
use std::f32::consts::{PI, TAU};

use crate::errors::Result;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::Scene;

pub struct GenUvCoords;

impl PostProcessStage for GenUvCoords {
    fn name(&self) -> &'static str {
        "gen-uv-coords"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::GEN_UV_COORDS)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        for mesh in &mut scene.meshes {
            if mesh.has_uv_set(0) || !mesh.has_positions() {
                continue;
            }

            let centroid =
                mesh.positions.iter().sum::<Vec3>() / mesh.vertex_count().max(1) as f32;
            let uvs = mesh
                .positions
                .iter()
                .map(|&position| {
                    let dir = (position - centroid).normalize_or_zero();
                    if dir == Vec3::ZERO {
                        Vec3::ZERO
                    } else {
                        let u = 0.5 + dir.z.atan2(dir.x) / TAU;
                        let v = 0.5 - dir.y.asin() / PI;
                        Vec3::new(u, v, 0.0)
                    }
                })
                .collect();
            mesh.uvs[0] = uvs;
            mesh.uv_components[0] = 2;
            log::debug!("GenUvCoords: generated spherical mapping for mesh '{}'", mesh.name);
        }
        Ok(())
    }
}

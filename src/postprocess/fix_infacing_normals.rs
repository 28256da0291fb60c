//! Inward-facing normal repair.
//!
//! Heuristic: offset every vertex along its normal and compare the bounding
//! box against the original. If the offset box is smaller, the normals
//! point into the body; flip them and reverse the winding so lighting and
//! culling stay consistent.

use glam::Vec3;

use crate::errors::Result;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::Scene;

pub struct FixInfacingNormals;

impl PostProcessStage for FixInfacingNormals {
    fn name(&self) -> &'static str {
        "fix-infacing-normals"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::FIX_INFACING_NORMALS)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        for mesh in &mut scene.meshes {
            if !mesh.has_normals() || !mesh.has_positions() {
                continue;
            }

            let mut min0 = Vec3::splat(f32::INFINITY);
            let mut max0 = Vec3::splat(f32::NEG_INFINITY);
            let mut min1 = min0;
            let mut max1 = max0;
            for (position, normal) in mesh.positions.iter().zip(&mesh.normals) {
                min0 = min0.min(*position);
                max0 = max0.max(*position);
                let offset = *position + *normal;
                min1 = min1.min(offset);
                max1 = max1.max(offset);
            }

            let extent0 = (max0 - min0).length_squared();
            let extent1 = (max1 - min1).length_squared();
            if extent1 >= extent0 {
                continue;
            }

            log::debug!("FixInfacingNormals: flipping normals of mesh '{}'", mesh.name);
            for normal in &mut mesh.normals {
                *normal = -*normal;
            }
            for face in &mut mesh.faces {
                face.indices.reverse();
            }
        }
        Ok(())
    }
}

//! Flat (face) normal generation.
//!
//! Every vertex of a face receives the face's geometric normal. Meshes that
//! already carry normals are left alone. Point and line faces get a zero
//! normal; the find-invalid-data stage can strip those later if asked.

use glam::Vec3;

use crate::errors::Result;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::Scene;

pub struct GenFaceNormals;

impl PostProcessStage for GenFaceNormals {
    fn name(&self) -> &'static str {
        "gen-face-normals"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::GEN_NORMALS)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        for mesh in &mut scene.meshes {
            if mesh.has_normals() || !mesh.has_positions() {
                continue;
            }
            let mut normals = vec![Vec3::ZERO; mesh.vertex_count()];
            for face in &mesh.faces {
                if face.indices.len() < 3 {
                    continue;
                }
                let a = mesh.positions[face.indices[0] as usize];
                let b = mesh.positions[face.indices[1] as usize];
                let c = mesh.positions[face.indices[2] as usize];
                let normal = (b - a).cross(c - a).normalize_or_zero();
                for &index in &face.indices {
                    normals[index as usize] = normal;
                }
            }
            mesh.normals = normals;
        }
        Ok(())
    }
}

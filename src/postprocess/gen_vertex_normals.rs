//! Smooth (vertex) normal generation.
//!
//! Computes the geometric normal of each face, then replaces every vertex
//! normal with the average over all vertices at (nearly) the same position
//! whose face normals lie within the configured smoothing cone. Position
//! neighborhoods come from the shared spatial sort index, so this stage only
//! runs inside the marker window.

use glam::Vec3;

use crate::errors::Result;
use crate::importer::{config, PropertyStore};
use crate::postprocess::util::position_epsilon;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::Scene;

pub struct GenVertexNormals {
    max_smoothing_angle_deg: f32,
}

impl Default for GenVertexNormals {
    fn default() -> Self {
        Self {
            max_smoothing_angle_deg: 175.0,
        }
    }
}

impl PostProcessStage for GenVertexNormals {
    fn name(&self) -> &'static str {
        "gen-vertex-normals"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::GEN_SMOOTH_NORMALS)
    }

    fn setup_properties(&mut self, props: &PropertyStore) {
        self.max_smoothing_angle_deg =
            props.get_float(config::PP_GSN_MAX_SMOOTHING_ANGLE, 175.0);
    }

    fn execute(&mut self, scene: &mut Scene, shared: &mut SharedPostState) -> Result<()> {
        let angle_limit = self.max_smoothing_angle_deg.to_radians().cos();

        for (mesh_index, mesh) in scene.meshes.iter_mut().enumerate() {
            if mesh.has_normals() || !mesh.has_positions() {
                continue;
            }
            let sort = shared.spatial_sort_for(mesh_index)?;

            // Pass 1: per-vertex face normals. Verbose layout puts each
            // vertex in at most one face.
            let mut face_normals = vec![Vec3::ZERO; mesh.vertex_count()];
            for face in &mesh.faces {
                if face.indices.len() < 3 {
                    continue;
                }
                let a = mesh.positions[face.indices[0] as usize];
                let b = mesh.positions[face.indices[1] as usize];
                let c = mesh.positions[face.indices[2] as usize];
                let normal = (b - a).cross(c - a).normalize_or_zero();
                for &index in &face.indices {
                    face_normals[index as usize] = normal;
                }
            }

            // Pass 2: average over the position neighborhood, limited to
            // faces within the smoothing cone.
            let epsilon = position_epsilon(mesh);
            let mut neighbors = Vec::new();
            let mut smoothed = vec![Vec3::ZERO; mesh.vertex_count()];
            for (i, &own) in face_normals.iter().enumerate() {
                sort.find_positions(mesh.positions[i], epsilon, &mut neighbors);
                let mut accum = Vec3::ZERO;
                for &other in &neighbors {
                    let candidate = face_normals[other as usize];
                    if own.dot(candidate) >= angle_limit {
                        accum += candidate;
                    }
                }
                smoothed[i] = accum.normalize_or_zero();
            }
            mesh.normals = smoothed;
        }
        Ok(())
    }
}

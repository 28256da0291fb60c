//! Tangent and bitangent generation.
//!
//! Derives a per-vertex tangent frame from texture coordinate set 0:
//! per-triangle tangent directions are assigned to the triangle's vertices,
//! smoothed over position duplicates within the configured cone (via the
//! shared spatial sort index), then Gram-Schmidt orthonormalized against the
//! vertex normal. Requires normals and UVs; meshes lacking either are
//! skipped with a log note.

use glam::Vec3;

use crate::errors::Result;
use crate::importer::{config, PropertyStore};
use crate::postprocess::util::position_epsilon;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::Scene;

pub struct CalcTangentSpace {
    max_smoothing_angle_deg: f32,
}

impl Default for CalcTangentSpace {
    fn default() -> Self {
        Self {
            max_smoothing_angle_deg: 45.0,
        }
    }
}

impl PostProcessStage for CalcTangentSpace {
    fn name(&self) -> &'static str {
        "calc-tangent-space"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::CALC_TANGENT_SPACE)
    }

    fn setup_properties(&mut self, props: &PropertyStore) {
        self.max_smoothing_angle_deg = props.get_float(config::PP_CT_MAX_SMOOTHING_ANGLE, 45.0);
    }

    fn execute(&mut self, scene: &mut Scene, shared: &mut SharedPostState) -> Result<()> {
        let angle_limit = self.max_smoothing_angle_deg.to_radians().cos();

        for (mesh_index, mesh) in scene.meshes.iter_mut().enumerate() {
            if mesh.has_tangents() {
                continue;
            }
            if !mesh.has_normals() || !mesh.has_uv_set(0) {
                log::debug!(
                    "CalcTangentSpace: skipping mesh '{}' (needs normals and UV set 0)",
                    mesh.name
                );
                continue;
            }
            let sort = shared.spatial_sort_for(mesh_index)?;

            let count = mesh.vertex_count();
            let mut raw_tangents = vec![Vec3::ZERO; count];
            let mut raw_bitangents = vec![Vec3::ZERO; count];

            for face in &mesh.faces {
                if face.indices.len() < 3 {
                    continue;
                }
                let i0 = face.indices[0] as usize;
                let i1 = face.indices[1] as usize;
                let i2 = face.indices[2] as usize;

                let edge1 = mesh.positions[i1] - mesh.positions[i0];
                let edge2 = mesh.positions[i2] - mesh.positions[i0];
                let duv1 = mesh.uvs[0][i1] - mesh.uvs[0][i0];
                let duv2 = mesh.uvs[0][i2] - mesh.uvs[0][i0];

                let det = duv1.x * duv2.y - duv1.y * duv2.x;
                let (tangent, bitangent) = if det.abs() < 1e-10 {
                    // Degenerate UV mapping; keep zero and patch below.
                    (Vec3::ZERO, Vec3::ZERO)
                } else {
                    let r = 1.0 / det;
                    (
                        (edge1 * duv2.y - edge2 * duv1.y) * r,
                        (edge2 * duv1.x - edge1 * duv2.x) * r,
                    )
                };
                for &index in &face.indices {
                    raw_tangents[index as usize] = tangent;
                    raw_bitangents[index as usize] = bitangent;
                }
            }

            // Smooth across position duplicates, then orthonormalize.
            let epsilon = position_epsilon(mesh);
            let mut neighbors = Vec::new();
            let mut tangents = vec![Vec3::ZERO; count];
            let mut bitangents = vec![Vec3::ZERO; count];
            for i in 0..count {
                let own = raw_tangents[i];
                let mut accum = own;
                if own != Vec3::ZERO {
                    sort.find_positions(mesh.positions[i], epsilon, &mut neighbors);
                    for &other in &neighbors {
                        let candidate = raw_tangents[other as usize];
                        if other as usize != i
                            && candidate != Vec3::ZERO
                            && own.normalize().dot(candidate.normalize()) >= angle_limit
                        {
                            accum += candidate;
                        }
                    }
                }

                let normal = mesh.normals[i];
                let mut tangent = (accum - normal * normal.dot(accum)).normalize_or_zero();
                if tangent == Vec3::ZERO {
                    // No usable UV gradient; pick any axis orthogonal to the
                    // normal so the frame stays complete.
                    tangent = normal.any_orthonormal_vector();
                }
                let mut bitangent = normal.cross(tangent);
                if bitangent.dot(raw_bitangents[i]) < 0.0 {
                    bitangent = -bitangent;
                }
                tangents[i] = tangent;
                bitangents[i] = bitangent;
            }
            mesh.tangents = tangents;
            mesh.bitangents = bitangents;
        }
        Ok(())
    }
}

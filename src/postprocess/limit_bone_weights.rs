//! Bone weight limiting.
//!
//! Caps the number of bone influences per vertex at a configurable limit
//! (default 4). The weakest influences are removed and the survivors are
//! renormalized to sum to 1. Bones left without any influence are removed.

use crate::errors::Result;
use crate::importer::{config, PropertyStore};
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::Scene;

pub struct LimitBoneWeights {
    max_weights: usize,
}

impl Default for LimitBoneWeights {
    fn default() -> Self {
        Self { max_weights: 4 }
    }
}

impl PostProcessStage for LimitBoneWeights {
    fn name(&self) -> &'static str {
        "limit-bone-weights"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::LIMIT_BONE_WEIGHTS)
    }

    fn setup_properties(&mut self, props: &PropertyStore) {
        self.max_weights = props.get_int(config::PP_LBW_MAX_WEIGHTS, 4).max(1) as usize;
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        for mesh in &mut scene.meshes {
            if !mesh.has_bones() {
                continue;
            }

            // (bone index, weight) influences per vertex
            let mut per_vertex: Vec<Vec<(usize, f32)>> = vec![Vec::new(); mesh.vertex_count()];
            for (bone_index, bone) in mesh.bones.iter().enumerate() {
                for weight in &bone.weights {
                    per_vertex[weight.vertex_id as usize].push((bone_index, weight.weight));
                }
            }

            let mut removed = 0usize;
            for influences in &mut per_vertex {
                if influences.len() <= self.max_weights {
                    continue;
                }
                influences.sort_by(|a, b| b.1.total_cmp(&a.1));
                removed += influences.len() - self.max_weights;
                influences.truncate(self.max_weights);
                let sum: f32 = influences.iter().map(|(_, w)| w).sum();
                if sum > 0.0 {
                    for influence in influences.iter_mut() {
                        influence.1 /= sum;
                    }
                }
            }
            if removed == 0 {
                continue;
            }

            for bone in &mut mesh.bones {
                bone.weights.clear();
            }
            for (vertex_id, influences) in per_vertex.iter().enumerate() {
                for &(bone_index, weight) in influences {
                    mesh.bones[bone_index].weights.push(crate::scene::VertexWeight {
                        vertex_id: vertex_id as u32,
                        weight,
                    });
                }
            }
            let before = mesh.bones.len();
            mesh.bones.retain(|bone| !bone.weights.is_empty());
            log::debug!(
                "LimitBoneWeights: mesh '{}': removed {removed} influence(s), {} empty bone(s)",
                mesh.name,
                before - mesh.bones.len()
            );
        }
        Ok(())
    }
}

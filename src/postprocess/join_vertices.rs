//! Join-identical-vertices stage.
//!
//! Collapses vertices whose full attribute sets are identical into shared,
//! indexed vertices. Candidates come from the shared spatial sort index;
//! only candidates whose every attribute compares equal are merged, so two
//! faces end up sharing an index only when the shared vertex data is
//! interchangeable. Leaving verbose layout is recorded on the scene via
//! [`SceneFlags::NON_VERBOSE_FORMAT`].
//!
//! [`SceneFlags::NON_VERBOSE_FORMAT`]: crate::scene::SceneFlags

use crate::errors::Result;
use crate::postprocess::util::copy_vertices_by_order;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{Bone, Mesh, Scene, SceneFlags, VertexWeight, MAX_COLOR_SETS, MAX_UV_SETS};

const JOIN_RADIUS: f32 = 1e-5;

pub struct JoinIdenticalVertices;

impl PostProcessStage for JoinIdenticalVertices {
    fn name(&self) -> &'static str {
        "join-identical-vertices"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::JOIN_IDENTICAL_VERTICES)
    }

    fn execute(&mut self, scene: &mut Scene, shared: &mut SharedPostState) -> Result<()> {
        let mut before = 0usize;
        let mut after = 0usize;

        for (mesh_index, mesh) in scene.meshes.iter_mut().enumerate() {
            let sort = shared.spatial_sort_for(mesh_index)?;
            let count = mesh.vertex_count();
            before += count;

            const UNSET: u32 = u32::MAX;
            let mut replacement = vec![UNSET; count];
            // order[new_index] = first old index carrying that vertex data
            let mut order: Vec<u32> = Vec::new();
            let mut neighbors = Vec::new();

            for i in 0..count {
                if replacement[i] != UNSET {
                    continue;
                }
                let new_index = order.len() as u32;
                order.push(i as u32);
                replacement[i] = new_index;

                sort.find_positions(mesh.positions[i], JOIN_RADIUS, &mut neighbors);
                for &candidate in &neighbors {
                    let j = candidate as usize;
                    if j > i && replacement[j] == UNSET && same_vertex(mesh, i, j) {
                        replacement[j] = new_index;
                    }
                }
            }

            if order.len() == count {
                after += count;
                continue;
            }

            let mut joined = copy_vertices_by_order(mesh, &order);
            joined.faces = mesh.faces.clone();
            for face in &mut joined.faces {
                for index in &mut face.indices {
                    *index = replacement[*index as usize];
                }
            }
            joined.primitive_types = mesh.primitive_types;

            // Remap influences through the replacement table; duplicates
            // collapsing onto the same new vertex keep a single entry.
            joined.bones.clear();
            for bone in &mesh.bones {
                let mut weights: Vec<VertexWeight> = bone
                    .weights
                    .iter()
                    .map(|w| VertexWeight {
                        vertex_id: replacement[w.vertex_id as usize],
                        weight: w.weight,
                    })
                    .collect();
                weights.sort_by_key(|w| w.vertex_id);
                weights.dedup_by_key(|w| w.vertex_id);
                if !weights.is_empty() {
                    joined.bones.push(Bone {
                        name: bone.name.clone(),
                        offset_matrix: bone.offset_matrix,
                        weights,
                    });
                }
            }

            after += joined.vertex_count();
            *mesh = joined;
        }

        if after < before {
            scene.flags |= SceneFlags::NON_VERBOSE_FORMAT;
            log::debug!("JoinIdenticalVertices: {before} vertices down to {after}");
        }
        Ok(())
    }
}

/// Full-attribute equality; merged vertices must be interchangeable.
fn same_vertex(mesh: &Mesh, a: usize, b: usize) -> bool {
    if mesh.positions[a] != mesh.positions[b] {
        return false;
    }
    if !mesh.normals.is_empty() && mesh.normals[a] != mesh.normals[b] {
        return false;
    }
    if !mesh.tangents.is_empty()
        && (mesh.tangents[a] != mesh.tangents[b] || mesh.bitangents[a] != mesh.bitangents[b])
    {
        return false;
    }
    for set in 0..MAX_COLOR_SETS {
        if !mesh.colors[set].is_empty() && mesh.colors[set][a] != mesh.colors[set][b] {
            return false;
        }
    }
    for set in 0..MAX_UV_SETS {
        if !mesh.uvs[set].is_empty() && mesh.uvs[set][a] != mesh.uvs[set][b] {
            return false;
        }
    }
    true
}

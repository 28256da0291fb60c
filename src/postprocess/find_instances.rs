//! Duplicate mesh instancing.
//!
//! Detects meshes that are exact copies of an earlier mesh (same material,
//! primitive types, vertex streams, and faces) and rewrites node references
//! to point at the first occurrence, dropping the copies. A cheap structural
//! hash prunes the candidate set before full equality is checked.

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::postprocess::util::remap_node_mesh_indices;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{Mesh, Scene};

pub struct FindInstances;

impl PostProcessStage for FindInstances {
    fn name(&self) -> &'static str {
        "find-instances"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::FIND_INSTANCES)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        let count = scene.meshes.len();
        if count < 2 {
            return Ok(());
        }

        let mut by_hash: FxHashMap<u64, Vec<usize>> = FxHashMap::default();
        let mut target: Vec<usize> = (0..count).collect();
        for (i, mesh) in scene.meshes.iter().enumerate() {
            let candidates = by_hash.entry(structural_hash(mesh)).or_default();
            if let Some(&original) = candidates
                .iter()
                .find(|&&j| same_mesh(&scene.meshes[j], mesh))
            {
                target[i] = original;
            } else {
                candidates.push(i);
            }
        }
        if target.iter().enumerate().all(|(i, &t)| i == t) {
            return Ok(());
        }

        // Compact the survivors and build old -> new mapping.
        let mut remap: Vec<Vec<u32>> = vec![Vec::new(); count];
        let mut survivors: Vec<Mesh> = Vec::new();
        for i in 0..count {
            if target[i] == i {
                remap[i] = vec![survivors.len() as u32];
                survivors.push(scene.meshes[i].clone());
            }
        }
        for i in 0..count {
            if target[i] != i {
                remap[i] = remap[target[i]].clone();
            }
        }

        log::debug!(
            "FindInstances: {count} mesh(es) down to {} unique",
            survivors.len()
        );
        scene.meshes = survivors;
        remap_node_mesh_indices(scene, &remap);
        Ok(())
    }
}

fn structural_hash(mesh: &Mesh) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = rustc_hash::FxHasher::default();
    mesh.vertex_count().hash(&mut hasher);
    mesh.face_count().hash(&mut hasher);
    mesh.material_index.hash(&mut hasher);
    mesh.primitive_types.bits().hash(&mut hasher);
    for position in &mesh.positions {
        position.x.to_bits().hash(&mut hasher);
        position.y.to_bits().hash(&mut hasher);
        position.z.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

fn same_mesh(a: &Mesh, b: &Mesh) -> bool {
    a.material_index == b.material_index
        && a.primitive_types == b.primitive_types
        && a.positions == b.positions
        && a.normals == b.normals
        && a.tangents == b.tangents
        && a.bitangents == b.bitangents
        && a.colors == b.colors
        && a.uvs == b.uvs
        && a.faces == b.faces
        && a.bones == b.bones
}

//! Redundant material elimination.
//!
//! Materials with identical live property lists are collapsed onto their
//! first occurrence, and materials no meshes reference are dropped. Mesh
//! material indices are remapped accordingly.

use crate::errors::Result;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::Scene;

pub struct RemoveRedundantMaterials;

impl PostProcessStage for RemoveRedundantMaterials {
    fn name(&self) -> &'static str {
        "remove-redundant-materials"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::REMOVE_REDUNDANT_MATERIALS)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        if scene.materials.is_empty() {
            return Ok(());
        }

        // Representative (first equal-content material) per slot.
        let count = scene.materials.len();
        let mut representative: Vec<usize> = (0..count).collect();
        for i in 1..count {
            for j in 0..i {
                if scene.materials[i].same_content(&scene.materials[j]) {
                    representative[i] = j;
                    break;
                }
            }
        }

        let mut referenced = vec![false; count];
        for mesh in &scene.meshes {
            referenced[representative[mesh.material_index as usize]] = true;
        }

        // Compact the survivors, preserving order.
        let mut remap = vec![0u32; count];
        let mut survivors = Vec::new();
        for (i, material) in scene.materials.iter().enumerate() {
            if representative[i] == i && referenced[i] {
                remap[i] = survivors.len() as u32;
                survivors.push(material.clone());
            }
        }
        if survivors.len() == count {
            return Ok(());
        }

        for mesh in &mut scene.meshes {
            mesh.material_index = remap[representative[mesh.material_index as usize]];
        }
        log::debug!(
            "RemoveRedundantMaterials: {count} material(s) down to {}",
            survivors.len()
        );
        scene.materials = survivors;
        Ok(())
    }
}

//! Sort-by-primitive-type stage.
//!
//! Splits meshes mixing primitive kinds (points, lines, triangles,
//! polygons) into one homogeneous mesh per kind, rewriting node references.
//! A configurable primitive mask drops whole kinds from the scene entirely;
//! commonly points and lines. If that removes every mesh the scene is
//! marked incomplete instead of failing.

use crate::errors::Result;
use crate::importer::{config, PropertyStore};
use crate::postprocess::util::{extract_submesh, remap_node_mesh_indices};
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{Face, Mesh, PrimitiveTypes, Scene, SceneFlags};

#[derive(Default)]
pub struct SortByPrimitiveType {
    remove_mask: PrimitiveTypes,
}

impl PostProcessStage for SortByPrimitiveType {
    fn name(&self) -> &'static str {
        "sort-by-primitive-type"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::SORT_BY_PRIMITIVE_TYPE)
    }

    fn setup_properties(&mut self, props: &PropertyStore) {
        self.remove_mask =
            PrimitiveTypes::from_bits_truncate(props.get_int(config::PP_SBP_REMOVE, 0) as u32);
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        let kinds = [
            PrimitiveTypes::POINT,
            PrimitiveTypes::LINE,
            PrimitiveTypes::TRIANGLE,
            PrimitiveTypes::POLYGON,
        ];

        let mut mapping: Vec<Vec<u32>> = Vec::with_capacity(scene.meshes.len());
        let mut output: Vec<Mesh> = Vec::new();
        let mut changed = false;

        for mesh in &scene.meshes {
            let present: Vec<PrimitiveTypes> = kinds
                .iter()
                .copied()
                .filter(|&kind| mesh.primitive_types.contains(kind))
                .collect();

            let homogeneous = present.len() <= 1;
            let affected = present.iter().any(|&kind| self.remove_mask.contains(kind));
            if homogeneous && !affected {
                mapping.push(vec![output.len() as u32]);
                output.push(mesh.clone());
                continue;
            }

            changed = true;
            let mut new_indices = Vec::new();
            for kind in present {
                if self.remove_mask.contains(kind) {
                    log::debug!(
                        "SortByPrimitiveType: dropping {kind:?} faces of mesh '{}'",
                        mesh.name
                    );
                    continue;
                }
                let faces: Vec<Face> = mesh
                    .faces
                    .iter()
                    .filter(|face| face.primitive_type() == kind)
                    .cloned()
                    .collect();
                if faces.is_empty() {
                    continue;
                }
                let mut sub = extract_submesh(mesh, &faces, false);
                if !homogeneous {
                    sub.name = format!("{}_{}", mesh.name, kind_suffix(kind));
                }
                new_indices.push(output.len() as u32);
                output.push(sub);
            }
            mapping.push(new_indices);
        }

        if changed {
            scene.meshes = output;
            remap_node_mesh_indices(scene, &mapping);
            if scene.meshes.is_empty() {
                log::warn!("SortByPrimitiveType: primitive removal left no meshes");
                scene.flags |= SceneFlags::INCOMPLETE;
            }
        }
        Ok(())
    }
}

fn kind_suffix(kind: PrimitiveTypes) -> &'static str {
    match kind {
        PrimitiveTypes::POINT => "points",
        PrimitiveTypes::LINE => "lines",
        PrimitiveTypes::TRIANGLE => "triangles",
        _ => "polygons",
    }
}

//! Degenerate face handling.
//!
//! A face is degenerate when distinct index slots carry the same position
//! (identical indices or bitwise-equal coordinates). By default degenerates
//! are demoted to the primitive their unique vertices actually span
//! (triangle with two unique corners becomes a line, and so on); with the
//! removal property set they are dropped and the mesh is rebuilt without
//! orphaned vertices.

use smallvec::SmallVec;

use crate::errors::Result;
use crate::importer::{config, PropertyStore};
use crate::postprocess::util::extract_submesh;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{Face, Scene};

#[derive(Default)]
pub struct FindDegenerates {
    remove: bool,
}

impl PostProcessStage for FindDegenerates {
    fn name(&self) -> &'static str {
        "find-degenerates"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::FIND_DEGENERATES)
    }

    fn setup_properties(&mut self, props: &PropertyStore) {
        self.remove = props.get_int(config::PP_FD_REMOVE, 0) != 0;
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        for mesh in &mut scene.meshes {
            let mut degenerate_count = 0usize;
            let mut kept: Vec<Face> = Vec::with_capacity(mesh.faces.len());

            for face in &mesh.faces {
                // Unique index slots by position value.
                let mut unique: SmallVec<[u32; 4]> = SmallVec::new();
                for &index in &face.indices {
                    let position = mesh.positions[index as usize];
                    if !unique
                        .iter()
                        .any(|&u| mesh.positions[u as usize] == position)
                    {
                        unique.push(index);
                    }
                }

                if unique.len() == face.indices.len() {
                    kept.push(face.clone());
                    continue;
                }
                degenerate_count += 1;
                if !self.remove {
                    kept.push(Face { indices: unique });
                }
            }

            if degenerate_count == 0 {
                continue;
            }
            log::debug!(
                "FindDegenerates: mesh '{}': {degenerate_count} degenerate face(s) {}",
                mesh.name,
                if self.remove { "removed" } else { "demoted" }
            );
            if self.remove {
                *mesh = extract_submesh(mesh, &kept, false);
            } else {
                mesh.faces = kept;
                mesh.update_primitive_types();
            }
        }
        Ok(())
    }
}

//! Triangulation stage.
//!
//! Fan-triangulates every polygon face. Points, lines, and triangles pass
//! through unchanged. Meshes containing polygons are rebuilt in verbose
//! layout, so corner vertices shared between fan triangles are duplicated
//! rather than referenced twice.

use smallvec::smallvec;

use crate::errors::Result;
use crate::postprocess::util::extract_submesh;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{Face, PrimitiveTypes, Scene};

pub struct Triangulate;

impl PostProcessStage for Triangulate {
    fn name(&self) -> &'static str {
        "triangulate"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::TRIANGULATE)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        let mut touched = 0usize;
        for mesh in &mut scene.meshes {
            if !mesh
                .faces
                .iter()
                .any(|f| f.primitive_type() == PrimitiveTypes::POLYGON)
            {
                continue;
            }

            let mut fan_faces: Vec<Face> = Vec::with_capacity(mesh.faces.len());
            for face in &mesh.faces {
                if face.indices.len() <= 3 {
                    fan_faces.push(face.clone());
                } else {
                    for i in 1..face.indices.len() - 1 {
                        fan_faces.push(Face {
                            indices: smallvec![
                                face.indices[0],
                                face.indices[i],
                                face.indices[i + 1],
                            ],
                        });
                    }
                }
            }
            *mesh = extract_submesh(mesh, &fan_faces, true);
            touched += 1;
        }
        if touched > 0 {
            log::debug!("Triangulate: rebuilt {touched} mesh(es)");
        }
        Ok(())
    }
}

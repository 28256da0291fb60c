//! Large mesh splitting, on two axes.
//!
//! [`SplitLargeMeshesTriangle`] caps the face count of a mesh;
//! [`SplitLargeMeshesVertex`] caps the vertex count by accumulating faces
//! until the budget is reached. Both rebuild the affected mesh into several
//! parts and fan node references out to all of them. Both service the same
//! step bit and differ only in their position in the pipeline: the triangle
//! axis runs before normal generation, the vertex axis after vertex joining.

use crate::errors::Result;
use crate::importer::{config, PropertyStore};
use crate::postprocess::util::{extract_submesh, remap_node_mesh_indices};
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{Face, Mesh, Scene};

const DEFAULT_LIMIT: i32 = 1_000_000;

pub struct SplitLargeMeshesTriangle {
    triangle_limit: usize,
}

impl Default for SplitLargeMeshesTriangle {
    fn default() -> Self {
        Self {
            triangle_limit: DEFAULT_LIMIT as usize,
        }
    }
}

impl PostProcessStage for SplitLargeMeshesTriangle {
    fn name(&self) -> &'static str {
        "split-large-meshes-triangle"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::SPLIT_LARGE_MESHES)
    }

    fn setup_properties(&mut self, props: &PropertyStore) {
        self.triangle_limit = props
            .get_int(config::PP_SLM_TRIANGLE_LIMIT, DEFAULT_LIMIT)
            .max(1) as usize;
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        split_meshes(scene, |mesh| {
            if mesh.face_count() <= self.triangle_limit {
                return None;
            }
            Some(
                mesh.faces
                    .chunks(self.triangle_limit)
                    .map(<[Face]>::to_vec)
                    .collect(),
            )
        })
    }
}

pub struct SplitLargeMeshesVertex {
    vertex_limit: usize,
}

impl Default for SplitLargeMeshesVertex {
    fn default() -> Self {
        Self {
            vertex_limit: DEFAULT_LIMIT as usize,
        }
    }
}

impl PostProcessStage for SplitLargeMeshesVertex {
    fn name(&self) -> &'static str {
        "split-large-meshes-vertex"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::SPLIT_LARGE_MESHES)
    }

    fn setup_properties(&mut self, props: &PropertyStore) {
        self.vertex_limit = props
            .get_int(config::PP_SLM_VERTEX_LIMIT, DEFAULT_LIMIT)
            .max(1) as usize;
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        split_meshes(scene, |mesh| {
            if mesh.vertex_count() <= self.vertex_limit {
                return None;
            }
            // Accumulate faces until their (worst-case unshared) vertex
            // demand would exceed the budget.
            let mut chunks: Vec<Vec<Face>> = Vec::new();
            let mut current: Vec<Face> = Vec::new();
            let mut budget = 0usize;
            for face in &mesh.faces {
                if !current.is_empty() && budget + face.indices.len() > self.vertex_limit {
                    chunks.push(std::mem::take(&mut current));
                    budget = 0;
                }
                budget += face.indices.len();
                current.push(face.clone());
            }
            if !current.is_empty() {
                chunks.push(current);
            }
            Some(chunks)
        })
    }
}

/// Applies `plan` to every mesh; a `Some` result replaces the mesh by one
/// part per face chunk and fans node references out accordingly.
fn split_meshes(
    scene: &mut Scene,
    mut plan: impl FnMut(&Mesh) -> Option<Vec<Vec<Face>>>,
) -> Result<()> {
    let count = scene.meshes.len();
    let mut mapping: Vec<Vec<u32>> = Vec::with_capacity(count);
    let mut output: Vec<Mesh> = Vec::new();
    let mut any_split = false;

    for mesh in &scene.meshes {
        match plan(mesh) {
            Some(chunks) if chunks.len() > 1 => {
                any_split = true;
                let mut new_indices = Vec::with_capacity(chunks.len());
                log::debug!(
                    "SplitLargeMeshes: splitting mesh '{}' into {} part(s)",
                    mesh.name,
                    chunks.len()
                );
                for (part, faces) in chunks.iter().enumerate() {
                    let mut sub = extract_submesh(mesh, faces, false);
                    sub.name = format!("{}_part{part}", mesh.name);
                    new_indices.push(output.len() as u32);
                    output.push(sub);
                }
                mapping.push(new_indices);
            }
            _ => {
                mapping.push(vec![output.len() as u32]);
                output.push(mesh.clone());
            }
        }
    }

    if any_split {
        scene.meshes = output;
        remap_node_mesh_indices(scene, &mapping);
    }
    Ok(())
}

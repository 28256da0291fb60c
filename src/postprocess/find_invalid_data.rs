//! Invalid vertex data detection and repair.
//!
//! - Non-finite position coordinates are fatal; the import fails with a
//!   message naming the mesh.
//! - Normal/tangent/bitangent streams that are entirely zero or contain
//!   non-finite values are stripped (later generation stages can rebuild
//!   them).
//! - Texture coordinate sets whose values are all identical carry no
//!   information and are removed; higher sets shift down.

use glam::Vec3;

use crate::errors::{ImportError, Result};
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{Scene, MAX_UV_SETS};

pub struct FindInvalidData;

impl PostProcessStage for FindInvalidData {
    fn name(&self) -> &'static str {
        "find-invalid-data"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::FIND_INVALID_DATA)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        for mesh in &mut scene.meshes {
            if mesh.positions.iter().any(|p| !p.is_finite()) {
                return Err(ImportError::Decode(format!(
                    "Mesh '{}' contains invalid (non-finite) positions",
                    mesh.name
                )));
            }

            if stream_is_invalid(&mesh.normals) {
                log::warn!("FindInvalidData: stripping invalid normals of mesh '{}'", mesh.name);
                mesh.normals.clear();
            }
            if stream_is_invalid(&mesh.tangents) || stream_is_invalid(&mesh.bitangents) {
                log::warn!(
                    "FindInvalidData: stripping invalid tangent frame of mesh '{}'",
                    mesh.name
                );
                mesh.tangents.clear();
                mesh.bitangents.clear();
            }

            // Drop constant UV sets, shifting the remaining ones down so
            // set 0 stays the primary channel.
            let mut write = 0usize;
            for read in 0..MAX_UV_SETS {
                if mesh.uvs[read].is_empty() {
                    continue;
                }
                let constant = mesh.uvs[read].windows(2).all(|w| w[0] == w[1])
                    && mesh.uvs[read].len() > 1;
                if constant || mesh.uvs[read].iter().any(|uv| !uv.is_finite()) {
                    log::warn!(
                        "FindInvalidData: removing texture coordinate set {read} of mesh '{}'",
                        mesh.name
                    );
                    continue;
                }
                if write != read {
                    mesh.uvs[write] = std::mem::take(&mut mesh.uvs[read]);
                    mesh.uv_components[write] = mesh.uv_components[read];
                }
                write += 1;
            }
            for set in write..MAX_UV_SETS {
                mesh.uvs[set] = Vec::new();
                mesh.uv_components[set] = 0;
            }
        }
        Ok(())
    }
}

/// A directional stream is invalid when it contains non-finite values or
/// carries no direction at all.
fn stream_is_invalid(stream: &[Vec3]) -> bool {
    if stream.is_empty() {
        return false;
    }
    stream.iter().any(|v| !v.is_finite()) || stream.iter().all(|v| v.length_squared() < 1e-12)
}

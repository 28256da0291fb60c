//! Removal of requested scene and vertex components.
//!
//! Strips the components named by the configured [`ComponentFlags`] mask
//! before any other stage touches the data: cheaper than importing,
//! generating, and then discarding. Removing meshes or materials marks the
//! scene incomplete so validation accepts the reduced structure.

use bitflags::bitflags;

use crate::errors::Result;
use crate::importer::{config, PropertyStore};
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{NodeHandle, Scene, SceneFlags, MAX_COLOR_SETS, MAX_UV_SETS};

bitflags! {
    /// Scene and vertex components the remove-vertex-components stage can
    /// strip.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ComponentFlags: u32 {
        const NORMALS                 = 1 << 0;
        const TANGENTS_AND_BITANGENTS = 1 << 1;
        const COLORS                  = 1 << 2;
        const TEXCOORDS               = 1 << 3;
        const BONE_WEIGHTS            = 1 << 4;
        const ANIMATIONS              = 1 << 5;
        const TEXTURES                = 1 << 6;
        const LIGHTS                  = 1 << 7;
        const CAMERAS                 = 1 << 8;
        const MESHES                  = 1 << 9;
        const MATERIALS               = 1 << 10;
    }
}

#[derive(Default)]
pub struct RemoveVertexComponents {
    mask: ComponentFlags,
}

impl PostProcessStage for RemoveVertexComponents {
    fn name(&self) -> &'static str {
        "remove-vertex-components"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::REMOVE_COMPONENT)
    }

    fn setup_properties(&mut self, props: &PropertyStore) {
        self.mask = ComponentFlags::from_bits_truncate(
            props.get_int(config::PP_RVC_FLAGS, 0) as u32
        );
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        if self.mask.is_empty() {
            log::debug!("RemoveVertexComponents: empty component mask, nothing to do");
            return Ok(());
        }

        if self.mask.contains(ComponentFlags::MESHES) {
            scene.meshes.clear();
            let handles: Vec<NodeHandle> = scene.nodes.keys().collect();
            for handle in handles {
                scene.nodes[handle].mesh_indices.clear();
            }
            scene.flags |= SceneFlags::INCOMPLETE;
        }
        if self.mask.contains(ComponentFlags::MATERIALS) {
            scene.materials.clear();
            for mesh in &mut scene.meshes {
                mesh.material_index = 0;
            }
            scene.flags |= SceneFlags::INCOMPLETE;
        }
        if self.mask.contains(ComponentFlags::ANIMATIONS) {
            scene.animations.clear();
        }
        if self.mask.contains(ComponentFlags::TEXTURES) {
            scene.textures.clear();
        }
        if self.mask.contains(ComponentFlags::LIGHTS) {
            scene.lights.clear();
        }
        if self.mask.contains(ComponentFlags::CAMERAS) {
            scene.cameras.clear();
        }

        for mesh in &mut scene.meshes {
            if self.mask.contains(ComponentFlags::NORMALS) {
                mesh.normals.clear();
            }
            if self.mask.contains(ComponentFlags::TANGENTS_AND_BITANGENTS) {
                mesh.tangents.clear();
                mesh.bitangents.clear();
            }
            if self.mask.contains(ComponentFlags::COLORS) {
                for set in 0..MAX_COLOR_SETS {
                    mesh.colors[set].clear();
                }
            }
            if self.mask.contains(ComponentFlags::TEXCOORDS) {
                for set in 0..MAX_UV_SETS {
                    mesh.uvs[set].clear();
                    mesh.uv_components[set] = 0;
                }
            }
            if self.mask.contains(ComponentFlags::BONE_WEIGHTS) {
                mesh.bones.clear();
            }
        }

        log::debug!("RemoveVertexComponents: stripped {:?}", self.mask);
        Ok(())
    }
}

//! Coordinate system conversion stages.
//!
//! Three independent stages that together convert the canonical
//! right-handed scene for left-handed consumers:
//!
//! - [`MakeLeftHanded`]: mirrors the Z axis through every transform, vertex
//!   stream, bone offset, animation key, camera, and light
//! - [`FlipUvs`]: flips the V texture coordinate of every UV set
//! - [`FlipWindingOrder`]: reverses the index order of every face
//!
//! Applying any of them twice restores the original data up to
//! floating-point rounding.

use glam::{Mat4, Quat, Vec3};

use crate::errors::Result;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{NodeHandle, Scene};

pub struct MakeLeftHanded;

impl PostProcessStage for MakeLeftHanded {
    fn name(&self) -> &'static str {
        "make-left-handed"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::MAKE_LEFT_HANDED)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        let mirror = Mat4::from_scale(Vec3::new(1.0, 1.0, -1.0));

        let handles: Vec<NodeHandle> = scene.nodes.keys().collect();
        for handle in handles {
            let node = &mut scene.nodes[handle];
            node.transform = mirror * node.transform * mirror;
        }

        for mesh in &mut scene.meshes {
            for position in &mut mesh.positions {
                position.z = -position.z;
            }
            for normal in &mut mesh.normals {
                normal.z = -normal.z;
            }
            for tangent in &mut mesh.tangents {
                tangent.z = -tangent.z;
            }
            // The frame stays right-handed relative to the mirrored normal
            // and tangent when the bitangent flips entirely.
            for bitangent in &mut mesh.bitangents {
                *bitangent = -*bitangent;
            }
            for bone in &mut mesh.bones {
                bone.offset_matrix = mirror * bone.offset_matrix * mirror;
            }
        }

        for animation in &mut scene.animations {
            for channel in &mut animation.channels {
                for key in &mut channel.position_keys {
                    key.value.z = -key.value.z;
                }
                for key in &mut channel.rotation_keys {
                    let q = key.value;
                    key.value = Quat::from_xyzw(-q.x, -q.y, q.z, q.w);
                }
            }
        }

        for camera in &mut scene.cameras {
            camera.position.z = -camera.position.z;
            camera.look_at.z = -camera.look_at.z;
            camera.up.z = -camera.up.z;
        }
        for light in &mut scene.lights {
            light.position.z = -light.position.z;
            light.direction.z = -light.direction.z;
        }
        Ok(())
    }
}

pub struct FlipUvs;

impl PostProcessStage for FlipUvs {
    fn name(&self) -> &'static str {
        "flip-uvs"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::FLIP_UVS)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        for mesh in &mut scene.meshes {
            for set in &mut mesh.uvs {
                for uv in set {
                    uv.y = 1.0 - uv.y;
                }
            }
        }
        Ok(())
    }
}

pub struct FlipWindingOrder;

impl PostProcessStage for FlipWindingOrder {
    fn name(&self) -> &'static str {
        "flip-winding-order"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::FLIP_WINDING_ORDER)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        for mesh in &mut scene.meshes {
            for face in &mut mesh.faces {
                face.indices.reverse();
            }
        }
        Ok(())
    }
}

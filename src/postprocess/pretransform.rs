//! Pre-transform-vertices stage.
//!
//! Bakes every node's absolute transform into the vertex data it references
//! and collapses the hierarchy to the root. A mesh referenced under several
//! distinct transforms is cloned per reference. Normals, tangents, and
//! bitangents go through the inverse-transpose. Animations are dropped
//! (their target nodes no longer exist); cameras and lights keep their
//! world-space placement by folding the owning node's transform into their
//! local vectors.

use glam::{Mat4, Vec3};

use crate::errors::Result;
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{Mesh, NodeHandle, Scene};

pub struct PreTransformVertices;

impl PostProcessStage for PreTransformVertices {
    fn name(&self) -> &'static str {
        "pre-transform-vertices"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::PRE_TRANSFORM_VERTICES)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        // 1. Collect (mesh index, absolute transform) pairs and world
        //    transforms of camera/light owner nodes.
        let mut references: Vec<(u32, Mat4)> = Vec::new();
        let mut world_of_node: Vec<(String, Mat4)> = Vec::new();
        collect(scene, scene.root(), Mat4::IDENTITY, &mut references, &mut world_of_node);

        // 2. Bake. Meshes used under exactly one transform are transformed
        //    in place; additional references clone.
        let mut baked: Vec<Mesh> = Vec::new();
        for &(mesh_index, transform) in &references {
            let mut mesh = scene.meshes[mesh_index as usize].clone();
            apply_transform(&mut mesh, transform);
            baked.push(mesh);
        }
        scene.meshes = baked;

        // 3. Collapse the hierarchy: the root keeps every baked mesh and no
        //    children.
        let root = scene.root();
        let children: Vec<NodeHandle> = scene.nodes[root].children().to_vec();
        for child in children {
            scene.remove_subtree(child);
        }
        let root_node = &mut scene.nodes[root];
        root_node.transform = Mat4::IDENTITY;
        root_node.mesh_indices = (0..scene.meshes.len() as u32).collect();

        // 4. Fold node placement into cameras and lights, then drop
        //    animations.
        for camera in &mut scene.cameras {
            if let Some((_, world)) = world_of_node.iter().find(|(n, _)| *n == camera.name) {
                camera.position = world.transform_point3(camera.position);
                camera.look_at = world.transform_vector3(camera.look_at);
                camera.up = world.transform_vector3(camera.up);
            }
        }
        for light in &mut scene.lights {
            if let Some((_, world)) = world_of_node.iter().find(|(n, _)| *n == light.name) {
                light.position = world.transform_point3(light.position);
                light.direction = world.transform_vector3(light.direction).normalize_or_zero();
            }
        }
        if !scene.animations.is_empty() {
            log::debug!(
                "PreTransformVertices: dropping {} animation(s), hierarchy was baked",
                scene.animations.len()
            );
            scene.animations.clear();
        }
        // Baked meshes no longer have a hierarchy for bones to reference.
        for mesh in &mut scene.meshes {
            mesh.bones.clear();
        }
        Ok(())
    }
}

fn collect(
    scene: &Scene,
    handle: NodeHandle,
    parent_transform: Mat4,
    references: &mut Vec<(u32, Mat4)>,
    world_of_node: &mut Vec<(String, Mat4)>,
) {
    let node = &scene.nodes[handle];
    let world = parent_transform * node.transform;
    world_of_node.push((node.name.clone(), world));
    for &mesh_index in &node.mesh_indices {
        references.push((mesh_index, world));
    }
    for &child in node.children() {
        collect(scene, child, world, references, world_of_node);
    }
}

fn apply_transform(mesh: &mut Mesh, transform: Mat4) {
    for position in &mut mesh.positions {
        *position = transform.transform_point3(*position);
    }
    if mesh.has_normals() || mesh.has_tangents() {
        let normal_matrix = transform.inverse().transpose();
        let rotate = |v: &mut Vec3| {
            *v = normal_matrix.transform_vector3(*v).normalize_or_zero();
        };
        for normal in &mut mesh.normals {
            rotate(normal);
        }
        for tangent in &mut mesh.tangents {
            rotate(tangent);
        }
        for bitangent in &mut mesh.bitangents {
            rotate(bitangent);
        }
    }
}

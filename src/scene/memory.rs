//! Scene memory accounting.
//!
//! Walks a scene and reports the approximate heap footprint per asset
//! category. Pure read-only arithmetic; nothing is allocated or mutated.

use std::mem::size_of;

use glam::{Vec3, Vec4};

use crate::scene::animation::Animation;
use crate::scene::material::{Material, PropertyValue};
use crate::scene::mesh::Mesh;
use crate::scene::node::Node;
use crate::scene::scene::Scene;

/// Per-category byte counts for a scene, plus the grand total.
///
/// `total` always equals the sum of the category fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    pub meshes: usize,
    pub materials: usize,
    pub nodes: usize,
    pub textures: usize,
    pub animations: usize,
    pub cameras: usize,
    pub lights: usize,
    pub total: usize,
}

/// Computes the memory requirements of `scene`.
#[must_use]
pub fn compute_memory_requirements(scene: &Scene) -> MemoryInfo {
    let mut info = MemoryInfo::default();

    for mesh in &scene.meshes {
        info.meshes += mesh_bytes(mesh);
    }
    for material in &scene.materials {
        info.materials += material_bytes(material);
    }
    for node in scene.nodes.values() {
        info.nodes += node_bytes(node);
    }
    for texture in &scene.textures {
        info.textures += size_of::<crate::scene::Texture>() + texture.data.len();
    }
    for animation in &scene.animations {
        info.animations += animation_bytes(animation);
    }
    info.cameras = scene.cameras.len() * size_of::<crate::scene::Camera>();
    info.lights = scene.lights.len() * size_of::<crate::scene::Light>();

    info.total = info.meshes
        + info.materials
        + info.nodes
        + info.textures
        + info.animations
        + info.cameras
        + info.lights;
    info
}

fn mesh_bytes(mesh: &Mesh) -> usize {
    let mut bytes = size_of::<Mesh>() + mesh.name.len();
    bytes += mesh.positions.len() * size_of::<Vec3>();
    bytes += mesh.normals.len() * size_of::<Vec3>();
    bytes += mesh.tangents.len() * size_of::<Vec3>();
    bytes += mesh.bitangents.len() * size_of::<Vec3>();
    for set in &mesh.colors {
        bytes += set.len() * size_of::<Vec4>();
    }
    for set in &mesh.uvs {
        bytes += set.len() * size_of::<Vec3>();
    }
    for face in &mesh.faces {
        bytes += size_of::<crate::scene::Face>() + face.indices.len() * size_of::<u32>();
    }
    for bone in &mesh.bones {
        bytes += size_of::<crate::scene::Bone>()
            + bone.name.len()
            + bone.weights.len() * size_of::<crate::scene::VertexWeight>();
    }
    bytes
}

fn material_bytes(material: &Material) -> usize {
    let mut bytes = size_of::<Material>();
    for property in material.properties() {
        bytes += size_of::<crate::scene::MaterialProperty>() + property.key.len();
        bytes += match &property.value {
            PropertyValue::Float(v) => v.len() * size_of::<f32>(),
            PropertyValue::Int(v) => v.len() * size_of::<i32>(),
            PropertyValue::Str(s) => s.len(),
            PropertyValue::Buffer(b) => b.len(),
        };
    }
    bytes
}

fn node_bytes(node: &Node) -> usize {
    size_of::<Node>()
        + node.name.len()
        + node.children().len() * size_of::<crate::scene::NodeHandle>()
        + node.mesh_indices.len() * size_of::<u32>()
}

fn animation_bytes(animation: &Animation) -> usize {
    let mut bytes = size_of::<Animation>() + animation.name.len();
    // Channels are walked by their own iterator, never by the animation's
    // index in the outer array.
    for channel in &animation.channels {
        bytes += size_of::<crate::scene::NodeChannel>() + channel.node_name.len();
        bytes += channel.position_keys.len() * size_of::<crate::scene::VectorKey>();
        bytes += channel.rotation_keys.len() * size_of::<crate::scene::QuatKey>();
        bytes += channel.scaling_keys.len() * size_of::<crate::scene::VectorKey>();
    }
    bytes
}

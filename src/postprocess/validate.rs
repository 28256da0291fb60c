//! Canonical scene validation.
//!
//! A pure predicate over the scene, reported through the stage interface so
//! the dispatcher can run it out of band: once before the pipeline when
//! requested, and between every pair of stages in extra-verbose mode. The
//! first violation fails the import with a message naming the spot;
//! non-fatal findings are logged and stamp
//! [`SceneFlags::VALIDATION_WARNING`].

use rustc_hash::FxHashSet;

use crate::errors::{ImportError, Result};
use crate::postprocess::{PostProcessStage, PostProcessSteps, SharedPostState};
use crate::scene::{Mesh, NodeHandle, Scene, SceneFlags, MAX_UV_SETS};

pub struct ValidateDataStructure;

impl PostProcessStage for ValidateDataStructure {
    fn name(&self) -> &'static str {
        "validate-data-structure"
    }

    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.contains(PostProcessSteps::VALIDATE_DATA_STRUCTURE)
    }

    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        let mut warnings = false;
        validate_nodes(scene)?;
        for (index, mesh) in scene.meshes.iter().enumerate() {
            validate_mesh(scene, index, mesh, &mut warnings)?;
        }
        validate_animations(scene)?;
        validate_textures(scene)?;

        if warnings {
            scene.flags |= SceneFlags::VALIDATION_WARNING;
        }
        scene.flags |= SceneFlags::VALIDATED;
        Ok(())
    }
}

fn fail(message: String) -> Result<()> {
    Err(ImportError::Validation(message))
}

fn validate_nodes(scene: &Scene) -> Result<()> {
    if scene.node(scene.root()).is_none() {
        return fail("root node is not live".into());
    }
    if scene.nodes[scene.root()].parent().is_some() {
        return fail("root node has a parent".into());
    }

    // Reachability walk; every arena node must be visited exactly once.
    let mut visited: FxHashSet<NodeHandle> = FxHashSet::default();
    let mut stack = vec![scene.root()];
    while let Some(handle) = stack.pop() {
        if !visited.insert(handle) {
            return fail(format!(
                "node '{}' is reachable along two paths",
                scene.nodes[handle].name
            ));
        }
        let node = &scene.nodes[handle];
        for &child in node.children() {
            let Some(child_node) = scene.node(child) else {
                return fail(format!("node '{}' has a dangling child handle", node.name));
            };
            if child_node.parent() != Some(handle) {
                return fail(format!(
                    "node '{}' disagrees with its child '{}' about parentage",
                    node.name, child_node.name
                ));
            }
            stack.push(child);
        }
        for &mesh_index in &node.mesh_indices {
            if mesh_index as usize >= scene.meshes.len() {
                return fail(format!(
                    "node '{}' references mesh {mesh_index}, scene has {}",
                    node.name,
                    scene.meshes.len()
                ));
            }
        }
    }
    if visited.len() != scene.nodes.len() {
        return fail(format!(
            "{} node(s) are not reachable from the root",
            scene.nodes.len() - visited.len()
        ));
    }

    if !scene.flags.contains(SceneFlags::INCOMPLETE) && scene.meshes.is_empty() {
        return fail("scene has no meshes but is not marked incomplete".into());
    }
    Ok(())
}

fn validate_mesh(scene: &Scene, index: usize, mesh: &Mesh, warnings: &mut bool) -> Result<()> {
    let incomplete = scene.flags.contains(SceneFlags::INCOMPLETE);
    let vertex_count = mesh.vertex_count();

    if !incomplete {
        if !mesh.has_positions() {
            return fail(format!("mesh {index} ('{}') has no positions", mesh.name));
        }
        if mesh.faces.is_empty() {
            return fail(format!("mesh {index} ('{}') has no faces", mesh.name));
        }
    }

    for (stream, name) in [
        (&mesh.normals, "normals"),
        (&mesh.tangents, "tangents"),
        (&mesh.bitangents, "bitangents"),
    ] {
        if !stream.is_empty() && stream.len() != vertex_count {
            return fail(format!(
                "mesh {index}: {name} stream has {} entries for {vertex_count} vertices",
                stream.len()
            ));
        }
    }
    for set in 0..MAX_UV_SETS {
        if !mesh.uvs[set].is_empty() && mesh.uvs[set].len() != vertex_count {
            return fail(format!(
                "mesh {index}: texture coordinate set {set} has {} entries for {vertex_count} vertices",
                mesh.uvs[set].len()
            ));
        }
    }
    for (set, colors) in mesh.colors.iter().enumerate() {
        if !colors.is_empty() && colors.len() != vertex_count {
            return fail(format!(
                "mesh {index}: color set {set} has {} entries for {vertex_count} vertices",
                colors.len()
            ));
        }
    }

    if !scene.materials.is_empty() && mesh.material_index as usize >= scene.materials.len() {
        return fail(format!(
            "mesh {index} references material {}, scene has {}",
            mesh.material_index,
            scene.materials.len()
        ));
    }

    // Face indices in range; in verbose layout additionally unique across
    // the whole mesh.
    let verbose = !scene.flags.contains(SceneFlags::NON_VERBOSE_FORMAT);
    let mut seen = vec![false; vertex_count];
    for (face_index, face) in mesh.faces.iter().enumerate() {
        if face.indices.is_empty() {
            return fail(format!("mesh {index}: face {face_index} is empty"));
        }
        for &vertex in &face.indices {
            let Some(slot) = seen.get_mut(vertex as usize) else {
                return fail(format!(
                    "mesh {index}: face {face_index} references vertex {vertex} of {vertex_count}"
                ));
            };
            if verbose && *slot {
                return fail(format!(
                    "mesh {index}: vertex {vertex} is shared between faces of a verbose mesh"
                ));
            }
            *slot = true;
        }
    }

    // Bones must name existing nodes and reference valid vertices.
    for bone in &mesh.bones {
        if scene.find_node_by_name(&bone.name).is_none() {
            return fail(format!(
                "mesh {index}: bone '{}' names no node in the hierarchy",
                bone.name
            ));
        }
        if bone.weights.is_empty() {
            log::warn!("Validation: mesh {index}: bone '{}' has no weights", bone.name);
            *warnings = true;
        }
        for weight in &bone.weights {
            if weight.vertex_id as usize >= vertex_count {
                return fail(format!(
                    "mesh {index}: bone '{}' weights vertex {} of {vertex_count}",
                    bone.name, weight.vertex_id
                ));
            }
            if !(0.0..=1.0 + 1e-3).contains(&weight.weight) {
                return fail(format!(
                    "mesh {index}: bone '{}' carries weight {} outside [0, 1]",
                    bone.name, weight.weight
                ));
            }
        }
    }
    Ok(())
}

fn validate_animations(scene: &Scene) -> Result<()> {
    for (index, animation) in scene.animations.iter().enumerate() {
        for channel in &animation.channels {
            if scene.find_node_by_name(&channel.node_name).is_none() {
                return fail(format!(
                    "animation {index} ('{}'): channel targets unknown node '{}'",
                    animation.name, channel.node_name
                ));
            }
            let position_ok = channel
                .position_keys
                .windows(2)
                .all(|w| w[0].time <= w[1].time);
            let rotation_ok = channel
                .rotation_keys
                .windows(2)
                .all(|w| w[0].time <= w[1].time);
            let scaling_ok = channel
                .scaling_keys
                .windows(2)
                .all(|w| w[0].time <= w[1].time);
            if !(position_ok && rotation_ok && scaling_ok) {
                return fail(format!(
                    "animation {index} ('{}'): key times of channel '{}' decrease",
                    animation.name, channel.node_name
                ));
            }
        }
    }
    Ok(())
}

fn validate_textures(scene: &Scene) -> Result<()> {
    for (index, texture) in scene.textures.iter().enumerate() {
        if texture.data.len() != texture.expected_data_len() {
            return fail(format!(
                "texture {index}: {} data bytes, {} expected for {}x{}",
                texture.data.len(),
                texture.expected_data_len(),
                texture.width,
                texture.height
            ));
        }
    }
    Ok(())
}

//! Mesh surgery helpers shared by the rebuilding stages.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::scene::{Bone, Face, Mesh, NodeHandle, Scene};

/// Builds a new mesh containing exactly the given `faces` of `src`.
///
/// With `verbose` set, every face-vertex becomes a freshly copied vertex
/// (shared indices are duplicated). Otherwise each referenced source vertex
/// is copied once, preserving sharing. Either way no orphaned vertices
/// remain and bone weights are remapped (weights whose vertex falls outside
/// the subset are dropped, bones left empty are removed).
#[must_use]
pub fn extract_submesh(src: &Mesh, faces: &[Face], verbose: bool) -> Mesh {
    // order[new_index] = old_index
    let mut order: Vec<u32> = Vec::new();
    let mut old_to_new: FxHashMap<u32, u32> = FxHashMap::default();
    let mut new_faces: Vec<Face> = Vec::with_capacity(faces.len());

    for face in faces {
        let mut indices = SmallVec::with_capacity(face.indices.len());
        for &old in &face.indices {
            let new = if verbose {
                order.push(old);
                order.len() as u32 - 1
            } else {
                *old_to_new.entry(old).or_insert_with(|| {
                    order.push(old);
                    order.len() as u32 - 1
                })
            };
            indices.push(new);
        }
        new_faces.push(Face { indices });
    }

    let mut mesh = copy_vertices_by_order(src, &order);
    mesh.faces = new_faces;
    mesh.update_primitive_types();
    mesh
}

/// Copies vertex streams of `src` gathered by `order` (`order[new] = old`)
/// and remaps bone weights accordingly. Faces are left empty.
#[must_use]
pub fn copy_vertices_by_order(src: &Mesh, order: &[u32]) -> Mesh {
    let gather3 = |stream: &Vec<glam::Vec3>| -> Vec<glam::Vec3> {
        if stream.is_empty() {
            Vec::new()
        } else {
            order.iter().map(|&old| stream[old as usize]).collect()
        }
    };
    let gather4 = |stream: &Vec<glam::Vec4>| -> Vec<glam::Vec4> {
        if stream.is_empty() {
            Vec::new()
        } else {
            order.iter().map(|&old| stream[old as usize]).collect()
        }
    };

    let mut mesh = Mesh::new(src.name.clone());
    mesh.material_index = src.material_index;
    mesh.uv_components = src.uv_components;
    mesh.positions = gather3(&src.positions);
    mesh.normals = gather3(&src.normals);
    mesh.tangents = gather3(&src.tangents);
    mesh.bitangents = gather3(&src.bitangents);
    for set in 0..crate::scene::MAX_COLOR_SETS {
        mesh.colors[set] = gather4(&src.colors[set]);
    }
    for set in 0..crate::scene::MAX_UV_SETS {
        mesh.uvs[set] = gather3(&src.uvs[set]);
    }

    if !src.bones.is_empty() {
        // old vertex -> all new vertices copied from it
        let mut fanout: FxHashMap<u32, SmallVec<[u32; 2]>> = FxHashMap::default();
        for (new, &old) in order.iter().enumerate() {
            fanout.entry(old).or_default().push(new as u32);
        }
        for bone in &src.bones {
            let mut weights = Vec::new();
            for weight in &bone.weights {
                if let Some(targets) = fanout.get(&weight.vertex_id) {
                    for &target in targets {
                        weights.push(crate::scene::VertexWeight {
                            vertex_id: target,
                            weight: weight.weight,
                        });
                    }
                }
            }
            if !weights.is_empty() {
                mesh.bones.push(Bone {
                    name: bone.name.clone(),
                    offset_matrix: bone.offset_matrix,
                    weights,
                });
            }
        }
    }
    mesh
}

/// Rewrites every node's mesh references through `mapping`, where
/// `mapping[old_index]` lists the replacement indices (possibly empty).
pub fn remap_node_mesh_indices(scene: &mut Scene, mapping: &[Vec<u32>]) {
    let handles: Vec<NodeHandle> = scene.nodes.keys().collect();
    for handle in handles {
        let node = &mut scene.nodes[handle];
        let old = std::mem::take(&mut node.mesh_indices);
        for index in old {
            if let Some(replacements) = mapping.get(index as usize) {
                node.mesh_indices.extend_from_slice(replacements);
            }
        }
    }
}

/// Position comparison epsilon scaled to the mesh extents: 1e-4 times the
/// bounding box diagonal.
#[must_use]
pub fn position_epsilon(mesh: &Mesh) -> f32 {
    let mut min = glam::Vec3::splat(f32::INFINITY);
    let mut max = glam::Vec3::splat(f32::NEG_INFINITY);
    for &p in &mesh.positions {
        min = min.min(p);
        max = max.max(p);
    }
    if mesh.positions.is_empty() {
        return 1e-4;
    }
    (max - min).length() * 1e-4
}

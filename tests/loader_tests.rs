//! Resident Loader Tests
//!
//! Tests for:
//! - OBJ: vertices, faces, groups, materials, index forms, verbose output
//! - STL: ASCII and binary decoding, header/count consistency
//! - Signature probing: content wins when the extension is unknown
//! - Probing helper functions

use glam::Vec3;
use sceneport::importer::{
    check_magic_token, get_extension, search_file_header_for_token, simple_extension_check,
};
use sceneport::{Importer, MemoryIoSystem, PostProcessSteps, PrimitiveTypes};

fn memory_importer(files: &[(&str, &[u8])]) -> Importer {
    let mut io = MemoryIoSystem::new();
    for (path, bytes) in files {
        io.add_file(*path, *bytes);
    }
    let mut importer = Importer::new();
    importer.set_io_handler(Some(Box::new(io)));
    importer
}

fn binary_stl(triangles: &[[Vec3; 4]]) -> Vec<u8> {
    let mut bytes = vec![0u8; 80];
    bytes.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for triangle in triangles {
        for vector in triangle {
            bytes.extend_from_slice(&vector.x.to_le_bytes());
            bytes.extend_from_slice(&vector.y.to_le_bytes());
            bytes.extend_from_slice(&vector.z.to_le_bytes());
        }
        bytes.extend_from_slice(&0u16.to_le_bytes());
    }
    bytes
}

// ============================================================================
// OBJ
// ============================================================================

#[test]
fn obj_decodes_positions_uvs_normals_and_faces() {
    let source = "\
# comment line
o Tri
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
";
    let mut importer = memory_importer(&[("tri.obj", source.as_bytes())]);
    let scene = importer
        .read_file("tri.obj", PostProcessSteps::empty())
        .expect("import should succeed");

    assert_eq!(scene.meshes.len(), 1);
    let mesh = &scene.meshes[0];
    assert_eq!(mesh.name, "Tri");
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.face_count(), 1);
    assert!(mesh.has_normals());
    assert!(mesh.has_uv_set(0));
    assert_eq!(mesh.uv_components[0], 2);
    assert_eq!(mesh.positions[1], Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(mesh.normals[2], Vec3::Z);
    assert_eq!(mesh.primitive_types, PrimitiveTypes::TRIANGLE);

    // The mesh hangs off a node named after its group.
    let node = scene.find_node_by_name("Tri").expect("group node");
    assert_eq!(scene.nodes[node].mesh_indices, vec![0]);
}

#[test]
fn obj_negative_indices_resolve_relative_to_pool() {
    let source = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f -3 -2 -1
";
    let mut importer = memory_importer(&[("rel.obj", source.as_bytes())]);
    let scene = importer
        .read_file("rel.obj", PostProcessSteps::empty())
        .expect("import should succeed");
    assert_eq!(scene.meshes[0].positions[0], Vec3::ZERO);
    assert_eq!(scene.meshes[0].positions[2], Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn obj_usemtl_assigns_material_slots() {
    let source = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
v 1.0 1.0 0.0
usemtl red
f 1 2 3
usemtl blue
f 2 4 3
";
    let mut importer = memory_importer(&[("mat.obj", source.as_bytes())]);
    let scene = importer
        .read_file("mat.obj", PostProcessSteps::empty())
        .expect("import should succeed");

    assert_eq!(scene.materials.len(), 2);
    assert_eq!(scene.meshes.len(), 2);
    assert_eq!(scene.materials[0].get_string("?mat.name"), Some("red"));
    assert_eq!(scene.materials[1].get_string("?mat.name"), Some("blue"));
    assert_eq!(scene.meshes[0].material_index, 0);
    assert_eq!(scene.meshes[1].material_index, 1);
}

#[test]
fn obj_polygons_survive_as_polygons_without_triangulation() {
    let source = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
f 1 2 3 4
";
    let mut importer = memory_importer(&[("quad.obj", source.as_bytes())]);
    let scene = importer
        .read_file("quad.obj", PostProcessSteps::empty())
        .expect("import should succeed");
    assert_eq!(scene.meshes[0].primitive_types, PrimitiveTypes::POLYGON);
    assert_eq!(scene.meshes[0].faces[0].indices.len(), 4);
}

#[test]
fn obj_output_is_verbose() {
    // Two faces sharing pool vertices must still get private vertex runs.
    let source = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
v 1.0 1.0 0.0
f 1 2 3
f 3 2 4
";
    let mut importer = memory_importer(&[("shared.obj", source.as_bytes())]);
    let scene = importer
        .read_file("shared.obj", PostProcessSteps::empty())
        .expect("import should succeed");

    let mesh = &scene.meshes[0];
    assert_eq!(mesh.vertex_count(), 6);
    let mut seen = vec![false; mesh.vertex_count()];
    for face in &mesh.faces {
        for &i in &face.indices {
            assert!(!seen[i as usize]);
            seen[i as usize] = true;
        }
    }
}

#[test]
fn obj_malformed_index_is_a_decode_error() {
    let mut importer = memory_importer(&[("bad.obj", &b"v 0 0 0\nf 1 2 zz\n"[..])]);
    assert!(importer
        .read_file("bad.obj", PostProcessSteps::empty())
        .is_none());
    assert!(importer.error_string().contains("OBJ"));
}

// ============================================================================
// STL
// ============================================================================

#[test]
fn stl_ascii_decodes_facets() {
    let source = "\
solid pyramid
  facet normal 0.0 0.0 1.0
    outer loop
      vertex 0.0 0.0 0.0
      vertex 1.0 0.0 0.0
      vertex 0.0 1.0 0.0
    endloop
  endfacet
endsolid pyramid
";
    let mut importer = memory_importer(&[("pyramid.stl", source.as_bytes())]);
    let scene = importer
        .read_file("pyramid.stl", PostProcessSteps::empty())
        .expect("import should succeed");

    let mesh = &scene.meshes[0];
    assert_eq!(mesh.name, "pyramid");
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.face_count(), 1);
    assert_eq!(mesh.normals[0], Vec3::Z);
}

#[test]
fn stl_binary_decodes_triangles() {
    let bytes = binary_stl(&[
        [
            Vec3::Z,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        [
            Vec3::Z,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
    ]);
    let mut importer = memory_importer(&[("part.stl", &bytes[..])]);
    let scene = importer
        .read_file("part.stl", PostProcessSteps::empty())
        .expect("import should succeed");

    let mesh = &scene.meshes[0];
    assert_eq!(mesh.face_count(), 2);
    assert_eq!(mesh.vertex_count(), 6);
    assert!(mesh.faces.iter().all(|f| f.indices.len() == 3));
}

#[test]
fn stl_truncated_binary_is_a_decode_error() {
    let mut bytes = binary_stl(&[[Vec3::Z, Vec3::ZERO, Vec3::X, Vec3::Y]]);
    bytes.truncate(bytes.len() - 10);
    let mut importer = memory_importer(&[("trunc.stl", &bytes[..])]);
    assert!(importer
        .read_file("trunc.stl", PostProcessSteps::empty())
        .is_none());
    assert!(importer.error_string().contains("truncated"));
}

// ============================================================================
// Signature Probing
// ============================================================================

#[test]
fn unknown_extension_falls_back_to_signature_pass() {
    // OBJ content under an unknown extension: the extension pass finds
    // nothing, the signature pass spots the OBJ tokens.
    let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    let mut importer = memory_importer(&[("scan.dump", source.as_bytes())]);
    let scene = importer
        .read_file("scan.dump", PostProcessSteps::empty())
        .expect("signature pass should select the OBJ loader");
    assert_eq!(scene.meshes[0].face_count(), 1);
}

#[test]
fn binary_stl_is_detected_by_size_consistency() {
    let bytes = binary_stl(&[[Vec3::Z, Vec3::ZERO, Vec3::X, Vec3::Y]]);
    let mut importer = memory_importer(&[("scan.dump", &bytes[..])]);
    let scene = importer
        .read_file("scan.dump", PostProcessSteps::empty())
        .expect("signature pass should select the STL loader");
    assert_eq!(scene.meshes[0].face_count(), 1);
}

#[test]
fn extensionless_paths_skip_the_signature_pass() {
    let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    let mut importer = memory_importer(&[("dump", source.as_bytes())]);
    assert!(importer.read_file("dump", PostProcessSteps::empty()).is_none());
    assert!(importer.error_string().contains("No suitable reader"));
}

// ============================================================================
// Probing Helpers
// ============================================================================

#[test]
fn get_extension_lowercases_and_strips_dot() {
    assert_eq!(get_extension("model.OBJ"), "obj");
    assert_eq!(get_extension("dir.v2/model.stl"), "stl");
    assert_eq!(get_extension("noext"), "");
    assert_eq!(get_extension("trailing."), "");
}

#[test]
fn simple_extension_check_is_case_insensitive() {
    assert!(simple_extension_check("a/b/Model.StL", &["stl"]));
    assert!(!simple_extension_check("model.stlx", &["stl"]));
    assert!(!simple_extension_check("model", &["stl"]));
}

#[test]
fn header_token_search_ignores_case_and_nul_bytes() {
    let mut io = MemoryIoSystem::new();
    // UTF-16-ish content: interleaved NUL bytes.
    io.add_file("wide.txt", b"S\0O\0L\0I\0D\0 cube".to_vec());
    io.add_file("plain.txt", b"nothing of note".to_vec());

    assert!(search_file_header_for_token(&io, "wide.txt", &["solid"], 200).unwrap());
    assert!(!search_file_header_for_token(&io, "plain.txt", &["solid"], 200).unwrap());
}

#[test]
fn magic_token_check_matches_byte_swapped_variants() {
    let mut io = MemoryIoSystem::new();
    io.add_file("be.bin", vec![0xDE, 0xAD, 0xBE, 0xEF]);

    let magic: &[&[u8]] = &[&[0xDE, 0xAD, 0xBE, 0xEF]];
    assert!(check_magic_token(&io, "be.bin", magic, 0).unwrap());

    // The same magic given little-endian still matches via the swap.
    let swapped: &[&[u8]] = &[&[0xEF, 0xBE, 0xAD, 0xDE]];
    assert!(check_magic_token(&io, "be.bin", swapped, 0).unwrap());

    let other: &[&[u8]] = &[&[1, 2, 3, 4]];
    assert!(!check_magic_token(&io, "be.bin", other, 0).unwrap());
}

//! Post-Processing Stage Tests
//!
//! Tests for:
//! - SpatialSort radius queries
//! - Triangulation (verbose rebuild), degenerate handling
//! - Normal, tangent, and UV generation
//! - Vertex joining and the non-verbose scene flag
//! - Coordinate conversion idempotence (double flip)
//! - Bone weight limiting, material dedup, instancing, splitting, sorting,
//!   cache locality, component removal
//! - Data structure validation findings

use glam::{Mat4, Vec3};
use sceneport::postprocess::convert_left_handed::{FlipUvs, FlipWindingOrder, MakeLeftHanded};
use sceneport::postprocess::find_degenerates::FindDegenerates;
use sceneport::postprocess::find_instances::FindInstances;
use sceneport::postprocess::gen_face_normals::GenFaceNormals;
use sceneport::postprocess::gen_vertex_normals::GenVertexNormals;
use sceneport::postprocess::improve_cache_locality::ImproveCacheLocality;
use sceneport::postprocess::join_vertices::JoinIdenticalVertices;
use sceneport::postprocess::limit_bone_weights::LimitBoneWeights;
use sceneport::postprocess::remove_redundant_materials::RemoveRedundantMaterials;
use sceneport::postprocess::remove_vertex_components::RemoveVertexComponents;
use sceneport::postprocess::sort_by_ptype::SortByPrimitiveType;
use sceneport::postprocess::spatial_sort::{ComputeSpatialSort, DestroySpatialSort};
use sceneport::postprocess::split_large_meshes::SplitLargeMeshesTriangle;
use sceneport::postprocess::triangulate::Triangulate;
use sceneport::postprocess::validate::ValidateDataStructure;
use sceneport::{
    config, Bone, ComponentFlags, Face, Material, Mesh, PostProcessStage, PrimitiveTypes,
    PropertyStore, Scene, SceneFlags, SharedPostState, SpatialSort, VertexWeight,
};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn approx_vec(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

/// Scene with one mesh attached under the root.
fn scene_with_mesh(mesh: Mesh) -> Scene {
    let mut scene = Scene::new();
    let root = scene.root();
    let node = scene.create_child_node(root, mesh.name.clone());
    scene.meshes.push(mesh);
    scene.nodes[node].mesh_indices.push(0);
    scene
}

/// Unit quad in the XY plane as a single polygon face (verbose layout).
fn quad_mesh() -> Mesh {
    let mut mesh = Mesh::new("Quad");
    mesh.positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];
    mesh.faces = vec![Face::new(0..4)];
    mesh.update_primitive_types();
    mesh
}

/// Two triangles sharing an edge, fully verbose (six vertices).
fn two_triangle_mesh() -> Mesh {
    let mut mesh = Mesh::new("TwoTris");
    mesh.positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
    ];
    mesh.faces = vec![Face::new(0..3), Face::new(3..6)];
    mesh.update_primitive_types();
    mesh
}

fn run(stage: &mut dyn PostProcessStage, scene: &mut Scene) {
    let mut shared = SharedPostState::new();
    stage.execute(scene, &mut shared).expect("stage should succeed");
}

fn run_in_window(stages: &mut [&mut dyn PostProcessStage], scene: &mut Scene) {
    let mut shared = SharedPostState::new();
    ComputeSpatialSort
        .execute(scene, &mut shared)
        .expect("setup marker");
    for stage in stages.iter_mut() {
        stage.execute(scene, &mut shared).expect("stage should succeed");
    }
    DestroySpatialSort
        .execute(scene, &mut shared)
        .expect("teardown marker");
    assert!(!shared.has_spatial_sorts());
}

// ============================================================================
// SpatialSort
// ============================================================================

#[test]
fn spatial_sort_finds_neighbors_within_radius() {
    let positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1e-7),
        Vec3::new(5.0, 0.0, 0.0),
    ];
    let sort = SpatialSort::new(&positions);
    assert_eq!(sort.len(), 3);

    let mut out = Vec::new();
    sort.find_positions(Vec3::ZERO, 1e-5, &mut out);
    out.sort_unstable();
    assert_eq!(out, vec![0, 1]);

    sort.find_positions(Vec3::new(5.0, 0.0, 0.0), 1e-5, &mut out);
    assert_eq!(out, vec![2]);
}

// ============================================================================
// Triangulation
// ============================================================================

#[test]
fn triangulate_fans_polygons_and_stays_verbose() {
    let mut scene = scene_with_mesh(quad_mesh());
    run(&mut Triangulate, &mut scene);

    let mesh = &scene.meshes[0];
    assert_eq!(mesh.face_count(), 2);
    assert!(mesh.faces.iter().all(|f| f.indices.len() == 3));
    assert_eq!(mesh.primitive_types, PrimitiveTypes::TRIANGLE);
    // Verbose rebuild: six vertices, no index shared between faces.
    assert_eq!(mesh.vertex_count(), 6);
    let mut seen = vec![false; mesh.vertex_count()];
    for face in &mesh.faces {
        for &i in &face.indices {
            assert!(!seen[i as usize], "vertex {i} referenced twice");
            seen[i as usize] = true;
        }
    }
}

#[test]
fn triangulate_leaves_triangles_untouched() {
    let mut scene = scene_with_mesh(two_triangle_mesh());
    let before = scene.meshes[0].clone();
    run(&mut Triangulate, &mut scene);
    assert_eq!(scene.meshes[0], before);
}

// ============================================================================
// Normal Generation
// ============================================================================

#[test]
fn face_normals_point_along_plane_normal() {
    let mut scene = scene_with_mesh(two_triangle_mesh());
    run(&mut GenFaceNormals, &mut scene);

    let mesh = &scene.meshes[0];
    assert!(mesh.has_normals());
    for &normal in &mesh.normals {
        assert!(approx_vec(normal, Vec3::Z));
    }
}

#[test]
fn smooth_normals_average_across_shared_positions() {
    // Two faces folded along the shared edge; duplicated corner positions
    // must receive the averaged normal.
    let mut mesh = Mesh::new("Fold");
    mesh.positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        // Second face tilts out of the XY plane.
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, -1.0, 1.0),
        Vec3::new(1.0, 0.0, 0.0),
    ];
    mesh.faces = vec![Face::new(0..3), Face::new(3..6)];
    mesh.update_primitive_types();
    let mut scene = scene_with_mesh(mesh);

    let mut stage = GenVertexNormals::default();
    run_in_window(&mut [&mut stage], &mut scene);

    let mesh = &scene.meshes[0];
    assert!(mesh.has_normals());
    // Vertices 0 and 3 share a position; smoothing must give them the same
    // normal, distinct from either face normal.
    assert!(approx_vec(mesh.normals[0], mesh.normals[3]));
    assert!(!approx_vec(mesh.normals[0], Vec3::Z));
    assert!(approx(mesh.normals[0].length(), 1.0));
}

// ============================================================================
// Vertex Joining
// ============================================================================

#[test]
fn join_collapses_identical_vertices_and_flags_scene() {
    let mut scene = scene_with_mesh(two_triangle_mesh());
    let mut stage = JoinIdenticalVertices;
    run_in_window(&mut [&mut stage], &mut scene);

    let mesh = &scene.meshes[0];
    // (1,0,0) and (0,1,0) each appear twice; four unique vertices remain.
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.face_count(), 2);
    assert!(scene.flags.contains(SceneFlags::NON_VERBOSE_FORMAT));
    for face in &scene.meshes[0].faces {
        for &i in &face.indices {
            assert!((i as usize) < 4);
        }
    }
}

#[test]
fn join_keeps_vertices_with_differing_attributes() {
    let mut mesh = two_triangle_mesh();
    // Same positions but distinct normals: nothing may merge.
    mesh.normals = vec![
        Vec3::Z,
        Vec3::Z,
        Vec3::Z,
        Vec3::X,
        Vec3::X,
        Vec3::X,
    ];
    let mut scene = scene_with_mesh(mesh);
    let mut stage = JoinIdenticalVertices;
    run_in_window(&mut [&mut stage], &mut scene);

    assert_eq!(scene.meshes[0].vertex_count(), 6);
    assert!(!scene.flags.contains(SceneFlags::NON_VERBOSE_FORMAT));
}

// ============================================================================
// Coordinate Conversion
// ============================================================================

#[test]
fn double_flip_restores_geometry() {
    let mut mesh = two_triangle_mesh();
    mesh.normals = vec![Vec3::Z; 6];
    mesh.uvs[0] = (0..6).map(|i| Vec3::new(i as f32 * 0.1, 0.3, 0.0)).collect();
    mesh.uv_components[0] = 2;
    let mut scene = scene_with_mesh(mesh);
    let root = scene.root();
    scene.nodes[root].transform = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    let original = scene.meshes[0].clone();
    let original_transform = scene.nodes[scene.root()].transform;

    for _ in 0..2 {
        run(&mut MakeLeftHanded, &mut scene);
        run(&mut FlipWindingOrder, &mut scene);
        run(&mut FlipUvs, &mut scene);
    }

    let mesh = &scene.meshes[0];
    for (a, b) in mesh.positions.iter().zip(&original.positions) {
        assert!(approx_vec(*a, *b));
    }
    for (a, b) in mesh.normals.iter().zip(&original.normals) {
        assert!(approx_vec(*a, *b));
    }
    for (a, b) in mesh.uvs[0].iter().zip(&original.uvs[0]) {
        assert!(approx_vec(*a, *b));
    }
    assert_eq!(mesh.faces, original.faces);
    let diff = (scene.nodes[scene.root()].transform - original_transform).abs();
    assert!(diff.to_cols_array().iter().all(|&v| v < EPSILON));
}

#[test]
fn flip_winding_reverses_every_face() {
    let mut scene = scene_with_mesh(two_triangle_mesh());
    run(&mut FlipWindingOrder, &mut scene);
    assert_eq!(scene.meshes[0].faces[0], Face::new([2, 1, 0]));
    assert_eq!(scene.meshes[0].faces[1], Face::new([5, 4, 3]));
}

// ============================================================================
// Bone Weight Limiting
// ============================================================================

#[test]
fn limit_bone_weights_keeps_strongest_and_renormalizes() {
    let mut mesh = two_triangle_mesh();
    // Vertex 0 influenced by three bones; limit of two must keep the two
    // strongest and renormalize their sum to one.
    for (name, weight) in [("a", 0.5f32), ("b", 0.3), ("c", 0.2)] {
        mesh.bones.push(Bone {
            name: name.to_string(),
            offset_matrix: Mat4::IDENTITY,
            weights: vec![VertexWeight {
                vertex_id: 0,
                weight,
            }],
        });
    }
    let mut scene = scene_with_mesh(mesh);
    // Bones must name nodes for validation elsewhere; irrelevant here.

    let mut props = PropertyStore::new();
    props.set_int(config::PP_LBW_MAX_WEIGHTS, 2);
    let mut stage = LimitBoneWeights::default();
    stage.setup_properties(&props);
    run(&mut stage, &mut scene);

    let mesh = &scene.meshes[0];
    assert_eq!(mesh.bones.len(), 2, "weakest bone should be dropped");
    let total: f32 = mesh
        .bones
        .iter()
        .flat_map(|b| b.weights.iter().map(|w| w.weight))
        .sum();
    assert!(approx(total, 1.0));
    assert!(approx(mesh.bones[0].weights[0].weight, 0.5 / 0.8));
}

// ============================================================================
// Material Dedup & Instancing
// ============================================================================

#[test]
fn redundant_materials_collapse_onto_first() {
    let mut scene = scene_with_mesh(two_triangle_mesh());
    let mut red = Material::new();
    red.set_floats("$clr.diffuse", [1.0, 0.0, 0.0]);
    scene.materials = vec![red.clone(), red.clone(), red];
    scene.meshes[0].material_index = 2;

    run(&mut RemoveRedundantMaterials, &mut scene);
    assert_eq!(scene.materials.len(), 1);
    assert_eq!(scene.meshes[0].material_index, 0);
}

#[test]
fn find_instances_rewrites_duplicate_meshes() {
    let mut scene = Scene::new();
    let root = scene.root();
    for i in 0..2 {
        let node = scene.create_child_node(root, format!("N{i}"));
        scene.meshes.push(two_triangle_mesh());
        scene.nodes[node].mesh_indices.push(i as u32);
    }

    run(&mut FindInstances, &mut scene);
    assert_eq!(scene.meshes.len(), 1);
    for handle in scene.descendants(scene.root()) {
        for &index in &scene.nodes[handle].mesh_indices {
            assert_eq!(index, 0);
        }
    }
}

// ============================================================================
// Splitting & Sorting
// ============================================================================

#[test]
fn split_large_meshes_honors_triangle_limit() {
    let mut scene = scene_with_mesh(two_triangle_mesh());
    let mut props = PropertyStore::new();
    props.set_int(config::PP_SLM_TRIANGLE_LIMIT, 1);
    let mut stage = SplitLargeMeshesTriangle::default();
    stage.setup_properties(&props);
    run(&mut stage, &mut scene);

    assert_eq!(scene.meshes.len(), 2);
    for mesh in &scene.meshes {
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
    }
    // The referencing node now points at both parts.
    let node = scene.find_node_by_name("TwoTris_part0");
    assert!(node.is_none(), "node keeps its original name");
    let owner = scene
        .descendants(scene.root())
        .into_iter()
        .find(|&h| !scene.nodes[h].mesh_indices.is_empty())
        .unwrap();
    assert_eq!(scene.nodes[owner].mesh_indices, vec![0, 1]);
}

#[test]
fn sort_by_ptype_splits_mixed_meshes() {
    let mut mesh = Mesh::new("Mixed");
    mesh.positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(3.0, 0.0, 0.0),
    ];
    mesh.faces = vec![Face::new(0..3), Face::new(3..5)];
    mesh.update_primitive_types();
    let mut scene = scene_with_mesh(mesh);

    run(&mut SortByPrimitiveType::default(), &mut scene);
    assert_eq!(scene.meshes.len(), 2);
    assert!(scene
        .meshes
        .iter()
        .any(|m| m.primitive_types == PrimitiveTypes::TRIANGLE));
    assert!(scene
        .meshes
        .iter()
        .any(|m| m.primitive_types == PrimitiveTypes::LINE));
}

#[test]
fn sort_by_ptype_removal_mask_drops_primitives() {
    let mut mesh = Mesh::new("Mixed");
    mesh.positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(3.0, 0.0, 0.0),
    ];
    mesh.faces = vec![Face::new(0..3), Face::new(3..5)];
    mesh.update_primitive_types();
    let mut scene = scene_with_mesh(mesh);

    let mut props = PropertyStore::new();
    props.set_int(
        config::PP_SBP_REMOVE,
        (PrimitiveTypes::LINE | PrimitiveTypes::POINT).bits() as i32,
    );
    let mut stage = SortByPrimitiveType::default();
    stage.setup_properties(&props);
    run(&mut stage, &mut scene);

    assert_eq!(scene.meshes.len(), 1);
    assert_eq!(scene.meshes[0].primitive_types, PrimitiveTypes::TRIANGLE);
}

// ============================================================================
// Degenerates & Component Removal
// ============================================================================

#[test]
fn degenerate_triangles_are_demoted_by_default() {
    let mut mesh = Mesh::new("Degen");
    mesh.positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0), // duplicate position
    ];
    mesh.faces = vec![Face::new(0..3)];
    mesh.update_primitive_types();
    let mut scene = scene_with_mesh(mesh);

    run(&mut FindDegenerates::default(), &mut scene);
    assert_eq!(scene.meshes[0].face_count(), 1);
    assert_eq!(scene.meshes[0].faces[0].indices.len(), 2);
    assert_eq!(scene.meshes[0].primitive_types, PrimitiveTypes::LINE);
}

#[test]
fn degenerate_triangles_are_removed_when_requested() {
    let mut mesh = two_triangle_mesh();
    mesh.positions[5] = mesh.positions[4]; // degenerate second face
    let mut scene = scene_with_mesh(mesh);

    let mut props = PropertyStore::new();
    props.set_int(config::PP_FD_REMOVE, 1);
    let mut stage = FindDegenerates::default();
    stage.setup_properties(&props);
    run(&mut stage, &mut scene);

    let mesh = &scene.meshes[0];
    assert_eq!(mesh.face_count(), 1);
    // Orphaned vertices of the removed face are gone too.
    assert_eq!(mesh.vertex_count(), 3);
}

#[test]
fn remove_vertex_components_strips_requested_streams() {
    let mut mesh = two_triangle_mesh();
    mesh.normals = vec![Vec3::Z; 6];
    let mut scene = scene_with_mesh(mesh);

    let mut props = PropertyStore::new();
    props.set_int(
        config::PP_RVC_FLAGS,
        ComponentFlags::NORMALS.bits() as i32,
    );
    let mut stage = RemoveVertexComponents::default();
    stage.setup_properties(&props);
    run(&mut stage, &mut scene);

    assert!(!scene.meshes[0].has_normals());
    assert!(scene.meshes[0].has_positions());
}

// ============================================================================
// Cache Locality
// ============================================================================

#[test]
fn cache_locality_preserves_geometry() {
    // A strip of triangles in verbose layout, joined so indices are shared.
    let mut mesh = Mesh::new("Strip");
    let mut faces = Vec::new();
    for i in 0..8u32 {
        let base = mesh.positions.len() as u32;
        let x = i as f32;
        mesh.positions.push(Vec3::new(x, 0.0, 0.0));
        mesh.positions.push(Vec3::new(x + 1.0, 0.0, 0.0));
        mesh.positions.push(Vec3::new(x, 1.0, 0.0));
        faces.push(Face::new(base..base + 3));
    }
    mesh.faces = faces;
    mesh.update_primitive_types();
    let face_count = mesh.face_count();
    let mut scene = scene_with_mesh(mesh);

    // Gather the multiset of face position triples before and after.
    let triple = |scene: &Scene, face: &Face| -> Vec<(u32, u32, u32)> {
        face.indices
            .iter()
            .map(|&i| {
                let p = scene.meshes[0].positions[i as usize];
                (p.x.to_bits(), p.y.to_bits(), p.z.to_bits())
            })
            .collect()
    };
    let mut before: Vec<_> = scene.meshes[0]
        .faces
        .clone()
        .iter()
        .map(|f| triple(&scene, f))
        .collect();

    run(&mut ImproveCacheLocality::default(), &mut scene);

    assert_eq!(scene.meshes[0].face_count(), face_count);
    let mut after: Vec<_> = scene.meshes[0]
        .faces
        .clone()
        .iter()
        .map(|f| triple(&scene, f))
        .collect();
    before.sort();
    after.sort();
    assert_eq!(before, after, "reordering must not change geometry");
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn validation_accepts_well_formed_scene_and_stamps_flag() {
    let mut scene = scene_with_mesh(two_triangle_mesh());
    run(&mut ValidateDataStructure, &mut scene);
    assert!(scene.flags.contains(SceneFlags::VALIDATED));
}

#[test]
fn validation_rejects_out_of_range_face_index() {
    let mut mesh = two_triangle_mesh();
    mesh.faces[1] = Face::new([3, 4, 17]);
    let mut scene = scene_with_mesh(mesh);

    let mut shared = SharedPostState::new();
    let err = ValidateDataStructure
        .execute(&mut scene, &mut shared)
        .unwrap_err();
    assert!(err.to_string().contains("references vertex"));
}

#[test]
fn validation_rejects_unreachable_nodes() {
    let mut scene = scene_with_mesh(two_triangle_mesh());
    // Created but never attached.
    let _orphan = scene.create_node("Orphan");

    let mut shared = SharedPostState::new();
    let err = ValidateDataStructure
        .execute(&mut scene, &mut shared)
        .unwrap_err();
    assert!(err.to_string().contains("not reachable"));
}

#[test]
fn validation_rejects_shared_indices_in_verbose_scenes() {
    let mut mesh = two_triangle_mesh();
    mesh.faces[1] = Face::new([0, 4, 5]); // reuses vertex 0
    let mut scene = scene_with_mesh(mesh);

    let mut shared = SharedPostState::new();
    let err = ValidateDataStructure
        .execute(&mut scene, &mut shared)
        .unwrap_err();
    assert!(err.to_string().contains("verbose"));

    // The same layout is legal once the scene is flagged non-verbose.
    scene.flags |= SceneFlags::NON_VERBOSE_FORMAT;
    assert!(ValidateDataStructure
        .execute(&mut scene, &mut shared)
        .is_ok());
}

//! Pipeline Runner Tests
//!
//! Tests for:
//! - Flag dispatch: active stages run in list order, inactive stages skip
//! - Halting on stage failure, with the stage named in the error
//! - Observable canonical ordering: triangulate before split before
//!   normal generation
//! - Shared pass state lifetime: consumers outside the marker window fail
//! - Extra-verbose validation between stages

use std::sync::{Arc, Mutex};

use glam::Vec3;
use sceneport::{
    config, Importer, IoSystem, MemoryIoSystem, PostProcessStage, PostProcessSteps, Result,
    Scene, SceneLoader, SharedPostState,
};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Decodes any `.tri` file into a single-triangle scene.
struct TriLoader;

impl SceneLoader for TriLoader {
    fn name(&self) -> &'static str {
        "tri"
    }
    fn extensions(&self) -> &'static [&'static str] {
        &["tri"]
    }
    fn can_read(&self, path: &str, _io: Option<&dyn IoSystem>, _check_sig: bool) -> bool {
        path.ends_with(".tri")
    }
    fn intern_read(&self, _path: &str, _io: &dyn IoSystem) -> Result<Scene> {
        let mut scene = Scene::new();
        let mut mesh = sceneport::Mesh::new("Tri");
        mesh.positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        mesh.faces = vec![sceneport::Face::new(0..3)];
        let root = scene.root();
        let node = scene.create_child_node(root, "TriNode");
        scene.meshes.push(mesh);
        scene.nodes[node].mesh_indices.push(0);
        Ok(scene)
    }
}

/// Records its own execution into a shared trace.
struct RecordingStage {
    label: &'static str,
    flag: PostProcessSteps,
    trace: Arc<Mutex<Vec<&'static str>>>,
}

impl PostProcessStage for RecordingStage {
    fn name(&self) -> &'static str {
        self.label
    }
    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.intersects(self.flag)
    }
    fn execute(&mut self, _scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        self.trace.lock().unwrap().push(self.label);
        Ok(())
    }
}

struct FailingStage {
    flag: PostProcessSteps,
}

impl PostProcessStage for FailingStage {
    fn name(&self) -> &'static str {
        "failing-stage"
    }
    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.intersects(self.flag)
    }
    fn execute(&mut self, _scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        Err(sceneport::ImportError::Decode("stage blew up".into()))
    }
}

fn tri_importer(pipeline: Vec<Box<dyn PostProcessStage>>) -> Importer {
    let mut io = MemoryIoSystem::new();
    io.add_file("scene.tri", b"tri".to_vec());
    let mut importer = Importer::with_parts(vec![Box::new(TriLoader)], pipeline);
    importer.set_io_handler(Some(Box::new(io)));
    importer
}

// ============================================================================
// Flag Dispatch & Ordering
// ============================================================================

#[test]
fn active_stages_run_in_list_order() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let pipeline: Vec<Box<dyn PostProcessStage>> = vec![
        Box::new(RecordingStage {
            label: "first",
            flag: PostProcessSteps::TRIANGULATE,
            trace: trace.clone(),
        }),
        Box::new(RecordingStage {
            label: "second",
            flag: PostProcessSteps::GEN_NORMALS,
            trace: trace.clone(),
        }),
        Box::new(RecordingStage {
            label: "third",
            flag: PostProcessSteps::FLIP_UVS,
            trace: trace.clone(),
        }),
    ];
    let mut importer = tri_importer(pipeline);

    let steps = PostProcessSteps::TRIANGULATE | PostProcessSteps::FLIP_UVS;
    assert!(importer.read_file("scene.tri", steps).is_some());
    // "second" is inactive for this request and must not appear.
    assert_eq!(*trace.lock().unwrap(), vec!["first", "third"]);
}

#[test]
fn empty_request_executes_no_stage() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let pipeline: Vec<Box<dyn PostProcessStage>> = vec![Box::new(RecordingStage {
        label: "only",
        flag: PostProcessSteps::TRIANGULATE,
        trace: trace.clone(),
    })];
    let mut importer = tri_importer(pipeline);

    assert!(importer
        .read_file("scene.tri", PostProcessSteps::empty())
        .is_some());
    assert!(trace.lock().unwrap().is_empty());
}

#[test]
fn stage_failure_halts_pipeline_and_discards_scene() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let pipeline: Vec<Box<dyn PostProcessStage>> = vec![
        Box::new(RecordingStage {
            label: "before",
            flag: PostProcessSteps::TRIANGULATE,
            trace: trace.clone(),
        }),
        Box::new(FailingStage {
            flag: PostProcessSteps::TRIANGULATE,
        }),
        Box::new(RecordingStage {
            label: "after",
            flag: PostProcessSteps::TRIANGULATE,
            trace: trace.clone(),
        }),
    ];
    let mut importer = tri_importer(pipeline);

    assert!(importer
        .read_file("scene.tri", PostProcessSteps::TRIANGULATE)
        .is_none());
    assert_eq!(*trace.lock().unwrap(), vec!["before"]);
    assert!(importer.scene().is_none());
    assert!(importer.error_string().contains("failing-stage"));
    assert!(importer.error_string().contains("stage blew up"));
}

#[test]
fn canonical_order_triangulate_split_then_normals() {
    let quad_obj = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
f 1 2 3 4
";
    let mut io = MemoryIoSystem::new();
    io.add_file("quad.obj", quad_obj.as_bytes().to_vec());
    let mut importer = Importer::new();
    importer.set_io_handler(Some(Box::new(io)));
    importer.set_property_int(config::PP_SLM_TRIANGLE_LIMIT, 1);

    let steps = PostProcessSteps::TRIANGULATE
        | PostProcessSteps::GEN_NORMALS
        | PostProcessSteps::SPLIT_LARGE_MESHES;
    let scene = importer
        .read_file("quad.obj", steps)
        .expect("import should succeed");

    // Triangulation ran before the split (the single quad became two
    // triangles, which the one-triangle limit then split apart), and normal
    // generation ran after it (each part carries normals).
    assert_eq!(scene.meshes.len(), 2);
    for mesh in &scene.meshes {
        assert_eq!(mesh.face_count(), 1);
        assert!(mesh.faces.iter().all(|f| f.indices.len() == 3));
        assert!(mesh.has_normals());
    }
}

// ============================================================================
// Shared Pass State
// ============================================================================

struct SpatialSortOutsideWindow;

impl PostProcessStage for SpatialSortOutsideWindow {
    fn name(&self) -> &'static str {
        "outside-window"
    }
    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.intersects(PostProcessSteps::TRIANGULATE)
    }
    fn execute(&mut self, _scene: &mut Scene, shared: &mut SharedPostState) -> Result<()> {
        // Not bracketed by the marker stages: this must fail fast.
        shared.spatial_sort_for(0).map(|_| ())
    }
}

#[test]
fn spatial_sort_access_outside_marker_window_fails() {
    let pipeline: Vec<Box<dyn PostProcessStage>> = vec![Box::new(SpatialSortOutsideWindow)];
    let mut importer = tri_importer(pipeline);

    assert!(importer
        .read_file("scene.tri", PostProcessSteps::TRIANGULATE)
        .is_none());
    assert!(importer.error_string().contains("outside the marker window"));
}

#[test]
fn spatial_sort_window_spans_consumer_stages() {
    // The default pipeline brackets smooth normals / tangents / joining;
    // requesting all three must succeed and clear the state afterwards.
    let mut io = MemoryIoSystem::new();
    io.add_file(
        "tris.obj",
        b"v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 3 2 4\n".to_vec(),
    );
    let mut importer = Importer::new();
    importer.set_io_handler(Some(Box::new(io)));

    let steps = PostProcessSteps::GEN_SMOOTH_NORMALS
        | PostProcessSteps::CALC_TANGENT_SPACE
        | PostProcessSteps::JOIN_IDENTICAL_VERTICES
        | PostProcessSteps::GEN_UV_COORDS;
    let scene = importer
        .read_file("tris.obj", steps)
        .expect("import should succeed");
    assert!(scene.meshes[0].has_normals());
    assert!(scene.meshes[0].has_tangents());
}

// ============================================================================
// Extra-Verbose Validation
// ============================================================================

struct CorruptingStage;

impl PostProcessStage for CorruptingStage {
    fn name(&self) -> &'static str {
        "corrupting"
    }
    fn is_active(&self, steps: PostProcessSteps) -> bool {
        steps.intersects(PostProcessSteps::TRIANGULATE)
    }
    fn execute(&mut self, scene: &mut Scene, _shared: &mut SharedPostState) -> Result<()> {
        // Dangling mesh reference; only inter-stage validation catches it.
        let root = scene.root();
        scene.nodes[root].mesh_indices.push(99);
        Ok(())
    }
}

#[test]
fn extra_verbose_revalidates_between_stages() {
    let pipeline: Vec<Box<dyn PostProcessStage>> = vec![Box::new(CorruptingStage)];
    let mut importer = tri_importer(pipeline);

    let steps = PostProcessSteps::TRIANGULATE | PostProcessSteps::VALIDATE_DATA_STRUCTURE;

    // Without extra-verbose the corruption goes unnoticed (validation runs
    // before the pipeline only).
    assert!(importer.read_file("scene.tri", steps).is_some());

    importer.set_extra_verbose(true);
    assert!(importer.read_file("scene.tri", steps).is_none());
    assert!(importer.error_string().contains("Validation failed"));
}

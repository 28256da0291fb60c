//! # sceneport
//!
//! A format-agnostic 3D asset import library. Heterogeneous model files —
//! mesh-only, animated, skeletal, hierarchical — are decoded into a single
//! canonical in-memory [`Scene`], then normalized, validated, and optimized
//! by a configurable pipeline of post-processing stages.
//!
//! # Example
//!
//! ```rust,ignore
//! use sceneport::{Importer, PostProcessSteps};
//!
//! let mut importer = Importer::new();
//! let steps = PostProcessSteps::TRIANGULATE | PostProcessSteps::GEN_SMOOTH_NORMALS;
//! match importer.read_file("model.obj", steps) {
//!     Some(scene) => println!("{} meshes", scene.meshes.len()),
//!     None => eprintln!("import failed: {}", importer.error_string()),
//! }
//! ```
//!
//! # Architecture
//!
//! - [`Importer`]: the dispatcher; owns format loaders, the stage pipeline,
//!   the IO system, configuration, and the current scene
//! - [`SceneLoader`]: the plugin contract per-format decoders implement
//! - [`PostProcessStage`]: the contract each pipeline transform implements
//! - [`IoSystem`]: pluggable byte access, defaulting to the filesystem
//!
//! A dispatcher instance is single-threaded by design; instance one per
//! thread for concurrent imports.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_lines)]

pub mod errors;
pub mod importer;
pub mod io;
pub mod postprocess;
pub mod scene;

pub use errors::{ImportError, Result};
pub use importer::{config, Importer, PropertyStore, SceneLoader};
pub use io::{FileSystemIo, IoSystem, MemoryIoSystem, ReadStream};
pub use postprocess::{
    ComponentFlags, PostProcessStage, PostProcessSteps, SharedPostState, SpatialSort,
};
pub use scene::{
    Animation, Bone, Camera, Face, Light, LightKind, Material, MemoryInfo, Mesh, Node,
    NodeChannel, NodeHandle, PrimitiveTypes, QuatKey, Scene, SceneFlags, Texture, VectorKey,
    VertexWeight,
};

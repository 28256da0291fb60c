//! Canonical Scene Model
//!
//! Every loader, regardless of source format, decodes into the same in-memory
//! representation: a [`Scene`] owning a node hierarchy plus flat arrays of
//! meshes, materials, animations, textures, cameras, and lights. The
//! post-processing stages mutate this representation in place and may assume
//! its invariants hold at every stage boundary.
//!
//! # Key invariants
//!
//! - The root node always exists and every node is reachable from it.
//! - Node mesh references index into `Scene::meshes`.
//! - Unless a scene is marked [`SceneFlags::INCOMPLETE`], it has at least one
//!   mesh and every mesh has at least one vertex and one face.
//! - Freshly decoded meshes are in *verbose* layout: no vertex index is shared
//!   between faces. Only the join-identical-vertices stage may break this, and
//!   it stamps [`SceneFlags::NON_VERBOSE_FORMAT`] when it does.

pub mod animation;
pub mod camera;
pub mod light;
pub mod material;
pub mod memory;
pub mod mesh;
pub mod node;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod texture;

pub use animation::{Animation, NodeChannel, QuatKey, VectorKey, DEFAULT_TICKS_PER_SECOND};
pub use camera::Camera;
pub use light::{Light, LightKind};
pub use material::{Material, MaterialProperty, PropertyValue};
pub use memory::{compute_memory_requirements, MemoryInfo};
pub use mesh::{Bone, Face, Mesh, PrimitiveTypes, VertexWeight, MAX_COLOR_SETS, MAX_UV_SETS};
pub use node::{Node, NodeHandle};
pub use scene::{Scene, SceneFlags};
pub use texture::Texture;

//! Post-Processing Pipeline
//!
//! After a loader has produced a canonical scene, an ordered list of
//! transform stages runs over it. Each stage advertises the
//! [`PostProcessSteps`] bits it services and is skipped unless the caller
//! requested one of them.
//!
//! # Ordering
//!
//! The stage order built by [`default_pipeline`] is a contract, not an
//! accident: cleanup stages run before generators, pre-transform precedes
//! triangulation precedes primitive sorting, invalid-data repair precedes
//! normal generation, and the spatial-sort consumers (smooth normals,
//! tangents, vertex joining) are bracketed by a construction and a
//! destruction marker that own the shared index's lifetime. Coordinate
//! conversion and the final optimizers run last.
//!
//! # Shared pass state
//!
//! [`SharedPostState`] carries data built by one stage for later ones,
//! currently the per-mesh spatial sort index. It is owned by the dispatcher,
//! handed to every `execute` call, and cleared after each import.

pub mod calc_tangents;
pub mod convert_left_handed;
pub mod find_degenerates;
pub mod find_instances;
pub mod find_invalid_data;
pub mod fix_infacing_normals;
pub mod gen_face_normals;
pub mod gen_uv_coords;
pub mod gen_vertex_normals;
pub mod improve_cache_locality;
pub mod join_vertices;
pub mod limit_bone_weights;
pub mod pretransform;
pub mod remove_redundant_materials;
pub mod remove_vertex_components;
pub mod sort_by_ptype;
pub mod spatial_sort;
pub mod split_large_meshes;
pub mod transform_uv_coords;
pub mod triangulate;
pub mod util;
pub mod validate;

pub use remove_vertex_components::ComponentFlags;
pub use spatial_sort::SpatialSort;
pub use validate::ValidateDataStructure;

use bitflags::bitflags;

use crate::errors::{ImportError, Result};
use crate::importer::PropertyStore;
use crate::scene::Scene;

bitflags! {
    /// Requestable post-processing transforms, one bit per stage.
    ///
    /// `GEN_NORMALS` and `GEN_SMOOTH_NORMALS` are mutually exclusive;
    /// `Importer::validate_steps` rejects the combination.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PostProcessSteps: u32 {
        const CALC_TANGENT_SPACE         = 1 << 0;
        const JOIN_IDENTICAL_VERTICES    = 1 << 1;
        const MAKE_LEFT_HANDED           = 1 << 2;
        const TRIANGULATE                = 1 << 3;
        const REMOVE_COMPONENT           = 1 << 4;
        const GEN_NORMALS                = 1 << 5;
        const GEN_SMOOTH_NORMALS         = 1 << 6;
        const SPLIT_LARGE_MESHES         = 1 << 7;
        const PRE_TRANSFORM_VERTICES     = 1 << 8;
        const LIMIT_BONE_WEIGHTS         = 1 << 9;
        const VALIDATE_DATA_STRUCTURE    = 1 << 10;
        const IMPROVE_CACHE_LOCALITY     = 1 << 11;
        const REMOVE_REDUNDANT_MATERIALS = 1 << 12;
        const FIX_INFACING_NORMALS       = 1 << 13;
        const SORT_BY_PRIMITIVE_TYPE     = 1 << 15;
        const FIND_DEGENERATES           = 1 << 16;
        const FIND_INVALID_DATA          = 1 << 17;
        const GEN_UV_COORDS              = 1 << 18;
        const TRANSFORM_UV_COORDS        = 1 << 19;
        const FIND_INSTANCES             = 1 << 20;
        const FLIP_UVS                   = 1 << 23;
        const FLIP_WINDING_ORDER         = 1 << 24;
    }
}

/// Transient data coupling pipeline stages within one import.
#[derive(Default)]
pub struct SharedPostState {
    /// One spatial sort index per scene mesh, live only between the
    /// construction and destruction marker stages.
    spatial_sorts: Option<Vec<SpatialSort>>,
}

impl SharedPostState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the spatial-sort window is currently open.
    #[must_use]
    pub fn has_spatial_sorts(&self) -> bool {
        self.spatial_sorts.is_some()
    }

    pub(crate) fn install_spatial_sorts(&mut self, sorts: Vec<SpatialSort>) {
        self.spatial_sorts = Some(sorts);
    }

    /// The spatial sort index of mesh `mesh_index`. Fails when called
    /// outside the marker window: that is a stage-ordering bug, not a data
    /// problem.
    pub fn spatial_sort_for(&self, mesh_index: usize) -> Result<&SpatialSort> {
        self.spatial_sorts
            .as_ref()
            .and_then(|sorts| sorts.get(mesh_index))
            .ok_or_else(|| {
                ImportError::OrderingBroken(format!(
                    "spatial sort index for mesh {mesh_index} requested outside the marker window"
                ))
            })
    }

    /// Drops all transient data. Called by the destruction marker and by the
    /// dispatcher at the end of every import.
    pub fn clear(&mut self) {
        self.spatial_sorts = None;
    }
}

/// A single transform stage of the pipeline.
pub trait PostProcessStage {
    /// Stable name, used in logs and failure messages.
    fn name(&self) -> &'static str;

    /// Whether this stage runs for the given request bitset. Stages may
    /// assume the bitset already passed `Importer::validate_steps`.
    fn is_active(&self, steps: PostProcessSteps) -> bool;

    /// Snapshots configuration from the dispatcher's store; called
    /// immediately before each [`PostProcessStage::execute`].
    fn setup_properties(&mut self, _props: &PropertyStore) {}

    /// Mutates the scene in place. An error is fatal to the import: the
    /// dispatcher discards the scene and records the message.
    fn execute(&mut self, scene: &mut Scene, shared: &mut SharedPostState) -> Result<()>;
}

/// Builds the canonical stage ordering.
///
/// The returned list is fixed at dispatcher construction; see the module
/// docs for the ordering constraints it encodes.
#[must_use]
pub fn default_pipeline() -> Vec<Box<dyn PostProcessStage>> {
    vec![
        Box::new(remove_vertex_components::RemoveVertexComponents::default()),
        Box::new(remove_redundant_materials::RemoveRedundantMaterials),
        Box::new(find_instances::FindInstances),
        Box::new(find_degenerates::FindDegenerates::default()),
        Box::new(gen_uv_coords::GenUvCoords),
        Box::new(transform_uv_coords::TransformUvCoords),
        Box::new(pretransform::PreTransformVertices),
        Box::new(triangulate::Triangulate),
        Box::new(sort_by_ptype::SortByPrimitiveType::default()),
        Box::new(find_invalid_data::FindInvalidData),
        Box::new(fix_infacing_normals::FixInfacingNormals),
        Box::new(split_large_meshes::SplitLargeMeshesTriangle::default()),
        Box::new(gen_face_normals::GenFaceNormals),
        Box::new(spatial_sort::ComputeSpatialSort),
        Box::new(gen_vertex_normals::GenVertexNormals::default()),
        Box::new(calc_tangents::CalcTangentSpace::default()),
        Box::new(join_vertices::JoinIdenticalVertices),
        Box::new(spatial_sort::DestroySpatialSort),
        Box::new(split_large_meshes::SplitLargeMeshesVertex::default()),
        Box::new(convert_left_handed::MakeLeftHanded),
        Box::new(convert_left_handed::FlipUvs),
        Box::new(convert_left_handed::FlipWindingOrder),
        Box::new(limit_bone_weights::LimitBoneWeights::default()),
        Box::new(improve_cache_locality::ImproveCacheLocality::default()),
    ]
}

use bitflags::bitflags;
use glam::{Mat4, Vec3, Vec4};
use smallvec::SmallVec;

/// Maximum number of vertex color sets a mesh may carry.
pub const MAX_COLOR_SETS: usize = 4;
/// Maximum number of texture coordinate sets a mesh may carry.
pub const MAX_UV_SETS: usize = 4;

bitflags! {
    /// Kinds of geometric primitives present in a mesh's face list.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PrimitiveTypes: u32 {
        /// Single-vertex point.
        const POINT    = 1 << 0;
        /// Two-vertex line segment.
        const LINE     = 1 << 1;
        /// Three-vertex triangle.
        const TRIANGLE = 1 << 2;
        /// Polygon with more than three vertices.
        const POLYGON  = 1 << 3;
    }
}

impl PrimitiveTypes {
    /// Primitive kind of a face with `count` indices.
    #[must_use]
    pub fn for_index_count(count: usize) -> Self {
        match count {
            0 | 1 => Self::POINT,
            2 => Self::LINE,
            3 => Self::TRIANGLE,
            _ => Self::POLYGON,
        }
    }
}

/// A single face: an ordered list of indices into the vertex streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Face {
    pub indices: SmallVec<[u32; 4]>,
}

impl Face {
    #[must_use]
    pub fn new(indices: impl IntoIterator<Item = u32>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }

    /// Primitive kind of this face, inferred from its index count.
    #[inline]
    #[must_use]
    pub fn primitive_type(&self) -> PrimitiveTypes {
        PrimitiveTypes::for_index_count(self.indices.len())
    }
}

/// A single influence of a bone on a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    /// Index of the influenced vertex.
    pub vertex_id: u32,
    /// Influence strength in `(0, 1]`; influences on one vertex sum to 1.
    pub weight: f32,
}

/// A single bone of a mesh.
///
/// A bone names a node in the hierarchy by which it can be addressed by
/// animations, and carries its vertex influences plus the matrix that maps
/// mesh space to bone space in bind pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub offset_matrix: Mat4,
    pub weights: Vec<VertexWeight>,
}

/// Array-of-structures vertex and face container.
///
/// All present vertex streams have exactly `vertex_count()` elements; an
/// empty stream means the attribute is absent. Positions are mandatory
/// unless the owning scene is marked incomplete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub name: String,
    /// Primitive kinds present in `faces`. Inferred by the scene
    /// preprocessor when a loader leaves it empty.
    pub primitive_types: PrimitiveTypes,

    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    pub bitangents: Vec<Vec3>,
    pub colors: [Vec<Vec4>; MAX_COLOR_SETS],
    pub uvs: [Vec<Vec3>; MAX_UV_SETS],
    /// Number of meaningful components (1-3) per texture coordinate set.
    pub uv_components: [u8; MAX_UV_SETS],

    pub faces: Vec<Face>,
    pub bones: Vec<Bone>,
    /// Index into `Scene::materials`.
    pub material_index: u32,
}

impl Mesh {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    #[must_use]
    pub fn has_positions(&self) -> bool {
        !self.positions.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn has_tangents(&self) -> bool {
        !self.tangents.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn has_bones(&self) -> bool {
        !self.bones.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn has_uv_set(&self, set: usize) -> bool {
        set < MAX_UV_SETS && !self.uvs[set].is_empty()
    }

    #[inline]
    #[must_use]
    pub fn has_color_set(&self, set: usize) -> bool {
        set < MAX_COLOR_SETS && !self.colors[set].is_empty()
    }

    /// Re-derives `primitive_types` from the face list.
    pub fn update_primitive_types(&mut self) {
        let mut types = PrimitiveTypes::empty();
        for face in &self.faces {
            types |= face.primitive_type();
        }
        self.primitive_types = types;
    }
}

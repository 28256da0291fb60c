use glam::Mat4;
use slotmap::new_key_type;

new_key_type! {
    /// Handle into the scene's node arena.
    pub struct NodeHandle;
}

/// A named transform in the scene hierarchy.
///
/// # Hierarchy
///
/// Nodes form a tree through parent-child relationships:
/// - `parent`: handle of the parent node (`None` only for the root)
/// - `children`: ordered child node handles
///
/// Prefer [`Scene::attach`] for building hierarchies; it keeps both sides of
/// the relationship in sync.
///
/// # Meshes
///
/// A node may reference zero or more meshes by index into `Scene::meshes`.
/// The same mesh index may appear under several nodes (instancing).
///
/// [`Scene::attach`]: crate::scene::Scene::attach
#[derive(Debug, Clone)]
pub struct Node {
    /// Node name; animation channels and bones resolve targets by this name.
    pub name: String,
    /// Transform relative to the parent node.
    pub transform: Mat4,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
    /// Indices into `Scene::meshes`.
    pub mesh_indices: Vec<u32>,
}

impl Node {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            parent: None,
            children: Vec::new(),
            mesh_indices: Vec::new(),
        }
    }

    /// Returns the parent node handle, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Returns a read-only slice of child node handles.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }
}

use bitflags::bitflags;
use slotmap::SlotMap;

use crate::scene::animation::Animation;
use crate::scene::camera::Camera;
use crate::scene::light::Light;
use crate::scene::material::Material;
use crate::scene::mesh::Mesh;
use crate::scene::node::{Node, NodeHandle};
use crate::scene::texture::Texture;

bitflags! {
    /// State markers on a decoded scene.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SceneFlags: u32 {
        /// The scene intentionally lacks data a complete scene would have
        /// (e.g. an empty mesh array). Validation relaxes its requirements
        /// for incomplete scenes.
        const INCOMPLETE         = 1 << 0;
        /// The validation stage ran and found no violation.
        const VALIDATED          = 1 << 1;
        /// The validation stage ran and logged non-fatal findings.
        const VALIDATION_WARNING = 1 << 2;
        /// The join-identical-vertices stage has run; meshes are no longer
        /// in verbose (one-face-per-vertex-index) layout.
        const NON_VERBOSE_FORMAT = 1 << 3;
    }
}

/// Root of the canonical asset graph.
///
/// Owns the node hierarchy (stored in a slotmap arena, rooted at a handle
/// that is always live) and the flat asset arrays nodes and meshes index
/// into. Exactly one loader creates a scene; only the scene preprocessor and
/// the post-processing stages may mutate it afterwards.
#[derive(Debug, Clone)]
pub struct Scene {
    pub flags: SceneFlags,
    pub nodes: SlotMap<NodeHandle, Node>,
    root: NodeHandle,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub animations: Vec<Animation>,
    pub textures: Vec<Texture>,
    pub cameras: Vec<Camera>,
    pub lights: Vec<Light>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Creates an empty scene with a live root node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new("ROOT"));
        Self {
            flags: SceneFlags::empty(),
            nodes,
            root,
            meshes: Vec::new(),
            materials: Vec::new(),
            animations: Vec::new(),
            textures: Vec::new(),
            cameras: Vec::new(),
            lights: Vec::new(),
        }
    }

    // ========================================================================
    // Node management
    // ========================================================================

    /// Handle of the root node. Always live.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    #[must_use]
    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    /// Inserts a new unattached node and returns its handle.
    ///
    /// The node is not reachable from the root until attached; loaders must
    /// attach every node they create.
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeHandle {
        self.nodes.insert(Node::new(name))
    }

    /// Inserts a new node as a child of `parent`.
    pub fn create_child_node(
        &mut self,
        parent: NodeHandle,
        name: impl Into<String>,
    ) -> NodeHandle {
        let handle = self.nodes.insert(Node::new(name));
        self.attach(handle, parent);
        handle
    }

    /// Establishes a parent-child relationship, detaching the child from any
    /// previous parent. Attaching a node to itself is a logged no-op.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("Cannot attach node to itself");
            return;
        }
        if !self.nodes.contains_key(parent) {
            log::error!("Parent node not found during attach");
            return;
        }

        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        if let Some(old_parent) = old_parent
            && let Some(old) = self.nodes.get_mut(old_parent)
        {
            old.children.retain(|&h| h != child);
        }

        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(child);
        }
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = Some(parent);
        }
    }

    /// Removes `handle` and its whole subtree. Removing the root is refused.
    pub fn remove_subtree(&mut self, handle: NodeHandle) {
        if handle == self.root {
            log::warn!("Refusing to remove the root node");
            return;
        }

        let mut to_remove = Vec::new();
        self.collect_subtree(handle, &mut to_remove);

        let parent = self.nodes.get(handle).and_then(|n| n.parent);
        if let Some(parent) = parent
            && let Some(parent_node) = self.nodes.get_mut(parent)
        {
            parent_node.children.retain(|&h| h != handle);
        }

        for h in to_remove {
            self.nodes.remove(h);
        }
    }

    fn collect_subtree(&self, handle: NodeHandle, out: &mut Vec<NodeHandle>) {
        out.push(handle);
        if let Some(node) = self.nodes.get(handle) {
            for &child in &node.children {
                self.collect_subtree(child, out);
            }
        }
    }

    /// All handles reachable from `from`, depth first, `from` included.
    #[must_use]
    pub fn descendants(&self, from: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        self.collect_subtree(from, &mut out);
        out
    }

    /// Finds a node by name, depth first from the root.
    #[must_use]
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.descendants(self.root)
            .into_iter()
            .find(|&h| self.nodes[h].name == name)
    }
}

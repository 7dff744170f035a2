//! Scene graph arena
//!
//! Objects live in a flat `Vec` addressed by [`ObjectId`]. Each object
//! stores its parent index, so "nearest ancestor of kind X" queries walk
//! upward without back-pointers or reference cycles.

use armature_core::NodeId;
use serde::{Deserialize, Serialize};

/// Index of an object inside a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Flat surface material: RGB colour (0.0-1.0) and opacity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: [f32; 3],
    pub opacity: f32,
}

impl Material {
    pub const fn opaque(color: [f32; 3]) -> Self {
        Self {
            color,
            opacity: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::opaque([0.8, 0.8, 0.8])
    }
}

/// Geometry of a renderable shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Box { size: [f64; 3] },
    Cylinder { radius: f64, length: f64 },
    Sphere { radius: f64 },
    Mesh { filename: String, scale: [f64; 3] },
}

/// What an object represents
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Group,
    Robot,
    Link,
    Joint,
    /// Renderable geometry of a link. `source` points at the `<visual>`
    /// element this object was built from.
    Visual { source: Option<NodeId> },
    Mesh {
        geometry: Geometry,
        material: Material,
    },
    /// Text tag attached to another object
    Label { text: String },
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
}

impl SceneObject {
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }
}

/// Arena of scene objects
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    objects: Vec<SceneObject>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object under `parent` (or as a root)
    pub fn add(
        &mut self,
        name: impl Into<String>,
        kind: ObjectKind,
        parent: Option<ObjectId>,
    ) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(SceneObject {
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.attach(id, parent);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn kind(&self, id: ObjectId) -> Option<&ObjectKind> {
        self.get(id).map(|o| &o.kind)
    }

    pub fn name(&self, id: ObjectId) -> Option<&str> {
        self.get(id).map(|o| o.name.as_str())
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.get(id).and_then(|o| o.parent)
    }

    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.get(id).map(|o| o.children.as_slice()).unwrap_or_default()
    }

    /// The object itself followed by each of its ancestors up to the root
    pub fn ancestors(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        let start = self.get(id).map(|_| id);
        std::iter::successors(start, move |current| self.parent(*current))
    }

    /// True if `ancestor` is `id` or one of its ancestors
    pub fn is_ancestor(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Move `id` under `new_parent`. Refuses moves that would create a cycle.
    pub fn reparent(&mut self, id: ObjectId, new_parent: ObjectId) -> bool {
        if self.get(id).is_none() || self.get(new_parent).is_none() {
            return false;
        }
        if self.is_ancestor(id, new_parent) {
            return false;
        }
        self.detach(id);
        self.attach(id, new_parent);
        true
    }

    /// Remove `id` (and its subtree) from its parent
    pub fn detach(&mut self, id: ObjectId) {
        if let Some(parent) = self.objects.get_mut(id.0).and_then(|o| o.parent.take()) {
            self.objects[parent.0].children.retain(|c| *c != id);
        }
    }

    fn attach(&mut self, id: ObjectId, parent: ObjectId) {
        self.objects[id.0].parent = Some(parent);
        self.objects[parent.0].children.push(id);
    }

    /// Every object in the subtree rooted at `id`, depth first
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn material(&self, id: ObjectId) -> Option<Material> {
        match self.kind(id)? {
            ObjectKind::Mesh { material, .. } => Some(*material),
            _ => None,
        }
    }

    /// Replace a mesh's material, returning the previous one. Objects
    /// without a material are left alone.
    pub fn set_material(&mut self, id: ObjectId, new: Material) -> Option<Material> {
        match &mut self.objects.get_mut(id.0)?.kind {
            ObjectKind::Mesh { material, .. } => Some(std::mem::replace(material, new)),
            _ => None,
        }
    }

    /// Attach a text label to `id`
    pub fn add_label(&mut self, id: ObjectId, text: &str) -> ObjectId {
        self.add(
            format!("{text}_label"),
            ObjectKind::Label {
                text: text.to_string(),
            },
            Some(id),
        )
    }

    /// Text of the labels currently attached to `id`
    pub fn labels(&self, id: ObjectId) -> Vec<&str> {
        self.children(id)
            .iter()
            .filter_map(|c| match self.kind(*c) {
                Some(ObjectKind::Label { text }) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_visual(&self, id: ObjectId) -> bool {
        matches!(self.kind(id), Some(ObjectKind::Visual { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh() -> ObjectKind {
        ObjectKind::Mesh {
            geometry: Geometry::Sphere { radius: 1.0 },
            material: Material::default(),
        }
    }

    #[test]
    fn test_ancestors_start_at_object() {
        let mut scene = SceneGraph::new();
        let root = scene.add("robot", ObjectKind::Robot, None);
        let link = scene.add("base", ObjectKind::Link, Some(root));
        let body = scene.add("body", mesh(), Some(link));

        let chain: Vec<_> = scene.ancestors(body).collect();
        assert_eq!(chain, vec![body, link, root]);
        assert!(scene.is_ancestor(root, body));
        assert!(!scene.is_ancestor(body, root));
    }

    #[test]
    fn test_reparent_refuses_cycles() {
        let mut scene = SceneGraph::new();
        let a = scene.add("a", ObjectKind::Group, None);
        let b = scene.add("b", ObjectKind::Group, Some(a));
        let c = scene.add("c", ObjectKind::Group, None);

        assert!(!scene.reparent(a, b));
        assert!(scene.reparent(c, b));
        assert_eq!(scene.parent(c), Some(b));
        assert_eq!(scene.descendants(a), vec![a, b, c]);
    }

    #[test]
    fn test_set_material_only_on_meshes() {
        let mut scene = SceneGraph::new();
        let group = scene.add("g", ObjectKind::Group, None);
        let body = scene.add("body", mesh(), Some(group));

        let red = Material::opaque([1.0, 0.0, 0.0]);
        assert_eq!(scene.set_material(group, red), None);
        assert_eq!(scene.set_material(body, red), Some(Material::default()));
        assert_eq!(scene.material(body), Some(red));
    }

    #[test]
    fn test_labels() {
        let mut scene = SceneGraph::new();
        let body = scene.add("body", mesh(), None);
        let label = scene.add_label(body, "base");
        assert_eq!(scene.labels(body), vec!["base"]);
        scene.detach(label);
        assert!(scene.labels(body).is_empty());
    }
}

//! Picked object to link name resolution

use armature_core::XmlDocument;

use crate::model::RobotModel;
use crate::scene::{ObjectId, ObjectKind, SceneGraph};

/// Nearest visual object at or above `object`
pub fn visual_ancestor(scene: &SceneGraph, object: ObjectId) -> Option<ObjectId> {
    scene.ancestors(object).find(|id| scene.is_visual(*id))
}

/// Name of the link owning `object`.
///
/// Walks up to the nearest visual, follows its `<visual>` element reference
/// and reads the `name` of the element that contains it. Returns `None` when
/// any step is missing; callers treat that as nothing under the pointer.
pub fn resolve_link<'a>(
    scene: &SceneGraph,
    document: &'a XmlDocument,
    object: ObjectId,
) -> Option<&'a str> {
    let visual = visual_ancestor(scene, object)?;
    let ObjectKind::Visual { source: Some(node) } = scene.kind(visual)? else {
        return None;
    };
    let owner = document.parent(*node)?;
    document.attribute(owner, "name")
}

impl RobotModel {
    /// Name of the link owning a picked object
    pub fn resolve_link(&self, object: ObjectId) -> Option<&str> {
        resolve_link(self.scene(), self.document(), object)
    }
}

//! Highlight materials and name tags for parent, child and hovered links
//!
//! Each role holds at most one [`HighlightRecord`] remembering the material
//! it replaced, so clearing a role always restores the mesh's own material.
//! When a hovered mesh is then selected, the original material is taken
//! from the hover record rather than from the mesh, which at that point
//! still shows the hover colour.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scene::{Material, ObjectId, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightRole {
    Parent,
    Child,
    Hover,
}

/// An applied highlight: the object, the material it replaced and the tag
/// attached to it
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRecord {
    pub object: ObjectId,
    pub original: Material,
    pub tag: Option<ObjectId>,
}

/// Override materials per role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightPalette {
    pub hover: Material,
    pub parent: Material,
    pub child: Material,
}

impl Default for HighlightPalette {
    fn default() -> Self {
        Self {
            hover: Material {
                color: [1.0, 1.0, 0.0],
                opacity: 0.6,
            },
            parent: Material {
                color: [0.0, 1.0, 0.0],
                opacity: 0.6,
            },
            child: Material {
                color: [0.0, 0.0, 1.0],
                opacity: 0.6,
            },
        }
    }
}

impl HighlightPalette {
    pub fn material(&self, role: HighlightRole) -> Material {
        match role {
            HighlightRole::Parent => self.parent,
            HighlightRole::Child => self.child,
            HighlightRole::Hover => self.hover,
        }
    }
}

/// Parse `#rrggbb` or `#rgb` into RGB components (0.0-1.0)
pub fn parse_hex_color(s: &str) -> Option<[f32; 3]> {
    let hex = s.trim().strip_prefix('#')?;
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| {
        u8::from_str_radix(expanded.get(i..i + 2)?, 16)
            .ok()
            .map(|v| f32::from(v) / 255.0)
    };
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Applies and restores highlight overrides on a scene
#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    palette: HighlightPalette,
    parent: Option<HighlightRecord>,
    child: Option<HighlightRecord>,
    hover: Option<HighlightRecord>,
}

impl Highlighter {
    pub fn new(palette: HighlightPalette) -> Self {
        Self {
            palette,
            ..Default::default()
        }
    }

    pub fn palette(&self) -> &HighlightPalette {
        &self.palette
    }

    pub fn record(&self, role: HighlightRole) -> Option<&HighlightRecord> {
        match role {
            HighlightRole::Parent => self.parent.as_ref(),
            HighlightRole::Child => self.child.as_ref(),
            HighlightRole::Hover => self.hover.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: HighlightRole) -> &mut Option<HighlightRecord> {
        match role {
            HighlightRole::Parent => &mut self.parent,
            HighlightRole::Child => &mut self.child,
            HighlightRole::Hover => &mut self.hover,
        }
    }

    /// True if `object` carries a parent or child highlight
    pub fn is_selected(&self, object: ObjectId) -> bool {
        [&self.parent, &self.child]
            .into_iter()
            .flatten()
            .any(|r| r.object == object)
    }

    /// Highlight `object` in `role`, replacing any previous highlight of that
    /// role. Returns false if the object has no material to override.
    pub fn highlight(
        &mut self,
        scene: &mut SceneGraph,
        object: ObjectId,
        role: HighlightRole,
        label: Option<&str>,
    ) -> bool {
        if role == HighlightRole::Hover {
            return self.hover(scene, Some(object), label);
        }
        self.unhighlight(scene, role);

        let remembered = [&self.hover, &self.parent, &self.child]
            .into_iter()
            .flatten()
            .find(|r| r.object == object)
            .map(|r| r.original);
        let Some(original) = remembered.or_else(|| scene.material(object)) else {
            return false;
        };

        scene.set_material(object, self.palette.material(role));
        let tag = label.map(|text| scene.add_label(object, text));
        debug!(?role, object = object.index(), "Applied highlight");
        *self.slot_mut(role) = Some(HighlightRecord {
            object,
            original,
            tag,
        });
        true
    }

    /// Remove the highlight of `role`, restoring the replaced material
    pub fn unhighlight(&mut self, scene: &mut SceneGraph, role: HighlightRole) {
        let Some(record) = self.slot_mut(role).take() else {
            return;
        };
        if let Some(tag) = record.tag {
            scene.detach(tag);
        }
        // a hovered mesh that became selected keeps its selection colour
        if role == HighlightRole::Hover && self.is_selected(record.object) {
            return;
        }
        scene.set_material(record.object, record.original);
        debug!(?role, object = record.object.index(), "Removed highlight");
    }

    /// Move the hover highlight to `object`, or drop it for `None`.
    /// Selected objects are never hover highlighted.
    pub fn hover(
        &mut self,
        scene: &mut SceneGraph,
        object: Option<ObjectId>,
        label: Option<&str>,
    ) -> bool {
        self.unhighlight(scene, HighlightRole::Hover);
        let Some(object) = object else {
            return false;
        };
        if self.is_selected(object) {
            return false;
        }
        let Some(original) = scene.set_material(object, self.palette.hover) else {
            return false;
        };
        let tag = label.map(|text| scene.add_label(object, text));
        self.hover = Some(HighlightRecord {
            object,
            original,
            tag,
        });
        true
    }

    /// Clear parent and child highlights
    pub fn clear(&mut self, scene: &mut SceneGraph) {
        self.unhighlight(scene, HighlightRole::Parent);
        self.unhighlight(scene, HighlightRole::Child);
    }

    /// Clear every highlight including hover
    pub fn clear_all(&mut self, scene: &mut SceneGraph) {
        self.clear(scene);
        self.unhighlight(scene, HighlightRole::Hover);
    }

    /// Drop all records without touching a scene. Used when the scene the
    /// records point into has been replaced.
    pub fn forget(&mut self) {
        self.parent = None;
        self.child = None;
        self.hover = None;
    }
}

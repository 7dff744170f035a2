//! Link selection state machine
//!
//! [`SelectionState`] is a plain value. Every transition consumes the
//! current state and returns the next one together with the effects the
//! caller must apply (highlights, dropdown values, joint name suggestion),
//! in order. Slots are always updated before any effect is produced.

use armature_core::DEFAULT_JOINT_NAME;
use armature_scene::{HighlightRole, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::controls::NONE;

/// Whether link picking is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Idle,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotRole {
    Parent,
    Child,
}

impl SlotRole {
    pub fn other(self) -> Self {
        match self {
            SlotRole::Parent => SlotRole::Child,
            SlotRole::Child => SlotRole::Parent,
        }
    }

    pub fn highlight_role(self) -> HighlightRole {
        match self {
            SlotRole::Parent => HighlightRole::Parent,
            SlotRole::Child => HighlightRole::Child,
        }
    }
}

/// A link occupying a slot, with the object used to highlight it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedLink {
    pub name: String,
    pub object: Option<ObjectId>,
}

impl SelectedLink {
    pub fn new(name: impl Into<String>, object: Option<ObjectId>) -> Self {
        Self {
            name: name.into(),
            object,
        }
    }
}

/// Side effect of a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEffect {
    Highlight {
        role: SlotRole,
        object: ObjectId,
        link: String,
    },
    Unhighlight(SlotRole),
    /// Parent and child highlights
    ClearHighlights,
    /// Parent, child and hover highlights
    ClearAllHighlights,
    /// Show `value` in the role's dropdown without re-triggering it
    SetDropdown { role: SlotRole, value: String },
    SuggestName(String),
}

/// Result of a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SelectionState,
    pub effects: Vec<SelectionEffect>,
}

impl Transition {
    fn unchanged(state: SelectionState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    mode: EditorMode,
    parent: Option<SelectedLink>,
    child: Option<SelectedLink>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.mode == EditorMode::Active
    }

    pub fn parent(&self) -> Option<&SelectedLink> {
        self.parent.as_ref()
    }

    pub fn child(&self) -> Option<&SelectedLink> {
        self.child.as_ref()
    }

    pub fn slot(&self, role: SlotRole) -> Option<&SelectedLink> {
        match role {
            SlotRole::Parent => self.parent.as_ref(),
            SlotRole::Child => self.child.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: SlotRole) -> &mut Option<SelectedLink> {
        match role {
            SlotRole::Parent => &mut self.parent,
            SlotRole::Child => &mut self.child,
        }
    }

    fn slot_name(&self, role: SlotRole) -> Option<&str> {
        self.slot(role).map(|l| l.name.as_str())
    }

    /// Both slots filled
    pub fn is_complete(&self) -> bool {
        self.parent.is_some() && self.child.is_some()
    }

    /// Joint name suggested by the current slots
    pub fn suggested_name(&self) -> String {
        suggest_joint_name(self.slot_name(SlotRole::Parent), self.slot_name(SlotRole::Child))
    }

    fn dropdown(&self, role: SlotRole) -> SelectionEffect {
        SelectionEffect::SetDropdown {
            role,
            value: self.slot_name(role).unwrap_or(NONE).to_string(),
        }
    }

    fn fill(&mut self, role: SlotRole, link: SelectedLink, effects: &mut Vec<SelectionEffect>) {
        if let Some(object) = link.object {
            effects.push(SelectionEffect::Highlight {
                role,
                object,
                link: link.name.clone(),
            });
        }
        *self.slot_mut(role) = Some(link);
    }

    /// Turn link picking on or off. Turning it off empties both slots and
    /// drops every highlight.
    pub fn toggle_mode(mut self, enabled: bool) -> Transition {
        if enabled {
            self.mode = EditorMode::Active;
            return Transition::unchanged(self);
        }
        self.mode = EditorMode::Idle;
        self.parent = None;
        self.child = None;
        debug!("Editor mode off, selection cleared");
        let effects = vec![
            SelectionEffect::ClearAllHighlights,
            self.dropdown(SlotRole::Parent),
            self.dropdown(SlotRole::Child),
            SelectionEffect::SuggestName(self.suggested_name()),
        ];
        Transition {
            state: self,
            effects,
        }
    }

    /// A link was clicked in the viewport. Ignored while idle.
    ///
    /// Picking the child unselects it. Otherwise, with both slots full, the
    /// pick starts a new selection with the picked link as parent. Picking
    /// the parent of a partial selection unselects it, and a new link fills
    /// the parent slot first, then the child slot.
    pub fn pick(mut self, link: SelectedLink) -> Transition {
        if !self.is_active() {
            return Transition::unchanged(self);
        }

        let mut effects = Vec::new();
        let parent = self.slot_name(SlotRole::Parent);
        let child = self.slot_name(SlotRole::Child);

        if child == Some(link.name.as_str()) {
            debug!(link = %link.name, "Unselecting child");
            self.child = None;
            effects.push(SelectionEffect::Unhighlight(SlotRole::Child));
            effects.push(self.dropdown(SlotRole::Child));
        } else if parent.is_some() && child.is_some() {
            debug!(link = %link.name, "Both slots full, restarting with new parent");
            self.child = None;
            effects.push(SelectionEffect::ClearHighlights);
            self.fill(SlotRole::Parent, link, &mut effects);
            effects.push(self.dropdown(SlotRole::Parent));
            effects.push(self.dropdown(SlotRole::Child));
        } else if parent == Some(link.name.as_str()) {
            debug!(link = %link.name, "Unselecting parent");
            self.parent = None;
            effects.push(SelectionEffect::Unhighlight(SlotRole::Parent));
            effects.push(self.dropdown(SlotRole::Parent));
        } else if parent.is_none() {
            debug!(link = %link.name, "Selecting parent");
            self.fill(SlotRole::Parent, link, &mut effects);
            effects.push(self.dropdown(SlotRole::Parent));
        } else {
            debug!(link = %link.name, "Selecting child");
            self.fill(SlotRole::Child, link, &mut effects);
            effects.push(self.dropdown(SlotRole::Child));
        }

        effects.push(SelectionEffect::SuggestName(self.suggested_name()));
        Transition {
            state: self,
            effects,
        }
    }

    /// A link was chosen in the parent or child dropdown. `None` is the
    /// "none" entry. Choosing the link held by the other slot reverts the
    /// dropdown and changes nothing.
    pub fn choose_from_dropdown(mut self, role: SlotRole, link: Option<SelectedLink>) -> Transition {
        let mut effects = Vec::new();

        match link {
            Some(link) if self.slot_name(role.other()) == Some(link.name.as_str()) => {
                debug!(?role, link = %link.name, "Link already used by the other slot");
                effects.push(self.dropdown(role));
                return Transition {
                    state: self,
                    effects,
                };
            }
            Some(link) => {
                if self.slot(role).is_some() {
                    effects.push(SelectionEffect::Unhighlight(role));
                }
                self.fill(role, link, &mut effects);
            }
            None => {
                *self.slot_mut(role) = None;
                effects.push(SelectionEffect::Unhighlight(role));
            }
        }

        effects.push(SelectionEffect::SuggestName(self.suggested_name()));
        Transition {
            state: self,
            effects,
        }
    }

    /// Put an existing joint's links into the slots, replacing the current
    /// selection
    pub fn load_joint(mut self, parent: Option<SelectedLink>, child: Option<SelectedLink>) -> Transition {
        self.parent = None;
        self.child = None;
        let mut effects = vec![SelectionEffect::ClearHighlights];
        if let Some(parent) = parent {
            self.fill(SlotRole::Parent, parent, &mut effects);
        }
        if let Some(child) = child.filter(|c| self.slot_name(SlotRole::Parent) != Some(c.name.as_str())) {
            self.fill(SlotRole::Child, child, &mut effects);
        }
        effects.push(self.dropdown(SlotRole::Parent));
        effects.push(self.dropdown(SlotRole::Child));
        Transition {
            state: self,
            effects,
        }
    }

    /// Empty both slots, keeping the mode
    pub fn reset(mut self) -> Transition {
        self.parent = None;
        self.child = None;
        let effects = vec![
            SelectionEffect::ClearHighlights,
            self.dropdown(SlotRole::Parent),
            self.dropdown(SlotRole::Child),
            SelectionEffect::SuggestName(self.suggested_name()),
        ];
        Transition {
            state: self,
            effects,
        }
    }
}

/// `{parent}_to_{child}_joint`, with `...` standing in for an empty slot
pub fn suggest_joint_name(parent: Option<&str>, child: Option<&str>) -> String {
    match (parent, child) {
        (Some(p), Some(c)) => format!("{p}_to_{c}_joint"),
        (Some(p), None) => format!("{p}_to_..._joint"),
        (None, Some(c)) => format!("..._to_{c}_joint"),
        (None, None) => DEFAULT_JOINT_NAME.to_string(),
    }
}

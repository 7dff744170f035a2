//! Joint editor controller
//!
//! [`JointEditor`] owns the document, the loaded model and the editor panel,
//! and routes user events through the selection state machine. Loading is
//! asynchronous from the editor's point of view: the loader deposits its
//! result in a pending slot that every event handler drains first. Until a
//! model is ready, every interaction is ignored.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use armature_core::{read_joint, PatchError, UrdfPatcher};
use armature_scene::{
    load_model, HighlightRole, Highlighter, LoadError, ModelLoader, ObjectId, RobotModel,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, EditorConfig};
use crate::controls::{joint_sliders, EditorControls, EditorField, FieldError, JointSlider, NEW_JOINT, NONE};
use crate::selection::{SelectedLink, SelectionEffect, SelectionState, SlotRole, Transition};

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document error: {0}")]
    Document(#[from] io::Error),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("Edited description does not load: {0}")]
    Invalid(#[from] LoadError),
}

/// Where the robot description text lives
pub trait DocumentContext {
    /// Current full text
    fn text(&self) -> io::Result<String>;
    /// Replace the full text
    fn replace(&mut self, text: &str) -> io::Result<()>;
}

/// Document held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDocument {
    text: String,
}

impl MemoryDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl DocumentContext for MemoryDocument {
    fn text(&self) -> io::Result<String> {
        Ok(self.text.clone())
    }

    fn replace(&mut self, text: &str) -> io::Result<()> {
        self.text = text.to_string();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// A load is in flight
    Loading,
    Ready,
    /// The first load failed, nothing to show
    Failed,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotReady,
    IncompleteSelection,
}

/// Result of pressing the commit button
#[derive(Debug)]
pub enum CommitOutcome {
    Added(String),
    Modified(String),
    Ignored(IgnoreReason),
    Failed(EditorError),
}

type PendingLoad = Rc<RefCell<Option<Result<RobotModel, LoadError>>>>;

/// Interactive joint editor over one robot description
pub struct JointEditor<D: DocumentContext, L: ModelLoader> {
    document: D,
    loader: L,
    patcher: UrdfPatcher,
    phase: LoadPhase,
    pending: PendingLoad,
    model: Option<RobotModel>,
    selection: SelectionState,
    controls: EditorControls,
    highlighter: Highlighter,
    sliders: Vec<JointSlider>,
}

impl<D: DocumentContext, L: ModelLoader> JointEditor<D, L> {
    /// Create the editor and start loading the document
    pub fn new(document: D, loader: L, config: &EditorConfig) -> Result<Self, EditorError> {
        let palette = config.materials.palette()?;
        let mut editor = Self {
            document,
            loader,
            patcher: UrdfPatcher::with_indent(&config.document.indent),
            phase: LoadPhase::Loading,
            pending: PendingLoad::default(),
            model: None,
            selection: SelectionState::new(),
            controls: EditorControls::new(config.fields.clone()),
            highlighter: Highlighter::new(palette),
            sliders: Vec::new(),
        };
        editor.reload()?;
        Ok(editor)
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn model(&self) -> Option<&RobotModel> {
        self.model.as_ref()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn controls(&self) -> &EditorControls {
        &self.controls
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    pub fn sliders(&self) -> &[JointSlider] {
        &self.sliders
    }

    /// Re-read the document and hand it to the loader
    pub fn reload(&mut self) -> Result<(), EditorError> {
        if self.phase == LoadPhase::Disposed {
            return Ok(());
        }
        let text = self.document.text()?;
        self.phase = LoadPhase::Loading;
        let slot = Rc::clone(&self.pending);
        self.loader.load(
            &text,
            Box::new(move |result| {
                *slot.borrow_mut() = Some(result);
            }),
        );
        self.poll_load();
        Ok(())
    }

    /// Apply a finished load if one is waiting
    pub fn poll_load(&mut self) {
        let result = self.pending.borrow_mut().take();
        if let Some(result) = result {
            self.on_description_loaded(result);
        }
    }

    fn is_ready(&mut self) -> bool {
        self.poll_load();
        self.phase == LoadPhase::Ready
    }

    /// A load finished. A failed reload keeps the model already shown.
    pub fn on_description_loaded(&mut self, result: Result<RobotModel, LoadError>) {
        if self.phase == LoadPhase::Disposed {
            return;
        }
        match result {
            Ok(model) => {
                info!(
                    robot = %model.name(),
                    links = model.links().len(),
                    joints = model.joints().len(),
                    "Robot description ready"
                );
                // records point into the replaced scene
                self.highlighter.forget();
                self.controls.set_options(model.link_names(), model.joint_names());
                self.sliders = joint_sliders(&model);
                self.model = Some(model);
                self.phase = LoadPhase::Ready;
            }
            Err(e) if self.model.is_some() => {
                warn!("Reload failed, keeping previous model: {}", e);
                self.phase = LoadPhase::Ready;
            }
            Err(e) => {
                error!("Failed to load robot description: {}", e);
                self.phase = LoadPhase::Failed;
            }
        }
    }

    fn apply(&mut self, transition: Transition) {
        self.selection = transition.state;
        for effect in transition.effects {
            match effect {
                SelectionEffect::Highlight { role, object, link } => {
                    if let Some(model) = self.model.as_mut() {
                        self.highlighter.highlight(
                            model.scene_mut(),
                            object,
                            role.highlight_role(),
                            Some(link.as_str()),
                        );
                    }
                }
                SelectionEffect::Unhighlight(role) => {
                    if let Some(model) = self.model.as_mut() {
                        self.highlighter.unhighlight(model.scene_mut(), role.highlight_role());
                    }
                }
                SelectionEffect::ClearHighlights => {
                    if let Some(model) = self.model.as_mut() {
                        self.highlighter.clear(model.scene_mut());
                    }
                }
                SelectionEffect::ClearAllHighlights => {
                    if let Some(model) = self.model.as_mut() {
                        self.highlighter.clear_all(model.scene_mut());
                    }
                }
                SelectionEffect::SetDropdown { role, value } => match role {
                    SlotRole::Parent => self.controls.parent = value,
                    SlotRole::Child => self.controls.child = value,
                },
                SelectionEffect::SuggestName(name) => {
                    if self.controls.is_creating() {
                        self.controls.name = name;
                    }
                }
            }
        }
    }

    /// Link picking switched on or off
    pub fn on_editor_mode_toggled(&mut self, enabled: bool) {
        if !self.is_ready() {
            return;
        }
        debug!(enabled, "Editor mode toggled");
        self.controls.mode = enabled;
        let transition = std::mem::take(&mut self.selection).toggle_mode(enabled);
        self.apply(transition);
    }

    /// An object was clicked in the viewport, `None` for empty space
    pub fn on_link_picked(&mut self, object: Option<ObjectId>) {
        if !self.is_ready() || !self.selection.is_active() {
            return;
        }
        let Some(object) = object else {
            return;
        };
        let Some(name) = self.model.as_ref().and_then(|m| m.resolve_link(object)) else {
            debug!(object = object.index(), "Picked object is not part of a link");
            return;
        };
        let link = SelectedLink::new(name, Some(object));
        let transition = std::mem::take(&mut self.selection).pick(link);
        self.apply(transition);
    }

    /// The pointer moved onto `object`, or off every object
    pub fn on_pointer_moved(&mut self, object: Option<ObjectId>) {
        if !self.is_ready() || !self.selection.is_active() {
            return;
        }
        let Some(model) = self.model.as_mut() else {
            return;
        };
        let target = object.and_then(|o| model.resolve_link(o).map(|name| (o, name.to_string())));
        match target {
            Some((object, name)) => {
                self.highlighter.hover(model.scene_mut(), Some(object), Some(name.as_str()));
            }
            None => {
                self.highlighter.hover(model.scene_mut(), None, None);
            }
        }
    }

    pub fn on_parent_dropdown_changed(&mut self, value: &str) {
        self.on_dropdown_changed(SlotRole::Parent, value);
    }

    pub fn on_child_dropdown_changed(&mut self, value: &str) {
        self.on_dropdown_changed(SlotRole::Child, value);
    }

    fn on_dropdown_changed(&mut self, role: SlotRole, value: &str) {
        if !self.is_ready() {
            return;
        }
        let Some(model) = self.model.as_ref() else {
            return;
        };
        let link = if value == NONE {
            None
        } else if model.link(value).is_some() {
            Some(SelectedLink::new(value, model.primary_visual_mesh(value)))
        } else {
            warn!(?role, link = value, "Unknown link chosen in dropdown");
            let current = self.selection.slot(role).map_or(NONE, |l| l.name.as_str()).to_string();
            self.set_dropdown(role, current);
            return;
        };
        self.set_dropdown(role, value.to_string());
        let transition = std::mem::take(&mut self.selection).choose_from_dropdown(role, link);
        self.apply(transition);
    }

    fn set_dropdown(&mut self, role: SlotRole, value: String) {
        match role {
            SlotRole::Parent => self.controls.parent = value,
            SlotRole::Child => self.controls.child = value,
        }
    }

    /// Joint type changed. Axis and limit rows follow the new type.
    pub fn on_joint_type_changed(&mut self, value: &str) -> Result<(), FieldError> {
        if !self.is_ready() {
            return Ok(());
        }
        self.controls.set(EditorField::Type, value)?;
        debug!(
            joint_type = %self.controls.joint_type,
            visible = ?self.controls.visible_fields(),
            "Joint type changed"
        );
        Ok(())
    }

    /// Any field edited by name. Type and link fields go through their own
    /// handlers.
    pub fn on_field_changed(&mut self, field: EditorField, value: &str) -> Result<(), FieldError> {
        match field {
            EditorField::Type => self.on_joint_type_changed(value),
            EditorField::Parent => {
                self.on_parent_dropdown_changed(value);
                Ok(())
            }
            EditorField::Child => {
                self.on_child_dropdown_changed(value);
                Ok(())
            }
            _ if !self.is_ready() => Ok(()),
            _ => self.controls.set(field, value),
        }
    }

    /// The joint dropdown changed. The sentinel returns the panel to
    /// creating a new joint; a joint name loads that joint for editing.
    pub fn on_selected_joint_changed(&mut self, value: &str) -> Result<(), EditorError> {
        if !self.is_ready() {
            return Ok(());
        }
        if value == NEW_JOINT {
            self.start_new_joint();
            return Ok(());
        }

        let record = match self
            .document
            .text()
            .map_err(EditorError::from)
            .and_then(|text| read_joint(&text, value).map_err(EditorError::from))
        {
            Ok(record) => record,
            Err(e) => {
                warn!(joint = value, "Cannot load joint for editing: {}", e);
                self.start_new_joint();
                return Err(e);
            }
        };

        debug!(joint = value, "Editing existing joint");
        self.controls.populate_from(&record);
        let (parent, child) = match self.model.as_ref() {
            Some(model) => {
                let selected = |name: Option<&String>| {
                    name.filter(|n| model.link(n).is_some())
                        .map(|n| SelectedLink::new(n.as_str(), model.primary_visual_mesh(n)))
                };
                (selected(record.parent.as_ref()), selected(record.child.as_ref()))
            }
            None => (None, None),
        };
        let transition = std::mem::take(&mut self.selection).load_joint(parent, child);
        self.apply(transition);
        Ok(())
    }

    fn start_new_joint(&mut self) {
        self.controls.reset_fields();
        let transition = std::mem::take(&mut self.selection).reset();
        self.apply(transition);
    }

    /// A joint slider moved. Returns the value applied after clamping.
    pub fn on_joint_value_changed(&mut self, joint: &str, value: f64) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        let applied = self.model.as_mut()?.set_joint_value(joint, value)?;
        if let Some(slider) = self.sliders.iter_mut().find(|s| s.joint == joint) {
            slider.value = applied;
        }
        Some(applied)
    }

    /// Add or update the joint described by the panel. Needs both slots
    /// filled. On success the document is rewritten, the model reloaded and
    /// the panel returned to creating a new joint. On failure the document
    /// is left as it was.
    pub fn on_commit(&mut self) -> CommitOutcome {
        if !self.is_ready() {
            debug!("Commit ignored, model not loaded");
            return CommitOutcome::Ignored(IgnoreReason::NotReady);
        }
        let (Some(parent), Some(child)) = (self.selection.parent(), self.selection.child()) else {
            debug!("Commit ignored, parent and child links are required");
            return CommitOutcome::Ignored(IgnoreReason::IncompleteSelection);
        };
        let (parent, child) = (parent.name.clone(), child.name.clone());

        let creating = self.controls.is_creating();
        // joints are not renamed by an update
        let name = if creating {
            self.controls.name.clone()
        } else {
            self.controls.selected_joint.clone()
        };
        let text = match self.document.text() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to read document: {}", e);
                return CommitOutcome::Failed(e.into());
            }
        };
        let patched = if creating {
            self.patcher.add_joint(&text, &self.controls.to_joint_spec(&parent, &child))
        } else {
            let patch = self.controls.to_patch(&parent, &child);
            self.patcher.modify_joint(&text, &self.controls.selected_joint, &patch)
        };
        let patched = match patched {
            Ok(patched) => patched,
            Err(e) => {
                warn!(joint = %name, "Joint edit rejected: {}", e);
                return CommitOutcome::Failed(e.into());
            }
        };
        // the document only takes text the scene can be rebuilt from
        if let Err(e) = load_model(&patched) {
            warn!(joint = %name, %parent, %child, "Joint edit rejected: {}", e);
            return CommitOutcome::Failed(e.into());
        }
        if let Err(e) = self.document.replace(&patched) {
            error!("Failed to write document: {}", e);
            return CommitOutcome::Failed(e.into());
        }

        if creating {
            info!(joint = %name, %parent, %child, "Added joint");
        } else {
            info!(joint = %name, %parent, %child, "Updated joint");
        }

        self.start_new_joint();
        if let Err(e) = self.reload() {
            error!("Failed to reload document: {}", e);
        }

        if creating {
            CommitOutcome::Added(name)
        } else {
            CommitOutcome::Modified(name)
        }
    }

    /// Tear the editor down. Loads finishing afterwards are dropped.
    pub fn dispose(&mut self) {
        if let Some(model) = self.model.as_mut() {
            self.highlighter.clear_all(model.scene_mut());
        }
        self.selection = SelectionState::new();
        self.controls.mode = false;
        self.pending = PendingLoad::default();
        self.model = None;
        self.sliders.clear();
        self.phase = LoadPhase::Disposed;
        debug!("Joint editor disposed");
    }

    /// Object currently highlighted in `role`
    pub fn highlighted(&self, role: HighlightRole) -> Option<ObjectId> {
        self.highlighter.record(role).map(|r| r.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_core::JointType;
    use armature_scene::{load_model, LoadCallback, Material, UrdfLoader};

    const ARM: &str = r#"<?xml version="1.0"?>
<robot name="arm">
  <link name="base">
    <visual>
      <geometry><box size="0.2 0.2 0.1"/></geometry>
      <material name="grey"><color rgba="0.5 0.5 0.5 1"/></material>
    </visual>
  </link>
  <link name="upper">
    <visual>
      <geometry><cylinder radius="0.05" length="0.4"/></geometry>
      <material name="red"><color rgba="1 0 0 1"/></material>
    </visual>
  </link>
  <link name="tool">
    <visual>
      <geometry><sphere radius="0.02"/></geometry>
    </visual>
  </link>
  <joint name="shoulder" type="revolute">
    <parent link="base"/>
    <child link="upper"/>
    <origin xyz="0 0 0.1" rpy="0 0 0"/>
    <axis xyz="0 1 0"/>
    <limit lower="-1.5" upper="1.5" effort="10" velocity="2"/>
  </joint>
</robot>
"#;

    /// Loader that completes only when told to
    #[derive(Clone, Default)]
    struct DeferredLoader {
        queued: Rc<RefCell<Vec<(String, LoadCallback)>>>,
    }

    impl DeferredLoader {
        fn finish(&self) {
            let queued: Vec<_> = self.queued.borrow_mut().drain(..).collect();
            for (text, on_done) in queued {
                on_done(load_model(&text));
            }
        }
    }

    impl ModelLoader for DeferredLoader {
        fn load(&self, text: &str, on_done: LoadCallback) {
            self.queued.borrow_mut().push((text.to_string(), on_done));
        }
    }

    fn editor(text: &str) -> JointEditor<MemoryDocument, UrdfLoader> {
        JointEditor::new(MemoryDocument::new(text), UrdfLoader::new(), &EditorConfig::default()).unwrap()
    }

    fn mesh(editor: &JointEditor<MemoryDocument, UrdfLoader>, link: &str) -> ObjectId {
        editor.model().unwrap().primary_visual_mesh(link).unwrap()
    }

    fn material(editor: &JointEditor<MemoryDocument, UrdfLoader>, object: ObjectId) -> Material {
        editor.model().unwrap().scene().material(object).unwrap()
    }

    fn slots(editor: &JointEditor<MemoryDocument, UrdfLoader>) -> (Option<String>, Option<String>) {
        let s = editor.selection();
        (
            s.parent().map(|l| l.name.clone()),
            s.child().map(|l| l.name.clone()),
        )
    }

    #[test]
    fn test_events_ignored_until_loaded() {
        let loader = DeferredLoader::default();
        let mut editor =
            JointEditor::new(MemoryDocument::new(ARM), loader.clone(), &EditorConfig::default()).unwrap();
        assert_eq!(editor.phase(), LoadPhase::Loading);

        editor.on_editor_mode_toggled(true);
        assert!(!editor.selection().is_active());
        assert!(matches!(editor.on_commit(), CommitOutcome::Ignored(IgnoreReason::NotReady)));

        loader.finish();
        editor.on_editor_mode_toggled(true);
        assert_eq!(editor.phase(), LoadPhase::Ready);
        assert!(editor.selection().is_active());
        assert_eq!(editor.controls().link_options(), ["none", "base", "upper", "tool"]);
        assert_eq!(editor.controls().joint_options(), ["New Joint", "shoulder"]);
    }

    #[test]
    fn test_failed_first_load() {
        let mut editor = editor("<robot name=\"r\"><link name=\"a\"></robot>");
        assert_eq!(editor.phase(), LoadPhase::Failed);
        assert!(editor.model().is_none());
        editor.on_editor_mode_toggled(true);
        assert!(!editor.selection().is_active());
    }

    #[test]
    fn test_pick_highlights_and_suggests_name() {
        let mut editor = editor(ARM);
        let base = mesh(&editor, "base");
        let upper = mesh(&editor, "upper");
        let grey = material(&editor, base);

        editor.on_editor_mode_toggled(true);
        editor.on_link_picked(Some(base));
        assert_eq!(slots(&editor), (Some("base".into()), None));
        assert_eq!(material(&editor, base), editor.highlighter().palette().parent);
        assert_eq!(editor.controls().parent, "base");
        assert_eq!(editor.controls().name, "base_to_..._joint");

        editor.on_link_picked(Some(upper));
        assert_eq!(slots(&editor), (Some("base".into()), Some("upper".into())));
        assert_eq!(material(&editor, upper), editor.highlighter().palette().child);
        assert_eq!(editor.controls().name, "base_to_upper_joint");

        // picking the parent again restarts with it as parent
        editor.on_link_picked(Some(base));
        assert_eq!(slots(&editor), (Some("base".into()), None));
        assert_eq!(material(&editor, base), editor.highlighter().palette().parent);
        assert_ne!(material(&editor, upper), editor.highlighter().palette().child);

        editor.on_link_picked(Some(base));
        assert_eq!(slots(&editor), (None, None));
        assert_eq!(material(&editor, base), grey);
    }

    #[test]
    fn test_pick_ignored_while_idle() {
        let mut editor = editor(ARM);
        let base = mesh(&editor, "base");
        editor.on_link_picked(Some(base));
        editor.on_link_picked(None);
        assert_eq!(slots(&editor), (None, None));
    }

    #[test]
    fn test_mode_off_clears_highlights() {
        let mut editor = editor(ARM);
        let base = mesh(&editor, "base");
        let tool = mesh(&editor, "tool");
        let grey = material(&editor, base);

        editor.on_editor_mode_toggled(true);
        editor.on_link_picked(Some(base));
        editor.on_pointer_moved(Some(tool));
        assert_eq!(material(&editor, tool), editor.highlighter().palette().hover);

        editor.on_editor_mode_toggled(false);
        assert_eq!(slots(&editor), (None, None));
        assert_eq!(material(&editor, base), grey);
        assert_eq!(material(&editor, tool), Material::default());
        assert_eq!(editor.controls().parent, "none");
        assert!(editor.highlighted(HighlightRole::Hover).is_none());
    }

    #[test]
    fn test_hover_then_pick_restores_true_original() {
        let mut editor = editor(ARM);
        let upper = mesh(&editor, "upper");
        let red = material(&editor, upper);

        editor.on_editor_mode_toggled(true);
        editor.on_pointer_moved(Some(upper));
        let labels = editor.model().unwrap().scene().labels(upper);
        assert_eq!(labels, ["upper"]);

        editor.on_link_picked(Some(upper));
        editor.on_pointer_moved(None);
        assert_eq!(material(&editor, upper), editor.highlighter().palette().parent);

        editor.on_link_picked(Some(upper));
        assert_eq!(material(&editor, upper), red);
    }

    #[test]
    fn test_dropdowns() {
        let mut editor = editor(ARM);
        let base = mesh(&editor, "base");

        editor.on_parent_dropdown_changed("base");
        assert_eq!(slots(&editor), (Some("base".into()), None));
        assert_eq!(editor.highlighted(HighlightRole::Parent), Some(base));

        editor.on_child_dropdown_changed("base");
        assert_eq!(slots(&editor), (Some("base".into()), None));
        assert_eq!(editor.controls().child, "none");

        editor.on_child_dropdown_changed("gripper");
        assert_eq!(editor.controls().child, "none");

        editor.on_child_dropdown_changed("tool");
        assert_eq!(editor.controls().child, "tool");
        assert_eq!(editor.controls().name, "base_to_tool_joint");

        editor.on_parent_dropdown_changed("none");
        assert_eq!(slots(&editor), (None, Some("tool".into())));
        assert!(editor.highlighted(HighlightRole::Parent).is_none());
    }

    #[test]
    fn test_incomplete_commit_leaves_document() {
        let mut editor = editor(ARM);
        editor.on_editor_mode_toggled(true);
        let base = mesh(&editor, "base");
        editor.on_link_picked(Some(base));

        assert!(matches!(
            editor.on_commit(),
            CommitOutcome::Ignored(IgnoreReason::IncompleteSelection)
        ));
        assert_eq!(editor.document().as_str(), ARM);
    }

    #[test]
    fn test_commit_between_connected_links_is_rejected() {
        let mut editor = editor(ARM);
        editor.on_editor_mode_toggled(true);
        let base = mesh(&editor, "base");
        let upper = mesh(&editor, "upper");
        editor.on_link_picked(Some(base));
        editor.on_link_picked(Some(upper));

        let outcome = editor.on_commit();
        assert!(matches!(
            outcome,
            CommitOutcome::Failed(EditorError::Invalid(LoadError::KinematicLoop(ref j))) if j == "base_to_upper_joint"
        ));
        assert_eq!(editor.document().as_str(), ARM);
        assert_eq!(editor.model().unwrap().joint_names(), ["shoulder"]);
        assert_eq!(slots(&editor), (Some("base".into()), Some("upper".into())));
    }

    #[test]
    fn test_commit_with_duplicate_joint_name_is_rejected() {
        let mut editor = editor(ARM);
        editor.on_editor_mode_toggled(true);
        let upper = mesh(&editor, "upper");
        let tool = mesh(&editor, "tool");
        editor.on_link_picked(Some(upper));
        editor.on_link_picked(Some(tool));
        editor.on_field_changed(EditorField::Name, "shoulder").unwrap();

        let outcome = editor.on_commit();
        assert!(matches!(
            outcome,
            CommitOutcome::Failed(EditorError::Invalid(LoadError::DuplicateJoint(ref j))) if j == "shoulder"
        ));
        assert_eq!(editor.document().as_str(), ARM);

        // the editor keeps working on the untouched document
        editor.on_field_changed(EditorField::Name, "wrist").unwrap();
        assert!(matches!(editor.on_commit(), CommitOutcome::Added(ref n) if n == "wrist"));
        assert_eq!(editor.model().unwrap().joint_names(), ["shoulder", "wrist"]);
        assert_eq!(editor.controls().joint_options(), ["New Joint", "shoulder", "wrist"]);
    }

    #[test]
    fn test_commit_adds_joint_and_reloads() {
        let mut editor = editor(ARM);
        editor.on_editor_mode_toggled(true);
        let upper = mesh(&editor, "upper");
        let tool = mesh(&editor, "tool");
        editor.on_link_picked(Some(upper));
        editor.on_link_picked(Some(tool));
        editor.on_joint_type_changed("fixed").unwrap();
        editor.on_field_changed(EditorField::OriginXyz, "0 0 0.4").unwrap();

        let outcome = editor.on_commit();
        assert!(matches!(outcome, CommitOutcome::Added(ref n) if n == "upper_to_tool_joint"));

        let text = editor.document().as_str();
        assert!(text.contains(r#"<joint name="upper_to_tool_joint" type="fixed">"#));
        assert!(text.contains(r#"<origin xyz="0 0 0.4" rpy="0 0 0"/>"#));
        assert!(!text.contains(r#"<axis xyz="0 0 1"/>"#));

        let model = editor.model().unwrap();
        assert_eq!(model.joint("upper_to_tool_joint").unwrap().joint_type, JointType::Fixed);
        assert_eq!(slots(&editor), (None, None));
        assert!(editor.controls().is_creating());
        assert_eq!(editor.controls().joint_type, JointType::Revolute);
        assert_eq!(editor.controls().joint_options(), ["New Joint", "shoulder", "upper_to_tool_joint"]);
        assert!(editor.selection().is_active());
    }

    #[test]
    fn test_modify_existing_joint() {
        let mut editor = editor(ARM);
        editor.on_selected_joint_changed("shoulder").unwrap();
        assert_eq!(editor.controls().commit_label(), "Update Joint");
        assert_eq!(editor.controls().axis_xyz, "0 1 0");
        assert_eq!(editor.controls().upper, "1.5");
        assert_eq!(slots(&editor), (Some("base".into()), Some("upper".into())));
        assert_eq!(editor.controls().parent, "base");
        assert_eq!(editor.highlighted(HighlightRole::Child), Some(mesh(&editor, "upper")));
        // the suggestion does not overwrite the joint being edited
        assert_eq!(editor.controls().name, "shoulder");

        editor.on_joint_type_changed("fixed").unwrap();
        let outcome = editor.on_commit();
        assert!(matches!(outcome, CommitOutcome::Modified(ref n) if n == "shoulder"));

        let text = editor.document().as_str();
        assert!(text.contains(r#"<joint name="shoulder" type="fixed">"#));
        assert!(!text.contains("<axis"));
        assert!(!text.contains("<limit"));
        assert!(editor.controls().is_creating());
        assert!(editor.sliders().is_empty());
    }

    #[test]
    fn test_sentinel_resets_panel() {
        let mut editor = editor(ARM);
        editor.on_selected_joint_changed("shoulder").unwrap();
        editor.on_selected_joint_changed(NEW_JOINT).unwrap();
        assert!(editor.controls().is_creating());
        assert_eq!(editor.controls().name, "new_joint");
        assert_eq!(editor.controls().axis_xyz, "0 0 1");
        assert_eq!(slots(&editor), (None, None));
    }

    #[test]
    fn test_failed_patch_keeps_document() {
        let mut editor = editor(ARM);
        editor.on_selected_joint_changed("shoulder").unwrap();

        let without_joint = ARM.replace("shoulder", "elbow");
        editor.document_mut().replace(&without_joint).unwrap();

        let outcome = editor.on_commit();
        assert!(matches!(
            outcome,
            CommitOutcome::Failed(EditorError::Patch(PatchError::JointNotFound(ref j))) if j == "shoulder"
        ));
        assert_eq!(editor.document().as_str(), without_joint);
    }

    #[test]
    fn test_unknown_selected_joint_falls_back_to_new() {
        let mut editor = editor(ARM);
        let err = editor.on_selected_joint_changed("elbow").unwrap_err();
        assert!(matches!(err, EditorError::Patch(PatchError::JointNotFound(_))));
        assert!(editor.controls().is_creating());
    }

    #[test]
    fn test_failed_reload_keeps_model() {
        let mut editor = editor(ARM);
        editor.on_description_loaded(Err(LoadError::MissingRobot));
        assert_eq!(editor.phase(), LoadPhase::Ready);
        assert_eq!(editor.model().unwrap().name(), "arm");
    }

    #[test]
    fn test_joint_slider_clamps() {
        let mut editor = editor(ARM);
        assert_eq!(editor.sliders().len(), 1);
        assert_eq!(editor.on_joint_value_changed("shoulder", 3.0), Some(1.5));
        assert_eq!(editor.sliders()[0].value, 1.5);
        assert_eq!(editor.on_joint_value_changed("nothing", 0.5), None);
    }

    #[test]
    fn test_dispose_drops_late_loads() {
        let loader = DeferredLoader::default();
        let mut editor =
            JointEditor::new(MemoryDocument::new(ARM), loader.clone(), &EditorConfig::default()).unwrap();
        editor.dispose();
        loader.finish();
        editor.poll_load();
        assert_eq!(editor.phase(), LoadPhase::Disposed);
        assert!(editor.model().is_none());
    }
}

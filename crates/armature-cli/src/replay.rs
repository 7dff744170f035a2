//! Scripted editor sessions
//!
//! A script is a TOML list of `[[step]]` tables, each naming an `action`,
//! played against a [`JointEditor`] in order:
//!
//! ```toml
//! [[step]]
//! action = "mode"
//! enabled = true
//!
//! [[step]]
//! action = "pick"
//! link = "base"
//!
//! [[step]]
//! action = "field"
//! field = "type"
//! value = "fixed"
//!
//! [[step]]
//! action = "commit"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use armature_editor::{CommitOutcome, DocumentContext, EditorField, JointEditor};
use armature_scene::ModelLoader;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Script {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    Mode { enabled: bool },
    /// Click a link's first visual, or empty space without `link`
    Pick {
        #[serde(default)]
        link: Option<String>,
    },
    Hover {
        #[serde(default)]
        link: Option<String>,
    },
    Parent { value: String },
    Child { value: String },
    Field { field: EditorField, value: String },
    SelectJoint { value: String },
    Slider { joint: String, value: f64 },
    Commit,
}

/// What the commits of a script did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub ignored: usize,
    pub failed: Vec<String>,
}

pub fn load_script(path: &Path) -> Result<Script> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid script {}", path.display()))
}

/// Play every step of `script`. Failed commits are reported, not fatal.
pub fn run_script<D: DocumentContext, L: ModelLoader>(
    editor: &mut JointEditor<D, L>,
    script: &Script,
) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();

    for (index, step) in script.steps.iter().enumerate() {
        debug!(step = index + 1, ?step, "Replaying step");
        match step {
            Step::Mode { enabled } => editor.on_editor_mode_toggled(*enabled),
            Step::Pick { link } => {
                let object = link_object(editor, link.as_deref());
                if link.is_some() && object.is_none() {
                    warn!(step = index + 1, link = ?link, "Link has no pickable visual");
                    continue;
                }
                editor.on_link_picked(object);
            }
            Step::Hover { link } => {
                let object = link_object(editor, link.as_deref());
                editor.on_pointer_moved(object);
            }
            Step::Parent { value } => editor.on_parent_dropdown_changed(value),
            Step::Child { value } => editor.on_child_dropdown_changed(value),
            Step::Field { field, value } => editor
                .on_field_changed(*field, value)
                .with_context(|| format!("Step {}: cannot set {field}", index + 1))?,
            Step::SelectJoint { value } => {
                if let Err(e) = editor.on_selected_joint_changed(value) {
                    warn!(step = index + 1, "Cannot select joint {}: {}", value, e);
                }
            }
            Step::Slider { joint, value } => {
                if editor.on_joint_value_changed(joint, *value).is_none() {
                    warn!(step = index + 1, %joint, "Joint cannot be driven");
                }
            }
            Step::Commit => match editor.on_commit() {
                CommitOutcome::Added(name) => report.added.push(name),
                CommitOutcome::Modified(name) => report.modified.push(name),
                CommitOutcome::Ignored(reason) => {
                    warn!(step = index + 1, ?reason, "Commit ignored");
                    report.ignored += 1;
                }
                CommitOutcome::Failed(e) => {
                    warn!(step = index + 1, "Commit failed: {}", e);
                    report.failed.push(e.to_string());
                }
            },
        }
    }
    Ok(report)
}

fn link_object<D: DocumentContext, L: ModelLoader>(
    editor: &JointEditor<D, L>,
    link: Option<&str>,
) -> Option<armature_scene::ObjectId> {
    editor.model()?.primary_visual_mesh(link?)
}

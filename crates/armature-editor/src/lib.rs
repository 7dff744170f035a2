//! Armature Editor - interactive joint editing
//!
//! Ties the document layer and the scene together:
//! - Link selection state machine with explicit effects
//! - The joint editor panel and joint sliders
//! - The controller that routes pick, hover and panel events, gates them on
//!   model loading and commits joint edits back to the document
//! - TOML configuration for highlight colours, field defaults and indentation

pub mod config;
pub mod controller;
pub mod controls;
pub mod selection;

pub use config::{load_config, save_default_config, ConfigError, EditorConfig, CONFIG_FILE};
pub use controller::{
    CommitOutcome, DocumentContext, EditorError, IgnoreReason, JointEditor, LoadPhase,
    MemoryDocument,
};
pub use controls::{
    joint_sliders, EditorControls, EditorField, FieldDefaults, FieldError, JointSlider,
    ADD_JOINT_LABEL, NEW_JOINT, NONE, UPDATE_JOINT_LABEL,
};
pub use selection::{
    suggest_joint_name, EditorMode, SelectedLink, SelectionEffect, SelectionState, SlotRole,
    Transition,
};

//! Armature Core - URDF document model and joint patching
//!
//! This crate provides the text-level editing layer of Armature:
//! - An arena-backed XML document that writes untouched markup back verbatim
//! - Joint types and the axis/limit predicates shared by every edit path
//! - Joint patching: add a joint, modify an existing one, read one back

pub mod document;
pub mod joint;
pub mod patch;

pub use document::{DocumentError, NodeId, NodeKind, XmlDocument};
pub use joint::{
    parse_triple, JointPatch, JointRecord, JointSpec, JointType, UnknownJointType,
    DEFAULT_AXIS, DEFAULT_EFFORT, DEFAULT_JOINT_NAME, DEFAULT_LOWER, DEFAULT_ORIGIN,
    DEFAULT_UPPER, DEFAULT_VELOCITY,
};
pub use patch::{
    add_joint, joint_names, modify_joint, read_joint, PatchError, UrdfPatcher, DEFAULT_INDENT,
};

//! Joint types, joint specifications and partial joint edits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_JOINT_NAME: &str = "new_joint";
pub const DEFAULT_ORIGIN: &str = "0 0 0";
pub const DEFAULT_AXIS: &str = "0 0 1";
pub const DEFAULT_LOWER: &str = "-1.0";
pub const DEFAULT_UPPER: &str = "1.0";
pub const DEFAULT_EFFORT: &str = "0.0";
pub const DEFAULT_VELOCITY: &str = "0.0";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown joint type: {0}")]
pub struct UnknownJointType(pub String);

/// Degree-of-freedom kind of a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    #[default]
    Revolute,
    Continuous,
    Prismatic,
    Fixed,
    Floating,
    Planar,
}

impl JointType {
    pub const ALL: [JointType; 6] = [
        JointType::Revolute,
        JointType::Continuous,
        JointType::Prismatic,
        JointType::Fixed,
        JointType::Floating,
        JointType::Planar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JointType::Revolute => "revolute",
            JointType::Continuous => "continuous",
            JointType::Prismatic => "prismatic",
            JointType::Fixed => "fixed",
            JointType::Floating => "floating",
            JointType::Planar => "planar",
        }
    }

    /// Whether a joint of this type carries an `<axis>` element.
    ///
    /// Used by both patch paths and by the editor's field visibility, so the
    /// form never shows a field that would be dropped on save.
    pub fn needs_axis(self) -> bool {
        matches!(
            self,
            JointType::Revolute | JointType::Continuous | JointType::Prismatic | JointType::Planar
        )
    }

    /// Whether a joint of this type carries a `<limit>` element
    pub fn needs_limits(self) -> bool {
        matches!(self, JointType::Revolute | JointType::Prismatic)
    }

    /// Number of values needed to describe the joint's position
    pub fn degrees_of_freedom(self) -> usize {
        match self {
            JointType::Fixed => 0,
            JointType::Revolute | JointType::Continuous | JointType::Prismatic => 1,
            JointType::Planar => 2,
            JointType::Floating => 6,
        }
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointType {
    type Err = UnknownJointType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JointType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| UnknownJointType(s.to_string()))
    }
}

/// Full description of a joint to add
///
/// Vector-valued fields are whitespace-separated text (`"0 0 1"`), written to
/// the document exactly as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    pub origin_xyz: String,
    pub origin_rpy: String,
    pub axis_xyz: String,
    pub lower: String,
    pub upper: String,
    pub effort: String,
    pub velocity: String,
}

impl JointSpec {
    /// Joint between two links with default origin, axis and limits
    pub fn new(
        name: impl Into<String>,
        joint_type: JointType,
        parent: impl Into<String>,
        child: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            joint_type,
            parent: parent.into(),
            child: child.into(),
            origin_xyz: DEFAULT_ORIGIN.to_string(),
            origin_rpy: DEFAULT_ORIGIN.to_string(),
            axis_xyz: DEFAULT_AXIS.to_string(),
            lower: DEFAULT_LOWER.to_string(),
            upper: DEFAULT_UPPER.to_string(),
            effort: DEFAULT_EFFORT.to_string(),
            velocity: DEFAULT_VELOCITY.to_string(),
        }
    }

    /// Patch that overwrites every editable attribute with this spec's values
    pub fn to_patch(&self) -> JointPatch {
        JointPatch {
            joint_type: Some(self.joint_type),
            parent: Some(self.parent.clone()),
            child: Some(self.child.clone()),
            origin_xyz: Some(self.origin_xyz.clone()),
            origin_rpy: Some(self.origin_rpy.clone()),
            axis_xyz: Some(self.axis_xyz.clone()),
            lower: Some(self.lower.clone()),
            upper: Some(self.upper.clone()),
            effort: Some(self.effort.clone()),
            velocity: Some(self.velocity.clone()),
        }
    }
}

/// Partial joint edit; only `Some` fields are applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointPatch {
    #[serde(rename = "type", default)]
    pub joint_type: Option<JointType>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub child: Option<String>,
    #[serde(default)]
    pub origin_xyz: Option<String>,
    #[serde(default)]
    pub origin_rpy: Option<String>,
    #[serde(default)]
    pub axis_xyz: Option<String>,
    #[serde(default)]
    pub lower: Option<String>,
    #[serde(default)]
    pub upper: Option<String>,
    #[serde(default)]
    pub effort: Option<String>,
    #[serde(default)]
    pub velocity: Option<String>,
}

impl JointPatch {
    pub fn is_empty(&self) -> bool {
        *self == JointPatch::default()
    }

    pub(crate) fn touches_origin(&self) -> bool {
        self.origin_xyz.is_some() || self.origin_rpy.is_some()
    }

    pub(crate) fn touches_limits(&self) -> bool {
        self.lower.is_some() || self.upper.is_some() || self.effort.is_some() || self.velocity.is_some()
    }
}

/// Attributes of a joint as currently written in a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JointRecord {
    pub name: String,
    /// Raw `type` attribute, which may not be a known joint type
    pub type_name: Option<String>,
    pub parent: Option<String>,
    pub child: Option<String>,
    pub origin_xyz: Option<String>,
    pub origin_rpy: Option<String>,
    pub axis_xyz: Option<String>,
    pub lower: Option<String>,
    pub upper: Option<String>,
    pub effort: Option<String>,
    pub velocity: Option<String>,
}

impl JointRecord {
    pub fn joint_type(&self) -> Option<JointType> {
        self.type_name.as_deref().and_then(|t| t.parse().ok())
    }
}

/// Parse a whitespace-separated triple such as `"0 0 1"`
pub fn parse_triple(s: &str) -> Option<[f64; 3]> {
    let parts: Vec<f64> = s
        .split_whitespace()
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;
    if parts.len() == 3 {
        Some([parts[0], parts[1], parts[2]])
    } else {
        None
    }
}

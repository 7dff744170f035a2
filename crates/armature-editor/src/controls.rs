//! Editor control panel model
//!
//! The panel is a typed struct, one member per recognised field, instead
//! of a free-form key/value bag. [`EditorField`] names the fields for code
//! that addresses them dynamically (scripts, the command line).

use std::fmt;
use std::str::FromStr;

use armature_core::{
    JointPatch, JointRecord, JointSpec, JointType, UnknownJointType, DEFAULT_AXIS,
    DEFAULT_EFFORT, DEFAULT_JOINT_NAME, DEFAULT_LOWER, DEFAULT_ORIGIN, DEFAULT_UPPER,
    DEFAULT_VELOCITY,
};
use armature_scene::RobotModel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Selected-joint value meaning "create a new joint"
pub const NEW_JOINT: &str = "New Joint";
/// Link dropdown value meaning "no link"
pub const NONE: &str = "none";

pub const ADD_JOINT_LABEL: &str = "Add Joint";
pub const UPDATE_JOINT_LABEL: &str = "Update Joint";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Unknown editor field: {0}")]
    UnknownField(String),
    #[error(transparent)]
    InvalidType(#[from] UnknownJointType),
}

/// Editable joint fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorField {
    Name,
    Type,
    Parent,
    Child,
    OriginXyz,
    OriginRpy,
    AxisXyz,
    Lower,
    Upper,
    Effort,
    Velocity,
}

impl EditorField {
    pub const ALL: [EditorField; 11] = [
        EditorField::Name,
        EditorField::Type,
        EditorField::Parent,
        EditorField::Child,
        EditorField::OriginXyz,
        EditorField::OriginRpy,
        EditorField::AxisXyz,
        EditorField::Lower,
        EditorField::Upper,
        EditorField::Effort,
        EditorField::Velocity,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            EditorField::Name => "name",
            EditorField::Type => "type",
            EditorField::Parent => "parent",
            EditorField::Child => "child",
            EditorField::OriginXyz => "origin_xyz",
            EditorField::OriginRpy => "origin_rpy",
            EditorField::AxisXyz => "axis_xyz",
            EditorField::Lower => "lower",
            EditorField::Upper => "upper",
            EditorField::Effort => "effort",
            EditorField::Velocity => "velocity",
        }
    }

    /// Label shown next to the field
    pub fn label(&self) -> &'static str {
        match self {
            EditorField::Name => "Name",
            EditorField::Type => "Type",
            EditorField::Parent => "Parent Link",
            EditorField::Child => "Child Link",
            EditorField::OriginXyz => "Origin XYZ",
            EditorField::OriginRpy => "Origin RPY",
            EditorField::AxisXyz => "Axis XYZ",
            EditorField::Lower => "Lower Limit",
            EditorField::Upper => "Upper Limit",
            EditorField::Effort => "Effort",
            EditorField::Velocity => "Velocity",
        }
    }

    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            EditorField::Lower | EditorField::Upper | EditorField::Effort | EditorField::Velocity
        )
    }
}

impl fmt::Display for EditorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EditorField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EditorField::ALL
            .into_iter()
            .find(|f| f.key() == s)
            .ok_or_else(|| FieldError::UnknownField(s.to_string()))
    }
}

/// Values the form falls back to for a new joint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefaults {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default, rename = "type")]
    pub joint_type: JointType,
    #[serde(default = "default_origin")]
    pub origin_xyz: String,
    #[serde(default = "default_origin")]
    pub origin_rpy: String,
    #[serde(default = "default_axis")]
    pub axis_xyz: String,
    #[serde(default = "default_lower")]
    pub lower: String,
    #[serde(default = "default_upper")]
    pub upper: String,
    #[serde(default = "default_effort")]
    pub effort: String,
    #[serde(default = "default_velocity")]
    pub velocity: String,
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self {
            name: default_name(),
            joint_type: JointType::default(),
            origin_xyz: default_origin(),
            origin_rpy: default_origin(),
            axis_xyz: default_axis(),
            lower: default_lower(),
            upper: default_upper(),
            effort: default_effort(),
            velocity: default_velocity(),
        }
    }
}

fn default_name() -> String {
    DEFAULT_JOINT_NAME.to_string()
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

fn default_axis() -> String {
    DEFAULT_AXIS.to_string()
}

fn default_lower() -> String {
    DEFAULT_LOWER.to_string()
}

fn default_upper() -> String {
    DEFAULT_UPPER.to_string()
}

fn default_effort() -> String {
    DEFAULT_EFFORT.to_string()
}

fn default_velocity() -> String {
    DEFAULT_VELOCITY.to_string()
}

/// State of the joint editor panel
#[derive(Debug, Clone, PartialEq)]
pub struct EditorControls {
    /// Link selector mode toggle
    pub mode: bool,
    /// [`NEW_JOINT`] or the name of the joint being modified
    pub selected_joint: String,
    pub name: String,
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
    link_options: Vec<String>,
    joint_options: Vec<String>,
    defaults: FieldDefaults,
}

impl Default for EditorControls {
    fn default() -> Self {
        Self::new(FieldDefaults::default())
    }
}

impl EditorControls {
    pub fn new(defaults: FieldDefaults) -> Self {
        let mut controls = Self {
            mode: false,
            selected_joint: NEW_JOINT.to_string(),
            name: String::new(),
            joint_type: JointType::default(),
            parent: NONE.to_string(),
            child: NONE.to_string(),
            origin_xyz: String::new(),
            origin_rpy: String::new(),
            axis_xyz: String::new(),
            lower: String::new(),
            upper: String::new(),
            effort: String::new(),
            velocity: String::new(),
            link_options: vec![NONE.to_string()],
            joint_options: vec![NEW_JOINT.to_string()],
            defaults,
        };
        controls.reset_fields();
        controls
    }

    /// Restore every joint field to its default. The mode toggle and the
    /// option lists are kept.
    pub fn reset_fields(&mut self) {
        let d = &self.defaults;
        self.selected_joint = NEW_JOINT.to_string();
        self.name = d.name.clone();
        self.joint_type = d.joint_type;
        self.parent = NONE.to_string();
        self.child = NONE.to_string();
        self.origin_xyz = d.origin_xyz.clone();
        self.origin_rpy = d.origin_rpy.clone();
        self.axis_xyz = d.axis_xyz.clone();
        self.lower = d.lower.clone();
        self.upper = d.upper.clone();
        self.effort = d.effort.clone();
        self.velocity = d.velocity.clone();
    }

    pub fn get(&self, field: EditorField) -> String {
        match field {
            EditorField::Name => self.name.clone(),
            EditorField::Type => self.joint_type.to_string(),
            EditorField::Parent => self.parent.clone(),
            EditorField::Child => self.child.clone(),
            EditorField::OriginXyz => self.origin_xyz.clone(),
            EditorField::OriginRpy => self.origin_rpy.clone(),
            EditorField::AxisXyz => self.axis_xyz.clone(),
            EditorField::Lower => self.lower.clone(),
            EditorField::Upper => self.upper.clone(),
            EditorField::Effort => self.effort.clone(),
            EditorField::Velocity => self.velocity.clone(),
        }
    }

    /// Set a field from its text value. Only `type` can fail.
    pub fn set(&mut self, field: EditorField, value: &str) -> Result<(), FieldError> {
        let slot = match field {
            EditorField::Type => {
                self.joint_type = value.parse()?;
                return Ok(());
            }
            EditorField::Name => &mut self.name,
            EditorField::Parent => &mut self.parent,
            EditorField::Child => &mut self.child,
            EditorField::OriginXyz => &mut self.origin_xyz,
            EditorField::OriginRpy => &mut self.origin_rpy,
            EditorField::AxisXyz => &mut self.axis_xyz,
            EditorField::Lower => &mut self.lower,
            EditorField::Upper => &mut self.upper,
            EditorField::Effort => &mut self.effort,
            EditorField::Velocity => &mut self.velocity,
        };
        *slot = value.to_string();
        Ok(())
    }

    /// True while the sentinel is selected
    pub fn is_creating(&self) -> bool {
        self.selected_joint == NEW_JOINT
    }

    pub fn commit_label(&self) -> &'static str {
        if self.is_creating() {
            ADD_JOINT_LABEL
        } else {
            UPDATE_JOINT_LABEL
        }
    }

    /// Whether a field's row is shown for the current joint type
    pub fn is_visible(&self, field: EditorField) -> bool {
        match field {
            EditorField::AxisXyz => self.joint_type.needs_axis(),
            f if f.is_limit() => self.joint_type.needs_limits(),
            _ => true,
        }
    }

    pub fn visible_fields(&self) -> Vec<EditorField> {
        EditorField::ALL
            .into_iter()
            .filter(|f| self.is_visible(*f))
            .collect()
    }

    /// Dropdown entries for parent and child: `none` then every link
    pub fn link_options(&self) -> &[String] {
        &self.link_options
    }

    /// Dropdown entries for the selected joint: the sentinel then every joint
    pub fn joint_options(&self) -> &[String] {
        &self.joint_options
    }

    pub fn set_options(&mut self, links: Vec<String>, joints: Vec<String>) {
        self.link_options = std::iter::once(NONE.to_string()).chain(links).collect();
        self.joint_options = std::iter::once(NEW_JOINT.to_string()).chain(joints).collect();
    }

    /// Fill the form from a joint read out of the document. Missing axis
    /// and limit values fall back to the defaults.
    pub fn populate_from(&mut self, record: &JointRecord) {
        let d = &self.defaults;
        let or = |value: &Option<String>, default: &str| value.clone().unwrap_or_else(|| default.to_string());

        self.selected_joint = record.name.clone();
        self.name = record.name.clone();
        self.joint_type = record.joint_type().unwrap_or(d.joint_type);
        self.parent = or(&record.parent, NONE);
        self.child = or(&record.child, NONE);
        self.origin_xyz = or(&record.origin_xyz, &d.origin_xyz);
        self.origin_rpy = or(&record.origin_rpy, &d.origin_rpy);
        self.axis_xyz = or(&record.axis_xyz, &d.axis_xyz);
        self.lower = or(&record.lower, &d.lower);
        self.upper = or(&record.upper, &d.upper);
        self.effort = or(&record.effort, &d.effort);
        self.velocity = or(&record.velocity, &d.velocity);
    }

    /// New joint between `parent` and `child` from the current field values
    pub fn to_joint_spec(&self, parent: &str, child: &str) -> JointSpec {
        JointSpec {
            name: self.name.clone(),
            joint_type: self.joint_type,
            parent: parent.to_string(),
            child: child.to_string(),
            origin_xyz: self.origin_xyz.clone(),
            origin_rpy: self.origin_rpy.clone(),
            axis_xyz: self.axis_xyz.clone(),
            lower: self.lower.clone(),
            upper: self.upper.clone(),
            effort: self.effort.clone(),
            velocity: self.velocity.clone(),
        }
    }

    /// Patch overwriting every editable attribute of an existing joint
    pub fn to_patch(&self, parent: &str, child: &str) -> JointPatch {
        self.to_joint_spec(parent, child).to_patch()
    }
}

/// Slider for driving one joint of the loaded model
#[derive(Debug, Clone, PartialEq)]
pub struct JointSlider {
    pub joint: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub value: f64,
}

/// One slider per movable joint, in document order
pub fn joint_sliders(model: &RobotModel) -> Vec<JointSlider> {
    model
        .movable_joints()
        .map(|joint| JointSlider {
            joint: joint.name.clone(),
            min: joint.limit.lower,
            max: joint.limit.upper,
            step: (joint.limit.upper - joint.limit.lower) / 20.0,
            value: joint.value(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let controls = EditorControls::default();
        assert!(controls.is_creating());
        assert_eq!(controls.commit_label(), "Add Joint");
        assert_eq!(controls.name, "new_joint");
        assert_eq!(controls.joint_type, JointType::Revolute);
        assert_eq!(controls.parent, "none");
        assert_eq!(controls.axis_xyz, "0 0 1");
        assert_eq!(controls.lower, "-1.0");
        assert_eq!(controls.velocity, "0.0");
    }

    #[test]
    fn test_visibility_follows_type() {
        let mut controls = EditorControls::default();
        assert_eq!(controls.visible_fields().len(), 11);

        controls.set(EditorField::Type, "continuous").unwrap();
        assert!(controls.is_visible(EditorField::AxisXyz));
        assert!(!controls.is_visible(EditorField::Lower));

        controls.set(EditorField::Type, "fixed").unwrap();
        assert!(!controls.is_visible(EditorField::AxisXyz));
        assert!(!controls.is_visible(EditorField::Velocity));
        assert!(controls.is_visible(EditorField::OriginRpy));
    }

    #[test]
    fn test_field_keys_round_trip() {
        for field in EditorField::ALL {
            assert_eq!(field.key().parse::<EditorField>().unwrap(), field);
        }
        assert_eq!(
            "mass".parse::<EditorField>().unwrap_err(),
            FieldError::UnknownField("mass".to_string())
        );
    }

    #[test]
    fn test_set_rejects_unknown_type() {
        let mut controls = EditorControls::default();
        assert!(matches!(
            controls.set(EditorField::Type, "ball"),
            Err(FieldError::InvalidType(_))
        ));
        assert_eq!(controls.joint_type, JointType::Revolute);
        controls.set(EditorField::OriginXyz, "1 2 3").unwrap();
        assert_eq!(controls.get(EditorField::OriginXyz), "1 2 3");
    }

    #[test]
    fn test_populate_from_record_uses_defaults_for_missing() {
        let mut controls = EditorControls::default();
        let record = JointRecord {
            name: "weld".to_string(),
            type_name: Some("fixed".to_string()),
            parent: Some("a".to_string()),
            child: Some("b".to_string()),
            origin_xyz: Some("0 0 1".to_string()),
            ..Default::default()
        };
        controls.populate_from(&record);
        assert!(!controls.is_creating());
        assert_eq!(controls.commit_label(), "Update Joint");
        assert_eq!(controls.joint_type, JointType::Fixed);
        assert_eq!(controls.parent, "a");
        assert_eq!(controls.origin_xyz, "0 0 1");
        assert_eq!(controls.origin_rpy, "0 0 0");
        assert_eq!(controls.axis_xyz, "0 0 1");
        assert_eq!(controls.upper, "1.0");

        controls.reset_fields();
        assert!(controls.is_creating());
        assert_eq!(controls.name, "new_joint");
    }

    #[test]
    fn test_options_start_with_sentinels() {
        let mut controls = EditorControls::default();
        controls.set_options(vec!["a".into(), "b".into()], vec!["j".into()]);
        assert_eq!(controls.link_options(), ["none", "a", "b"]);
        assert_eq!(controls.joint_options(), ["New Joint", "j"]);
    }

    #[test]
    fn test_joint_sliders() {
        let model = RobotModel::parse(
            r#"<robot name="r">
  <link name="a"/><link name="b"/><link name="c"/>
  <joint name="elbow" type="revolute"><parent link="a"/><child link="b"/><limit lower="-1" upper="1"/></joint>
  <joint name="weld" type="fixed"><parent link="b"/><child link="c"/></joint>
</robot>"#,
        )
        .unwrap();
        let sliders = joint_sliders(&model);
        assert_eq!(
            sliders,
            vec![JointSlider {
                joint: "elbow".to_string(),
                min: -1.0,
                max: 1.0,
                step: 0.1,
                value: 0.0,
            }]
        );
    }
}

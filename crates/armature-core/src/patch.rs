//! Joint patching for robot description documents
//!
//! Every operation parses the document text, edits the parsed tree and
//! returns a freshly serialized string. The input text is never modified,
//! so a failed edit leaves the caller's document authoritative.
//!
//! New elements are indented to match the surrounding markup: the
//! indentation of existing siblings is reused when present, and the
//! patcher's indent unit (two spaces by default) fills in otherwise.

use thiserror::Error;
use tracing::debug;

use crate::document::{DocumentError, NodeId, XmlDocument};
use crate::joint::{JointPatch, JointRecord, JointSpec, JointType};

/// Indent unit used when the document gives no hint
pub const DEFAULT_INDENT: &str = "  ";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("Malformed robot description: {0}")]
    MalformedDocument(#[from] DocumentError),
    #[error("No <robot> element found in robot description")]
    MissingRootElement,
    #[error("Joint \"{0}\" not found in robot description")]
    JointNotFound(String),
}

/// Applies joint edits to robot description text
#[derive(Debug, Clone)]
pub struct UrdfPatcher {
    indent: String,
}

impl Default for UrdfPatcher {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT.to_string(),
        }
    }
}

impl UrdfPatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different indent unit for documents without indentation hints
    pub fn with_indent(indent: impl Into<String>) -> Self {
        Self {
            indent: indent.into(),
        }
    }

    /// Append a new `<joint>` as the last child of `<robot>`.
    ///
    /// `<parent>`, `<child>` and `<origin>` are always written; `<axis>` and
    /// `<limit>` only when the joint type uses them.
    pub fn add_joint(&self, text: &str, spec: &JointSpec) -> Result<String, PatchError> {
        let mut doc = XmlDocument::parse(text)?;
        let robot = doc
            .find_element("robot")
            .ok_or(PatchError::MissingRootElement)?;
        let layout = Layout::of(&doc, robot, &self.indent);

        debug!(
            joint = %spec.name,
            joint_type = %spec.joint_type,
            parent = %spec.parent,
            child = %spec.child,
            "Adding joint"
        );

        let joint = doc.create_element(
            "joint",
            &[("name", spec.name.as_str()), ("type", spec.joint_type.as_str())],
        );

        let mut children = vec![
            doc.create_element("parent", &[("link", spec.parent.as_str())]),
            doc.create_element("child", &[("link", spec.child.as_str())]),
            doc.create_element(
                "origin",
                &[("xyz", spec.origin_xyz.as_str()), ("rpy", spec.origin_rpy.as_str())],
            ),
        ];
        if spec.joint_type.needs_axis() {
            children.push(doc.create_element("axis", &[("xyz", spec.axis_xyz.as_str())]));
        }
        if spec.joint_type.needs_limits() {
            children.push(doc.create_element(
                "limit",
                &[
                    ("lower", spec.lower.as_str()),
                    ("upper", spec.upper.as_str()),
                    ("effort", spec.effort.as_str()),
                    ("velocity", spec.velocity.as_str()),
                ],
            ));
        }

        for child in children {
            let indent = doc.create_text(&format!("\n{}", layout.grandchild));
            doc.append_child(joint, indent);
            doc.append_child(joint, child);
        }
        let closing = doc.create_text(&format!("\n{}", layout.child));
        doc.append_child(joint, closing);

        insert_element(&mut doc, robot, joint, &layout);

        Ok(doc.to_xml())
    }

    /// Apply a partial edit to an existing joint.
    ///
    /// Axis and limit fields are only written when the joint's resulting
    /// type uses them; stale `<axis>`/`<limit>` elements are removed when the
    /// type no longer does. Joints whose type is not a known URDF type keep
    /// their axis and limit elements untouched.
    pub fn modify_joint(
        &self,
        text: &str,
        joint_name: &str,
        patch: &JointPatch,
    ) -> Result<String, PatchError> {
        let mut doc = XmlDocument::parse(text)?;
        doc.find_element("robot")
            .ok_or(PatchError::MissingRootElement)?;
        let joint = find_joint(&doc, joint_name)
            .ok_or_else(|| PatchError::JointNotFound(joint_name.to_string()))?;

        debug!(joint = %joint_name, ?patch, "Modifying joint");

        if let Some(joint_type) = patch.joint_type {
            doc.set_attribute(joint, "type", joint_type.as_str());
        }
        if let Some(parent) = &patch.parent {
            let el = self.find_or_create(&mut doc, joint, "parent");
            doc.set_attribute(el, "link", parent);
        }
        if let Some(child) = &patch.child {
            let el = self.find_or_create(&mut doc, joint, "child");
            doc.set_attribute(el, "link", child);
        }
        if patch.touches_origin() {
            let origin = self.find_or_create(&mut doc, joint, "origin");
            if let Some(xyz) = &patch.origin_xyz {
                doc.set_attribute(origin, "xyz", xyz);
            }
            if let Some(rpy) = &patch.origin_rpy {
                doc.set_attribute(origin, "rpy", rpy);
            }
        }

        let effective_type = patch.joint_type.or_else(|| {
            doc.attribute(joint, "type")
                .and_then(|t| t.parse::<JointType>().ok())
        });
        let Some(joint_type) = effective_type else {
            debug!(joint = %joint_name, "Unrecognised joint type, leaving axis and limit as-is");
            return Ok(doc.to_xml());
        };

        if joint_type.needs_axis() {
            if let Some(xyz) = &patch.axis_xyz {
                let axis = self.find_or_create(&mut doc, joint, "axis");
                doc.set_attribute(axis, "xyz", xyz);
            }
        } else if let Some(axis) = doc.first_child_named(joint, "axis") {
            debug!(joint = %joint_name, %joint_type, "Removing axis");
            remove_element(&mut doc, axis);
        }

        if joint_type.needs_limits() {
            if patch.touches_limits() {
                let limit = self.find_or_create(&mut doc, joint, "limit");
                let fields = [
                    ("lower", &patch.lower),
                    ("upper", &patch.upper),
                    ("effort", &patch.effort),
                    ("velocity", &patch.velocity),
                ];
                for (attr, value) in fields {
                    if let Some(value) = value {
                        doc.set_attribute(limit, attr, value);
                    }
                }
            }
        } else if let Some(limit) = doc.first_child_named(joint, "limit") {
            debug!(joint = %joint_name, %joint_type, "Removing limit");
            remove_element(&mut doc, limit);
        }

        Ok(doc.to_xml())
    }

    /// Read a joint's current attributes out of the document
    pub fn read_joint(&self, text: &str, joint_name: &str) -> Result<JointRecord, PatchError> {
        let doc = XmlDocument::parse(text)?;
        doc.find_element("robot")
            .ok_or(PatchError::MissingRootElement)?;
        let joint = find_joint(&doc, joint_name)
            .ok_or_else(|| PatchError::JointNotFound(joint_name.to_string()))?;

        let child_attr = |element: &str, attr: &str| {
            doc.first_child_named(joint, element)
                .and_then(|el| doc.attribute(el, attr))
                .map(str::to_string)
        };

        Ok(JointRecord {
            name: joint_name.to_string(),
            type_name: doc.attribute(joint, "type").map(str::to_string),
            parent: child_attr("parent", "link"),
            child: child_attr("child", "link"),
            origin_xyz: child_attr("origin", "xyz"),
            origin_rpy: child_attr("origin", "rpy"),
            axis_xyz: child_attr("axis", "xyz"),
            lower: child_attr("limit", "lower"),
            upper: child_attr("limit", "upper"),
            effort: child_attr("limit", "effort"),
            velocity: child_attr("limit", "velocity"),
        })
    }

    fn find_or_create(&self, doc: &mut XmlDocument, joint: NodeId, name: &str) -> NodeId {
        if let Some(existing) = doc.first_child_named(joint, name) {
            return existing;
        }
        let element = doc.create_element(name, &[]);
        // joints written on a single line stay on a single line
        let children = doc.children(joint);
        if !children.is_empty() && !children.iter().any(|c| doc.is_whitespace(*c)) {
            doc.append_child(joint, element);
            return element;
        }
        let layout = Layout::of(doc, joint, &self.indent);
        insert_element(doc, joint, element, &layout);
        element
    }
}

/// Names of all joints declared in the document, in document order
pub fn joint_names(text: &str) -> Result<Vec<String>, PatchError> {
    let doc = XmlDocument::parse(text)?;
    let robot = doc
        .find_element("robot")
        .ok_or(PatchError::MissingRootElement)?;
    Ok(doc
        .child_elements(robot)
        .filter(|id| doc.name(*id) == Some("joint"))
        .filter_map(|id| doc.attribute(id, "name").map(str::to_string))
        .collect())
}

/// Add a joint using the default indent unit
pub fn add_joint(text: &str, spec: &JointSpec) -> Result<String, PatchError> {
    UrdfPatcher::default().add_joint(text, spec)
}

/// Modify a joint using the default indent unit
pub fn modify_joint(text: &str, joint_name: &str, patch: &JointPatch) -> Result<String, PatchError> {
    UrdfPatcher::default().modify_joint(text, joint_name, patch)
}

/// Read a joint's attributes
pub fn read_joint(text: &str, joint_name: &str) -> Result<JointRecord, PatchError> {
    UrdfPatcher::default().read_joint(text, joint_name)
}

/// Find a kinematic joint by name. `<joint>` references inside
/// `<transmission>` blocks share the element name and are skipped.
fn find_joint(doc: &XmlDocument, name: &str) -> Option<NodeId> {
    doc.elements_named("joint").find(|id| {
        doc.attribute(*id, "name") == Some(name)
            && doc.parent(*id).and_then(|p| doc.name(p)) != Some("transmission")
    })
}

/// Indentation around a container element
struct Layout {
    /// Indentation of the container's own tags
    own: String,
    /// Indentation of the container's children
    child: String,
    /// Indentation of the children's children
    grandchild: String,
}

impl Layout {
    fn of(doc: &XmlDocument, container: NodeId, unit: &str) -> Self {
        let own = doc.indentation_of(container).unwrap_or_default();
        let child = doc
            .child_elements(container)
            .find_map(|c| doc.indentation_of(c))
            .unwrap_or_else(|| format!("{own}{unit}"));
        let step = child
            .strip_prefix(own.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(unit)
            .to_string();
        let grandchild = format!("{child}{step}");
        Self {
            own,
            child,
            grandchild,
        }
    }
}

/// Insert `element` as the last element child of `container`, keeping the
/// container's closing-tag indentation in place
fn insert_element(doc: &mut XmlDocument, container: NodeId, element: NodeId, layout: &Layout) {
    let indent = doc.create_text(&format!("\n{}", layout.child));
    match doc.closing_whitespace(container) {
        Some(closing) => {
            doc.insert_before(container, indent, closing);
            doc.insert_before(container, element, closing);
        }
        None => {
            doc.append_child(container, indent);
            doc.append_child(container, element);
            let closing = doc.create_text(&format!("\n{}", layout.own));
            doc.append_child(container, closing);
        }
    }
}

/// Detach an element along with the indentation in front of it
fn remove_element(doc: &mut XmlDocument, element: NodeId) {
    if let Some(prev) = doc.previous_sibling(element) {
        if doc.is_whitespace(prev) {
            doc.detach(prev);
        }
    }
    doc.detach(element);
}

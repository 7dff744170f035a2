//! Robot model built from a URDF document
//!
//! Links and joints are stored in `Vec`s with a name-keyed index. The scene
//! graph nests objects kinematically: each joint object hangs under its
//! parent link and the child link's object is moved under the joint.

use std::collections::HashMap;

use armature_core::{parse_triple, JointType, NodeId, XmlDocument};
use tracing::{debug, warn};

use crate::loader::LoadError;
use crate::scene::{Geometry, Material, ObjectId, ObjectKind, SceneGraph};

/// Position and orientation offset
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub xyz: [f64; 3],
    pub rpy: [f64; 3],
}

/// Joint motion limits
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointLimit {
    pub lower: f64,
    pub upper: f64,
    pub effort: f64,
    pub velocity: f64,
}

#[derive(Debug, Clone)]
pub struct Link {
    pub name: String,
    pub object: ObjectId,
    /// Visual objects in document order
    pub visuals: Vec<ObjectId>,
}

#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    pub object: ObjectId,
    pub origin: Pose,
    pub axis: [f64; 3],
    pub limit: JointLimit,
    /// Current position, one value per degree of freedom
    pub values: Vec<f64>,
}

impl Joint {
    pub fn value(&self) -> f64 {
        self.values.first().copied().unwrap_or_default()
    }

    /// Joints that can be driven by a slider: not fixed and with a
    /// non-degenerate limit range
    pub fn is_movable(&self) -> bool {
        self.joint_type != JointType::Fixed
            && !(self.limit.lower == 0.0 && self.limit.upper == 0.0)
    }

    fn clamps(&self) -> bool {
        matches!(self.joint_type, JointType::Revolute | JointType::Prismatic)
    }
}

/// A loaded robot: its document, scene graph, links and joints
#[derive(Debug, Clone)]
pub struct RobotModel {
    name: String,
    document: XmlDocument,
    scene: SceneGraph,
    root: ObjectId,
    links: Vec<Link>,
    link_index: HashMap<String, usize>,
    joints: Vec<Joint>,
    joint_index: HashMap<String, usize>,
}

impl RobotModel {
    /// Build a model from URDF text
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let document = XmlDocument::parse(text)?;
        let robot = document.find_element("robot").ok_or(LoadError::MissingRobot)?;
        let name = document.attribute(robot, "name").unwrap_or_default().to_string();

        let mut scene = SceneGraph::new();
        let root = scene.add(name.clone(), ObjectKind::Robot, None);
        let materials = named_materials(&document, robot)?;

        let mut links = Vec::new();
        let mut link_index = HashMap::new();
        for node in document.child_elements(robot) {
            if document.name(node) != Some("link") {
                continue;
            }
            let link_name = required(&document, node, "name")?.to_string();
            if link_index.contains_key(&link_name) {
                return Err(LoadError::DuplicateLink(link_name));
            }
            let object = scene.add(link_name.clone(), ObjectKind::Link, Some(root));
            let visuals = build_visuals(&document, node, &link_name, object, &materials, &mut scene)?;
            link_index.insert(link_name.clone(), links.len());
            links.push(Link {
                name: link_name,
                object,
                visuals,
            });
        }

        let mut joints = Vec::new();
        let mut joint_index = HashMap::new();
        for node in document.child_elements(robot) {
            if document.name(node) != Some("joint") {
                continue;
            }
            let joint = build_joint(&document, node, &links, &link_index, &mut scene)?;
            if joint_index.contains_key(&joint.name) {
                return Err(LoadError::DuplicateJoint(joint.name));
            }
            joint_index.insert(joint.name.clone(), joints.len());
            joints.push(joint);
        }

        debug!(robot = %name, objects = scene.len(), "Built robot scene");

        Ok(Self {
            name,
            document,
            scene,
            root,
            links,
            link_index,
            joints,
            joint_index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed document the model was built from
    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Scene object at the top of the robot's subtree
    pub fn root(&self) -> ObjectId {
        self.root
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.link_index.get(name).map(|i| &self.links[*i])
    }

    pub fn link_names(&self) -> Vec<String> {
        self.links.iter().map(|l| l.name.clone()).collect()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joint_index.get(name).map(|i| &self.joints[*i])
    }

    pub fn joint_names(&self) -> Vec<String> {
        self.joints.iter().map(|j| j.name.clone()).collect()
    }

    pub fn movable_joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter().filter(|j| j.is_movable())
    }

    /// First mesh of a link's first visual, used as the link's pick and
    /// highlight target
    pub fn primary_visual_mesh(&self, link_name: &str) -> Option<ObjectId> {
        let visual = *self.link(link_name)?.visuals.first()?;
        self.scene.children(visual).first().copied()
    }

    /// Set a joint's first value. Revolute and prismatic joints are clamped
    /// to their limits. Returns the value actually applied, or `None` for
    /// unknown and fixed joints.
    pub fn set_joint_value(&mut self, name: &str, value: f64) -> Option<f64> {
        let index = *self.joint_index.get(name)?;
        let joint = &mut self.joints[index];
        if joint.values.is_empty() {
            return None;
        }
        let applied = if joint.clamps() && joint.limit.lower <= joint.limit.upper {
            value.clamp(joint.limit.lower, joint.limit.upper)
        } else {
            value
        };
        joint.values[0] = applied;
        Some(applied)
    }
}

fn required<'a>(doc: &'a XmlDocument, node: NodeId, attribute: &'static str) -> Result<&'a str, LoadError> {
    doc.attribute(node, attribute)
        .ok_or_else(|| LoadError::MissingAttribute {
            attribute,
            element: doc.name(node).unwrap_or_default().to_string(),
        })
}

fn triple_attr(
    doc: &XmlDocument,
    node: Option<NodeId>,
    attribute: &'static str,
    default: [f64; 3],
) -> Result<[f64; 3], LoadError> {
    let Some(value) = node.and_then(|n| doc.attribute(n, attribute)) else {
        return Ok(default);
    };
    parse_triple(value).ok_or_else(|| LoadError::InvalidAttribute {
        attribute,
        element: node.and_then(|n| doc.name(n)).unwrap_or_default().to_string(),
        value: value.to_string(),
    })
}

fn float_attr(doc: &XmlDocument, node: Option<NodeId>, attribute: &'static str) -> Result<f64, LoadError> {
    let Some(value) = node.and_then(|n| doc.attribute(n, attribute)) else {
        return Ok(0.0);
    };
    value.trim().parse().map_err(|_| LoadError::InvalidAttribute {
        attribute,
        element: node.and_then(|n| doc.name(n)).unwrap_or_default().to_string(),
        value: value.to_string(),
    })
}

/// Materials declared at robot level, by name
fn named_materials(doc: &XmlDocument, robot: NodeId) -> Result<HashMap<String, Material>, LoadError> {
    let mut materials = HashMap::new();
    for node in doc.child_elements(robot) {
        if doc.name(node) != Some("material") {
            continue;
        }
        let Some(name) = doc.attribute(node, "name") else {
            continue;
        };
        if let Some(material) = material_color(doc, node)? {
            materials.insert(name.to_string(), material);
        }
    }
    Ok(materials)
}

/// Material from a `<material>` element's `<color rgba>` child
fn material_color(doc: &XmlDocument, material: NodeId) -> Result<Option<Material>, LoadError> {
    let Some(color) = doc.first_child_named(material, "color") else {
        return Ok(None);
    };
    let Some(rgba) = doc.attribute(color, "rgba") else {
        return Ok(None);
    };
    let parts: Option<Vec<f32>> = rgba.split_whitespace().map(|p| p.parse().ok()).collect();
    match parts.as_deref() {
        Some([r, g, b, a]) => Ok(Some(Material {
            color: [*r, *g, *b],
            opacity: *a,
        })),
        _ => Err(LoadError::InvalidAttribute {
            attribute: "rgba",
            element: "color".to_string(),
            value: rgba.to_string(),
        }),
    }
}

fn parse_geometry(doc: &XmlDocument, geometry: NodeId) -> Result<Option<Geometry>, LoadError> {
    let Some(shape) = doc.child_elements(geometry).next() else {
        return Ok(None);
    };
    let geometry = match doc.name(shape) {
        Some("box") => Geometry::Box {
            size: triple_attr(doc, Some(shape), "size", [1.0, 1.0, 1.0])?,
        },
        Some("cylinder") => Geometry::Cylinder {
            radius: float_attr(doc, Some(shape), "radius")?,
            length: float_attr(doc, Some(shape), "length")?,
        },
        Some("sphere") => Geometry::Sphere {
            radius: float_attr(doc, Some(shape), "radius")?,
        },
        Some("mesh") => Geometry::Mesh {
            filename: required(doc, shape, "filename")?.to_string(),
            scale: triple_attr(doc, Some(shape), "scale", [1.0, 1.0, 1.0])?,
        },
        other => {
            warn!(shape = ?other, "Skipping unsupported geometry");
            return Ok(None);
        }
    };
    Ok(Some(geometry))
}

fn build_visuals(
    doc: &XmlDocument,
    link: NodeId,
    link_name: &str,
    link_object: ObjectId,
    materials: &HashMap<String, Material>,
    scene: &mut SceneGraph,
) -> Result<Vec<ObjectId>, LoadError> {
    let mut visuals = Vec::new();
    for node in doc.child_elements(link) {
        if doc.name(node) != Some("visual") {
            continue;
        }
        let name = doc
            .attribute(node, "name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{link_name}_visual_{}", visuals.len()));
        let visual = scene.add(name, ObjectKind::Visual { source: Some(node) }, Some(link_object));
        visuals.push(visual);

        let material = match doc.first_child_named(node, "material") {
            Some(m) => match material_color(doc, m)? {
                Some(material) => material,
                None => doc
                    .attribute(m, "name")
                    .and_then(|n| materials.get(n))
                    .copied()
                    .unwrap_or_default(),
            },
            None => Material::default(),
        };

        let geometry = match doc.first_child_named(node, "geometry") {
            Some(g) => parse_geometry(doc, g)?,
            None => None,
        };
        if let Some(geometry) = geometry {
            scene.add(
                format!("{link_name}_mesh"),
                ObjectKind::Mesh { geometry, material },
                Some(visual),
            );
        }
    }
    Ok(visuals)
}

fn build_joint(
    doc: &XmlDocument,
    node: NodeId,
    links: &[Link],
    link_index: &HashMap<String, usize>,
    scene: &mut SceneGraph,
) -> Result<Joint, LoadError> {
    let name = required(doc, node, "name")?.to_string();
    let type_name = required(doc, node, "type")?;
    let joint_type: JointType = type_name
        .parse()
        .map_err(|_| LoadError::UnknownJointType(type_name.to_string()))?;

    let link_ref = |element: &'static str| -> Result<usize, LoadError> {
        let el = doc
            .first_child_named(node, element)
            .ok_or_else(|| LoadError::MissingElement {
                element,
                context: format!("joint {name}"),
            })?;
        let link = required(doc, el, "link")?;
        link_index
            .get(link)
            .copied()
            .ok_or_else(|| LoadError::UndefinedLink {
                joint: name.clone(),
                link: link.to_string(),
            })
    };
    let parent = &links[link_ref("parent")?];
    let child = &links[link_ref("child")?];

    let origin_el = doc.first_child_named(node, "origin");
    let origin = Pose {
        xyz: triple_attr(doc, origin_el, "xyz", [0.0; 3])?,
        rpy: triple_attr(doc, origin_el, "rpy", [0.0; 3])?,
    };
    let axis = triple_attr(doc, doc.first_child_named(node, "axis"), "xyz", [1.0, 0.0, 0.0])?;
    let limit_el = doc.first_child_named(node, "limit");
    let limit = JointLimit {
        lower: float_attr(doc, limit_el, "lower")?,
        upper: float_attr(doc, limit_el, "upper")?,
        effort: float_attr(doc, limit_el, "effort")?,
        velocity: float_attr(doc, limit_el, "velocity")?,
    };

    // a link already hanging under a joint has a second parent
    if scene
        .parent(child.object)
        .and_then(|p| scene.kind(p))
        .is_some_and(|k| *k == ObjectKind::Joint)
    {
        return Err(LoadError::KinematicLoop(name));
    }
    let object = scene.add(name.clone(), ObjectKind::Joint, Some(parent.object));
    if !scene.reparent(child.object, object) {
        return Err(LoadError::KinematicLoop(name));
    }

    Ok(Joint {
        parent: parent.name.clone(),
        child: child.name.clone(),
        name,
        joint_type,
        object,
        origin,
        axis,
        limit,
        values: vec![0.0; joint_type.degrees_of_freedom()],
    })
}

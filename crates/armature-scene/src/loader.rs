//! Loading robot descriptions into robot models
//!
//! Loading is callback based: a [`ModelLoader`] reports completion (success
//! or failure) through exactly one invocation of the supplied callback,
//! which may happen before `load` returns or at some later point.

use armature_core::DocumentError;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::model::RobotModel;
use crate::xacro;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Malformed robot description: {0}")]
    Document(#[from] DocumentError),
    #[error("No <robot> element found in robot description")]
    MissingRobot,
    #[error("Missing required element <{element}> in {context}")]
    MissingElement {
        element: &'static str,
        context: String,
    },
    #[error("Missing required attribute {attribute} on <{element}>")]
    MissingAttribute {
        attribute: &'static str,
        element: String,
    },
    #[error("Invalid value for {attribute} on <{element}>: {value}")]
    InvalidAttribute {
        attribute: &'static str,
        element: String,
        value: String,
    },
    #[error("Unknown joint type: {0}")]
    UnknownJointType(String),
    #[error("Joint {joint} references undefined link {link}")]
    UndefinedLink { joint: String, link: String },
    #[error("Duplicate link name: {0}")]
    DuplicateLink(String),
    #[error("Duplicate joint name: {0}")]
    DuplicateJoint(String),
    #[error("Kinematic loop detected at joint {0}")]
    KinematicLoop(String),
    #[error("Unsupported xacro construct: {0}")]
    UnsupportedXacro(String),
    #[error("Undefined xacro property: {0}")]
    UndefinedProperty(String),
}

/// Completion callback for [`ModelLoader::load`]
pub type LoadCallback = Box<dyn FnOnce(Result<RobotModel, LoadError>)>;

/// Turns robot description text into a [`RobotModel`]
pub trait ModelLoader {
    /// Start loading `text`. `on_done` is invoked exactly once.
    fn load(&self, text: &str, on_done: LoadCallback);
}

/// Loader for plain URDF and property-only xacro documents. Completes
/// before returning.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrdfLoader;

impl UrdfLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModelLoader for UrdfLoader {
    fn load(&self, text: &str, on_done: LoadCallback) {
        on_done(load_model(text));
    }
}

/// Load a robot description synchronously, expanding xacro first if needed
pub fn load_model(text: &str) -> Result<RobotModel, LoadError> {
    let result = if xacro::is_xacro(text) {
        debug!("Expanding xacro robot description");
        xacro::expand(text).and_then(|expanded| RobotModel::parse(&expanded))
    } else {
        RobotModel::parse(text)
    };

    match &result {
        Ok(model) => info!(
            robot = %model.name(),
            links = model.links().len(),
            joints = model.joints().len(),
            "Loaded robot model"
        ),
        Err(e) => error!("Failed to load robot description: {}", e),
    }
    result
}

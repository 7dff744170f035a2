//! Armature Scene - Robot model, scene graph and link picking
//!
//! This crate turns robot description text into something a viewer can
//! show and a user can point at:
//! - A scene graph arena with kinematic nesting of links and joints
//! - Robot models with name-keyed link and joint tables
//! - Resolution of picked objects to the link that owns them
//! - Highlight materials and name tags for selected and hovered links
//! - Callback-based loading with property-only xacro expansion

pub mod highlight;
pub mod loader;
pub mod model;
pub mod resolve;
pub mod scene;
pub mod xacro;

pub use highlight::{parse_hex_color, HighlightPalette, HighlightRecord, HighlightRole, Highlighter};
pub use loader::{load_model, LoadCallback, LoadError, ModelLoader, UrdfLoader};
pub use model::{Joint, JointLimit, Link, Pose, RobotModel};
pub use resolve::{resolve_link, visual_ancestor};
pub use scene::{Geometry, Material, ObjectId, ObjectKind, SceneGraph, SceneObject};

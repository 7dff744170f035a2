//! One-shot subcommands: inspect a description, add or modify a joint

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use armature_core::{JointPatch, JointSpec, JointType, UrdfPatcher};
use armature_editor::EditorConfig;
use armature_scene::{load_model, RobotModel};
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use crate::files::{read_document, write_result};

/// Joint values shared by `add-joint` and `modify-joint`
#[derive(Args, Debug, Clone, Default)]
pub struct JointOptions {
    /// Joint type (revolute, continuous, prismatic, fixed, floating, planar)
    #[arg(long = "type")]
    pub joint_type: Option<JointType>,
    #[arg(long)]
    pub parent: Option<String>,
    #[arg(long)]
    pub child: Option<String>,
    /// Origin translation "x y z"
    #[arg(long)]
    pub xyz: Option<String>,
    /// Origin rotation "r p y"
    #[arg(long)]
    pub rpy: Option<String>,
    /// Joint axis "x y z"
    #[arg(long)]
    pub axis: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub lower: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub upper: Option<String>,
    #[arg(long)]
    pub effort: Option<String>,
    #[arg(long)]
    pub velocity: Option<String>,
}

impl JointOptions {
    /// Full joint from the options, falling back to configured defaults
    pub fn to_spec(&self, name: &str, config: &EditorConfig) -> Result<JointSpec> {
        let (Some(parent), Some(child)) = (&self.parent, &self.child) else {
            bail!("--parent and --child are required to add a joint");
        };
        let d = &config.fields;
        let or = |value: &Option<String>, default: &str| value.clone().unwrap_or_else(|| default.to_string());
        Ok(JointSpec {
            name: name.to_string(),
            joint_type: self.joint_type.unwrap_or(d.joint_type),
            parent: parent.clone(),
            child: child.clone(),
            origin_xyz: or(&self.xyz, &d.origin_xyz),
            origin_rpy: or(&self.rpy, &d.origin_rpy),
            axis_xyz: or(&self.axis, &d.axis_xyz),
            lower: or(&self.lower, &d.lower),
            upper: or(&self.upper, &d.upper),
            effort: or(&self.effort, &d.effort),
            velocity: or(&self.velocity, &d.velocity),
        })
    }

    /// Only the values given on the command line
    pub fn to_patch(&self) -> JointPatch {
        JointPatch {
            joint_type: self.joint_type,
            parent: self.parent.clone(),
            child: self.child.clone(),
            origin_xyz: self.xyz.clone(),
            origin_rpy: self.rpy.clone(),
            axis_xyz: self.axis.clone(),
            lower: self.lower.clone(),
            upper: self.upper.clone(),
            effort: self.effort.clone(),
            velocity: self.velocity.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct AddJointArgs {
    /// Robot description to edit
    pub file: PathBuf,
    /// Name of the new joint
    #[arg(long)]
    pub name: String,
    #[command(flatten)]
    pub joint: JointOptions,
    /// Write the result here instead of editing in place
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ModifyJointArgs {
    /// Robot description to edit
    pub file: PathBuf,
    /// Joint to modify
    pub joint_name: String,
    #[command(flatten)]
    pub joint: JointOptions,
    /// Write the result here instead of editing in place
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct RobotSummary {
    pub robot: String,
    pub links: Vec<LinkSummary>,
    pub joints: Vec<JointSummary>,
}

#[derive(Debug, Serialize)]
pub struct LinkSummary {
    pub name: String,
    pub visuals: usize,
}

#[derive(Debug, Serialize)]
pub struct JointSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    pub movable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<[f64; 2]>,
}

impl RobotSummary {
    pub fn of(model: &RobotModel) -> Self {
        Self {
            robot: model.name().to_string(),
            links: model
                .links()
                .iter()
                .map(|l| LinkSummary {
                    name: l.name.clone(),
                    visuals: l.visuals.len(),
                })
                .collect(),
            joints: model
                .joints()
                .iter()
                .map(|j| JointSummary {
                    name: j.name.clone(),
                    joint_type: j.joint_type,
                    parent: j.parent.clone(),
                    child: j.child.clone(),
                    movable: j.is_movable(),
                    limits: j.joint_type.needs_limits().then_some([j.limit.lower, j.limit.upper]),
                })
                .collect(),
        }
    }
}

impl std::fmt::Display for RobotSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Robot: {}", self.robot)?;
        writeln!(f, "Links ({}):", self.links.len())?;
        for link in &self.links {
            writeln!(f, "  - {} ({} visuals)", link.name, link.visuals)?;
        }
        writeln!(f, "Joints ({}):", self.joints.len())?;
        for joint in &self.joints {
            write!(f, "  - {} [{}] {} -> {}", joint.name, joint.joint_type, joint.parent, joint.child)?;
            if let Some([lower, upper]) = joint.limits {
                write!(f, " limits {lower}..{upper}")?;
            }
            if joint.movable {
                write!(f, " (movable)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub fn inspect(file: &std::path::Path, json: bool) -> Result<()> {
    let text = read_document(file)?;
    let model = load_model(&text).with_context(|| format!("Failed to load {}", file.display()))?;
    let summary = RobotSummary::of(&model);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }
    Ok(())
}

/// Reject an edit whose result no longer loads, unless the input did not
/// load either
fn check_result(before: &str, after: &str) -> Result<()> {
    if load_model(before).is_err() {
        warn!("Input does not load, skipping validation of the result");
        return Ok(());
    }
    load_model(after).context("Edited description does not load")?;
    Ok(())
}

pub fn add_joint(args: &AddJointArgs, config: &EditorConfig) -> Result<()> {
    let text = read_document(&args.file)?;
    let spec = args.joint.to_spec(&args.name, config)?;
    let patcher = UrdfPatcher::with_indent(&config.document.indent);
    let patched = patcher.add_joint(&text, &spec)?;
    check_result(&text, &patched)?;
    write_result(&args.file, args.output.as_deref(), &patched)?;
    info!(joint = %spec.name, parent = %spec.parent, child = %spec.child, "Added joint");
    Ok(())
}

pub fn modify_joint(args: &ModifyJointArgs, config: &EditorConfig) -> Result<()> {
    let patch = args.joint.to_patch();
    if patch.is_empty() {
        bail!("Nothing to change for joint {}", args.joint_name);
    }
    let text = read_document(&args.file)?;
    let patcher = UrdfPatcher::with_indent(&config.document.indent);
    let patched = patcher.modify_joint(&text, &args.joint_name, &patch)?;
    check_result(&text, &patched)?;
    write_result(&args.file, args.output.as_deref(), &patched)?;
    info!(joint = %args.joint_name, "Modified joint");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOT: &str = r#"<robot name="r">
  <link name="a">
    <visual><geometry><box size="1 1 1"/></geometry></visual>
  </link>
  <link name="b"/>
  <link name="c"/>
  <joint name="j" type="revolute">
    <parent link="a"/>
    <child link="b"/>
    <limit lower="-1" upper="1" effort="1" velocity="1"/>
  </joint>
</robot>
"#;

    fn write_robot(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("robot.urdf");
        std::fs::write(&path, ROBOT).unwrap();
        path
    }

    #[test]
    fn test_add_joint_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_robot(&dir);
        let args = AddJointArgs {
            file: file.clone(),
            name: "b_to_c".to_string(),
            joint: JointOptions {
                joint_type: Some(JointType::Fixed),
                parent: Some("b".to_string()),
                child: Some("c".to_string()),
                ..Default::default()
            },
            output: None,
        };
        add_joint(&args, &EditorConfig::default()).unwrap();

        let model = load_model(&read_document(&file).unwrap()).unwrap();
        assert_eq!(model.joint("b_to_c").unwrap().joint_type, JointType::Fixed);
    }

    #[test]
    fn test_add_joint_to_unknown_link_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_robot(&dir);
        let args = AddJointArgs {
            file: file.clone(),
            name: "bad".to_string(),
            joint: JointOptions {
                parent: Some("b".to_string()),
                child: Some("ghost".to_string()),
                ..Default::default()
            },
            output: None,
        };
        assert!(add_joint(&args, &EditorConfig::default()).is_err());
        assert_eq!(read_document(&file).unwrap(), ROBOT);
    }

    #[test]
    fn test_add_joint_requires_links() {
        let spec = JointOptions::default().to_spec("x", &EditorConfig::default());
        assert!(spec.is_err());
    }

    #[test]
    fn test_modify_joint_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_robot(&dir);
        let output = dir.path().join("out.urdf");
        let args = ModifyJointArgs {
            file: file.clone(),
            joint_name: "j".to_string(),
            joint: JointOptions {
                upper: Some("2".to_string()),
                ..Default::default()
            },
            output: Some(output.clone()),
        };
        modify_joint(&args, &EditorConfig::default()).unwrap();

        assert_eq!(read_document(&file).unwrap(), ROBOT);
        let edited = read_document(&output).unwrap();
        assert!(edited.contains(r#"<limit lower="-1" upper="2" effort="1" velocity="1"/>"#));
    }

    #[test]
    fn test_modify_without_changes_fails() {
        let dir = tempfile::tempdir().unwrap();
        let args = ModifyJointArgs {
            file: write_robot(&dir),
            joint_name: "j".to_string(),
            joint: JointOptions::default(),
            output: None,
        };
        assert!(modify_joint(&args, &EditorConfig::default()).is_err());
    }

    #[test]
    fn test_summary() {
        let model = load_model(ROBOT).unwrap();
        let summary = RobotSummary::of(&model);
        assert_eq!(summary.links[0].visuals, 1);
        assert_eq!(summary.joints[0].limits, Some([-1.0, 1.0]));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["joints"][0]["type"], "revolute");
        assert!(summary.to_string().contains("j [revolute] a -> b limits -1..1 (movable)"));
    }
}

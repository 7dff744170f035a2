//! Editor configuration loading

use std::path::Path;

use armature_core::DEFAULT_INDENT;
use armature_scene::{parse_hex_color, HighlightPalette, Material};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::controls::FieldDefaults;

/// Default configuration file name
pub const CONFIG_FILE: &str = "armature.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid colour for {role}: {value}")]
    InvalidColor { role: &'static str, value: String },
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub materials: MaterialsConfig,
    #[serde(default)]
    pub fields: FieldDefaults,
    #[serde(default)]
    pub document: DocumentConfig,
}

/// Highlight colours as `#rrggbb` strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialsConfig {
    #[serde(default = "default_hover")]
    pub hover: String,
    #[serde(default = "default_parent")]
    pub parent: String,
    #[serde(default = "default_child")]
    pub child: String,
    /// Opacity shared by all highlight materials
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

impl Default for MaterialsConfig {
    fn default() -> Self {
        Self {
            hover: default_hover(),
            parent: default_parent(),
            child: default_child(),
            opacity: default_opacity(),
        }
    }
}

fn default_hover() -> String {
    "#ffff00".to_string()
}

fn default_parent() -> String {
    "#00ff00".to_string()
}

fn default_child() -> String {
    "#0000ff".to_string()
}

fn default_opacity() -> f32 {
    0.6
}

impl MaterialsConfig {
    pub fn palette(&self) -> Result<HighlightPalette, ConfigError> {
        let material = |role: &'static str, value: &str| {
            parse_hex_color(value)
                .map(|color| Material {
                    color,
                    opacity: self.opacity.clamp(0.0, 1.0),
                })
                .ok_or_else(|| ConfigError::InvalidColor {
                    role,
                    value: value.to_string(),
                })
        };
        Ok(HighlightPalette {
            hover: material("hover", &self.hover)?,
            parent: material("parent", &self.parent)?,
            child: material("child", &self.child)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Indent unit for documents without indentation to follow
    #[serde(default = "default_indent")]
    pub indent: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
        }
    }
}

fn default_indent() -> String {
    DEFAULT_INDENT.to_string()
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<EditorConfig, ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: EditorConfig = toml::from_str(&content)?;
        // colours are checked here so a bad file fails at startup
        config.materials.palette()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(EditorConfig::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(&EditorConfig::default())?;
    std::fs::write(path, content)?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_core::JointType;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.document.indent, "  ");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r##"
[materials]
parent = "#ff8800"

[fields]
type = "fixed"
axis_xyz = "1 0 0"

[document]
indent = "    "
"##,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.materials.parent, "#ff8800");
        assert_eq!(config.materials.hover, "#ffff00");
        assert_eq!(config.fields.joint_type, JointType::Fixed);
        assert_eq!(config.fields.axis_xyz, "1 0 0");
        assert_eq!(config.fields.name, "new_joint");
        assert_eq!(config.document.indent, "    ");

        let palette = config.materials.palette().unwrap();
        assert_eq!(palette.parent.color[0], 1.0);
        assert_eq!(palette.parent.opacity, 0.6);
    }

    #[test]
    fn test_invalid_colour_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[materials]\nhover = \"yellow\"\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::InvalidColor { role: "hover", .. })
        ));
    }

    #[test]
    fn test_save_default_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        save_default_config(&path).unwrap();
        assert_eq!(load_config(&path).unwrap(), EditorConfig::default());
    }
}

//! Minimal xacro expansion
//!
//! Supports `<xacro:property name=".." value=".."/>` definitions and
//! `${name}` references inside attribute values. Property elements are
//! removed from the expanded output. Macros, includes, conditionals and
//! arithmetic expressions are reported as unsupported.

use std::collections::HashMap;

use armature_core::{NodeId, XmlDocument};
use tracing::debug;

use crate::loader::LoadError;

const PROPERTY: &str = "xacro:property";

/// Robot descriptions that mention xacro anywhere go through expansion
pub fn is_xacro(text: &str) -> bool {
    text.contains("xacro")
}

/// Expand property definitions and references into plain URDF text
pub fn expand(text: &str) -> Result<String, LoadError> {
    let mut doc = XmlDocument::parse(text)?;
    let mut properties: HashMap<String, String> = HashMap::new();
    let mut definitions = Vec::new();

    for id in doc.elements() {
        let Some(name) = doc.name(id) else {
            continue;
        };
        if name == PROPERTY {
            let (key, value) = property(&doc, id)?;
            let value = substitute(value, &properties)?;
            debug!(property = %key, %value, "Defined xacro property");
            properties.insert(key.to_string(), value);
            definitions.push(id);
        } else if name.starts_with("xacro:") {
            return Err(LoadError::UnsupportedXacro(name.to_string()));
        }
    }

    let mut updates: Vec<(NodeId, String, String)> = Vec::new();
    for id in doc.elements() {
        if doc.name(id) == Some(PROPERTY) {
            continue;
        }
        let Some(element) = doc.element(id) else {
            continue;
        };
        for attr in element.attributes() {
            if attr.value.contains("${") {
                let value = substitute(&attr.value, &properties)?;
                updates.push((id, attr.name.clone(), value));
            }
        }
    }
    for (id, name, value) in updates {
        doc.set_attribute(id, &name, &value);
    }

    for id in definitions {
        if let Some(prev) = doc.previous_sibling(id) {
            if doc.is_whitespace(prev) {
                doc.detach(prev);
            }
        }
        doc.detach(id);
    }

    Ok(doc.to_xml())
}

fn property(doc: &XmlDocument, id: NodeId) -> Result<(&str, &str), LoadError> {
    let name = doc
        .attribute(id, "name")
        .ok_or_else(|| LoadError::MissingAttribute {
            attribute: "name",
            element: PROPERTY.to_string(),
        })?;
    let value = doc
        .attribute(id, "value")
        .ok_or_else(|| LoadError::UnsupportedXacro(format!("block property {name}")))?;
    Ok((name, value))
}

fn substitute(value: &str, properties: &HashMap<String, String>) -> Result<String, LoadError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| LoadError::UnsupportedXacro(format!("unterminated expression in \"{value}\"")))?;
        let expr = after[..end].trim();
        if !expr.chars().all(|c| c.is_alphanumeric() || c == '_') || expr.is_empty() {
            return Err(LoadError::UnsupportedXacro(format!("expression ${{{expr}}}")));
        }
        let resolved = properties
            .get(expr)
            .ok_or_else(|| LoadError::UndefinedProperty(expr.to_string()))?;
        out.push_str(resolved);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_properties() {
        let text = r#"<robot name="r" xmlns:xacro="http://www.ros.org/wiki/xacro">
  <xacro:property name="len" value="0.4"/>
  <xacro:property name="half" value="${len} 0 0"/>
  <link name="a"/>
  <joint name="j" type="fixed">
    <origin xyz="${half}" rpy="0 0 0"/>
  </joint>
</robot>"#;
        let out = expand(text).unwrap();
        assert_eq!(
            out,
            r#"<robot name="r" xmlns:xacro="http://www.ros.org/wiki/xacro">
  <link name="a"/>
  <joint name="j" type="fixed">
    <origin xyz="0.4 0 0" rpy="0 0 0"/>
  </joint>
</robot>"#
        );
    }

    #[test]
    fn test_undefined_property() {
        let text = r#"<robot xmlns:xacro="x"><link name="${missing}"/></robot>"#;
        assert_eq!(
            expand(text).unwrap_err(),
            LoadError::UndefinedProperty("missing".to_string())
        );
    }

    #[test]
    fn test_unsupported_constructs() {
        let text = r#"<robot xmlns:xacro="x"><xacro:include filename="arm.xacro"/></robot>"#;
        assert_eq!(
            expand(text).unwrap_err(),
            LoadError::UnsupportedXacro("xacro:include".to_string())
        );

        let text = r#"<robot xmlns:xacro="x"><xacro:property name="a" value="1"/><link name="${a*2}"/></robot>"#;
        assert!(matches!(expand(text), Err(LoadError::UnsupportedXacro(_))));
    }

    #[test]
    fn test_is_xacro() {
        assert!(is_xacro(r#"<robot xmlns:xacro="http://www.ros.org/wiki/xacro"/>"#));
        assert!(!is_xacro(r#"<robot name="r"/>"#));
    }
}

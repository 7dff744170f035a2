//! Reading and atomically writing robot description files

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Write `text` to `path` through a temporary file in the same directory,
/// so readers never see a partly written document
pub fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut file = NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(text.as_bytes())?;
    file.as_file().sync_all()?;
    debug!(temp = %file.path().display(), "Wrote temporary document");
    file.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    info!(path = %path.display(), bytes = text.len(), "Wrote document");
    Ok(())
}

/// Write to `output` if given, otherwise back over `input`
pub fn write_result(input: &Path, output: Option<&Path>, text: &str) -> Result<()> {
    write_atomic(output.unwrap_or(input), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("robot.urdf");
        std::fs::write(&path, "<robot name=\"old\"/>").unwrap();

        write_atomic(&path, "<robot name=\"new\"/>").unwrap();
        assert_eq!(read_document(&path).unwrap(), "<robot name=\"new\"/>");

        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_result_prefers_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.urdf");
        let output = dir.path().join("out.urdf");
        std::fs::write(&input, "a").unwrap();

        write_result(&input, Some(output.as_path()), "b").unwrap();
        assert_eq!(read_document(&input).unwrap(), "a");
        assert_eq!(read_document(&output).unwrap(), "b");
    }

    #[test]
    fn test_read_missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_document(&dir.path().join("missing.urdf")).unwrap_err();
        assert!(err.to_string().contains("missing.urdf"));
    }
}

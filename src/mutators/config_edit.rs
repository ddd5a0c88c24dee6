use std::path::Path;
use tracing::{debug, instrument};

use crate::core::ConfigDoc;
use crate::core::tree::TreeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The value was found and rewritten in this many string leaves.
    Applied(usize),
    /// The value is already absent; the file was not rewritten.
    Noop,
}

/// Replace one string value inside a config artifact, preserving every
/// unrelated key. The file is only rewritten when something actually changed.
#[instrument(skip(old, new))]
pub fn replace_in_config(path: &Path, old: &str, new: &str) -> Result<EditOutcome, TreeError> {
    let mut doc = ConfigDoc::read(path)?;
    let changed = doc.replace_value(old, new);

    if changed == 0 {
        debug!(path = %path.display(), "value already absent");
        return Ok(EditOutcome::Noop);
    }

    doc.write(path)?;
    debug!(path = %path.display(), leaves = changed, "config value replaced");
    Ok(EditOutcome::Applied(changed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn replaces_value_and_preserves_other_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("storage.json");
        fs::write(
            &path,
            r#"{"telemetry.machineId": "old-id", "window.zoom": 1}"#,
        )
        .unwrap();

        let outcome = replace_in_config(&path, "old-id", "new-id").unwrap();
        assert_eq!(outcome, EditOutcome::Applied(1));

        let reread: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reread["telemetry.machineId"], "new-id");
        assert_eq!(reread["window.zoom"], 1);
    }

    #[test]
    fn absent_value_is_a_noop_without_rewrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        let content = r#"{"theme": "dark"}"#;
        fs::write(&path, content).unwrap();

        let outcome = replace_in_config(&path, "missing", "x").unwrap();
        assert_eq!(outcome, EditOutcome::Noop);
        // Byte-identical: a noop never touches the file.
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }
}

use std::path::Path;

use crate::core::{ArtifactKind, RiskTier};

/// Names that flag a directory as holding workspace/cache state worth
/// recording without deep inspection.
const WORKSPACE_DIR_MARKERS: &[&str] = &[
    "workspace",
    "workspaces",
    "workspacestorage",
    "globalstorage",
    "cache",
    "cacheddata",
    "blob_storage",
    "user_data",
    "logs",
];

pub fn is_workspace_dir(name: &str) -> bool {
    let lower = name.to_lowercase();
    WORKSPACE_DIR_MARKERS.iter().any(|m| lower.contains(m))
}

/// Risk classification heuristics. A value, not a fixed table: over-matching
/// is the main safety concern, so callers may tighten or extend the marker
/// lists per run.
#[derive(Debug, Clone)]
pub struct RiskPolicy {
    /// Path components that make an artifact safe to remove outright.
    pub safe_markers: Vec<String>,
    /// Markers for account/session/credential data, removed only when the
    /// user explicitly targets it.
    pub targeted_markers: Vec<String>,
    /// Markers that exclude an artifact from every mutation plan.
    pub never_touch_markers: Vec<String>,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        RiskPolicy {
            safe_markers: ["cache", "cacheddata", "temp", "tmp", "logs", "blob_storage"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            targeted_markers: [
                "account", "session", "credential", "auth", "login", "token", "profile",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            never_touch_markers: ["keychain", "wallet", "ssh", "gnupg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RiskPolicy {
    fn component_hit(&self, path: &Path, markers: &[String]) -> bool {
        path.components().any(|c| {
            let name = c.as_os_str().to_string_lossy().to_lowercase();
            markers.iter().any(|m| name.contains(m.as_str()))
        })
    }
}

/// Assign a risk tier to one artifact. Never-touch markers always win; cache
/// and temp locations are safe; recognized config/database artifacts default
/// to targeted-only so blanket options cannot sweep them up; everything else
/// is review, reported but never auto-selected.
pub fn classify(path: &Path, kind: ArtifactKind, policy: &RiskPolicy) -> RiskTier {
    if policy.component_hit(path, &policy.never_touch_markers) {
        return RiskTier::NeverTouch;
    }

    if policy.component_hit(path, &policy.safe_markers) {
        return RiskTier::Safe;
    }

    if policy.component_hit(path, &policy.targeted_markers) {
        return RiskTier::TargetedOnly;
    }

    match kind {
        ArtifactKind::ConfigFile | ArtifactKind::DatabaseFile => RiskTier::TargetedOnly,
        ArtifactKind::WorkspaceItem => RiskTier::Review,
    }
}

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::catalog::HostApplication;
use crate::core::{ArtifactKind, ScanResult};
use crate::mutators::{OutcomeStatus, RunReport};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persist a scan result as pretty JSON, for diffing between runs or feeding
/// other tools.
pub fn save_scan_json(result: &ScanResult, path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(result)?;
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}

pub fn load_scan_json(path: &Path) -> Result<ScanResult, ReportError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn host_label(catalog: &[HostApplication], id: &str) -> String {
    catalog
        .iter()
        .find(|h| h.id == id)
        .map(|h| h.name.clone())
        .unwrap_or_else(|| id.to_string())
}

/// Human-readable scan summary, grouped per host application.
pub fn render_scan(result: &ScanResult, catalog: &[HostApplication]) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Scan of {} ({} roots)",
        result.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        result.roots_scanned.len()
    );

    if result.is_empty() {
        let _ = writeln!(out, "\nNo plugin data found.");
        return out;
    }

    let mut hosts: Vec<Option<String>> = result.entries.iter().map(|e| e.host.clone()).collect();
    hosts.sort();
    hosts.dedup();

    for host in &hosts {
        let label = match host {
            Some(id) => host_label(catalog, id),
            None => "Standalone".to_string(),
        };
        let entries: Vec<_> = result
            .entries
            .iter()
            .filter(|e| e.host == *host)
            .collect();

        let _ = writeln!(out, "\n{} ({} artifacts)", label, entries.len());
        for entry in entries {
            let kind = match entry.kind {
                ArtifactKind::ConfigFile => "config",
                ArtifactKind::DatabaseFile => "database",
                ArtifactKind::WorkspaceItem => "workspace",
            };
            let mut notes = Vec::new();
            if !entry.identifiers.is_empty() {
                notes.push(format!("{} identifier(s)", entry.identifiers.len()));
            }
            let keyword_rows: usize = entry.keyword_hits.iter().map(|h| h.row_count).sum();
            if keyword_rows > 0 {
                notes.push(format!("{} keyword row(s)", keyword_rows));
            }
            if entry.unparseable {
                notes.push("unparseable".to_string());
            }
            let suffix = if notes.is_empty() {
                String::new()
            } else {
                format!(" [{}]", notes.join(", "))
            };
            let _ = writeln!(out, "  {:<10} {}{}", kind, entry.path.display(), suffix);
        }
    }

    if !result.processes.is_empty() {
        let _ = writeln!(out, "\nRunning processes:");
        for p in &result.processes {
            let _ = writeln!(
                out,
                "  pid {:<8} {} ({})",
                p.pid,
                p.exe_name,
                host_label(catalog, &p.host)
            );
        }
    }

    if !result.warnings.is_empty() {
        let _ = writeln!(out, "\nWarnings:");
        for w in &result.warnings {
            match &w.path {
                Some(path) => {
                    let _ = writeln!(out, "  ⚠️ {}: {}", path.display(), w.message);
                }
                None => {
                    let _ = writeln!(out, "  ⚠️ {}", w.message);
                }
            }
        }
    }

    if !result.recommendations.is_empty() {
        let _ = writeln!(out, "\nRecommendations:");
        for r in &result.recommendations {
            let _ = writeln!(out, "  • {}", r);
        }
    }

    out
}

/// Summary of one executed cleanup run.
pub fn render_run(report: &RunReport) -> String {
    let mut out = String::new();

    for outcome in &report.outcomes {
        let mark = match outcome.status {
            OutcomeStatus::Applied => "✅",
            OutcomeStatus::Noop => "•",
            OutcomeStatus::Failed => "❌",
        };
        let detail = outcome
            .detail
            .as_deref()
            .map(|d| format!(" ({})", d))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{} {}{}",
            mark,
            outcome.action.target.display(),
            detail
        );
    }

    for skipped in &report.skipped {
        let _ = writeln!(out, "⏭️ {}: {}", skipped.path.display(), skipped.reason);
    }

    let _ = writeln!(
        out,
        "\n{} applied, {} unchanged, {} failed, {} skipped",
        report.applied(),
        report.count(OutcomeStatus::Noop),
        report.failed(),
        report.skipped.len()
    );

    if let Some(id) = &report.manifest_id {
        let _ = writeln!(out, "Backup: {}", id);
    }
    if report.cancelled {
        let _ = writeln!(out, "Run cancelled before completion.");
    }

    out
}

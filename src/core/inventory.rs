use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a discovered artifact is, which decides how mutators may touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    ConfigFile,
    DatabaseFile,
    WorkspaceItem,
}

/// Whether an artifact may be auto-selected for destructive actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskTier {
    Safe,
    TargetedOnly,
    Review,
    NeverTouch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Email,
    Uuid,
    Username,
}

/// One identifier value found inside an artifact, with enough location
/// context to act on it later (dotted key path, `line:<n>`, or
/// `<table>.<column>` for database artifacts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierHit {
    pub kind: IdentifierKind,
    pub value: String,
    pub location: String,
}

/// Keyword occurrences in one text column of one database table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHit {
    pub table: String,
    pub column: String,
    pub row_count: usize,
}

/// One discovered artifact. Immutable once created; a new scan supersedes
/// rather than mutates existing entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    /// Owning host application id; `None` for standalone installs.
    pub host: Option<String>,
    pub tier: RiskTier,
    pub identifiers: Vec<IdentifierHit>,
    pub keyword_hits: Vec<TableHit>,
    pub unparseable: bool,
}

impl InventoryEntry {
    pub fn new(path: PathBuf, kind: ArtifactKind, host: Option<String>, tier: RiskTier) -> Self {
        InventoryEntry {
            path,
            kind,
            host,
            tier,
            identifiers: Vec::new(),
            keyword_hits: Vec::new(),
            unparseable: false,
        }
    }

    pub fn emails(&self) -> impl Iterator<Item = &IdentifierHit> {
        self.identifiers
            .iter()
            .filter(|h| h.kind == IdentifierKind::Email)
    }

    pub fn uuids(&self) -> impl Iterator<Item = &IdentifierHit> {
        self.identifiers
            .iter()
            .filter(|h| h.kind == IdentifierKind::Uuid)
    }

    pub fn usernames(&self) -> impl Iterator<Item = &IdentifierHit> {
        self.identifiers
            .iter()
            .filter(|h| h.kind == IdentifierKind::Username)
    }
}

/// A process matched against a host application's name patterns. Valid only
/// for the lifetime of one scan; callers must re-validate the pid before
/// acting on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningProcessMatch {
    pub pid: u32,
    pub exe_name: String,
    pub exe_path: Option<PathBuf>,
    pub host: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Aggregate output of one discovery run. Always replaced wholesale by the
/// next run, never partially updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub started_at: DateTime<Utc>,
    pub roots_scanned: Vec<PathBuf>,
    pub entries: Vec<InventoryEntry>,
    pub processes: Vec<RunningProcessMatch>,
    pub warnings: Vec<ScanWarning>,
    pub recommendations: Vec<String>,
}

impl ScanResult {
    pub fn new(roots_scanned: Vec<PathBuf>) -> Self {
        ScanResult {
            started_at: Utc::now(),
            roots_scanned,
            entries: Vec::new(),
            processes: Vec::new(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn warn(&mut self, path: Option<&Path>, message: impl Into<String>) {
        self.warnings.push(ScanWarning {
            path: path.map(Path::to_path_buf),
            message: message.into(),
        });
    }

    pub fn count_kind(&self, kind: ArtifactKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn entries_for_host(&self, host: &str) -> impl Iterator<Item = &InventoryEntry> {
        self.entries
            .iter()
            .filter(move |e| e.host.as_deref() == Some(host))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.processes.is_empty()
    }
}

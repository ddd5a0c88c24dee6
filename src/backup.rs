use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Backup not found: {0}")]
    NotFound(String),

    #[error("Snapshot source missing: {0}")]
    SourceMissing(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    File,
    Directory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub original_path: PathBuf,
    /// Location inside the backup directory, relative to its root.
    pub stored_rel: PathBuf,
    pub kind: SnapshotKind,
    /// Hex SHA-256 of the file contents; directories carry none.
    pub sha256: Option<String>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<ManifestEntry>,
    /// False while the owning run is still in flight or was interrupted.
    pub completed: bool,
}

#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns the backup root directory and hands out per-run snapshot handles.
pub struct BackupManager {
    root: PathBuf,
}

impl BackupManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BackupManager { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh timestamped backup directory with an empty manifest.
    #[instrument(skip(self))]
    pub fn begin_run(&self) -> Result<BackupRun, BackupError> {
        fs::create_dir_all(&self.root)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut dir = self.root.join(format!("backup_{}", stamp));
        let mut attempt = 1;
        while dir.exists() {
            dir = self.root.join(format!("backup_{}_{}", stamp, attempt));
            attempt += 1;
        }
        fs::create_dir(&dir)?;

        let id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| stamp.clone());

        let run = BackupRun {
            dir,
            manifest: BackupManifest {
                id: id.clone(),
                created_at: Utc::now(),
                entries: Vec::new(),
                completed: false,
            },
            counter: 0,
        };
        run.persist_manifest()?;

        info!(backup = %id, "backup run started");
        Ok(run)
    }

    /// All manifests under the root, newest first. Unreadable manifests are
    /// skipped with a warning rather than failing the listing.
    pub fn list(&self) -> Result<Vec<BackupManifest>, BackupError> {
        let mut manifests = Vec::new();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(manifests),
            Err(err) => return Err(err.into()),
        };

        for entry in entries.flatten() {
            let manifest_path = entry.path().join(MANIFEST_FILE);
            if !manifest_path.is_file() {
                continue;
            }
            match read_manifest(&manifest_path) {
                Ok(manifest) => manifests.push(manifest),
                Err(err) => {
                    warn!(path = %manifest_path.display(), %err, "skipping unreadable manifest")
                }
            }
        }

        manifests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(manifests)
    }

    /// Put every snapshotted artifact back where it came from. Failures are
    /// collected per entry; one bad entry never aborts the rest.
    #[instrument(skip(self))]
    pub fn restore(&self, id: &str) -> Result<RestoreReport, BackupError> {
        let dir = self.root.join(id);
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(BackupError::NotFound(id.to_string()));
        }
        let manifest = read_manifest(&manifest_path)?;

        let mut report = RestoreReport::default();
        for entry in &manifest.entries {
            let stored = dir.join(&entry.stored_rel);
            match restore_entry(&stored, entry) {
                Ok(()) => report.restored.push(entry.original_path.clone()),
                Err(err) => {
                    warn!(path = %entry.original_path.display(), %err, "restore failed");
                    report
                        .failed
                        .push((entry.original_path.clone(), err.to_string()));
                }
            }
        }

        info!(
            backup = id,
            restored = report.restored.len(),
            failed = report.failed.len(),
            "restore complete"
        );
        Ok(report)
    }
}

/// One in-flight backup. The manifest is re-persisted after every snapshot,
/// so an interrupted run still lists everything captured so far.
pub struct BackupRun {
    dir: PathBuf,
    manifest: BackupManifest,
    counter: usize,
}

impl BackupRun {
    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    /// Copy one file or directory into the backup before it is mutated.
    #[instrument(skip(self))]
    pub fn snapshot(&mut self, path: &Path) -> Result<(), BackupError> {
        if !path.exists() {
            return Err(BackupError::SourceMissing(path.to_path_buf()));
        }

        self.counter += 1;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "item".to_string());
        // One numbered subfolder per artifact keeps collisions impossible.
        let stored_rel = PathBuf::from(format!("{:03}", self.counter)).join(&name);
        let stored = self.dir.join(&stored_rel);
        if let Some(parent) = stored.parent() {
            fs::create_dir_all(parent)?;
        }

        let (kind, sha256) = if path.is_dir() {
            copy_dir(path, &stored)?;
            (SnapshotKind::Directory, None)
        } else {
            fs::copy(path, &stored)?;
            (SnapshotKind::File, Some(file_sha256(path)?))
        };

        self.manifest.entries.push(ManifestEntry {
            original_path: path.to_path_buf(),
            stored_rel,
            kind,
            sha256,
            captured_at: Utc::now(),
        });
        self.persist_manifest()?;

        debug!(path = %path.display(), backup = %self.manifest.id, "snapshot taken");
        Ok(())
    }

    pub fn has_snapshot(&self, path: &Path) -> bool {
        self.manifest.entries.iter().any(|e| e.original_path == path)
    }

    pub fn entry_count(&self) -> usize {
        self.manifest.entries.len()
    }

    /// Remove the run directory. For runs that never snapshotted anything;
    /// an empty backup would only clutter later listings.
    pub fn discard(self) -> Result<(), BackupError> {
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    /// Mark the run complete. Called even after a cancelled or partially
    /// failed cleanup so the captured state stays restorable.
    pub fn commit(mut self) -> Result<String, BackupError> {
        self.manifest.completed = true;
        self.persist_manifest()?;
        Ok(self.manifest.id)
    }

    fn persist_manifest(&self) -> Result<(), BackupError> {
        let content = serde_json::to_string_pretty(&self.manifest)?;
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp.write_all(content.as_bytes())?;
        temp.persist(self.dir.join(MANIFEST_FILE))
            .map_err(|e| BackupError::Io(e.error))?;
        Ok(())
    }
}

fn read_manifest(path: &Path) -> Result<BackupManifest, BackupError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn restore_entry(stored: &Path, entry: &ManifestEntry) -> Result<(), BackupError> {
    if !stored.exists() {
        return Err(BackupError::SourceMissing(stored.to_path_buf()));
    }

    if let Some(parent) = entry.original_path.parent() {
        fs::create_dir_all(parent)?;
    }

    match entry.kind {
        SnapshotKind::File => {
            fs::copy(stored, &entry.original_path)?;
        }
        SnapshotKind::Directory => {
            if entry.original_path.exists() {
                fs::remove_dir_all(&entry.original_path)?;
            }
            copy_dir(stored, &entry.original_path)?;
        }
    }
    Ok(())
}

fn copy_dir(from: &Path, to: &Path) -> Result<(), BackupError> {
    for item in WalkDir::new(from).follow_links(false) {
        let item = item.map_err(|e| {
            BackupError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "walk error")
            }))
        })?;
        let Ok(rel) = item.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(rel);

        if item.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if item.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(item.path(), &target)?;
        }
    }
    Ok(())
}

pub fn file_sha256(path: &Path) -> Result<String, BackupError> {
    let content = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn snapshot_records_checksum_and_manifest_before_commit() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("settings.json");
        fs::write(&source, r#"{"deviceId": "abc"}"#).unwrap();

        let manager = BackupManager::new(temp.path().join("backups"));
        let mut run = manager.begin_run().unwrap();
        run.snapshot(&source).unwrap();

        // Manifest on disk already lists the entry, before any commit.
        let listed = manager.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].entries.len(), 1);
        assert!(!listed[0].completed);
        assert!(listed[0].entries[0].sha256.is_some());

        let id = run.commit().unwrap();
        let listed = manager.list().unwrap();
        assert_eq!(listed[0].id, id);
        assert!(listed[0].completed);
    }

    #[test]
    fn restore_round_trip_recovers_mutated_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("settings.json");
        let original = r#"{"deviceId": "original-value"}"#;
        fs::write(&source, original).unwrap();

        let manager = BackupManager::new(temp.path().join("backups"));
        let mut run = manager.begin_run().unwrap();
        run.snapshot(&source).unwrap();
        let id = run.commit().unwrap();

        fs::write(&source, r#"{"deviceId": "mutated"}"#).unwrap();

        let report = manager.restore(&id).unwrap();
        assert!(report.is_clean());
        assert_eq!(fs::read_to_string(&source).unwrap(), original);
    }

    #[test]
    fn restore_round_trip_recovers_deleted_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("workspaceStorage");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested/state.json"), "{}").unwrap();

        let manager = BackupManager::new(temp.path().join("backups"));
        let mut run = manager.begin_run().unwrap();
        run.snapshot(&dir).unwrap();
        let id = run.commit().unwrap();

        fs::remove_dir_all(&dir).unwrap();

        let report = manager.restore(&id).unwrap();
        assert!(report.is_clean());
        assert!(dir.join("nested/state.json").is_file());
    }

    #[test]
    fn restore_continues_past_missing_snapshots() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.json");
        let b = temp.path().join("b.json");
        fs::write(&a, "{}").unwrap();
        fs::write(&b, "{}").unwrap();

        let manager = BackupManager::new(temp.path().join("backups"));
        let mut run = manager.begin_run().unwrap();
        run.snapshot(&a).unwrap();
        run.snapshot(&b).unwrap();
        let id = run.commit().unwrap();

        // Sabotage the first stored copy.
        let backup_dir = temp.path().join("backups").join(&id);
        fs::remove_file(backup_dir.join("001/a.json")).unwrap();

        let report = manager.restore(&id).unwrap();
        assert_eq!(report.restored, vec![b.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, a);
    }

    #[test]
    fn list_is_newest_first_and_tolerates_garbage() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("backups");
        let manager = BackupManager::new(&root);

        let run = manager.begin_run().unwrap();
        let first = run.commit().unwrap();
        let run = manager.begin_run().unwrap();
        let second = run.commit().unwrap();

        // Stray directory without a manifest is ignored.
        fs::create_dir_all(root.join("not_a_backup")).unwrap();

        let listed = manager.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second);
        assert_eq!(listed[1].id, first);
    }

    #[test]
    fn missing_backup_id_is_an_error() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("backups"));
        assert!(matches!(
            manager.restore("backup_19700101_000000"),
            Err(BackupError::NotFound(_))
        ));
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use plugsweep::backup::BackupManager;
use plugsweep::catalog::{HostApplication, OperatingSystem, ProcessPattern, RootTemplate};
use plugsweep::core::{ArtifactKind, FreshIdPool, IdentifierKind};
use plugsweep::discovery::{DiscoveryEngine, ScanOptions};
use plugsweep::mutators::{cancel_flag, execute, OutcomeStatus};
use plugsweep::planner::{plan, ActionKind, CleanupOptions};

const OLD_MACHINE_ID: &str = "4f9e2b1c-0d3a-4c8e-9f10-aabbccddeeff";

fn no_env(_: &str) -> Option<String> {
    None
}

/// One synthetic editor profile with a config file, a state database, a
/// cache directory and a keychain directory that must never be touched.
fn build_fixture(root: &Path) {
    let data = root.join("data");
    fs::create_dir_all(data.join("cache")).unwrap();
    fs::create_dir_all(data.join("keychain")).unwrap();

    fs::write(
        data.join("settings.json"),
        format!(
            r#"{{
  "machineId": "{}",
  "email": "target@example.com",
  "backupEmail": "other@example.com",
  "username": "target",
  "fontSize": 14
}}"#,
            OLD_MACHINE_ID
        ),
    )
    .unwrap();

    let conn = rusqlite::Connection::open(data.join("state.vscdb")).unwrap();
    conn.execute_batch(
        "CREATE TABLE ItemTable (key TEXT PRIMARY KEY, value TEXT);
         INSERT INTO ItemTable VALUES ('a', 'contains augment text');
         INSERT INTO ItemTable VALUES ('b', 'clean');
         CREATE TABLE accounts (id INTEGER PRIMARY KEY, email TEXT);
         INSERT INTO accounts (email) VALUES ('target@example.com');",
    )
    .unwrap();
    drop(conn);

    fs::write(data.join("cache/blob.bin"), b"stale").unwrap();
    fs::write(data.join("keychain/secrets.json"), r#"{"token": "s3cret"}"#).unwrap();
}

fn fixture_catalog(root: &Path) -> Vec<HostApplication> {
    vec![HostApplication {
        id: "testhost".to_string(),
        name: "Test Host".to_string(),
        process_patterns: vec![ProcessPattern::exact("testhost")],
        roots: vec![RootTemplate::scoped(
            OperatingSystem::Linux,
            &format!("{}/data", root.display()),
        )],
    }]
}

fn scan_fixture(root: &Path) -> plugsweep::core::ScanResult {
    let catalog = fixture_catalog(root);
    let engine = DiscoveryEngine::new(&catalog, OperatingSystem::Linux, &no_env);
    engine.scan(&ScanOptions::default()).unwrap()
}

fn item_table_count(path: &Path) -> i64 {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.query_row("SELECT COUNT(*) FROM ItemTable", [], |r| r.get(0))
        .unwrap()
}

#[test]
fn full_cleanup_backs_up_mutates_and_restores() {
    let temp = TempDir::new().unwrap();
    build_fixture(temp.path());
    let data = temp.path().join("data");

    let scan_result = scan_fixture(temp.path());

    let options = CleanupOptions {
        reset_identifiers: true,
        clean_database_keyword: Some("augment".to_string()),
        clean_account_data: true,
        remove_all_accounts: true,
        clean_workspace: true,
        ..CleanupOptions::default()
    };
    let cleanup = plan(&scan_result, &options, &mut FreshIdPool::new());
    assert!(!cleanup.is_empty());

    let manager = BackupManager::new(temp.path().join("backups"));
    let run = manager.begin_run().unwrap();
    let report = execute(cleanup, Some(run), &cancel_flag());
    assert!(report.fully_applied(), "outcomes: {:?}", report.outcomes);
    let backup_id = report.manifest_id.clone().unwrap();

    // Identifier reset: the old id is gone, replaced by a fresh uuid.
    let settings = fs::read_to_string(data.join("settings.json")).unwrap();
    assert!(!settings.contains(OLD_MACHINE_ID));
    assert!(!settings.contains("target@example.com"));
    assert!(!settings.contains("other@example.com"));
    assert!(settings.contains("[REMOVED]"));
    // Unrelated keys survive untouched.
    assert!(settings.contains("\"fontSize\": 14"));

    // Keyword rows and the targeted account row are deleted.
    let db = data.join("state.vscdb");
    assert_eq!(item_table_count(&db), 1);
    let conn = rusqlite::Connection::open(&db).unwrap();
    let accounts: i64 = conn
        .query_row("SELECT COUNT(*) FROM accounts", [], |r| r.get(0))
        .unwrap();
    assert_eq!(accounts, 0);
    drop(conn);

    // Workspace cache is gone; the keychain directory is untouched.
    assert!(!data.join("cache").exists());
    assert_eq!(
        fs::read_to_string(data.join("keychain/secrets.json")).unwrap(),
        r#"{"token": "s3cret"}"#
    );

    // Restore brings back the exact pre-cleanup state.
    let restore = manager.restore(&backup_id).unwrap();
    assert!(restore.is_clean());
    let restored = fs::read_to_string(data.join("settings.json")).unwrap();
    assert!(restored.contains(OLD_MACHINE_ID));
    assert!(restored.contains("target@example.com"));
    assert_eq!(item_table_count(&db), 2);
    assert!(data.join("cache/blob.bin").is_file());
}

#[test]
fn targeted_email_cleanup_leaves_other_accounts() {
    let temp = TempDir::new().unwrap();
    build_fixture(temp.path());
    let data = temp.path().join("data");

    let scan_result = scan_fixture(temp.path());

    let options = CleanupOptions {
        clean_account_data: true,
        target_email: Some("target@example.com".to_string()),
        create_backup: false,
        ..CleanupOptions::default()
    };
    let cleanup = plan(&scan_result, &options, &mut FreshIdPool::new());
    let report = execute(cleanup, None, &cancel_flag());
    assert!(report.fully_applied());

    let settings = fs::read_to_string(data.join("settings.json")).unwrap();
    assert!(!settings.contains("target@example.com"));
    assert!(settings.contains("other@example.com"));
    // The username matching the targeted address's local part is scrubbed too.
    assert!(!settings.contains("\"username\": \"target\""));
    // Identifiers were not requested, so the machine id is untouched.
    assert!(settings.contains(OLD_MACHINE_ID));
}

#[test]
fn every_mutation_stays_inside_the_scanned_roots() {
    let temp = TempDir::new().unwrap();
    build_fixture(temp.path());

    let scan_result = scan_fixture(temp.path());

    let options = CleanupOptions {
        reset_identifiers: true,
        clean_database_keyword: Some("augment".to_string()),
        clean_account_data: true,
        remove_all_accounts: true,
        clean_workspace: true,
        ..CleanupOptions::default()
    };
    let cleanup = plan(&scan_result, &options, &mut FreshIdPool::new());

    for action in &cleanup.actions {
        assert!(
            scan_result
                .roots_scanned
                .iter()
                .any(|root| action.target.starts_with(root)),
            "{} escapes the scanned roots",
            action.target.display()
        );
    }
}

#[test]
fn fresh_identifiers_never_collide_with_old_ones() {
    let temp = TempDir::new().unwrap();
    build_fixture(temp.path());
    let data = temp.path().join("data");

    // A second config file sharing the same machine id.
    fs::write(
        data.join("storage.json"),
        format!(r#"{{"telemetry.machineId": "{}"}}"#, OLD_MACHINE_ID),
    )
    .unwrap();

    let scan_result = scan_fixture(temp.path());
    let options = CleanupOptions {
        reset_identifiers: true,
        create_backup: false,
        ..CleanupOptions::default()
    };
    let cleanup = plan(&scan_result, &options, &mut FreshIdPool::new());

    let replacements: Vec<(String, String)> = cleanup
        .actions
        .iter()
        .filter_map(|a| match &a.kind {
            ActionKind::ReplaceValue { old, new } => Some((old.clone(), new.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(replacements.len(), 2);
    for (old, new) in &replacements {
        assert_ne!(old, new);
    }
    // Same old id maps to the same fresh id across both files.
    assert_eq!(replacements[0].1, replacements[1].1);

    let report = execute(cleanup, None, &cancel_flag());
    assert!(report.fully_applied());

    let a = fs::read_to_string(data.join("settings.json")).unwrap();
    let b = fs::read_to_string(data.join("storage.json")).unwrap();
    assert!(!a.contains(OLD_MACHINE_ID));
    assert!(!b.contains(OLD_MACHINE_ID));
}

#[test]
fn unreadable_artifact_is_reported_and_skipped_by_the_plan() {
    let temp = TempDir::new().unwrap();
    build_fixture(temp.path());
    let data = temp.path().join("data");
    fs::write(data.join("broken.json"), "{definitely not json").unwrap();

    let scan_result = scan_fixture(temp.path());
    assert!(scan_result
        .entries
        .iter()
        .any(|e| e.unparseable && e.path.ends_with("broken.json")));
    assert!(!scan_result.warnings.is_empty());

    let options = CleanupOptions {
        clean_account_data: true,
        remove_all_accounts: true,
        create_backup: false,
        ..CleanupOptions::default()
    };
    let cleanup = plan(&scan_result, &options, &mut FreshIdPool::new());

    assert!(cleanup
        .actions
        .iter()
        .all(|a| !a.target.ends_with("broken.json")));
    assert!(cleanup
        .skipped
        .iter()
        .any(|s| s.path.ends_with("broken.json")));
}

#[test]
fn noop_actions_leave_files_byte_identical() {
    let temp = TempDir::new().unwrap();
    build_fixture(temp.path());
    let data = temp.path().join("data");

    let scan_result = scan_fixture(temp.path());
    let options = CleanupOptions {
        clean_account_data: true,
        remove_all_accounts: true,
        create_backup: false,
        ..CleanupOptions::default()
    };
    let cleanup = plan(&scan_result, &options, &mut FreshIdPool::new());

    // First run mutates; second run against the already-clean tree is a noop.
    let report = execute(cleanup, None, &cancel_flag());
    assert!(report.fully_applied());

    let settings_before = fs::read_to_string(data.join("settings.json")).unwrap();
    let rescan = scan_fixture(temp.path());
    let second = plan(&rescan, &options, &mut FreshIdPool::new());
    let second_report = execute(second, None, &cancel_flag());

    assert_eq!(second_report.failed(), 0);
    assert!(second_report
        .outcomes
        .iter()
        .all(|o| o.status != OutcomeStatus::Failed));
    let settings_after = fs::read_to_string(data.join("settings.json")).unwrap();
    assert_eq!(settings_before, settings_after);
}

#[test]
fn scan_report_json_survives_a_round_trip() {
    let temp = TempDir::new().unwrap();
    build_fixture(temp.path());

    let scan_result = scan_fixture(temp.path());
    let path: PathBuf = temp.path().join("reports/scan.json");
    plugsweep::report::save_scan_json(&scan_result, &path).unwrap();
    let loaded = plugsweep::report::load_scan_json(&path).unwrap();

    assert_eq!(loaded.entries.len(), scan_result.entries.len());
    assert_eq!(
        loaded.count_kind(ArtifactKind::DatabaseFile),
        scan_result.count_kind(ArtifactKind::DatabaseFile)
    );
    assert!(loaded
        .entries
        .iter()
        .flat_map(|e| e.identifiers.iter())
        .any(|h| h.kind == IdentifierKind::Email));
}

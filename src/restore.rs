use std::io;
use std::process::ExitCode;

use crate::backup::{BackupError, BackupManager};
use crate::config::Config;

/// `restore` lists available backups; `restore <id>` puts one back.
pub fn run_restore(args: &[String]) -> io::Result<ExitCode> {
    let config = Config::load().map_err(io::Error::other)?;
    let manager = BackupManager::new(config.backup_root());

    let Some(id) = args.first() else {
        return list_backups(&manager);
    };

    if id.starts_with('-') {
        eprintln!("❌ Unknown restore option: {}", id);
        return Ok(ExitCode::from(2));
    }

    println!("⏪ Restoring {}...", id);
    let report = match manager.restore(id) {
        Ok(report) => report,
        Err(BackupError::NotFound(id)) => {
            eprintln!("❌ No backup named {}", id);
            return Ok(ExitCode::from(4));
        }
        Err(err) => return Err(io::Error::other(err)),
    };

    for path in &report.restored {
        println!("✅ {}", path.display());
    }
    for (path, reason) in &report.failed {
        eprintln!("❌ {}: {}", path.display(), reason);
    }

    if report.is_clean() {
        println!("✅ Restore complete.");
        Ok(ExitCode::SUCCESS)
    } else if report.restored.is_empty() {
        Ok(ExitCode::from(4))
    } else {
        Ok(ExitCode::from(3))
    }
}

fn list_backups(manager: &BackupManager) -> io::Result<ExitCode> {
    let manifests = manager.list().map_err(io::Error::other)?;

    if manifests.is_empty() {
        println!("No backups under {}", manager.root().display());
        return Ok(ExitCode::SUCCESS);
    }

    for manifest in manifests {
        let status = if manifest.completed { "" } else { " (incomplete)" };
        println!(
            "{}  {} item(s), {}{}",
            manifest.id,
            manifest.entries.len(),
            manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            status
        );
    }

    Ok(ExitCode::SUCCESS)
}

use std::io;
use std::process::ExitCode;

use crate::backup::BackupManager;
use crate::config::Config;
use crate::core::FreshIdPool;
use crate::mutators::{cancel_flag, execute};
use crate::planner::{plan, CleanupOptions};
use crate::report;
use crate::scan::perform_scan;

fn parse_options(args: &[String], config: &Config) -> Result<CleanupOptions, String> {
    let mut options = CleanupOptions::default();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--reset-ids" => options.reset_identifiers = true,
            "--db-keyword" => {
                options.clean_database_keyword = Some(config.keyword().to_string())
            }
            "--accounts" => {
                options.clean_account_data = true;
                options.remove_all_accounts = true;
            }
            "--email" => {
                let addr = iter
                    .next()
                    .ok_or_else(|| "--email requires an address".to_string())?;
                options.clean_account_data = true;
                options.remove_all_accounts = false;
                options.target_email = Some(addr.clone());
            }
            "--workspace" => options.clean_workspace = true,
            "--all" => {
                options.reset_identifiers = true;
                options.clean_database_keyword = Some(config.keyword().to_string());
                options.clean_account_data = true;
                options.remove_all_accounts = true;
                options.clean_workspace = true;
            }
            "--no-backup" => options.create_backup = false,
            other => return Err(format!("Unknown clean option: {}", other)),
        }
    }

    if !options.requests_anything() {
        return Err(
            "Nothing selected; pass --reset-ids, --db-keyword, --accounts, --email, --workspace or --all"
                .to_string(),
        );
    }

    Ok(options)
}

/// Scan, plan, back up, mutate. Each destructive category is opt-in via its
/// own flag; backups are on unless `--no-backup` is passed.
pub fn run_cleanup(args: &[String]) -> io::Result<ExitCode> {
    let config = Config::load().map_err(io::Error::other)?;

    let options = match parse_options(args, &config) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("❌ {}", msg);
            return Ok(ExitCode::from(2));
        }
    };

    println!("🔍 Scanning for plugin data...");
    let scan = match perform_scan(&config) {
        Ok(scan) => scan,
        Err(crate::discovery::ScanError::NothingToScan) => {
            eprintln!("❌ No scannable locations could be resolved on this system.");
            return Ok(ExitCode::from(4));
        }
        Err(crate::discovery::ScanError::Io(err)) => return Err(err),
    };

    if !scan.processes.is_empty() {
        eprintln!("⚠️ Host applications are still running; cleaned data may be rewritten:");
        for p in &scan.processes {
            eprintln!("   pid {} ({})", p.pid, p.exe_name);
        }
    }

    let mut pool = FreshIdPool::new();
    let cleanup_plan = plan(&scan, &options, &mut pool);

    if cleanup_plan.is_empty() {
        for skipped in &cleanup_plan.skipped {
            println!("⏭️ {}: {}", skipped.path.display(), skipped.reason);
        }
        println!("✅ Nothing to clean for the selected options.");
        return Ok(ExitCode::SUCCESS);
    }

    let backup = if options.create_backup {
        let manager = BackupManager::new(config.backup_root());
        Some(manager.begin_run().map_err(io::Error::other)?)
    } else {
        None
    };

    println!("🧹 Applying {} action(s)...", cleanup_plan.actions.len());
    let run_report = execute(cleanup_plan, backup, &cancel_flag());
    print!("{}", report::render_run(&run_report));

    if run_report.cancelled {
        Ok(ExitCode::from(5))
    } else if run_report.failed() > 0 {
        if run_report.applied() == 0 {
            Ok(ExitCode::from(4))
        } else {
            Ok(ExitCode::from(3))
        }
    } else {
        println!("✅ Cleanup complete.");
        Ok(ExitCode::SUCCESS)
    }
}

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::catalog::{builtin_catalog, os_env, OperatingSystem};
use crate::config::Config;
use crate::core::ScanResult;
use crate::discovery::{generate_recommendations, DiscoveryEngine, ScanError, ScanOptions};
use crate::process::{ProcessInspector, SystemProcesses};
use crate::report;

/// Run discovery and print the inventory. `--json <path>` additionally
/// persists the result for later diffing.
pub fn run_scan(args: &[String]) -> io::Result<ExitCode> {
    let mut json_path: Option<PathBuf> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => match iter.next() {
                Some(path) => json_path = Some(PathBuf::from(path)),
                None => {
                    eprintln!("❌ --json requires a path");
                    return Ok(ExitCode::from(2));
                }
            },
            other => {
                eprintln!("❌ Unknown scan option: {}", other);
                return Ok(ExitCode::from(2));
            }
        }
    }

    let config = Config::load().map_err(io::Error::other)?;
    let catalog = builtin_catalog();

    println!("🔍 Scanning for plugin data...");

    let result = match perform_scan(&config) {
        Ok(result) => result,
        Err(ScanError::NothingToScan) => {
            eprintln!("❌ No scannable locations could be resolved on this system.");
            return Ok(ExitCode::from(4));
        }
        Err(ScanError::Io(err)) => return Err(err),
    };

    print!("{}", report::render_scan(&result, &catalog));

    if let Some(path) = json_path {
        report::save_scan_json(&result, &path).map_err(io::Error::other)?;
        println!("Report written to {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

/// Shared by the scan and clean commands: discovery plus process matching
/// plus recommendations, in one pass.
pub fn perform_scan(config: &Config) -> Result<ScanResult, ScanError> {
    let catalog = builtin_catalog();
    let engine = DiscoveryEngine::new(&catalog, OperatingSystem::current(), &os_env);

    let options = ScanOptions {
        max_depth: config.max_depth(),
        keyword: config.keyword().to_string(),
        ..ScanOptions::default()
    };

    let mut result = engine.scan(&options)?;

    let mut inspector = ProcessInspector::new(SystemProcesses::new());
    result.processes = inspector.list_matching(&catalog);
    result.recommendations = generate_recommendations(&result, &catalog);

    Ok(result)
}

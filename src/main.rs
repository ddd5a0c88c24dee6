use std::env;
use std::io;
use std::process::ExitCode;

use plugsweep::{clean, config::Config, logger, processes, restore, scan};

fn main() -> ExitCode {
    if let Ok(config) = Config::load() {
        let _ = logger::init_logger(&config);
    }

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(|s| s.as_str());
    let rest = &args[args.len().min(2)..];

    match command {
        None | Some("help") | Some("-h") | Some("--help") => {
            print_help();
            ExitCode::SUCCESS
        }
        Some("scan") => run_and_report(scan::run_scan, rest),
        Some("clean") => run_and_report(clean::run_cleanup, rest),
        Some("processes") => run_and_report(processes::run_processes, rest),
        Some("restore") => run_and_report(restore::run_restore, rest),
        Some(other) => {
            eprintln!("❌ Unknown command: {}", other);
            print_help();
            ExitCode::from(2)
        }
    }
}

fn run_and_report(f: fn(&[String]) -> io::Result<ExitCode>, args: &[String]) -> ExitCode {
    match f(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("❌ {}", err);
            ExitCode::from(4)
        }
    }
}

fn print_help() {
    println!("Usage: plugsweep <command> [options]");
    println!("Commands:");
    println!("  scan       - Discover plugin data across host applications");
    println!("               [--json <path>] also writes a JSON report");
    println!("  clean      - Back up and erase selected plugin data");
    println!("               --reset-ids     replace device/telemetry ids");
    println!("               --db-keyword    delete keyword rows from databases");
    println!("               --accounts      scrub all account identifiers");
    println!("               --email <addr>  scrub one account only");
    println!("               --workspace     delete workspace/cache dirs");
    println!("               --all           all of the above");
    println!("               --no-backup     skip the pre-mutation backup");
    println!("  processes  - List running host applications");
    println!("               [--terminate] ask them to exit, [--force] kill");
    println!("  restore    - List backups, or restore one by id");
    println!("  help       - Show this help message");
}

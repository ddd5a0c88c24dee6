use std::io;
use std::process::ExitCode;

use crate::catalog::builtin_catalog;
use crate::process::{ProcessInspector, SystemProcesses, TerminateMode, TerminateOutcome};

/// List host-application processes; `--terminate` asks them to exit,
/// `--force` kills outright.
pub fn run_processes(args: &[String]) -> io::Result<ExitCode> {
    let mut terminate = false;
    let mut mode = TerminateMode::Graceful;

    for arg in args {
        match arg.as_str() {
            "--terminate" => terminate = true,
            "--force" => {
                terminate = true;
                mode = TerminateMode::Forced;
            }
            other => {
                eprintln!("❌ Unknown processes option: {}", other);
                return Ok(ExitCode::from(2));
            }
        }
    }

    let catalog = builtin_catalog();
    let mut inspector = ProcessInspector::new(SystemProcesses::new());
    let matches = inspector.list_matching(&catalog);

    if matches.is_empty() {
        println!("✅ No host applications running.");
        return Ok(ExitCode::SUCCESS);
    }

    for m in &matches {
        println!("pid {:<8} {} ({})", m.pid, m.exe_name, m.host);
    }

    if !terminate {
        return Ok(ExitCode::SUCCESS);
    }

    let mut denied = 0usize;
    for m in &matches {
        match inspector.terminate(m.pid, mode) {
            TerminateOutcome::Terminated => println!("✅ pid {} terminated", m.pid),
            TerminateOutcome::NotFound => println!("pid {} already gone", m.pid),
            TerminateOutcome::Denied => {
                denied += 1;
                eprintln!(
                    "⚠️ pid {} still running; retry with --force to kill it",
                    m.pid
                );
            }
        }
    }

    if denied > 0 {
        Ok(ExitCode::from(3))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

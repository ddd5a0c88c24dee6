use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::backup::BackupRun;
use crate::mutators::config_edit::{self, EditOutcome};
use crate::mutators::db_edit;
use crate::mutators::workspace::{self, RemoveOutcome};
use crate::planner::{ActionKind, MutationAction, Plan, SkippedTarget};

/// Set from a Ctrl-C handler; checked between actions, never mid-action.
pub type CancelFlag = Arc<AtomicBool>;

pub fn cancel_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Applied,
    /// The target state already held; nothing was written.
    Noop,
    Failed,
}

#[derive(Debug)]
pub struct ActionOutcome {
    pub action: MutationAction,
    pub status: OutcomeStatus,
    pub detail: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<ActionOutcome>,
    pub skipped: Vec<SkippedTarget>,
    pub manifest_id: Option<String>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn applied(&self) -> usize {
        self.count(OutcomeStatus::Applied)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    pub fn fully_applied(&self) -> bool {
        !self.cancelled && self.failed() == 0
    }
}

/// Execute a plan in order. Every target is snapshotted into the backup
/// before its first mutation; a failed snapshot fails that action and the
/// run moves on. A cancelled run stops between actions and still commits
/// whatever the backup captured.
#[instrument(skip(plan, backup, cancel))]
pub fn execute(plan: Plan, mut backup: Option<BackupRun>, cancel: &CancelFlag) -> RunReport {
    let mut report = RunReport {
        skipped: plan.skipped,
        ..RunReport::default()
    };

    for action in plan.actions {
        if cancel.load(Ordering::SeqCst) {
            warn!("cleanup cancelled; remaining actions not executed");
            report.cancelled = true;
            break;
        }

        if action.backup_required {
            if let Some(run) = backup.as_mut() {
                if !run.has_snapshot(&action.target) {
                    if let Err(err) = run.snapshot(&action.target) {
                        report.outcomes.push(ActionOutcome {
                            action,
                            status: OutcomeStatus::Failed,
                            detail: Some(format!("backup failed: {}", err)),
                        });
                        continue;
                    }
                }
            }
        }

        let (status, detail) = apply(&action);
        report.outcomes.push(ActionOutcome {
            action,
            status,
            detail,
        });
    }

    if let Some(run) = backup {
        if run.entry_count() == 0 {
            if let Err(err) = run.discard() {
                warn!(%err, "empty backup discard failed");
            }
        } else {
            match run.commit() {
                Ok(id) => report.manifest_id = Some(id),
                Err(err) => warn!(%err, "backup manifest commit failed"),
            }
        }
    }

    info!(
        applied = report.applied(),
        noop = report.count(OutcomeStatus::Noop),
        failed = report.failed(),
        cancelled = report.cancelled,
        "cleanup run finished"
    );
    report
}

fn apply(action: &MutationAction) -> (OutcomeStatus, Option<String>) {
    match &action.kind {
        ActionKind::ReplaceValue { old, new } => {
            match config_edit::replace_in_config(&action.target, old, new) {
                Ok(EditOutcome::Applied(leaves)) => (
                    OutcomeStatus::Applied,
                    Some(format!("{} value(s) replaced", leaves)),
                ),
                Ok(EditOutcome::Noop) => (OutcomeStatus::Noop, None),
                Err(err) => (OutcomeStatus::Failed, Some(err.to_string())),
            }
        }
        ActionKind::DeleteDbRows {
            table,
            column,
            pattern,
        } => match db_edit::delete_matching_rows(&action.target, table, column, pattern) {
            Ok(0) => (OutcomeStatus::Noop, None),
            Ok(rows) => (
                OutcomeStatus::Applied,
                Some(format!("{} row(s) deleted", rows)),
            ),
            Err(err) => (OutcomeStatus::Failed, Some(err.to_string())),
        },
        ActionKind::DeleteDbRowsExact {
            table,
            column,
            value,
        } => match db_edit::delete_exact_rows(&action.target, table, column, value) {
            Ok(0) => (OutcomeStatus::Noop, None),
            Ok(rows) => (
                OutcomeStatus::Applied,
                Some(format!("{} row(s) deleted", rows)),
            ),
            Err(err) => (OutcomeStatus::Failed, Some(err.to_string())),
        },
        ActionKind::VacuumDb => match db_edit::vacuum(&action.target) {
            Ok(()) => (OutcomeStatus::Applied, None),
            Err(err) => (OutcomeStatus::Failed, Some(err.to_string())),
        },
        ActionKind::DeleteFile | ActionKind::DeleteDirectory => {
            match workspace::remove_path(&action.target) {
                Ok(RemoveOutcome::Removed) => (OutcomeStatus::Applied, None),
                Ok(RemoveOutcome::Missing) => (OutcomeStatus::Noop, None),
                Err(err) => (OutcomeStatus::Failed, Some(err.to_string())),
            }
        }
    }
}

use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, instrument};

use crate::core::{
    ArtifactKind, FreshIdPool, IdentifierKind, InventoryEntry, RiskTier, ScanResult,
};

/// Literal written over scrubbed account values.
pub const REMOVED_MARKER: &str = "[REMOVED]";

/// What the user asked a cleanup run to do. Everything defaults to off except
/// backups; the caller opts into each destructive category explicitly.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Replace device/telemetry ids with freshly generated ones.
    pub reset_identifiers: bool,
    /// Delete database rows whose text contains this keyword.
    pub clean_database_keyword: Option<String>,
    /// Scrub account identifiers (emails, usernames) from artifacts.
    pub clean_account_data: bool,
    /// Restrict account scrubbing to this one address.
    pub target_email: Option<String>,
    /// Scrub every account identifier found, not just the targeted one.
    pub remove_all_accounts: bool,
    /// Delete workspace and cache directories.
    pub clean_workspace: bool,
    pub create_backup: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        CleanupOptions {
            reset_identifiers: false,
            clean_database_keyword: None,
            clean_account_data: false,
            target_email: None,
            remove_all_accounts: false,
            clean_workspace: false,
            create_backup: true,
        }
    }
}

impl CleanupOptions {
    pub fn requests_anything(&self) -> bool {
        self.reset_identifiers
            || self.clean_database_keyword.is_some()
            || self.clean_account_data
            || self.clean_workspace
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    /// Swap one string value for another inside a config artifact.
    ReplaceValue { old: String, new: String },
    /// Delete rows where the column's text contains the pattern.
    DeleteDbRows {
        table: String,
        column: String,
        pattern: String,
    },
    /// Delete rows where the column equals the value exactly.
    DeleteDbRowsExact {
        table: String,
        column: String,
        value: String,
    },
    VacuumDb,
    DeleteFile,
    DeleteDirectory,
}

#[derive(Debug, Clone)]
pub struct MutationAction {
    pub target: PathBuf,
    pub host: Option<String>,
    pub kind: ActionKind,
    pub backup_required: bool,
}

#[derive(Debug, Clone)]
pub struct SkippedTarget {
    pub path: PathBuf,
    pub reason: String,
}

/// Ordered list of mutations derived from one scan. Building a plan touches
/// nothing on disk; only the runner does.
#[derive(Debug, Default)]
pub struct Plan {
    pub actions: Vec<MutationAction>,
    pub skipped: Vec<SkippedTarget>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn push(&mut self, entry: &InventoryEntry, kind: ActionKind, backup: bool) {
        let backup_required = backup && kind != ActionKind::VacuumDb;
        self.actions.push(MutationAction {
            target: entry.path.clone(),
            host: entry.host.clone(),
            kind,
            backup_required,
        });
    }

    fn skip(&mut self, entry: &InventoryEntry, reason: impl Into<String>) {
        self.skipped.push(SkippedTarget {
            path: entry.path.clone(),
            reason: reason.into(),
        });
    }
}

/// Build a mutation plan from a scan result. Category order is fixed:
/// identifier resets, then database keyword deletes, then account scrubs,
/// then per-database vacuums, then workspace deletions.
#[instrument(skip(scan, options, pool))]
pub fn plan(scan: &ScanResult, options: &CleanupOptions, pool: &mut FreshIdPool) -> Plan {
    let mut plan = Plan::default();

    let eligible: Vec<&InventoryEntry> = scan
        .entries
        .iter()
        .filter(|entry| {
            if entry.tier == RiskTier::NeverTouch {
                plan.skip(entry, "excluded: sensitive location");
                return false;
            }
            if entry.unparseable && entry.kind != ArtifactKind::WorkspaceItem {
                plan.skip(entry, "excluded: unparseable");
                return false;
            }
            true
        })
        .collect();

    if options.reset_identifiers {
        for entry in eligible
            .iter()
            .filter(|e| e.kind == ArtifactKind::ConfigFile)
        {
            for hit in entry.uuids() {
                let fresh = pool.replacement_for(&hit.value);
                plan.push(
                    entry,
                    ActionKind::ReplaceValue {
                        old: hit.value.clone(),
                        new: fresh,
                    },
                    options.create_backup,
                );
            }
        }
    }

    let mut dirty_databases: HashSet<PathBuf> = HashSet::new();

    if let Some(keyword) = &options.clean_database_keyword {
        for entry in eligible
            .iter()
            .filter(|e| e.kind == ArtifactKind::DatabaseFile)
        {
            for hit in &entry.keyword_hits {
                plan.push(
                    entry,
                    ActionKind::DeleteDbRows {
                        table: hit.table.clone(),
                        column: hit.column.clone(),
                        pattern: keyword.clone(),
                    },
                    options.create_backup,
                );
                dirty_databases.insert(entry.path.clone());
            }
        }
    }

    if options.clean_account_data {
        plan_account_scrub(&mut plan, &eligible, options, &mut dirty_databases);
    }

    for entry in eligible
        .iter()
        .filter(|e| dirty_databases.contains(&e.path))
    {
        // One vacuum per database, after every delete against it.
        if !plan
            .actions
            .iter()
            .any(|a| a.target == entry.path && a.kind == ActionKind::VacuumDb)
        {
            plan.push(entry, ActionKind::VacuumDb, false);
        }
    }

    if options.clean_workspace {
        for entry in eligible
            .iter()
            .filter(|e| e.kind == ArtifactKind::WorkspaceItem)
        {
            match entry.tier {
                RiskTier::Safe => {
                    plan.push(entry, ActionKind::DeleteDirectory, options.create_backup)
                }
                RiskTier::TargetedOnly if options.clean_account_data => {
                    plan.push(entry, ActionKind::DeleteDirectory, options.create_backup)
                }
                RiskTier::TargetedOnly => {
                    plan.skip(entry, "holds account data: pass an account option to include")
                }
                RiskTier::Review => plan.skip(entry, "needs manual review"),
                RiskTier::NeverTouch => unreachable!("filtered above"),
            }
        }
    }

    debug!(
        actions = plan.actions.len(),
        skipped = plan.skipped.len(),
        "plan built"
    );
    plan
}

fn plan_account_scrub(
    plan: &mut Plan,
    eligible: &[&InventoryEntry],
    options: &CleanupOptions,
    dirty_databases: &mut HashSet<PathBuf>,
) {
    let wants = |value: &str, kind: IdentifierKind| -> bool {
        match (&options.target_email, options.remove_all_accounts) {
            (Some(target), false) => match kind {
                IdentifierKind::Email => value.eq_ignore_ascii_case(target),
                // The username derived from the targeted address is scrubbed
                // alongside it; longer than three chars to avoid common words.
                _ => target
                    .split('@')
                    .next()
                    .map(|local| local.len() > 3 && value.eq_ignore_ascii_case(local))
                    .unwrap_or(false),
            },
            _ => true,
        }
    };

    for entry in eligible {
        match entry.kind {
            ArtifactKind::ConfigFile => {
                for hit in entry
                    .identifiers
                    .iter()
                    .filter(|h| h.kind != IdentifierKind::Uuid && wants(&h.value, h.kind))
                {
                    plan.push(
                        entry,
                        ActionKind::ReplaceValue {
                            old: hit.value.clone(),
                            new: REMOVED_MARKER.to_string(),
                        },
                        options.create_backup,
                    );
                }
            }
            ArtifactKind::DatabaseFile => {
                for hit in entry
                    .emails()
                    .filter(|h| wants(&h.value, IdentifierKind::Email))
                {
                    let Some((table, column)) = hit.location.split_once('.') else {
                        continue;
                    };
                    plan.push(
                        entry,
                        ActionKind::DeleteDbRows {
                            table: table.to_string(),
                            column: column.to_string(),
                            pattern: hit.value.clone(),
                        },
                        options.create_backup,
                    );
                    dirty_databases.insert(entry.path.clone());
                }

                // Usernames sit alone in account-ish columns; exact equality
                // avoids sweeping up superstring values.
                for hit in entry
                    .usernames()
                    .filter(|h| wants(&h.value, IdentifierKind::Username))
                {
                    let Some((table, column)) = hit.location.split_once('.') else {
                        continue;
                    };
                    plan.push(
                        entry,
                        ActionKind::DeleteDbRowsExact {
                            table: table.to_string(),
                            column: column.to_string(),
                            value: hit.value.clone(),
                        },
                        options.create_backup,
                    );
                    dirty_databases.insert(entry.path.clone());
                }
            }
            ArtifactKind::WorkspaceItem => {}
        }
    }
}

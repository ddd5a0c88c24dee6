use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::catalog::{resolve_roots, EnvLookup, HostApplication, OperatingSystem, ResolvedRoot};
use crate::core::tree::TreeValue;
use crate::core::{
    extract_from_doc, extract_from_text, ArtifactKind, ConfigDoc, DocFormat, InventoryEntry,
    ScanResult,
};
use crate::discovery::db::inspect_database;
use crate::discovery::rules::{classify, is_workspace_dir, RiskPolicy};

const CONFIG_EXTENSIONS: &[&str] = &["json", "ini", "cfg", "conf", "config", "xml"];
const DATABASE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3", "vscdb"];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no candidate roots resolvable for any host")]
    NothingToScan,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_depth: usize,
    pub keyword: String,
    pub policy: RiskPolicy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            max_depth: 6,
            keyword: "augment".to_string(),
            policy: RiskPolicy::default(),
        }
    }
}

/// Walks the catalog's candidate roots and builds the per-location inventory.
/// Strictly read-only: discovery never mutates anything it reads.
pub struct DiscoveryEngine<'a> {
    catalog: &'a [HostApplication],
    os: OperatingSystem,
    env: &'a EnvLookup<'a>,
}

impl<'a> DiscoveryEngine<'a> {
    pub fn new(
        catalog: &'a [HostApplication],
        os: OperatingSystem,
        env: &'a EnvLookup<'a>,
    ) -> Self {
        DiscoveryEngine { catalog, os, env }
    }

    #[instrument(skip(self, options))]
    pub fn scan(&self, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        let mut resolved: Vec<(Option<String>, ResolvedRoot)> = Vec::new();
        for host in self.catalog {
            let owner = if host.is_standalone() {
                None
            } else {
                Some(host.id.clone())
            };
            for root in resolve_roots(host, self.os, self.env) {
                resolved.push((owner.clone(), root));
            }
        }

        if resolved.is_empty() {
            return Err(ScanError::NothingToScan);
        }

        let existing: Vec<&(Option<String>, ResolvedRoot)> =
            resolved.iter().filter(|(_, r)| r.path.exists()).collect();

        let mut result =
            ScanResult::new(existing.iter().map(|(_, r)| r.path.clone()).collect());
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for (host, root) in &existing {
            self.walk_root(host.as_deref(), root, options, &mut seen, &mut result);
        }

        info!(
            roots = result.roots_scanned.len(),
            entries = result.entries.len(),
            warnings = result.warnings.len(),
            "discovery pass complete"
        );

        Ok(result)
    }

    fn walk_root(
        &self,
        host: Option<&str>,
        root: &ResolvedRoot,
        options: &ScanOptions,
        seen: &mut HashSet<PathBuf>,
        result: &mut ScanResult,
    ) {
        debug!(root = %root.path.display(), scoped = root.keyword_scoped, "walking root");

        let keyword_lower = options.keyword.to_lowercase();
        let scoped = root.keyword_scoped;
        let filter_keyword = keyword_lower.clone();

        let mut it = WalkDir::new(&root.path)
            .follow_links(false)
            .max_depth(options.max_depth)
            .into_iter()
            .filter_entry(move |e| {
                if !scoped || e.depth() != 1 {
                    return true;
                }
                e.file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .contains(&filter_keyword)
            });

        loop {
            let entry = match it.next() {
                None => break,
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    let path = err.path().map(Path::to_path_buf);
                    result.warn(path.as_deref(), format!("access error: {}", err));
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path().to_path_buf();

            if entry.file_type().is_dir() {
                if is_workspace_dir(&entry.file_name().to_string_lossy())
                    && seen.insert(path.clone())
                {
                    let tier = classify(&path, ArtifactKind::WorkspaceItem, &options.policy);
                    result.entries.push(InventoryEntry::new(
                        path,
                        ArtifactKind::WorkspaceItem,
                        host.map(str::to_string),
                        tier,
                    ));
                    // Contents inspected lazily, only when acted on.
                    it.skip_current_dir();
                }
                continue;
            }

            if !entry.file_type().is_file() || !seen.insert(path.clone()) {
                continue;
            }

            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default();

            if CONFIG_EXTENSIONS.contains(&ext.as_str()) {
                self.record_config(host, path, options, result);
            } else if DATABASE_EXTENSIONS.contains(&ext.as_str()) {
                self.record_database(host, path, options, result);
            }
        }
    }

    fn record_config(
        &self,
        host: Option<&str>,
        path: PathBuf,
        options: &ScanOptions,
        result: &mut ScanResult,
    ) {
        let tier = classify(&path, ArtifactKind::ConfigFile, &options.policy);
        let mut entry = InventoryEntry::new(
            path.clone(),
            ArtifactKind::ConfigFile,
            host.map(str::to_string),
            tier,
        );

        match ConfigDoc::read(&path) {
            Ok(doc) => {
                entry.identifiers = match doc.format {
                    DocFormat::Text => match &doc.root {
                        TreeValue::Str(content) => extract_from_text(content),
                        _ => Vec::new(),
                    },
                    _ => extract_from_doc(&doc),
                };
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "unparseable config artifact");
                entry.unparseable = true;
                result.warn(Some(&path), format!("unparseable: {}", err));
            }
        }

        result.entries.push(entry);
    }

    fn record_database(
        &self,
        host: Option<&str>,
        path: PathBuf,
        options: &ScanOptions,
        result: &mut ScanResult,
    ) {
        let tier = classify(&path, ArtifactKind::DatabaseFile, &options.policy);
        let mut entry = InventoryEntry::new(
            path.clone(),
            ArtifactKind::DatabaseFile,
            host.map(str::to_string),
            tier,
        );

        match inspect_database(&path, &options.keyword) {
            Ok(inspection) => {
                entry.identifiers = inspection.identifiers;
                entry.keyword_hits = inspection.keyword_hits;
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "unparseable database artifact");
                entry.unparseable = true;
                result.warn(Some(&path), format!("unparseable: {}", err));
            }
        }

        result.entries.push(entry);
    }
}

/// Derive user-facing recommendations from a finished scan, in the spirit of
/// the warnings a careful operator would want before pressing the button.
pub fn generate_recommendations(
    result: &ScanResult,
    catalog: &[HostApplication],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    let display_name = |id: &str| -> String {
        catalog
            .iter()
            .find(|h| h.id == id)
            .map(|h| h.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    if !result.processes.is_empty() {
        let mut names: Vec<String> = result
            .processes
            .iter()
            .map(|p| display_name(&p.host))
            .collect();
        names.sort();
        names.dedup();
        recommendations.push(format!(
            "Close the following applications before cleanup: {}",
            names.join(", ")
        ));
    }

    let mut hosts_with_data: Vec<String> = result
        .entries
        .iter()
        .filter_map(|e| e.host.clone())
        .collect();
    hosts_with_data.sort();
    hosts_with_data.dedup();

    if hosts_with_data.len() > 1 {
        let names: Vec<String> = hosts_with_data.iter().map(|h| display_name(h)).collect();
        recommendations.push(format!(
            "Plugin data found in multiple host applications: {}. Consider which one to keep data for.",
            names.join(", ")
        ));
    }

    for host in &hosts_with_data {
        let count = result.entries_for_host(host).count();
        if count > 50 {
            recommendations.push(format!(
                "{} has extensive plugin data ({} artifacts). Cleanup may take longer.",
                display_name(host),
                count
            ));
        }
    }

    recommendations
}

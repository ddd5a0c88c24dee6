use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::inventory::{IdentifierHit, IdentifierKind};
use super::tree::ConfigDoc;

lazy_static! {
    pub static ref EMAIL_RE: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap();
    static ref UUID_RE: Regex = Regex::new(
        r"(?i)^([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}|[0-9a-f]{32})$"
    )
    .unwrap();
    static ref ID_KEY_RE: Regex = Regex::new(
        r"(?i)((device|machine|telemetry|client|unique|installation|session|user)[_-]?id|guid|uuid)"
    )
    .unwrap();
    static ref ACCOUNT_KEY_RE: Regex =
        Regex::new(r"(?i)(email|user[_-]?name|login|account|profile|identity)").unwrap();
    static ref TEXT_ID_LINE_RE: Regex = Regex::new(
        r#"(?i)\b((?:device|machine|telemetry|client|unique|installation|session|user)[_-]?id|guid|uuid)\b\s*[=:]\s*"?([0-9a-fA-F-]{8,})"#
    )
    .unwrap();
    static ref TEXT_USER_LINE_RE: Regex =
        Regex::new(r#"(?i)\b(username|user|login|account)\b\s*[=:]\s*"?([^"\s,}{\]]+)"#).unwrap();
}

pub fn is_uuid_like(value: &str) -> bool {
    UUID_RE.is_match(value.trim())
}

/// Does a key or column name look like it names a telemetry/device id?
pub fn id_key_matches(name: &str) -> bool {
    ID_KEY_RE.is_match(name)
}

/// Does a key or column name look account-related?
pub fn account_key_matches(name: &str) -> bool {
    ACCOUNT_KEY_RE.is_match(name)
}

fn plausible_username(value: &str) -> bool {
    value.len() > 2 && !value.chars().all(|c| c.is_ascii_digit()) && !value.contains('@')
}

/// Extract identifier values from a parsed config tree. Emails are matched by
/// value anywhere; UUID and username hits additionally require the owning key
/// to look identifier-ish, which keeps false positives down in documents full
/// of arbitrary strings.
pub fn extract_from_doc(doc: &ConfigDoc) -> Vec<IdentifierHit> {
    let mut hits = Vec::new();

    doc.root.visit_strings(&mut |path, value| {
        for m in EMAIL_RE.find_iter(value) {
            push_unique(
                &mut hits,
                IdentifierHit {
                    kind: IdentifierKind::Email,
                    value: m.as_str().to_string(),
                    location: path.to_string(),
                },
            );
        }

        let key = path.rsplit('.').next().unwrap_or(path);
        if ID_KEY_RE.is_match(key) && is_uuid_like(value) {
            push_unique(
                &mut hits,
                IdentifierHit {
                    kind: IdentifierKind::Uuid,
                    value: value.trim().to_string(),
                    location: path.to_string(),
                },
            );
        } else if ACCOUNT_KEY_RE.is_match(key) && plausible_username(value) {
            push_unique(
                &mut hits,
                IdentifierHit {
                    kind: IdentifierKind::Username,
                    value: value.to_string(),
                    location: path.to_string(),
                },
            );
        }
    });

    hits
}

/// Line-oriented identifier extraction for plain-text and XML-ish artifacts.
pub fn extract_from_text(content: &str) -> Vec<IdentifierHit> {
    let mut hits = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let location = format!("line:{}", idx + 1);

        for m in EMAIL_RE.find_iter(line) {
            push_unique(
                &mut hits,
                IdentifierHit {
                    kind: IdentifierKind::Email,
                    value: m.as_str().to_string(),
                    location: location.clone(),
                },
            );
        }

        if let Some(caps) = TEXT_ID_LINE_RE.captures(line) {
            let value = caps[2].trim().to_string();
            if is_uuid_like(&value) {
                push_unique(
                    &mut hits,
                    IdentifierHit {
                        kind: IdentifierKind::Uuid,
                        value,
                        location: location.clone(),
                    },
                );
                continue;
            }
        }

        if let Some(caps) = TEXT_USER_LINE_RE.captures(line) {
            let value = caps[2].trim().to_string();
            if plausible_username(&value) {
                push_unique(
                    &mut hits,
                    IdentifierHit {
                        kind: IdentifierKind::Username,
                        value,
                        location,
                    },
                );
            }
        }
    }

    hits
}

fn push_unique(hits: &mut Vec<IdentifierHit>, hit: IdentifierHit) {
    if !hits.iter().any(|h| *h == hit) {
        hits.push(hit);
    }
}

/// Generates replacement identifiers for a single cleanup run. The same old
/// value always maps to the same fresh value, every fresh value differs from
/// every old value seen, and no two fresh values collide.
#[derive(Debug, Default)]
pub struct FreshIdPool {
    assigned: HashMap<String, String>,
    used: HashSet<String>,
}

impl FreshIdPool {
    pub fn new() -> Self {
        FreshIdPool::default()
    }

    pub fn replacement_for(&mut self, old: &str) -> String {
        if let Some(existing) = self.assigned.get(old) {
            return existing.clone();
        }

        self.used.insert(old.to_string());

        let hyphenated = old.contains('-');
        let fresh = loop {
            let candidate = if hyphenated {
                Uuid::new_v4().to_string()
            } else {
                Uuid::new_v4().simple().to_string()
            };
            if !self.used.contains(&candidate) {
                break candidate;
            }
        };

        self.used.insert(fresh.clone());
        self.assigned.insert(old.to_string(), fresh.clone());
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::{DocFormat, TreeValue};

    fn doc_from(entries: Vec<(&str, &str)>) -> ConfigDoc {
        ConfigDoc {
            format: DocFormat::Json,
            root: TreeValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), TreeValue::Str(v.to_string())))
                    .collect(),
            ),
        }
    }

    #[test]
    fn doc_extraction_finds_email_uuid_and_username() {
        let doc = doc_from(vec![
            ("email", "user@example.com"),
            ("deviceId", "4f9e2b1c-0d3a-4c8e-9f10-aabbccddeeff"),
            ("username", "alice"),
            ("theme", "dark"),
        ]);

        let hits = extract_from_doc(&doc);
        assert!(hits
            .iter()
            .any(|h| h.kind == IdentifierKind::Email && h.value == "user@example.com"));
        assert!(hits.iter().any(
            |h| h.kind == IdentifierKind::Uuid && h.value.starts_with("4f9e2b1c")
        ));
        assert!(hits
            .iter()
            .any(|h| h.kind == IdentifierKind::Username && h.value == "alice"));
        assert!(!hits.iter().any(|h| h.value == "dark"));
    }

    #[test]
    fn uuid_requires_identifier_looking_key() {
        let doc = doc_from(vec![("color", "4f9e2b1c-0d3a-4c8e-9f10-aabbccddeeff")]);
        let hits = extract_from_doc(&doc);
        assert!(hits.iter().all(|h| h.kind != IdentifierKind::Uuid));
    }

    #[test]
    fn text_extraction_reports_line_numbers() {
        let content = "theme=dark\nmachine_id = 0123456789abcdef0123456789abcdef\ncontact: other@example.com\n";
        let hits = extract_from_text(content);

        let uuid_hit = hits
            .iter()
            .find(|h| h.kind == IdentifierKind::Uuid)
            .unwrap();
        assert_eq!(uuid_hit.location, "line:2");

        let email_hit = hits
            .iter()
            .find(|h| h.kind == IdentifierKind::Email)
            .unwrap();
        assert_eq!(email_hit.value, "other@example.com");
        assert_eq!(email_hit.location, "line:3");
    }

    #[test]
    fn fresh_pool_never_reuses_or_echoes_values() {
        let mut pool = FreshIdPool::new();
        let old_a = "4f9e2b1c-0d3a-4c8e-9f10-aabbccddeeff";
        let old_b = "0123456789abcdef0123456789abcdef";

        let new_a = pool.replacement_for(old_a);
        let new_b = pool.replacement_for(old_b);

        assert_ne!(new_a, old_a);
        assert_ne!(new_b, old_b);
        assert_ne!(new_a, new_b);
        assert!(new_a.contains('-'));
        assert!(!new_b.contains('-'));

        // Same old value maps to the same fresh value within a run.
        assert_eq!(pool.replacement_for(old_a), new_a);
    }
}

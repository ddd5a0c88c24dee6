use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed INI line {0}: {1}")]
    IniLine(usize, String),
}

/// Generic tagged tree shared by all config formats, so identifier matching
/// and value rewriting stay format-agnostic. Maps keep insertion order to
/// leave unrelated keys byte-stable on write-back.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeValue {
    Map(Vec<(String, TreeValue)>),
    List(Vec<TreeValue>),
    Str(String),
    Num(serde_json::Number),
    Bool(bool),
    Null,
}

impl TreeValue {
    /// Visit every string leaf with its dotted key path.
    pub fn visit_strings(&self, f: &mut dyn FnMut(&str, &str)) {
        self.visit_inner("", f);
    }

    fn visit_inner(&self, path: &str, f: &mut dyn FnMut(&str, &str)) {
        match self {
            TreeValue::Map(entries) => {
                for (key, value) in entries {
                    let child = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };
                    value.visit_inner(&child, f);
                }
            }
            TreeValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.visit_inner(&format!("{}[{}]", path, i), f);
                }
            }
            TreeValue::Str(s) => f(path, s),
            _ => {}
        }
    }

    /// Replace occurrences of `old` in string leaves. Whole-value matches are
    /// swapped outright; embedded occurrences are substring-replaced. Returns
    /// the number of leaves changed; zero means the value is already absent.
    pub fn replace_str(&mut self, old: &str, new: &str) -> usize {
        match self {
            TreeValue::Map(entries) => entries
                .iter_mut()
                .map(|(_, v)| v.replace_str(old, new))
                .sum(),
            TreeValue::List(items) => items.iter_mut().map(|v| v.replace_str(old, new)).sum(),
            TreeValue::Str(s) => {
                if s == old {
                    *s = new.to_string();
                    1
                } else if s.contains(old) {
                    *s = s.replace(old, new);
                    1
                } else {
                    0
                }
            }
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Json,
    Ini,
    /// Fallback for XML and anything else text-like; the whole file is one
    /// string leaf and mutation is plain substring replacement.
    Text,
}

impl DocFormat {
    pub fn from_path(path: &Path) -> DocFormat {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => DocFormat::Json,
            Some("ini") | Some("cfg") | Some("conf") | Some("config") => DocFormat::Ini,
            _ => DocFormat::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigDoc {
    pub format: DocFormat,
    pub root: TreeValue,
}

impl ConfigDoc {
    pub fn read(path: &Path) -> Result<Self, TreeError> {
        let content = fs::read_to_string(path)?;
        let format = DocFormat::from_path(path);

        let root = match format {
            DocFormat::Json => {
                let value: serde_json::Value = serde_json::from_str(&content)?;
                from_json(value)
            }
            DocFormat::Ini => parse_ini(&content)?,
            DocFormat::Text => TreeValue::Str(content),
        };

        Ok(ConfigDoc { format, root })
    }

    pub fn write(&self, path: &Path) -> Result<(), TreeError> {
        let content = match self.format {
            DocFormat::Json => {
                let value = to_json(&self.root);
                let mut text = serde_json::to_string_pretty(&value)?;
                text.push('\n');
                text
            }
            DocFormat::Ini => render_ini(&self.root),
            DocFormat::Text => match &self.root {
                TreeValue::Str(s) => s.clone(),
                _ => String::new(),
            },
        };

        fs::write(path, content)?;
        Ok(())
    }

    pub fn replace_value(&mut self, old: &str, new: &str) -> usize {
        self.root.replace_str(old, new)
    }
}

fn from_json(value: serde_json::Value) -> TreeValue {
    match value {
        serde_json::Value::Object(map) => {
            TreeValue::Map(map.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
        serde_json::Value::Array(items) => {
            TreeValue::List(items.into_iter().map(from_json).collect())
        }
        serde_json::Value::String(s) => TreeValue::Str(s),
        serde_json::Value::Number(n) => TreeValue::Num(n),
        serde_json::Value::Bool(b) => TreeValue::Bool(b),
        serde_json::Value::Null => TreeValue::Null,
    }
}

fn to_json(value: &TreeValue) -> serde_json::Value {
    match value {
        TreeValue::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
        TreeValue::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        TreeValue::Str(s) => serde_json::Value::String(s.clone()),
        TreeValue::Num(n) => serde_json::Value::Number(n.clone()),
        TreeValue::Bool(b) => serde_json::Value::Bool(*b),
        TreeValue::Null => serde_json::Value::Null,
    }
}

fn parse_ini(content: &str) -> Result<TreeValue, TreeError> {
    let mut top: Vec<(String, TreeValue)> = Vec::new();
    let mut current_section: Option<(String, Vec<(String, TreeValue)>)> = None;

    for (idx, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            if let Some((name, entries)) = current_section.take() {
                top.push((name, TreeValue::Map(entries)));
            }
            current_section = Some((line[1..line.len() - 1].trim().to_string(), Vec::new()));
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .or_else(|| line.split_once(':'))
            .ok_or_else(|| TreeError::IniLine(idx + 1, raw_line.to_string()))?;

        let pair = (
            key.trim().to_string(),
            TreeValue::Str(value.trim().to_string()),
        );

        match current_section.as_mut() {
            Some((_, entries)) => entries.push(pair),
            None => top.push(pair),
        }
    }

    if let Some((name, entries)) = current_section.take() {
        top.push((name, TreeValue::Map(entries)));
    }

    Ok(TreeValue::Map(top))
}

fn render_ini(root: &TreeValue) -> String {
    let mut out = String::new();

    if let TreeValue::Map(entries) = root {
        for (key, value) in entries {
            match value {
                TreeValue::Map(section) => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&format!("[{}]\n", key));
                    for (k, v) in section {
                        out.push_str(&format!("{} = {}\n", k, render_scalar(v)));
                    }
                }
                other => out.push_str(&format!("{} = {}\n", key, render_scalar(other))),
            }
        }
    }

    out
}

fn render_scalar(value: &TreeValue) -> String {
    match value {
        TreeValue::Str(s) => s.clone(),
        TreeValue::Num(n) => n.to_string(),
        TreeValue::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Linux,
    MacOs,
    Windows,
}

impl OperatingSystem {
    pub fn current() -> OperatingSystem {
        if cfg!(target_os = "windows") {
            OperatingSystem::Windows
        } else if cfg!(target_os = "macos") {
            OperatingSystem::MacOs
        } else {
            OperatingSystem::Linux
        }
    }
}

/// A process-name heuristic. `exact` patterns must match the whole executable
/// name; otherwise a case-insensitive substring match is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPattern {
    pub pattern: String,
    pub exact: bool,
}

impl ProcessPattern {
    pub fn substring(pattern: &str) -> Self {
        ProcessPattern {
            pattern: pattern.to_string(),
            exact: false,
        }
    }

    pub fn exact(pattern: &str) -> Self {
        ProcessPattern {
            pattern: pattern.to_string(),
            exact: true,
        }
    }

    pub fn matches(&self, exe_name: &str) -> bool {
        let name = exe_name.to_lowercase();
        let pat = self.pattern.to_lowercase();
        if self.exact {
            name == pat
        } else {
            name.contains(&pat)
        }
    }
}

/// One candidate data root for a host on one OS. Templates carry `${VAR}`
/// placeholders resolved against the caller's environment. `keyword_scoped`
/// roots are broad app-data directories where only subdirectories whose name
/// matches the plugin keyword are entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootTemplate {
    pub os: OperatingSystem,
    pub template: String,
    #[serde(default)]
    pub keyword_scoped: bool,
}

impl RootTemplate {
    pub fn scoped(os: OperatingSystem, template: &str) -> Self {
        RootTemplate {
            os,
            template: template.to_string(),
            keyword_scoped: false,
        }
    }

    pub fn keyword(os: OperatingSystem, template: &str) -> Self {
        RootTemplate {
            os,
            template: template.to_string(),
            keyword_scoped: true,
        }
    }
}

/// An editor/IDE that may embed the target plugin. Immutable; scans reference
/// entries by id and never mutate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostApplication {
    pub id: String,
    pub name: String,
    pub process_patterns: Vec<ProcessPattern>,
    pub roots: Vec<RootTemplate>,
}

/// Pseudo-host id for standalone installs with no embedding editor.
pub const STANDALONE: &str = "standalone";

impl HostApplication {
    pub fn is_standalone(&self) -> bool {
        self.id == STANDALONE
    }
}

/// The builtin host table. Loaded once at startup and passed explicitly into
/// discovery and process inspection so tests can substitute synthetic tables.
pub fn builtin_catalog() -> Vec<HostApplication> {
    use OperatingSystem::{Linux, MacOs, Windows};

    vec![
        HostApplication {
            id: "vscode".to_string(),
            name: "Visual Studio Code".to_string(),
            process_patterns: vec![
                ProcessPattern::exact("code"),
                ProcessPattern::substring("code - insiders"),
                ProcessPattern::exact("code.exe"),
            ],
            roots: vec![
                RootTemplate::scoped(Linux, "${HOME}/.config/Code/User"),
                RootTemplate::scoped(Linux, "${HOME}/.vscode/extensions"),
                RootTemplate::scoped(MacOs, "${HOME}/Library/Application Support/Code/User"),
                RootTemplate::scoped(MacOs, "${HOME}/.vscode/extensions"),
                RootTemplate::scoped(Windows, "${APPDATA}/Code/User"),
                RootTemplate::scoped(Windows, "${USERPROFILE}/.vscode/extensions"),
            ],
        },
        HostApplication {
            id: "vscodium".to_string(),
            name: "VSCodium".to_string(),
            process_patterns: vec![
                ProcessPattern::exact("codium"),
                ProcessPattern::exact("vscodium.exe"),
            ],
            roots: vec![
                RootTemplate::scoped(Linux, "${HOME}/.config/VSCodium/User"),
                RootTemplate::scoped(Linux, "${HOME}/.vscode-oss/extensions"),
                RootTemplate::scoped(MacOs, "${HOME}/Library/Application Support/VSCodium/User"),
                RootTemplate::scoped(Windows, "${APPDATA}/VSCodium/User"),
            ],
        },
        HostApplication {
            id: "cursor".to_string(),
            name: "Cursor".to_string(),
            process_patterns: vec![
                ProcessPattern::exact("cursor"),
                ProcessPattern::exact("cursor.exe"),
            ],
            roots: vec![
                RootTemplate::scoped(Linux, "${HOME}/.config/Cursor/User"),
                RootTemplate::scoped(MacOs, "${HOME}/Library/Application Support/Cursor/User"),
                RootTemplate::scoped(Windows, "${APPDATA}/Cursor/User"),
            ],
        },
        HostApplication {
            id: "jetbrains".to_string(),
            name: "JetBrains IDEs".to_string(),
            process_patterns: vec![
                ProcessPattern::substring("idea"),
                ProcessPattern::substring("pycharm"),
                ProcessPattern::substring("webstorm"),
                ProcessPattern::substring("goland"),
            ],
            roots: vec![
                RootTemplate::keyword(Linux, "${HOME}/.config/JetBrains"),
                RootTemplate::keyword(Linux, "${HOME}/.local/share/JetBrains"),
                RootTemplate::keyword(MacOs, "${HOME}/Library/Application Support/JetBrains"),
                RootTemplate::keyword(Windows, "${APPDATA}/JetBrains"),
            ],
        },
        HostApplication {
            id: STANDALONE.to_string(),
            name: "Standalone install".to_string(),
            process_patterns: vec![ProcessPattern::substring("augment")],
            roots: vec![
                RootTemplate::keyword(Linux, "${HOME}/.config"),
                RootTemplate::keyword(Linux, "${HOME}/.local/share"),
                RootTemplate::keyword(MacOs, "${HOME}/Library/Application Support"),
                RootTemplate::keyword(MacOs, "${HOME}/Library/Preferences"),
                RootTemplate::keyword(Windows, "${APPDATA}"),
                RootTemplate::keyword(Windows, "${LOCALAPPDATA}"),
            ],
        },
    ]
}

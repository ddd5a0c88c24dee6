use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;
use tracing::debug;

use super::hosts::{HostApplication, OperatingSystem, RootTemplate};

lazy_static! {
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
}

/// Environment lookup used for placeholder expansion. Tests pass synthetic
/// closures; production code uses [`os_env`].
pub type EnvLookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// A root template with its placeholders expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoot {
    pub path: PathBuf,
    pub keyword_scoped: bool,
}

/// Expand the candidate roots of one host for one OS. Pure lookup, no
/// filesystem I/O. Unknown host/OS combinations and templates referencing
/// unset variables resolve to nothing — unknown is not an error, it is
/// "nothing known to scan there".
pub fn resolve_roots(
    host: &HostApplication,
    os: OperatingSystem,
    env: &EnvLookup,
) -> Vec<ResolvedRoot> {
    let mut roots = Vec::new();

    for template in host.roots.iter().filter(|r| r.os == os) {
        match expand(template, env) {
            Some(path) => roots.push(ResolvedRoot {
                path,
                keyword_scoped: template.keyword_scoped,
            }),
            None => debug!(
                host = %host.id,
                template = %template.template,
                "skipping root template with unset variable"
            ),
        }
    }

    roots
}

fn expand(template: &RootTemplate, env: &EnvLookup) -> Option<PathBuf> {
    let mut missing = false;
    let expanded = PLACEHOLDER_RE.replace_all(&template.template, |caps: &regex::Captures| {
        match env(&caps[1]) {
            Some(value) => value,
            None => {
                missing = true;
                String::new()
            }
        }
    });

    if missing {
        None
    } else {
        Some(PathBuf::from(expanded.into_owned()))
    }
}

/// Real-environment lookup, with `HOME` falling back to the platform home
/// directory when the variable itself is unset.
pub fn os_env(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(value) => Some(value),
        Err(_) if var == "HOME" => dirs::home_dir().map(|p| p.display().to_string()),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::hosts::ProcessPattern;

    fn host_with(roots: Vec<RootTemplate>) -> HostApplication {
        HostApplication {
            id: "test".to_string(),
            name: "Test".to_string(),
            process_patterns: vec![ProcessPattern::exact("test")],
            roots,
        }
    }

    fn env(var: &str) -> Option<String> {
        match var {
            "HOME" => Some("/home/alice".to_string()),
            _ => None,
        }
    }

    #[test]
    fn resolves_placeholders_in_order() {
        let host = host_with(vec![
            RootTemplate::scoped(OperatingSystem::Linux, "${HOME}/.config/Code/User"),
            RootTemplate::scoped(OperatingSystem::Linux, "${HOME}/.vscode/extensions"),
        ]);

        let roots = resolve_roots(&host, OperatingSystem::Linux, &env);
        assert_eq!(
            roots.iter().map(|r| r.path.clone()).collect::<Vec<_>>(),
            vec![
                PathBuf::from("/home/alice/.config/Code/User"),
                PathBuf::from("/home/alice/.vscode/extensions"),
            ]
        );
    }

    #[test]
    fn unknown_os_yields_empty_not_error() {
        let host = host_with(vec![RootTemplate::scoped(
            OperatingSystem::Linux,
            "${HOME}/.config/Code/User",
        )]);

        let roots = resolve_roots(&host, OperatingSystem::Windows, &env);
        assert!(roots.is_empty());
    }

    #[test]
    fn unset_variable_skips_template_silently() {
        let host = host_with(vec![
            RootTemplate::scoped(OperatingSystem::Linux, "${APPDATA}/Code/User"),
            RootTemplate::scoped(OperatingSystem::Linux, "${HOME}/.config/Code/User"),
        ]);

        let roots = resolve_roots(&host, OperatingSystem::Linux, &env);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].path, PathBuf::from("/home/alice/.config/Code/User"));
    }

    #[test]
    fn keyword_scoped_flag_survives_resolution() {
        let host = host_with(vec![RootTemplate::keyword(
            OperatingSystem::Linux,
            "${HOME}/.config",
        )]);

        let roots = resolve_roots(&host, OperatingSystem::Linux, &env);
        assert!(roots[0].keyword_scoped);
    }
}

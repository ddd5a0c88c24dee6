pub mod hosts;
pub mod resolve;

pub use hosts::{builtin_catalog, HostApplication, OperatingSystem, ProcessPattern, RootTemplate, STANDALONE};
pub use resolve::{os_env, resolve_roots, EnvLookup, ResolvedRoot};

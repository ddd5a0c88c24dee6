pub mod db;
pub mod engine;
pub mod rules;

pub use db::{inspect_database, DbInspection};
pub use engine::{generate_recommendations, DiscoveryEngine, ScanError, ScanOptions};
pub use rules::{classify, is_workspace_dir, RiskPolicy};

pub mod identifiers;
pub mod inventory;
pub mod tree;

pub use identifiers::{extract_from_doc, extract_from_text, FreshIdPool};
pub use inventory::{
    ArtifactKind, IdentifierHit, IdentifierKind, InventoryEntry, RiskTier, RunningProcessMatch,
    ScanResult, ScanWarning, TableHit,
};
pub use tree::{ConfigDoc, DocFormat, TreeError, TreeValue};

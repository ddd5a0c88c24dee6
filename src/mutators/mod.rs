pub mod config_edit;
pub mod db_edit;
pub mod runner;
pub mod workspace;

pub use config_edit::{replace_in_config, EditOutcome};
pub use db_edit::{delete_exact_rows, delete_matching_rows, vacuum, DbEditError};
pub use runner::{cancel_flag, execute, ActionOutcome, CancelFlag, OutcomeStatus, RunReport};
pub use workspace::{remove_path, RemoveOutcome};

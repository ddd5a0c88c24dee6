pub mod backup;
pub mod catalog;
pub mod clean;
pub mod config;
pub mod core;
pub mod discovery;
pub mod logger;
pub mod mutators;
pub mod planner;
pub mod process;
pub mod processes;
pub mod report;
pub mod restore;
pub mod scan;

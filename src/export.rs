pub mod config;
pub mod messages;
pub mod orchestrator;
pub mod sources;

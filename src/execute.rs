pub mod cancel;
pub mod engine;
pub mod native;
pub mod runner;

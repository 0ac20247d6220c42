pub mod frame;
pub mod heuristics;

pub mod geometry;
pub mod mask;

pub mod score;
pub mod suggest;

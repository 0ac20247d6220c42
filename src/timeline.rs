pub mod classify;
pub mod clip;
pub mod edit;
pub mod session;
pub mod upload;

pub mod build;
pub mod lock;

//! CLI command implementations

pub mod build;
pub mod config;
pub mod init;
pub mod manifest;
pub mod store;

pub use build::execute as build;
pub use config::execute as config;
pub use init::execute as init;
pub use manifest::execute as manifest;
pub use store::execute as store;

pub mod config;
pub mod error;
pub mod format;
pub mod handles;
pub mod state;

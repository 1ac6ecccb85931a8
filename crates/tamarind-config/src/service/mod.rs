pub mod config;
pub mod namespace;
pub mod watcher;

//! SeaORM entity definitions

pub mod prelude;

pub mod config_history;
pub mod config_info;
pub mod namespace_info;
pub mod token_blacklist;
pub mod token_usage;
pub mod users;

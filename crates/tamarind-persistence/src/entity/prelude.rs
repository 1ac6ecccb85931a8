pub use super::config_history::Entity as ConfigHistory;
pub use super::config_info::Entity as ConfigInfo;
pub use super::namespace_info::Entity as NamespaceInfo;
pub use super::token_blacklist::Entity as TokenBlacklist;
pub use super::token_usage::Entity as TokenUsage;
pub use super::users::Entity as Users;

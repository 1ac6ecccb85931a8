//! Authentication service implementations

pub mod password;
pub mod session;
pub mod sweeper;
pub mod token;
pub mod user;

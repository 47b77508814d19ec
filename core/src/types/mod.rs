pub mod config;
pub mod identity;
pub mod layout;
pub mod session;

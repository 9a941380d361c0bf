//! Command surface of the Warden RBAC engine.

pub mod command;
pub mod config;
pub mod dispatch;
pub mod serve;

pub use command::Command;
pub use config::ServerConfig;
pub use dispatch::Dispatcher;
pub use serve::serve;

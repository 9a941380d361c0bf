//! Domain models for Warden.
//!
//! These are the core types shared across all crates.

pub mod app_scope;
pub mod permission;
pub mod role;
pub mod role_assignment;

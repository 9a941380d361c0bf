//! Warden Core: domain models, list filters, repository traits and the
//! permission evaluator.
//!
//! Nothing in this crate talks to a database. Storage backends implement
//! the traits in [`repository`]; the evaluator in [`evaluator`] is generic
//! over them.

pub mod error;
pub mod evaluator;
pub mod filter;
pub mod models;
pub mod repository;

pub use error::{WardenError, WardenResult};
pub use evaluator::{GLOBAL_SCOPE_TOKEN, PUBLIC_PERMISSION, PermissionCheck, PermissionEvaluator};

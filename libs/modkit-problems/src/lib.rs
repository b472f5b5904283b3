//! RFC 7807 problem details for HTTP APIs
//!
//! This crate provides a single value type, [`Problem`], plus everything needed
//! to emit it:
//! - the extension guard (`Problem::set`): extension members need a problem type
//!   other than `about:blank`
//! - flattening to and from one JSON or XML object (`Problem::marshal`,
//!   `Problem::parse`)
//! - rendering onto an HTTP response (`Problem::render`, optional axum support)
//! - a catalog of canned API problems and a `validator` adapter
//!
//! Failures of these operations are themselves reported as a `Problem`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
// Fallible operations report a `Problem`, which outgrows clippy's error size budget.
#![allow(clippy::result_large_err)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod problem;
pub mod render;
pub mod validation;
mod xml;

// Re-export commonly used types
pub use catalog::ErrDef;
pub use config::ProblemsConfig;
pub use format::Format;
pub use problem::{
    ABOUT_BLANK, APPLICATION_PROBLEM_JSON, APPLICATION_PROBLEM_XML, Problem, reason_phrase,
};
pub use render::ResponseSink;
pub use validation::{FieldTranslator, Issue, ValidationParam};
pub use xml::PROBLEM_NAMESPACE;


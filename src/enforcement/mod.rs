//! Repository Policy Enforcement
//!
//! Runs the governance checks against every repository of an organization:
//! - Built-in license, vulnerability alert and branch protection checks
//! - Custom checks, in registration order
//! - Per-repository reporting and notification

pub mod builtin;
pub mod runner;

pub use runner::PolicyRunner;

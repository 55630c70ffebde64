//! Venmail E2E CLI
//!
//! Command-line front end for running the end-to-end suites and for
//! inspecting what a run would target.

pub mod commands;
pub mod output;
pub mod settings;

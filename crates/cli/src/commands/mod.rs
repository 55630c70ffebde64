//! CLI Commands

pub mod cleanup;
pub mod config;
pub mod domains;
pub mod env;
pub mod run;
pub mod validate;

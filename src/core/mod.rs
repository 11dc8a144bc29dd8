//! core
//!
//! Core domain types and configuration for repolint.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, AheadBehind
//! - [`config`] - Configuration schema and loading

pub mod config;
pub mod types;

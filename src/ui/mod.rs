//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Report rendering (text and JSON) and verbosity
//!
//! All stdout writes go through this module so the text and JSON formats
//! stay in one place.

pub mod output;

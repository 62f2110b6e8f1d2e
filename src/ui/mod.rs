//! ui
//!
//! User-facing terminal output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All command output goes through this module so quiet mode and stream
//! selection (stdout for results, stderr for everything else) are handled
//! in one place.

pub mod output;

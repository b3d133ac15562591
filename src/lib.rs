//! hfpgw Library
//!
//! Runs the gateway engine against an NDJSON bridge on stdin/stdout.

pub mod headless;

// Re-export main entry point
pub use headless::run_headless;

//! Shared infrastructure for the tessera crates
//!
//! Currently this is the logging bootstrap and the helpers that keep key
//! identifiers and KMS URIs out of log output.

pub mod logging;

pub use logging::LoggingTransformer;

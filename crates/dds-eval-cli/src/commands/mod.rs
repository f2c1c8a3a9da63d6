//! Subcommand implementations.

pub mod compare;
pub mod fetch;
pub mod flatten;

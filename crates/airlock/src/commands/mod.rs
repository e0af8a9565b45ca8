//! Command implementations for the airlock CLI.

pub mod emit;
pub mod fetch;

//! CLI subcommands.

pub mod migrate;
pub mod report;
pub mod sync;

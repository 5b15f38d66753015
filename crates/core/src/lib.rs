//! Stockpilot Core - Shared types library.
//!
//! This crate provides common types used across the Stockpilot components:
//! - `server` - Report/sync service (axum binary)
//! - `cli` - Command-line tools for migrations and report polling
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, shop domains, and job status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

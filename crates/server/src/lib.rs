//! Stockpilot report server.
//!
//! Serves markdown and restocking reports for a Shopify store. Reports join
//! three data sources:
//!
//! - Order history from the Shopify Admin API (GraphQL)
//! - The variant catalog from the same API
//! - Purchase-order receipt dates cached locally from the Stocky API
//!
//! The expensive part, scanning a month of orders, cannot fit in one
//! request, so it runs as a client-driven resumable job: each poll executes
//! one budgeted chunk and persists its cursor and accumulator before
//! answering. See [`jobs`] for the chunk machinery.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod shopify;
pub mod state;
pub mod stocky;

pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;

//! Long-running work split into client-driven chunks.
//!
//! Nothing here runs in the background. Every chunk executes inside a
//! request handler, bounded by a wall-clock budget, with its state persisted
//! so the next request can pick up where this one stopped.

pub mod accumulator;
pub mod full_sync;
pub mod report;
pub mod report_scan;

pub use accumulator::{SalesAccumulator, VariantSales};
pub use full_sync::SyncOutcome;
pub use report::{ReportPayload, ReportRow};
pub use report_scan::ScanOutcome;

//! Shared newtype wrappers.

pub mod id;
pub mod shop;
pub mod status;

pub use id::{JobId, Sku, VariantId};
pub use shop::{ShopDomain, ShopDomainError};
pub use status::JobStatus;

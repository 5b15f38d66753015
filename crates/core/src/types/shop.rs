//! Shop domain newtype with validation.
//!
//! Every persisted row and every upstream call in this system is scoped by
//! the shop it belongs to, so the tenant key gets its own validated type
//! instead of a bare `String`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when validating a shop domain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShopDomainError {
    /// The domain was empty.
    #[error("shop domain must not be empty")]
    Empty,

    /// The domain contained characters outside `[a-z0-9.-]`.
    #[error("shop domain contains invalid character: {0:?}")]
    InvalidCharacter(char),

    /// The domain is not a `*.myshopify.com` hostname.
    #[error("shop domain must end in .myshopify.com: {0}")]
    NotMyshopify(String),
}

/// A validated `*.myshopify.com` shop domain.
///
/// Used as the tenant key for all persisted state and as the host for
/// Admin API calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Parse and validate a shop domain.
    ///
    /// Lowercases the input and requires a `*.myshopify.com` hostname made
    /// of `[a-z0-9.-]` characters.
    ///
    /// # Errors
    ///
    /// Returns `ShopDomainError` if the domain is empty, contains invalid
    /// characters, or is not a `myshopify.com` subdomain.
    pub fn parse(input: &str) -> Result<Self, ShopDomainError> {
        let domain = input.trim().to_ascii_lowercase();

        if domain.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        if let Some(c) = domain
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '.' || *c == '-'))
        {
            return Err(ShopDomainError::InvalidCharacter(c));
        }

        if !domain.ends_with(".myshopify.com") || domain.len() <= ".myshopify.com".len() {
            return Err(ShopDomainError::NotMyshopify(domain));
        }

        Ok(Self(domain))
    }

    /// Get the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "sqlite")]
impl sqlx::Type<sqlx::Sqlite> for ShopDomain {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

#[cfg(feature = "sqlite")]
impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for ShopDomain {
    fn decode(
        value: sqlx::sqlite::SqliteValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let domain = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(domain))
    }
}

#[cfg(feature = "sqlite")]
impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for ShopDomain {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        buf.push(sqlx::sqlite::SqliteArgumentValue::Text(
            std::borrow::Cow::Owned(self.0.clone()),
        ));
        Ok(sqlx::encode::IsNull::No)
    }
}

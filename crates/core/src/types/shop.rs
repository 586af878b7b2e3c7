//! Shop domain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("shop domain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[a-z0-9.-]`.
    #[error("shop domain contains invalid character: {0:?}")]
    InvalidCharacter(char),
    /// The input has no dot, so it cannot be a domain.
    #[error("shop domain must contain a dot")]
    MissingDot,
}

/// A merchant shop domain as delivered by Shopify.
///
/// Shopify identifies shops by their `*.myshopify.com` domain in webhook
/// headers and OAuth callbacks (e.g. `store1.myshopify.com`). This type
/// validates the structure without pinning the suffix, since development
/// stores and legacy deliveries can carry other hostnames.
///
/// ## Constraints
///
/// - Length: 1-254 characters
/// - ASCII letters, digits, hyphens and dots only (normalized to lowercase)
/// - Must contain at least one dot
///
/// ## Examples
///
/// ```
/// use magic_checkout_core::ShopDomain;
///
/// assert!(ShopDomain::parse("store1.myshopify.com").is_ok());
/// assert!(ShopDomain::parse("").is_err());            // empty
/// assert!(ShopDomain::parse("store1").is_err());      // no dot
/// assert!(ShopDomain::parse("sto re1.com").is_err()); // whitespace
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Maximum length of a shop domain (RFC 1035 limit).
    pub const MAX_LENGTH: usize = 254;

    /// Parse a `ShopDomain` from a string.
    ///
    /// The input is normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Is empty
    /// - Is longer than 254 characters
    /// - Contains characters outside `[a-z0-9.-]`
    /// - Does not contain a dot
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        if s.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(ShopDomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let normalized = s.to_ascii_lowercase();

        if let Some(c) = normalized
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-')
        {
            return Err(ShopDomainError::InvalidCharacter(c));
        }

        if !normalized.contains('.') {
            return Err(ShopDomainError::MissingDot);
        }

        Ok(Self(normalized))
    }

    /// Returns the shop domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ShopDomain` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the shop handle (the label before the first dot).
    ///
    /// For `store1.myshopify.com` this is `store1`.
    #[must_use]
    pub fn handle(&self) -> &str {
        self.0.split('.').next().unwrap_or("")
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ShopDomain {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ShopDomain {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ShopDomain {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

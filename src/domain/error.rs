//! Domain validation errors for core domain types.
//!
//! These errors are returned by `try_new` constructors that validate inputs.
//!
//! # Examples
//!
//! ```
//! use sharpline::domain::error::DomainError;
//! use sharpline::domain::money::Odds;
//! use rust_decimal_macros::dec;
//!
//! let result = Odds::try_new(dec!(0.95));
//! assert!(matches!(result, Err(DomainError::OddsOutOfRange { .. })));
//! ```

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Decimal odds must exceed 1.0 (a stake must be able to win something).
    #[error("decimal odds must be greater than 1, got {odds}")]
    OddsOutOfRange {
        /// The invalid odds that were provided.
        odds: rust_decimal::Decimal,
    },

    /// A catalog refresh produced no entries at all.
    #[error("catalog is empty")]
    EmptyCatalog,

    /// Opportunities must reference at least one leg.
    #[error("legs cannot be empty")]
    EmptyLegs,
}

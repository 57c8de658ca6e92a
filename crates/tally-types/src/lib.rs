//! Tally Types - Value types shared by the Tally governance crates.
//!
//! This crate provides:
//! - Addresses (20-byte, Bech32m encoded)
//! - Amounts (unsigned native-unit quantities with checked arithmetic)

pub mod address;
pub mod amount;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use amount::Amount;
pub use error::TypesError;

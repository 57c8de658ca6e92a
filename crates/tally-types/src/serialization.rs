//! Serde implementations for tally-types.
//!
//! Addresses serialize as Bech32m strings. Amounts serialize as decimal
//! strings so values above 2^53 survive JSON, and deserialize from either a
//! string or a plain non-negative integer.

use crate::{Address, Amount};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(Amount::new(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from)
            .map_err(|_| E::custom(format!("negative amount: {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holding {
        holder: Address,
        amount: Amount,
    }

    #[test]
    fn test_json_uses_strings() {
        let holding = Holding {
            holder: Address::from_bytes([3u8; 20]),
            amount: Amount::new(u128::MAX),
        };
        let json = serde_json::to_string(&holding).unwrap();
        assert!(json.contains("tally1"));
        assert!(json.contains(&format!("\"{}\"", u128::MAX)));

        let back: Holding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, holding);
    }

    #[test]
    fn test_toml_accepts_integers_and_hex_addresses() {
        let src = r#"
            holder = "0x0101010101010101010101010101010101010101"
            amount = 250
        "#;
        let holding: Holding = toml::from_str(src).unwrap();
        assert_eq!(holding.holder, Address::from_bytes([1u8; 20]));
        assert_eq!(holding.amount, Amount::from(250u64));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let src = r#"
            holder = "0x0101010101010101010101010101010101010101"
            amount = -1
        "#;
        assert!(toml::from_str::<Holding>(src).is_err());
    }
}

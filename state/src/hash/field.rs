use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use num_traits::Num;
use thiserror::Error;

use crate::hash::HASH_LEN;
use crate::types::HashBytes;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError
{
    #[error("`{0}` is not a decimal integer")]
    NotDecimal(String),

    #[error("`{0}` is not below the scalar field modulus")]
    NotInField(String),
}

/// Decimal rendering of a big-endian field element.
pub fn to_decimal(bytes: &HashBytes) -> String
{
    BigUint::from_bytes_be(bytes).to_string()
}

/// Parses a decimal string into a canonical big-endian field element.
pub fn from_decimal(value: &str) -> Result<HashBytes, FieldError>
{
    // Only the canonical rendering is accepted, so leading zeros are rejected.
    let canonical = value.len() == 1 || !value.starts_with('0');
    if value.is_empty() || !canonical || !value.bytes().all(|b| b.is_ascii_digit())
    {
        Err(FieldError::NotDecimal(value.to_string()))?
    }

    let number = BigUint::from_str_radix(value, 10)
        .map_err(|_| FieldError::NotDecimal(value.to_string()))?;

    let modulus = BigUint::from_bytes_be(&Fr::MODULUS.to_bytes_be());
    if number >= modulus { Err(FieldError::NotInField(value.to_string()))? }

    let digits = number.to_bytes_be();
    let mut bytes = [0u8; HASH_LEN];
    bytes[HASH_LEN - digits.len()..].copy_from_slice(&digits);

    Ok(bytes)
}

pub fn from_u64(value: u64) -> HashBytes
{
    let mut bytes = [0u8; HASH_LEN];
    bytes[HASH_LEN - 8..].copy_from_slice(&value.to_be_bytes());
    bytes
}

/// Serde adapter storing a field element as a decimal string.
pub mod decimal
{
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::types::HashBytes;

    pub fn serialize<S: Serializer>(bytes: &HashBytes, serializer: S) -> Result<S::Ok, S::Error>
    {
        serializer.serialize_str(&super::to_decimal(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<HashBytes, D::Error>
    {
        let value = String::deserialize(deserializer)?;
        super::from_decimal(&value).map_err(D::Error::custom)
    }
}

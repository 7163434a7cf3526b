pub mod field;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};

use crate::types::HashBytes;

pub use field::{FieldError, from_decimal, from_u64, to_decimal};
pub use light_poseidon::PoseidonError;

pub const HASH_LEN: usize = 32;

/// Poseidon hash with circom parameters over big-endian encoded field elements.
pub fn hash(inputs: &[HashBytes]) -> Result<HashBytes, PoseidonError>
{
    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len())?;

    let fr_inputs: Vec<Fr> = inputs
        .iter()
        .map(|bytes| Fr::from_be_bytes_mod_order(bytes))
        .collect();

    Ok(fr_to_bytes(hasher.hash(&fr_inputs)?))
}

pub fn hash_left_right(left: HashBytes, right: HashBytes) -> Result<HashBytes, PoseidonError>
{
    hash(&[left, right])
}

pub fn hash4(inputs: [HashBytes; 4]) -> Result<HashBytes, PoseidonError>
{
    hash(&inputs)
}

pub fn hash5(inputs: [HashBytes; 5]) -> Result<HashBytes, PoseidonError>
{
    hash(&inputs)
}

/// Big-endian encoding of a scalar, left padded to [`HASH_LEN`] bytes.
pub fn fr_to_bytes(element: Fr) -> HashBytes
{
    let result = element.into_bigint().to_bytes_be();

    let mut bytes = [0u8; HASH_LEN];
    let offset = HASH_LEN.saturating_sub(result.len());
    bytes[offset..].copy_from_slice(&result[result.len().saturating_sub(HASH_LEN)..]);

    bytes
}

use core::fmt;

use blake_hash::{Blake512, Digest};
use num_bigint::BigUint;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::hash::{self, PoseidonError, HASH_LEN};
use crate::poll::curve::{Point, BASE8};
use crate::types::HashBytes;

const PRIVATE_KEY_PREFIX: &str = "macisk.";
const PUBLIC_KEY_PREFIX: &str = "macipk.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError
{
    /// The key does not carry the expected prefix or encoding.
    #[error("malformed key: {0}")]
    Malformed(String),

    /// The private key is all zeroes.
    #[error("private key is zero")]
    ZeroKey,
}

/// A public key used to facillitate secret sharing between participants and coordinators.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct PublicKey
{
    /// A 256-bit x-coordinate of the public key.
    pub x: HashBytes,

    /// A 256-bit y-coordinate of the public key.
    pub y: HashBytes
}

impl PublicKey
{
    /// Poseidon commitment to the key, as stored by poll contracts.
    pub fn hash(&self) -> Result<HashBytes, PoseidonError>
    {
        hash::hash_left_right(self.x, self.y)
    }

    pub fn is_on_curve(&self) -> bool
    {
        Point::from_bytes(&self.x, &self.y).is_on_curve()
    }

    /// `macipk.` followed by the hex of the packed point.
    pub fn serialize(&self) -> String
    {
        let packed = Point::from_bytes(&self.x, &self.y).pack();
        format!("{}{}", PUBLIC_KEY_PREFIX, hex::encode(packed))
    }

    pub fn parse(value: &str) -> Result<PublicKey, KeyError>
    {
        let bytes = decode_prefixed(value.trim(), PUBLIC_KEY_PREFIX, HASH_LEN)?;

        let mut packed = [0u8; HASH_LEN];
        packed.copy_from_slice(&bytes);

        let point = Point::unpack(&packed).ok_or_else(|| KeyError::Malformed("not a point on the curve".into()))?;

        Ok(PublicKey::from(point))
    }
}

impl From<Point> for PublicKey
{
    fn from(point: Point) -> Self
    {
        let (x, y) = point.to_bytes();
        PublicKey { x, y }
    }
}

/// Raw private key bytes. They are wiped once the key is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; HASH_LEN]);

impl PrivateKey
{
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Result<PrivateKey, KeyError>
    {
        if bytes.iter().all(|byte| *byte == 0) { Err(KeyError::ZeroKey)? }
        Ok(PrivateKey(bytes))
    }

    pub fn parse(value: &str) -> Result<PrivateKey, KeyError>
    {
        let mut decoded = decode_prefixed(value.trim(), PRIVATE_KEY_PREFIX, HASH_LEN)?;

        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();

        Self::from_bytes(bytes)
    }

    pub fn serialize(&self) -> String
    {
        format!("{}{}", PRIVATE_KEY_PREFIX, hex::encode(self.0))
    }

    /// Derives the public key `Base8 * s`, where `s` is the pruned blake512 digest of the key.
    pub fn public_key(&self) -> PublicKey
    {
        PublicKey::from(BASE8.mul(&self.scalar()))
    }

    fn scalar(&self) -> BigUint
    {
        let mut digest = Blake512::digest(&self.0[..]);

        let mut pruned = [0u8; HASH_LEN];
        pruned.copy_from_slice(&digest[..HASH_LEN]);
        pruned[0] &= 0xf8;
        pruned[HASH_LEN - 1] &= 0x7f;
        pruned[HASH_LEN - 1] |= 0x40;

        let scalar = BigUint::from_bytes_le(&pruned) >> 3;
        digest.as_mut_slice().zeroize();
        pruned.zeroize();

        scalar
    }
}

impl fmt::Debug for PrivateKey
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A coordinator keypair. The private half is only present inside the coordinator process.
#[derive(Clone, Debug)]
pub struct Keypair
{
    pub public_key: PublicKey,

    pub private_key: Option<PrivateKey>
}

impl Keypair
{
    pub fn from_private_key(private_key: PrivateKey) -> Keypair
    {
        Keypair {
            public_key: private_key.public_key(),
            private_key: Some(private_key)
        }
    }

    pub fn from_public_key(public_key: PublicKey) -> Keypair
    {
        Keypair { public_key, private_key: None }
    }
}

/// Keypairs are identified by their public key alone.
impl PartialEq for Keypair
{
    fn eq(&self, other: &Self) -> bool
    {
        self.public_key == other.public_key
    }
}

impl Eq for Keypair {}

fn decode_prefixed(value: &str, prefix: &str, len: usize) -> Result<Vec<u8>, KeyError>
{
    let Some(encoded) = value.strip_prefix(prefix) else { return Err(KeyError::Malformed(format!("expected prefix `{}`", prefix))) };

    let bytes = hex::decode(encoded).map_err(|_| KeyError::Malformed("invalid hex encoding".into()))?;
    if bytes.len() != len { Err(KeyError::Malformed(format!("expected {} bytes, found {}", len, bytes.len())))? }

    Ok(bytes)
}

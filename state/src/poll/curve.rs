//! Baby Jubjub in the circomlib parameterization, `a·x² + y² = 1 + d·x²·y²` over the
//! BN254 scalar field. This is the model MACI commits keys in.

use ark_bn254::Fr;
use ark_ff::{Field, MontFp, One, PrimeField};
use num_bigint::BigUint;

use crate::hash::{fr_to_bytes, HASH_LEN};
use crate::types::HashBytes;

const A: Fr = MontFp!("168700");
const D: Fr = MontFp!("168696");

/// Generator of the prime order subgroup.
pub const BASE8: Point = Point {
    x: MontFp!("5299619240641551281634865583518297030282874472190772894086521144482721001553"),
    y: MontFp!("16950150798460657717958625567821834550301663161624707787222815936182638968203")
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Point
{
    pub x: Fr,
    pub y: Fr
}

impl Point
{
    pub const IDENTITY: Point = Point { x: MontFp!("0"), y: MontFp!("1") };

    pub fn from_bytes(x: &HashBytes, y: &HashBytes) -> Point
    {
        Point {
            x: Fr::from_be_bytes_mod_order(x),
            y: Fr::from_be_bytes_mod_order(y)
        }
    }

    pub fn to_bytes(&self) -> (HashBytes, HashBytes)
    {
        (fr_to_bytes(self.x), fr_to_bytes(self.y))
    }

    pub fn is_on_curve(&self) -> bool
    {
        let x2 = self.x.square();
        let y2 = self.y.square();

        A * x2 + y2 == Fr::one() + D * x2 * y2
    }

    /// Twisted Edwards addition; complete on this curve, so the denominators never vanish.
    pub fn add(&self, other: &Point) -> Point
    {
        let beta = self.x * other.y;
        let gamma = self.y * other.x;
        let delta = (self.y - A * self.x) * (other.x + other.y);
        let dtau = D * beta * gamma;

        Point {
            x: (beta + gamma) / (Fr::one() + dtau),
            y: (delta + A * beta - gamma) / (Fr::one() - dtau)
        }
    }

    pub fn mul(&self, scalar: &BigUint) -> Point
    {
        let mut result = Point::IDENTITY;
        let mut base = *self;

        for bit in 0..scalar.bits()
        {
            if scalar.bit(bit) { result = result.add(&base); }
            base = base.add(&base);
        }

        result
    }

    /// `y` little-endian, with the top bit flagging an `x` above `(p - 1) / 2`.
    pub fn pack(&self) -> HashBytes
    {
        let mut packed = fr_to_bytes(self.y);
        packed.reverse();
        if is_negative(self.x) { packed[HASH_LEN - 1] |= 0x80; }

        packed
    }

    pub fn unpack(packed: &HashBytes) -> Option<Point>
    {
        let mut bytes = *packed;
        let negative = bytes[HASH_LEN - 1] & 0x80 != 0;
        bytes[HASH_LEN - 1] &= 0x7f;
        bytes.reverse();

        // Non-canonical encodings of y are rejected.
        let y = Fr::from_be_bytes_mod_order(&bytes);
        if fr_to_bytes(y) != bytes { return None; }

        let y2 = y.square();
        let x2 = (Fr::one() - y2) * (A - D * y2).inverse()?;
        let mut x = x2.sqrt()?;

        if is_negative(x) != negative { x = -x; }

        Some(Point { x, y })
    }
}

fn is_negative(value: Fr) -> bool
{
    value.into_bigint() > Fr::MODULUS_MINUS_ONE_DIV_TWO
}

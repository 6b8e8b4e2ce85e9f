//! Ristretto255 group arithmetic.
//!
//! Every public key, commitment and one-time key of the bridge lives in the
//! prime-order Ristretto255 group; scalars are integers modulo its order.

use core::ops::{Add, Mul, Neg, Sub};

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_TABLE;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar as DalekScalar;
use curve25519_dalek::traits::Identity;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

use crate::encoding::{decode_base64, encode_base64};
use crate::{Error, Result};

/// Number of bytes in a scalar or compressed point (32 bytes).
pub const ELEMENT_BYTES: usize = 32;

/// Number of bytes used for wide scalar reduction (64 bytes).
pub const WIDE_REDUCTION_BYTES: usize = 64;

/// Domain separation tag for deriving the value generator `h`.
///
/// Changing this value produces a different generator and invalidates every
/// commitment and signing public key.
const GENERATOR_H_DST: &[u8] = b"privacy-bridge-v1-generator-h";

/// Scalar modulo the Ristretto255 group order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Zeroize)]
pub struct Scalar(DalekScalar);

/// Element (point) of the Ristretto255 group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Point(RistrettoPoint);

impl Scalar {
    /// The additive identity.
    pub const ZERO: Scalar = Scalar(DalekScalar::ZERO);

    /// The multiplicative identity.
    pub const ONE: Scalar = Scalar(DalekScalar::ONE);

    /// Parses a canonical 32-byte little-endian scalar.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self> {
        let arr = fixed_bytes(bytes).ok_or_else(|| {
            Error::InvalidScalarEncoding(format!(
                "Expected {} bytes, got {}",
                ELEMENT_BYTES,
                bytes.len()
            ))
        })?;

        Option::<DalekScalar>::from(DalekScalar::from_canonical_bytes(arr))
            .map(Scalar)
            .ok_or_else(|| {
                Error::InvalidScalarEncoding("Bytes do not represent a valid scalar".to_string())
            })
    }

    /// Reduces 32 arbitrary bytes modulo the group order.
    pub fn from_bytes_mod_order(bytes: [u8; ELEMENT_BYTES]) -> Self {
        Scalar(DalekScalar::from_bytes_mod_order(bytes))
    }

    /// Reduces 64 uniformly distributed bytes modulo the group order.
    pub fn from_bytes_wide(bytes: &[u8; WIDE_REDUCTION_BYTES]) -> Self {
        Scalar(DalekScalar::from_bytes_mod_order_wide(bytes))
    }

    /// Returns the canonical 32-byte encoding.
    pub fn to_bytes(&self) -> [u8; ELEMENT_BYTES] {
        self.0.to_bytes()
    }

    /// Samples a uniformly random scalar.
    pub fn random<R: CryptoRngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; WIDE_REDUCTION_BYTES];
        rng.fill_bytes(&mut bytes);
        let scalar = Scalar(DalekScalar::from_bytes_mod_order_wide(&bytes));
        bytes.zeroize();
        scalar
    }

    /// Hashes labelled input to a scalar (SHA-512, wide reduction).
    pub fn hash_from(label: &[u8], parts: &[&[u8]]) -> Self {
        Scalar(DalekScalar::from_bytes_mod_order_wide(&labelled_hash(
            label, parts,
        )))
    }

    /// Returns the multiplicative inverse, or `None` for zero.
    pub fn invert(&self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(Scalar(self.0.invert()))
        }
    }

    /// Checks if the scalar is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == DalekScalar::ZERO
    }

    /// Interprets the scalar as a `u64`, failing if any higher byte is set.
    pub fn to_u64(&self) -> Option<u64> {
        let bytes = self.0.to_bytes();
        if bytes[8..].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&bytes[..8]);
        Some(u64::from_le_bytes(low))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar(DalekScalar::from(value))
    }
}

impl Point {
    /// Returns the group identity.
    pub fn identity() -> Self {
        Point(RistrettoPoint::identity())
    }

    /// Computes `scalar * G` using the precomputed basepoint table.
    pub fn mul_base(scalar: &Scalar) -> Self {
        Point(&scalar.0 * RISTRETTO_BASEPOINT_TABLE)
    }

    /// Parses a compressed 32-byte point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr = fixed_bytes(bytes).ok_or_else(|| {
            Error::InvalidPublicKey(format!(
                "Expected {} bytes, got {}",
                ELEMENT_BYTES,
                bytes.len()
            ))
        })?;

        CompressedRistretto(arr)
            .decompress()
            .map(Point)
            .ok_or_else(|| {
                Error::InvalidPublicKey("Bytes do not represent a valid Ristretto point".to_string())
            })
    }

    /// Returns the compressed 32-byte encoding.
    pub fn to_bytes(&self) -> [u8; ELEMENT_BYTES] {
        self.0.compress().to_bytes()
    }

    /// Hashes labelled input onto the group with no known discrete log.
    pub fn hash_from(label: &[u8], parts: &[&[u8]]) -> Self {
        Point(RistrettoPoint::from_uniform_bytes(&labelled_hash(label, parts)))
    }

    /// Checks if the point is the identity.
    pub fn is_identity(&self) -> bool {
        self.0 == RistrettoPoint::identity()
    }
}

/// Returns the base generator `g`.
pub fn generator_g() -> Point {
    Point(RISTRETTO_BASEPOINT_TABLE.basepoint())
}

/// Returns the value generator `h`, independent of `g`.
pub fn generator_h() -> Point {
    let hash = Sha512::new().chain_update(GENERATOR_H_DST).finalize();
    Point(RistrettoPoint::from_uniform_bytes(&hash.into()))
}

/// Multiplies the base generator by a scalar given as canonical bytes.
pub fn scalar_multiply_base(scalar_bytes: &[u8]) -> Result<Point> {
    let scalar = Scalar::from_canonical_bytes(scalar_bytes)?;
    Ok(Point::mul_base(&scalar))
}

/// Sums an iterator of points.
pub fn sum_points<'a, I: IntoIterator<Item = &'a Point>>(points: I) -> Point {
    points
        .into_iter()
        .fold(Point::identity(), |acc, point| acc + *point)
}

fn fixed_bytes(bytes: &[u8]) -> Option<[u8; ELEMENT_BYTES]> {
    bytes.try_into().ok()
}

fn labelled_hash(label: &[u8], parts: &[&[u8]]) -> [u8; WIDE_REDUCTION_BYTES] {
    let mut hasher = Sha512::new();
    hasher.update((label.len() as u64).to_le_bytes());
    hasher.update(label);
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

impl Add for Scalar {
    type Output = Scalar;

    fn add(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 + rhs.0)
    }
}

impl Sub for Scalar {
    type Output = Scalar;

    fn sub(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 - rhs.0)
    }
}

impl Mul for Scalar {
    type Output = Scalar;

    fn mul(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 * rhs.0)
    }
}

impl Neg for Scalar {
    type Output = Scalar;

    fn neg(self) -> Scalar {
        Scalar(-self.0)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point(self.0 + rhs.0)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point(self.0 - rhs.0)
    }
}

impl Mul<Scalar> for Point {
    type Output = Point;

    fn mul(self, rhs: Scalar) -> Point {
        Point(self.0 * rhs.0)
    }
}

/// Comparisons against secret-derived points go through this, not `==`.
impl ConstantTimeEq for Point {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, s: S) -> core::result::Result<S::Ok, S::Error> {
        s.serialize_str(&encode_base64(&self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(d: D) -> core::result::Result<Self, D::Error> {
        let text = String::deserialize(d)?;
        let bytes = decode_base64(&text).map_err(serde::de::Error::custom)?;
        Scalar::from_canonical_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, s: S) -> core::result::Result<S::Ok, S::Error> {
        s.serialize_str(&encode_base64(&self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(d: D) -> core::result::Result<Self, D::Error> {
        let text = String::deserialize(d)?;
        let bytes = decode_base64(&text).map_err(serde::de::Error::custom)?;
        Point::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

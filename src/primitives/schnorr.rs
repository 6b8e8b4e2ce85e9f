//! Schnorr signatures over two generators.
//!
//! A signing key is the pair `(s, r)` taken from the two halves of a private
//! key; the public key is `s*g + r*h`. Signing is a commit-challenge-response
//! protocol made non-interactive with a Merlin transcript: commit
//! `R = k1*g + k2*h`, challenge `e = H(pk, m, R)`, respond
//! `z1 = k1 - e*s`, `z2 = k2 - e*r`. The signature is `(e, z1, z2)`.

use rand_core::CryptoRngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::group::{generator_g, generator_h, Point, Scalar, ELEMENT_BYTES};
use super::transcript::Transcript;
use crate::encoding::{decode_base64, encode_base64};
use crate::{Error, Result};

/// Transcript domain for signatures.
const SIGNATURE_DOMAIN: &[u8] = b"schnorr-signature";

/// Encoded signature length: challenge followed by both responses.
pub const SIGNATURE_BYTES: usize = 3 * ELEMENT_BYTES;

/// Secret signing key.
///
/// Automatically zeroized when dropped.
#[derive(Clone, Debug, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    spend: Scalar,
    randomness: Scalar,
}

/// Public verification key `s*g + r*h`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VerifyingKey(Point);

/// Signature `(challenge, response)` where the response is the pair `(z1, z2)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    challenge: Scalar,
    z1: Scalar,
    z2: Scalar,
}

/// Secret nonce pair used in the commitment phase.
///
/// Not `Clone`; consumed by [`SigningKey::respond`], so a nonce can answer at
/// most one challenge.
#[derive(Zeroize, ZeroizeOnDrop)]
struct Nonce {
    k1: Scalar,
    k2: Scalar,
}

impl SigningKey {
    /// Creates a signing key from its two secret scalars.
    pub fn new(spend: Scalar, randomness: Scalar) -> Self {
        Self { spend, randomness }
    }

    /// Returns the public verification key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(generator_g() * self.spend + generator_h() * self.randomness)
    }

    /// Signs `message`, drawing the nonce from `rng` mixed with the key and message.
    pub fn sign<R: CryptoRngCore>(&self, message: &[u8], rng: &mut R) -> Signature {
        let mut transcript = signing_transcript(&self.verifying_key(), message);
        let (commitment, nonce) = self.commit(&transcript, rng);

        transcript.append_point(b"R", &commitment);
        let challenge = transcript.challenge_scalar(b"e");
        self.respond(nonce, challenge)
    }

    fn commit<R: CryptoRngCore>(&self, transcript: &Transcript, rng: &mut R) -> (Point, Nonce) {
        let mut nonce_rng = transcript.witness_rng(&[&self.spend, &self.randomness], rng);
        let nonce = Nonce {
            k1: Scalar::random(&mut nonce_rng),
            k2: Scalar::random(&mut nonce_rng),
        };
        let commitment = generator_g() * nonce.k1 + generator_h() * nonce.k2;
        (commitment, nonce)
    }

    fn respond(&self, nonce: Nonce, challenge: Scalar) -> Signature {
        Signature {
            challenge,
            z1: nonce.k1 - challenge * self.spend,
            z2: nonce.k2 - challenge * self.randomness,
        }
    }
}

impl VerifyingKey {
    /// Parses a compressed verification key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Point::from_bytes(bytes).map(VerifyingKey)
    }

    /// Returns the compressed 32-byte encoding.
    pub fn to_bytes(&self) -> [u8; ELEMENT_BYTES] {
        self.0.to_bytes()
    }

    /// Returns the underlying group element.
    pub fn point(&self) -> &Point {
        &self.0
    }

    /// Verifies `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let commitment = generator_g() * signature.z1
            + generator_h() * signature.z2
            + self.0 * signature.challenge;

        let mut transcript = signing_transcript(self, message);
        transcript.append_point(b"R", &commitment);
        transcript.challenge_scalar(b"e") == signature.challenge
    }
}

impl Signature {
    /// Returns the challenge scalar.
    pub fn challenge(&self) -> &Scalar {
        &self.challenge
    }

    /// Serializes as `challenge || z1 || z2` (96 bytes).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SIGNATURE_BYTES);
        bytes.extend_from_slice(&self.challenge.to_bytes());
        bytes.extend_from_slice(&self.z1.to_bytes());
        bytes.extend_from_slice(&self.z2.to_bytes());
        bytes
    }

    /// Deserializes a 96-byte signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_BYTES {
            return Err(Error::Deserialization(format!(
                "Signature must be {} bytes, got {}",
                SIGNATURE_BYTES,
                bytes.len()
            )));
        }

        Ok(Self {
            challenge: Scalar::from_canonical_bytes(&bytes[..ELEMENT_BYTES])?,
            z1: Scalar::from_canonical_bytes(&bytes[ELEMENT_BYTES..2 * ELEMENT_BYTES])?,
            z2: Scalar::from_canonical_bytes(&bytes[2 * ELEMENT_BYTES..])?,
        })
    }
}

impl Serialize for VerifyingKey {
    fn serialize<S: Serializer>(&self, s: S) -> core::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for VerifyingKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> core::result::Result<Self, D::Error> {
        Point::deserialize(d).map(VerifyingKey)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, s: S) -> core::result::Result<S::Ok, S::Error> {
        s.serialize_str(&encode_base64(&self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(d: D) -> core::result::Result<Self, D::Error> {
        let text = String::deserialize(d)?;
        let bytes = decode_base64(&text).map_err(serde::de::Error::custom)?;
        Signature::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

fn signing_transcript(key: &VerifyingKey, message: &[u8]) -> Transcript {
    let mut transcript = Transcript::new(SIGNATURE_DOMAIN);
    transcript.append_point(b"pk", &key.0);
    transcript.append_message(b"message", message);
    transcript
}

//! Core cryptographic primitives.
//!
//! This module contains the building blocks every other component relies on:
//! - **group**: Ristretto255 scalars, points and generators
//! - **transcript**: Fiat-Shamir transform, nonce derivation and per-call randomness
//! - **schnorr**: two-generator Schnorr signatures
//! - **hybrid**: ephemeral-key hybrid encryption
//! - **bls**: deterministic BLS12-381 key generation

/// Deterministic BLS12-381 key generation.
pub mod bls;
/// Ristretto255 group arithmetic.
pub mod group;
/// Hybrid public-key encryption.
pub mod hybrid;
/// Schnorr signatures.
pub mod schnorr;
/// Transcript for Fiat-Shamir transform.
pub mod transcript;

pub use bls::BlsKeyPair;
pub use group::{generator_g, generator_h, scalar_multiply_base, Point, Scalar};
pub use hybrid::HybridCiphertext;
pub use schnorr::{Signature, SigningKey, VerifyingKey};
pub use transcript::{SecureRng, Transcript};

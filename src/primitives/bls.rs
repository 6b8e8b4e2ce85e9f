//! Deterministic BLS12-381 key generation for committee keys.
//!
//! Verifiers recompute committee keys from the same seed, so generation is a
//! pure function of the seed bytes.

use bls12_381::{G2Affine, G2Projective, Scalar as BlsScalar};
use sha2::{Digest, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain separation tag for hashing seeds to secret scalars.
const BLS_KEYGEN_DST: &[u8] = b"privacy-bridge-bls12381-keygen-v1";

/// Width of the encoded private scalar (big-endian).
pub const BLS_PRIVATE_KEY_BYTES: usize = 32;

/// Width of a compressed G2 public key.
pub const BLS_PUBLIC_KEY_BYTES: usize = 96;

/// BLS key pair, zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BlsKeyPair {
    private_key: [u8; BLS_PRIVATE_KEY_BYTES],
    public_key: [u8; BLS_PUBLIC_KEY_BYTES],
}

impl BlsKeyPair {
    /// Derives a key pair from `seed`.
    ///
    /// `sk = SHA-512(dst || seed) mod r`, `pk = sk * G2`.
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut wide = [0u8; 64];
        wide.copy_from_slice(&Sha512::new().chain_update(BLS_KEYGEN_DST).chain_update(seed).finalize());
        let secret = BlsScalar::from_bytes_wide(&wide);
        wide.zeroize();

        let public = G2Affine::from(G2Projective::generator() * secret);

        let mut private_key = secret.to_bytes();
        private_key.reverse();

        Self {
            private_key,
            public_key: public.to_compressed(),
        }
    }

    /// Returns the big-endian private scalar.
    pub fn private_key(&self) -> &[u8; BLS_PRIVATE_KEY_BYTES] {
        &self.private_key
    }

    /// Returns the compressed public key.
    pub fn public_key(&self) -> &[u8; BLS_PUBLIC_KEY_BYTES] {
        &self.public_key
    }

    /// Returns `private_key || public_key`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(BLS_PRIVATE_KEY_BYTES + BLS_PUBLIC_KEY_BYTES);
        bytes.extend_from_slice(&self.private_key);
        bytes.extend_from_slice(&self.public_key);
        bytes
    }
}

impl core::fmt::Debug for BlsKeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlsKeyPair")
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_keys() {
        let a = BlsKeyPair::from_seed(b"committee seed");
        let b = BlsKeyPair::from_seed(b"committee seed");
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(a.to_bytes().len(), BLS_PRIVATE_KEY_BYTES + BLS_PUBLIC_KEY_BYTES);
    }

    #[test]
    fn different_seeds_differ() {
        let a = BlsKeyPair::from_seed(b"seed-1");
        let b = BlsKeyPair::from_seed(b"seed-2");
        assert_ne!(a.private_key(), b.private_key());
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn public_key_matches_private_scalar() {
        let pair = BlsKeyPair::from_seed(b"seed");
        let mut le = *pair.private_key();
        le.reverse();
        let secret = Option::<BlsScalar>::from(BlsScalar::from_bytes(&le)).unwrap();
        let expected = G2Affine::from(G2Projective::generator() * secret).to_compressed();
        assert_eq!(pair.public_key(), &expected);
    }
}

//! Hybrid public-key encryption.
//!
//! An ephemeral Diffie-Hellman exchange on Ristretto255 feeds HKDF-SHA256,
//! which yields a ChaCha20-Poly1305 key and nonce. The ephemeral point is
//! authenticated as associated data.
//!
//! Wire format: `[ephemeral point (32)][ciphertext][tag (16)]`.

use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce, Tag};
use hkdf::Hkdf;
use rand_core::CryptoRngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use super::group::{Point, Scalar, ELEMENT_BYTES};
use crate::{Error, Result};

/// HKDF salt binding derived keys to this construction.
const HYBRID_KDF_SALT: &[u8] = b"privacy-bridge-hybrid-encryption-v1";

/// Length of the symmetric key.
const KEY_BYTES: usize = 32;

/// Length of the AEAD nonce.
const NONCE_BYTES: usize = 12;

/// Length of the authentication tag.
pub const TAG_BYTES: usize = 16;

/// Smallest well-formed ciphertext: ephemeral key and tag around an empty body.
pub const MIN_CIPHERTEXT_BYTES: usize = ELEMENT_BYTES + TAG_BYTES;

/// Ciphertext of the hybrid scheme.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HybridCiphertext {
    ephemeral: Point,
    body: Vec<u8>,
    tag: [u8; TAG_BYTES],
}

impl HybridCiphertext {
    /// Returns the ephemeral public key.
    pub fn ephemeral(&self) -> &Point {
        &self.ephemeral
    }

    /// Serializes to `ephemeral || body || tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(MIN_CIPHERTEXT_BYTES + self.body.len());
        bytes.extend_from_slice(&self.ephemeral.to_bytes());
        bytes.extend_from_slice(&self.body);
        bytes.extend_from_slice(&self.tag);
        bytes
    }

    /// Parses the wire format.
    ///
    /// Any malformation is reported as [`Error::DecryptionFailure`], the same
    /// error an authentication failure produces.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_CIPHERTEXT_BYTES {
            return Err(Error::DecryptionFailure);
        }

        let ephemeral =
            Point::from_bytes(&bytes[..ELEMENT_BYTES]).map_err(|_| Error::DecryptionFailure)?;
        let tag_start = bytes.len() - TAG_BYTES;
        let mut tag = [0u8; TAG_BYTES];
        tag.copy_from_slice(&bytes[tag_start..]);

        Ok(Self {
            ephemeral,
            body: bytes[ELEMENT_BYTES..tag_start].to_vec(),
            tag,
        })
    }
}

/// Encrypts `message` to `public_key`.
pub fn encrypt<R: CryptoRngCore>(
    public_key: &Point,
    message: &[u8],
    rng: &mut R,
) -> Result<HybridCiphertext> {
    let mut ephemeral_secret = Scalar::random(rng);
    let ephemeral = Point::mul_base(&ephemeral_secret);
    let shared = *public_key * ephemeral_secret;
    ephemeral_secret.zeroize();

    let cipher = Cipher::derive(&shared, &ephemeral)?;
    let mut body = message.to_vec();
    let tag = cipher
        .aead
        .encrypt_in_place_detached(&cipher.nonce, &ephemeral.to_bytes(), &mut body)
        .map_err(|_| Error::ConstructionFailure("Symmetric encryption failed".to_string()))?;

    Ok(HybridCiphertext {
        ephemeral,
        body,
        tag: tag.into(),
    })
}

/// Encrypts to a public key given as compressed bytes.
pub fn encrypt_to_bytes<R: CryptoRngCore>(
    public_key: &[u8],
    message: &[u8],
    rng: &mut R,
) -> Result<HybridCiphertext> {
    let public_key = Point::from_bytes(public_key)?;
    encrypt(&public_key, message, rng)
}

/// Decrypts `ciphertext` with `private_key`.
pub fn decrypt(private_key: &Scalar, ciphertext: &HybridCiphertext) -> Result<Vec<u8>> {
    let shared = ciphertext.ephemeral * *private_key;
    let cipher = Cipher::derive(&shared, &ciphertext.ephemeral).map_err(|_| Error::DecryptionFailure)?;

    let mut plaintext = ciphertext.body.clone();
    cipher
        .aead
        .decrypt_in_place_detached(
            &cipher.nonce,
            &ciphertext.ephemeral.to_bytes(),
            &mut plaintext,
            Tag::from_slice(&ciphertext.tag),
        )
        .map_err(|_| Error::DecryptionFailure)?;

    Ok(plaintext)
}

/// Decrypts a serialized ciphertext.
pub fn decrypt_bytes(private_key: &Scalar, ciphertext: &[u8]) -> Result<Vec<u8>> {
    decrypt(private_key, &HybridCiphertext::from_bytes(ciphertext)?)
}

struct Cipher {
    aead: ChaCha20Poly1305,
    nonce: Nonce,
}

impl Cipher {
    fn derive(shared: &Point, ephemeral: &Point) -> Result<Self> {
        let mut ikm = [0u8; 2 * ELEMENT_BYTES];
        ikm[..ELEMENT_BYTES].copy_from_slice(&shared.to_bytes());
        ikm[ELEMENT_BYTES..].copy_from_slice(&ephemeral.to_bytes());

        let hkdf = Hkdf::<Sha256>::new(Some(HYBRID_KDF_SALT), &ikm);
        let mut okm = [0u8; KEY_BYTES + NONCE_BYTES];
        let expanded = hkdf.expand(b"key-and-nonce", &mut okm);
        ikm.zeroize();
        expanded.map_err(|_| Error::ConstructionFailure("Key derivation failed".to_string()))?;

        let cipher = Self {
            aead: ChaCha20Poly1305::new(Key::from_slice(&okm[..KEY_BYTES])),
            nonce: *Nonce::from_slice(&okm[KEY_BYTES..]),
        };
        okm.zeroize();
        Ok(cipher)
    }
}

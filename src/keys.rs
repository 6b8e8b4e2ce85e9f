//! Key management.
//!
//! A private key is 64 bytes: a spending half and a randomness half, each
//! reduced modulo the group order. Everything else in a [`KeySet`] is a
//! deterministic function of those two scalars.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding::base64_bytes;
use crate::primitives::{Point, Scalar, SigningKey, VerifyingKey};
use crate::wallet::KeyEncoding;
use crate::{Error, Result};

/// Size of each private-key half.
pub const PRIVATE_KEY_HALF_BYTES: usize = 32;

/// Size of raw private-key material.
pub const PRIVATE_KEY_BYTES: usize = 2 * PRIVATE_KEY_HALF_BYTES;

/// Domain tag for deriving the view scalar from the spending scalar.
const VIEW_KEY_DST: &[u8] = b"view-key";

/// Raw private-key material, zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; PRIVATE_KEY_BYTES]);

impl PrivateKey {
    /// Wraps raw key bytes.
    ///
    /// # Errors
    /// [`Error::InvalidKeyLength`] unless exactly 64 bytes are supplied.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; PRIVATE_KEY_BYTES] =
            bytes.try_into().map_err(|_| Error::InvalidKeyLength {
                expected: PRIVATE_KEY_BYTES,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_BYTES] {
        &self.0
    }

    /// Spending scalar from the first half.
    pub fn spend_scalar(&self) -> Scalar {
        Scalar::from_bytes_mod_order(half(&self.0[..PRIVATE_KEY_HALF_BYTES]))
    }

    /// Randomness scalar from the second half.
    pub fn randomness_scalar(&self) -> Scalar {
        Scalar::from_bytes_mod_order(half(&self.0[PRIVATE_KEY_HALF_BYTES..]))
    }

    /// Schnorr signing key over the scalar pair.
    pub fn signing_key(&self) -> SigningKey {
        SigningKey::new(self.spend_scalar(), self.randomness_scalar())
    }
}

impl core::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

fn half(bytes: &[u8]) -> [u8; PRIVATE_KEY_HALF_BYTES] {
    let mut arr = [0u8; PRIVATE_KEY_HALF_BYTES];
    arr.copy_from_slice(bytes);
    arr
}

/// Public address coins are sent to.
///
/// `public_key` identifies the owner; `transmission_key` is the Diffie-Hellman
/// key senders use to derive one-time keys and encrypt coin openings.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PaymentAddress {
    #[serde(rename = "Pk")]
    pub public_key: Point,
    #[serde(rename = "Tk")]
    pub transmission_key: Point,
}

impl PaymentAddress {
    /// Returns `public_key || transmission_key`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(&self.public_key.to_bytes());
        bytes.extend_from_slice(&self.transmission_key.to_bytes());
        bytes
    }

    /// Parses `public_key || transmission_key`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 64 {
            return Err(Error::InvalidKeyEncoding(format!(
                "Payment address must be 64 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            public_key: Point::from_bytes(&bytes[..32])?,
            transmission_key: Point::from_bytes(&bytes[32..])?,
        })
    }
}

/// View-only key material: recognizes and opens coins without spending authority.
#[derive(Clone, Debug, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ViewKey {
    #[serde(rename = "Pk")]
    #[zeroize(skip)]
    pub public_key: Point,
    #[serde(rename = "Rk")]
    pub view_secret: Scalar,
}

/// Usable key set derived from a private key.
#[derive(Clone, Debug)]
pub struct KeySet {
    private_key: PrivateKey,
    spend: Scalar,
    view: ViewKey,
    payment_address: PaymentAddress,
    encoded_address: String,
}

impl KeySet {
    /// Derives a key set from raw private-key bytes.
    ///
    /// # Errors
    /// - [`Error::InvalidKeyLength`] if `bytes` is not 64 bytes long
    /// - [`Error::InvalidKeyEncoding`] if the address collaborator cannot encode the address
    pub fn from_private_bytes(bytes: &[u8], encoding: &dyn KeyEncoding) -> Result<Self> {
        Self::from_private_key(PrivateKey::from_bytes(bytes)?, encoding)
    }

    /// Derives a key set from a private key.
    pub fn from_private_key(private_key: PrivateKey, encoding: &dyn KeyEncoding) -> Result<Self> {
        let spend = private_key.spend_scalar();
        let view_secret = Scalar::hash_from(VIEW_KEY_DST, &[&spend.to_bytes()]);
        let public_key = Point::mul_base(&spend);

        let payment_address = PaymentAddress {
            public_key,
            transmission_key: Point::mul_base(&view_secret),
        };
        let encoded_address = encoding
            .encode_payment_address(&payment_address)
            .map_err(|e| match e {
                Error::InvalidKeyEncoding(_) => e,
                other => Error::InvalidKeyEncoding(other.to_string()),
            })?;

        Ok(Self {
            private_key,
            spend,
            view: ViewKey {
                public_key,
                view_secret,
            },
            payment_address,
            encoded_address,
        })
    }

    /// Decodes a private key text and derives its key set.
    pub fn from_encoded_private_key(text: &str, encoding: &dyn KeyEncoding) -> Result<Self> {
        Self::from_private_key(encoding.decode_private_key(text)?, encoding)
    }

    /// Returns the raw private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Returns the spending scalar.
    pub fn spend_secret(&self) -> &Scalar {
        &self.spend
    }

    /// Returns the view scalar (the transmission key's discrete log).
    pub fn view_secret(&self) -> &Scalar {
        &self.view.view_secret
    }

    /// Returns the view-only key material.
    pub fn view_key(&self) -> &ViewKey {
        &self.view
    }

    /// Returns the owner public key `s*g`.
    pub fn public_key(&self) -> &Point {
        &self.payment_address.public_key
    }

    /// Returns the payment address.
    pub fn payment_address(&self) -> &PaymentAddress {
        &self.payment_address
    }

    /// Returns the payment address text produced by the address collaborator.
    pub fn encoded_payment_address(&self) -> &str {
        &self.encoded_address
    }

    /// Returns the Schnorr signing key.
    pub fn signing_key(&self) -> SigningKey {
        self.private_key.signing_key()
    }

    /// Returns the Schnorr verification key.
    pub fn signing_public_key(&self) -> VerifyingKey {
        self.signing_key().verifying_key()
    }

    /// Builds the host-facing serialized form.
    pub fn to_record(&self) -> KeySetRecord {
        KeySetRecord {
            private_key: self.private_key.as_bytes().to_vec(),
            payment_address: self.payment_address,
            readonly_key: self.view.clone(),
            payment_address_encoded: self.encoded_address.clone(),
        }
    }
}

/// Serialized key set, as returned to the host.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySetRecord {
    #[serde(with = "base64_bytes")]
    pub private_key: Vec<u8>,
    pub payment_address: PaymentAddress,
    pub readonly_key: ViewKey,
    pub payment_address_encoded: String,
}

/// Derives a key set from raw private-key bytes.
pub fn derive_key_set(private_key: &[u8], encoding: &dyn KeyEncoding) -> Result<KeySet> {
    KeySet::from_private_bytes(private_key, encoding)
}

/// Returns the encoded Schnorr public key for raw private-key bytes.
pub fn derive_signing_public_key(private_key: &[u8]) -> Result<[u8; 32]> {
    Ok(PrivateKey::from_bytes(private_key)?
        .signing_key()
        .verifying_key()
        .to_bytes())
}

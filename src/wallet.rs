//! Checksummed text encodings for keys, addresses and transactions.
//!
//! The bridge does not own these formats; it only has to match them byte for
//! byte. [`KeyEncoding`] is the seam, and [`Base58Check`] is the encoding the
//! host wallet uses.

use crate::keys::{PaymentAddress, PrivateKey};
use crate::{Error, Result};

/// Key type tag for a serialized private key.
pub const PRIVATE_KEY_TYPE: u8 = 0;

/// Key type tag for a serialized payment address.
pub const PAYMENT_ADDRESS_TYPE: u8 = 1;

/// Text encodings supplied by the wallet/address collaborator.
pub trait KeyEncoding: Send + Sync {
    /// Encodes a private key.
    fn encode_private_key(&self, key: &PrivateKey) -> Result<String>;

    /// Decodes a private key.
    fn decode_private_key(&self, text: &str) -> Result<PrivateKey>;

    /// Encodes a payment address.
    fn encode_payment_address(&self, address: &PaymentAddress) -> Result<String>;

    /// Decodes a payment address.
    fn decode_payment_address(&self, text: &str) -> Result<PaymentAddress>;

    /// Encodes a serialized transaction.
    fn encode_transaction(&self, serialized: &[u8]) -> Result<String>;
}

/// Base58Check with a leading version byte.
#[derive(Clone, Copy, Debug)]
pub struct Base58Check {
    version: u8,
}

impl Base58Check {
    /// Creates an encoder that prefixes `version` before the checksum.
    pub fn new(version: u8) -> Self {
        Self { version }
    }

    /// Creates an encoder using the configured version byte.
    pub fn from_config() -> Self {
        Self::new(crate::config::get().encoding_version)
    }

    /// Encodes `payload` with the version byte and a 4-byte checksum.
    pub fn encode(&self, payload: &[u8]) -> String {
        bs58::encode(payload)
            .with_check_version(self.version)
            .into_string()
    }

    /// Decodes text produced by [`Base58Check::encode`], returning the payload
    /// without the version byte.
    pub fn decode(&self, text: &str) -> Result<Vec<u8>> {
        let mut bytes = bs58::decode(text)
            .with_check(Some(self.version))
            .into_vec()
            .map_err(|e| Error::InvalidKeyEncoding(e.to_string()))?;
        if bytes.is_empty() {
            return Err(Error::InvalidKeyEncoding("Missing version byte".to_string()));
        }
        bytes.remove(0);
        Ok(bytes)
    }

    fn encode_key(&self, key_type: u8, data: &[u8]) -> String {
        let mut payload = Vec::with_capacity(1 + data.len());
        payload.push(key_type);
        payload.extend_from_slice(data);
        self.encode(&payload)
    }

    fn decode_key(&self, key_type: u8, text: &str) -> Result<Vec<u8>> {
        let payload = self.decode(text)?;
        match payload.split_first() {
            Some((&found, data)) if found == key_type => Ok(data.to_vec()),
            Some((&found, _)) => Err(Error::InvalidKeyEncoding(format!(
                "Expected key type {key_type}, found {found}"
            ))),
            None => Err(Error::InvalidKeyEncoding("Empty key payload".to_string())),
        }
    }
}

impl Default for Base58Check {
    fn default() -> Self {
        Self::new(0)
    }
}

impl KeyEncoding for Base58Check {
    fn encode_private_key(&self, key: &PrivateKey) -> Result<String> {
        Ok(self.encode_key(PRIVATE_KEY_TYPE, key.as_bytes()))
    }

    fn decode_private_key(&self, text: &str) -> Result<PrivateKey> {
        let data = self.decode_key(PRIVATE_KEY_TYPE, text)?;
        PrivateKey::from_bytes(&data).map_err(|e| Error::InvalidKeyEncoding(e.to_string()))
    }

    fn encode_payment_address(&self, address: &PaymentAddress) -> Result<String> {
        Ok(self.encode_key(PAYMENT_ADDRESS_TYPE, &address.to_bytes()))
    }

    fn decode_payment_address(&self, text: &str) -> Result<PaymentAddress> {
        let data = self.decode_key(PAYMENT_ADDRESS_TYPE, text)?;
        PaymentAddress::from_bytes(&data).map_err(|e| match e {
            Error::InvalidKeyEncoding(_) => e,
            other => Error::InvalidKeyEncoding(other.to_string()),
        })
    }

    fn encode_transaction(&self, serialized: &[u8]) -> Result<String> {
        Ok(self.encode(serialized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derive_key_set;

    #[test]
    fn private_key_roundtrip() {
        let encoding = Base58Check::default();
        let key = PrivateKey::from_bytes(&[42u8; 64]).unwrap();
        let text = encoding.encode_private_key(&key).unwrap();
        let decoded = encoding.decode_private_key(&text).unwrap();
        assert_eq!(decoded.as_bytes(), key.as_bytes());
    }

    #[test]
    fn payment_address_roundtrip() {
        let encoding = Base58Check::default();
        let keys = derive_key_set(&[1u8; 64], &encoding).unwrap();
        let decoded = encoding
            .decode_payment_address(keys.encoded_payment_address())
            .unwrap();
        assert_eq!(&decoded, keys.payment_address());
    }

    #[test]
    fn key_type_is_checked() {
        let encoding = Base58Check::default();
        let keys = derive_key_set(&[1u8; 64], &encoding).unwrap();
        assert!(matches!(
            encoding.decode_private_key(keys.encoded_payment_address()),
            Err(Error::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let encoding = Base58Check::default();
        let mut text = encoding.encode(b"payload");
        let last = text.pop().unwrap();
        text.push(if last == '2' { '3' } else { '2' });
        assert!(matches!(encoding.decode(&text), Err(Error::InvalidKeyEncoding(_))));
    }

    #[test]
    fn version_byte_is_checked() {
        let text = Base58Check::new(1).encode(b"payload");
        assert!(Base58Check::new(0).decode(&text).is_err());
        assert_eq!(Base58Check::new(1).decode(&text).unwrap(), b"payload");
    }
}

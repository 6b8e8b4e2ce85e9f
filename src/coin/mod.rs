//! Value-holding records in two hiding schemes.
//!
//! - **plain** (version 1): Pedersen-committed amount with a visible or
//!   hybrid-encrypted opening, owned by a long-lived public key
//! - **confidential** (version 2): amount and blinding masked with a
//!   Diffie-Hellman shared secret, owned by a one-time public key
//!
//! Both schemes serialize through [`CoinData`], the record the host library
//! exchanges.

mod confidential;
mod plain;

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::encoding::{amount_string, option_amount_string, option_base64_bytes};
use crate::keys::{KeySet, PaymentAddress};
use crate::primitives::{generator_h, Point, Scalar};
use crate::wallet::KeyEncoding;
use crate::{Error, Result};

pub use confidential::{create_coin, CoinV2};
pub(crate) use confidential::{create_coin_with_opening, CoinOpening};
pub use plain::{create_plain_coin, CoinV1};

/// Domain tag for mapping token ids to asset bases.
const ASSET_BASE_DST: &[u8] = b"asset-base";

/// Domain tag for key-image base points.
const KEY_IMAGE_DST: &[u8] = b"key-image";

/// 32-byte asset identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TokenId([u8; 32]);

impl TokenId {
    /// Identifier of the native asset.
    pub const NATIVE: TokenId = {
        let mut bytes = [0u8; 32];
        bytes[0] = 4;
        TokenId(bytes)
    };

    /// Wraps raw identifier bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the native asset's identifier.
    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }

    /// Base point amounts of this asset are committed to.
    pub fn asset_base(&self) -> Point {
        if self.is_native() {
            generator_h()
        } else {
            Point::hash_from(ASSET_BASE_DST, &[&self.0])
        }
    }

    /// Parses an optional token id, mapping empty text and the native id to `None`.
    pub fn parse_optional(text: &str) -> Result<Option<Self>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let id: TokenId = text.parse()?;
        Ok((!id.is_native()).then_some(id))
    }
}

/// Rejects coin info longer than the configured limit.
pub(crate) fn check_info_size(message: &[u8]) -> Result<()> {
    let max_info = crate::config::get().max_coin_info_size;
    if message.len() > max_info {
        return Err(Error::ConstructionFailure(format!(
            "Coin info of {} bytes exceeds {max_info}",
            message.len()
        )));
    }
    Ok(())
}

/// Asset base of an optional token, the native base when absent.
pub fn asset_base(token: Option<&TokenId>) -> Point {
    token.map_or_else(generator_h, TokenId::asset_base)
}

impl fmt::Display for TokenId {
    /// Hex in reversed byte order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.write_str(&hex::encode(reversed))
    }
}

impl FromStr for TokenId {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut bytes: [u8; 32] = hex::decode(text.trim())
            .map_err(|e| Error::Deserialization(format!("Invalid token id: {e}")))?
            .try_into()
            .map_err(|_| Error::Deserialization("Token id must be 32 bytes".to_string()))?;
        bytes.reverse();
        Ok(Self(bytes))
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, s: S) -> core::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> core::result::Result<Self, D::Error> {
        String::deserialize(d)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Recipient, amount and optional message of a coin to create.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PaymentInfo {
    pub address: PaymentAddress,
    pub amount: u64,
    /// Carried on the coin as its info; bounded by `max_coin_info_size`.
    pub message: Vec<u8>,
}

impl PaymentInfo {
    /// Payment of `amount` to `address` with no message.
    pub fn new(address: PaymentAddress, amount: u64) -> Self {
        Self {
            address,
            amount,
            message: Vec::new(),
        }
    }

    /// Resolves the host form, decoding the address text.
    pub fn from_data(data: &PaymentInfoData, encoding: &dyn KeyEncoding) -> Result<Self> {
        Ok(Self {
            address: encoding.decode_payment_address(&data.payment_address)?,
            amount: data.amount,
            message: data.message.clone().unwrap_or_default(),
        })
    }
}

/// Host form of [`PaymentInfo`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentInfoData {
    pub payment_address: String,
    #[serde(with = "amount_string")]
    pub amount: u64,
    #[serde(default, with = "option_base64_bytes", skip_serializing_if = "Option::is_none")]
    pub message: Option<Vec<u8>>,
}

/// A coin of either version.
#[derive(Clone, Debug, PartialEq)]
pub enum Coin {
    /// Version 1.
    Plain(CoinV1),
    /// Version 2.
    Confidential(CoinV2),
}

impl Coin {
    /// Version tag: 1 for plain, 2 for confidential.
    pub fn version(&self) -> u8 {
        match self {
            Coin::Plain(_) => CoinV1::VERSION,
            Coin::Confidential(_) => CoinV2::VERSION,
        }
    }

    /// Commitment to the hidden amount.
    pub fn commitment(&self) -> &Point {
        match self {
            Coin::Plain(coin) => &coin.commitment,
            Coin::Confidential(coin) => &coin.commitment,
        }
    }

    /// Position in the global coin set, if admitted.
    pub fn index(&self) -> Option<u64> {
        match self {
            Coin::Plain(coin) => coin.index,
            Coin::Confidential(coin) => coin.index,
        }
    }

    /// Recovers the coin's opening with `keys`.
    ///
    /// # Errors
    /// [`Error::DecryptionFailure`] if the coin does not belong to `keys` or
    /// the recovered opening does not reproduce the commitment.
    pub fn decrypt(&self, keys: &KeySet) -> Result<DecryptedCoin> {
        match self {
            Coin::Plain(coin) => coin.decrypt(keys),
            Coin::Confidential(coin) => coin.decrypt(keys),
        }
    }
}

impl From<CoinV1> for Coin {
    fn from(coin: CoinV1) -> Self {
        Coin::Plain(coin)
    }
}

impl From<CoinV2> for Coin {
    fn from(coin: CoinV2) -> Self {
        Coin::Confidential(coin)
    }
}

/// A coin together with its recovered opening.
#[derive(Clone, Debug)]
pub struct DecryptedCoin {
    /// The coin as received.
    pub coin: Coin,
    /// Recovered amount.
    pub value: u64,
    /// Blinding factor as carried on the wire.
    pub randomness: Scalar,
    /// Blinding of the commitment relative to `asset_base`:
    /// `commitment = value * asset_base + commitment_blinding * g`.
    pub commitment_blinding: Scalar,
    /// Unblinded asset base.
    pub asset_base: Point,
    /// Spend tag; equal for every opening of the same coin by the same owner.
    pub key_image: Point,
}

impl DecryptedCoin {
    /// Index of the underlying coin.
    pub fn index(&self) -> Option<u64> {
        self.coin.index()
    }
}

/// Coin record exchanged with the host.
///
/// Fields a version does not use are omitted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoinData {
    pub version: u8,
    #[serde(default, with = "option_amount_string", skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_image: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_random: Option<Point>,
    #[serde(default, with = "option_amount_string", skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_amount: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub randomness: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_randomness: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_tag: Option<Point>,
    #[serde(default, with = "option_base64_bytes", skip_serializing_if = "Option::is_none")]
    pub info: Option<Vec<u8>>,
    #[serde(
        rename = "TokenID",
        default,
        deserialize_with = "deserialize_token_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub token_id: Option<TokenId>,
    #[serde(default, with = "option_base64_bytes", skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<Vec<u8>>,
}

fn deserialize_token_id<'de, D: Deserializer<'de>>(
    d: D,
) -> core::result::Result<Option<TokenId>, D::Error> {
    match Option::<String>::deserialize(d)? {
        Some(text) => TokenId::parse_optional(&text).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl TryFrom<CoinData> for Coin {
    type Error = Error;

    fn try_from(data: CoinData) -> Result<Self> {
        match data.version {
            CoinV1::VERSION => CoinV1::try_from(data).map(Coin::Plain),
            CoinV2::VERSION => CoinV2::try_from(data).map(Coin::Confidential),
            other => Err(Error::UnsupportedCoinVersion(other)),
        }
    }
}

impl From<&Coin> for CoinData {
    fn from(coin: &Coin) -> Self {
        match coin {
            Coin::Plain(coin) => coin.into(),
            Coin::Confidential(coin) => coin.into(),
        }
    }
}

impl From<&DecryptedCoin> for CoinData {
    fn from(decrypted: &DecryptedCoin) -> Self {
        CoinData {
            value: Some(decrypted.value),
            randomness: Some(decrypted.randomness),
            key_image: Some(decrypted.key_image),
            ..CoinData::from(&decrypted.coin)
        }
    }
}

impl Serialize for Coin {
    fn serialize<S: Serializer>(&self, s: S) -> core::result::Result<S::Ok, S::Error> {
        CoinData::from(self).serialize(s)
    }
}

impl<'de> Deserialize<'de> for Coin {
    fn deserialize<D: Deserializer<'de>>(d: D) -> core::result::Result<Self, D::Error> {
        Coin::try_from(CoinData::deserialize(d)?).map_err(serde::de::Error::custom)
    }
}

/// Key image base for a coin identified by `parts`.
pub(crate) fn key_image_base(parts: &[&[u8]]) -> Point {
    Point::hash_from(KEY_IMAGE_DST, parts)
}

/// Returns `field` or a deserialization error naming it.
pub(crate) fn require<T>(field: Option<T>, name: &str) -> Result<T> {
    field.ok_or_else(|| Error::Deserialization(format!("Coin is missing field {name}")))
}

/// Decrypts a coin record with `keys`; the record's index is carried over.
pub fn decrypt_coin(data: CoinData, keys: &KeySet) -> Result<DecryptedCoin> {
    Coin::try_from(data)?.decrypt(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_token_id_text() {
        let text = TokenId::NATIVE.to_string();
        assert_eq!(text.len(), 64);
        assert!(text.ends_with("04"));
        assert!(text[..62].chars().all(|c| c == '0'));
        assert_eq!(text.parse::<TokenId>().unwrap(), TokenId::NATIVE);
    }

    #[test]
    fn native_token_id_reads_as_absent() {
        assert_eq!(TokenId::parse_optional("").unwrap(), None);
        assert_eq!(
            TokenId::parse_optional(&TokenId::NATIVE.to_string()).unwrap(),
            None
        );
        let custom = TokenId::from_bytes([9u8; 32]);
        assert_eq!(
            TokenId::parse_optional(&custom.to_string()).unwrap(),
            Some(custom)
        );
    }

    #[test]
    fn asset_bases_are_distinct() {
        let a = TokenId::from_bytes([1u8; 32]).asset_base();
        let b = TokenId::from_bytes([2u8; 32]).asset_base();
        assert_ne!(a, b);
        assert_ne!(a, generator_h());
        assert_eq!(TokenId::NATIVE.asset_base(), generator_h());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let data = CoinData {
            version: 3,
            ..CoinData::default()
        };
        assert!(matches!(
            Coin::try_from(data),
            Err(Error::UnsupportedCoinVersion(3))
        ));
    }

    #[test]
    fn bad_token_id_rejected() {
        assert!("zz".parse::<TokenId>().is_err());
        assert!("00".parse::<TokenId>().is_err());
    }
}

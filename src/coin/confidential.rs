use rand_core::CryptoRngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;

use super::{check_info_size, key_image_base, require, CoinData, DecryptedCoin, PaymentInfo, TokenId};
use crate::keys::KeySet;
use crate::primitives::{generator_h, Point, Scalar};
use crate::{Error, Result};

const ONE_TIME_DST: &[u8] = b"one-time";
const AMOUNT_MASK_DST: &[u8] = b"amount-mask";
const BLIND_MASK_DST: &[u8] = b"blind-mask";
const ASSET_BLIND_DST: &[u8] = b"asset-blind";

/// Version-2 coin: owned by a one-time key, amount and blinding masked with
/// a secret shared between sender and recipient.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoinV2 {
    pub(crate) public_key: Point,
    pub(crate) commitment: Point,
    pub(crate) tx_random: Point,
    pub(crate) encrypted_amount: Scalar,
    pub(crate) encrypted_randomness: Scalar,
    pub(crate) asset_tag: Option<Point>,
    pub(crate) info: Vec<u8>,
    pub(crate) index: Option<u64>,
}

/// Per-coin secrets derived from the Diffie-Hellman shared point.
struct SharedMasks {
    one_time: Scalar,
    amount: Scalar,
    blind: Scalar,
    asset: Scalar,
}

impl SharedMasks {
    fn derive(shared: &Point) -> Self {
        let shared = shared.to_bytes();
        Self {
            one_time: Scalar::hash_from(ONE_TIME_DST, &[&shared]),
            amount: Scalar::hash_from(AMOUNT_MASK_DST, &[&shared]),
            blind: Scalar::hash_from(BLIND_MASK_DST, &[&shared]),
            asset: Scalar::hash_from(ASSET_BLIND_DST, &[&shared]),
        }
    }
}

impl CoinV2 {
    pub const VERSION: u8 = 2;

    /// One-time public key: `H(shared) * g + owner public key`.
    pub fn public_key(&self) -> &Point {
        &self.public_key
    }

    /// `value * value_base + randomness * g`.
    pub fn commitment(&self) -> &Point {
        &self.commitment
    }

    /// Sender's ephemeral point the recipient derives the shared secret from.
    pub fn tx_random(&self) -> &Point {
        &self.tx_random
    }

    /// Blinded asset tag, present for non-native tokens.
    pub fn asset_tag(&self) -> Option<&Point> {
        self.asset_tag.as_ref()
    }

    /// Payment message.
    pub fn info(&self) -> &[u8] {
        &self.info
    }

    /// Position in the global coin set, if admitted.
    pub fn index(&self) -> Option<u64> {
        self.index
    }

    /// Records the position assigned on admission.
    pub fn with_index(mut self, index: u64) -> Self {
        self.index = Some(index);
        self
    }

    /// Base the amount is committed to: the blinded asset tag, else `h`.
    pub fn value_base(&self) -> Point {
        self.asset_tag.unwrap_or_else(generator_h)
    }

    pub(crate) fn decrypt(&self, keys: &KeySet) -> Result<DecryptedCoin> {
        let shared = self.tx_random * *keys.view_secret();
        let masks = SharedMasks::derive(&shared);

        let expected = Point::mul_base(&masks.one_time) + *keys.public_key();
        if !bool::from(expected.ct_eq(&self.public_key)) {
            return Err(Error::DecryptionFailure);
        }

        let value = (self.encrypted_amount - masks.amount)
            .to_u64()
            .ok_or(Error::DecryptionFailure)?;
        let randomness = self.encrypted_randomness - masks.blind;

        let base = self.value_base();
        let reopened = base * Scalar::from(value) + Point::mul_base(&randomness);
        if !bool::from(reopened.ct_eq(&self.commitment)) {
            return Err(Error::DecryptionFailure);
        }

        // C = v*(A + t*g) + b*g = v*A + (v*t + b)*g
        let (asset_base, commitment_blinding) = match self.asset_tag {
            Some(tag) => (
                tag - Point::mul_base(&masks.asset),
                Scalar::from(value) * masks.asset + randomness,
            ),
            None => (generator_h(), randomness),
        };

        let secret = masks.one_time + *keys.spend_secret();
        let key_image = key_image_base(&[&self.public_key.to_bytes()]) * secret;

        Ok(DecryptedCoin {
            coin: self.clone().into(),
            value,
            randomness,
            commitment_blinding,
            asset_base,
            key_image,
        })
    }
}

/// Opening of a freshly created coin, known only to its creator and owner.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CoinOpening {
    /// Blinding relative to [`CoinV2::value_base`].
    pub randomness: Scalar,
    /// Blinding relative to the unblinded asset base.
    pub commitment_blinding: Scalar,
}

/// Creates a version-2 coin paying `info.amount` to `info.address`.
///
/// A token id binds a blinded asset tag; `None` (or the native id) yields a
/// native coin. Every call draws fresh randomness.
///
/// # Errors
/// [`Error::ConstructionFailure`] if the payment message exceeds the
/// configured coin info size.
pub fn create_coin<R: CryptoRngCore>(
    info: &PaymentInfo,
    token: Option<&TokenId>,
    rng: &mut R,
) -> Result<CoinV2> {
    create_coin_with_opening(info, token, rng).map(|(coin, _)| coin)
}

pub(crate) fn create_coin_with_opening<R: CryptoRngCore>(
    info: &PaymentInfo,
    token: Option<&TokenId>,
    rng: &mut R,
) -> Result<(CoinV2, CoinOpening)> {
    check_info_size(&info.message)?;

    let tx_secret = Scalar::random(rng);
    let tx_random = Point::mul_base(&tx_secret);
    let masks = SharedMasks::derive(&(info.address.transmission_key * tx_secret));

    let asset_tag = token
        .filter(|id| !id.is_native())
        .map(|id| id.asset_base() + Point::mul_base(&masks.asset));
    let base = asset_tag.unwrap_or_else(generator_h);

    let amount = Scalar::from(info.amount);
    let randomness = Scalar::random(rng);
    let commitment_blinding = match asset_tag {
        Some(_) => amount * masks.asset + randomness,
        None => randomness,
    };

    let coin = CoinV2 {
        public_key: Point::mul_base(&masks.one_time) + info.address.public_key,
        commitment: base * amount + Point::mul_base(&randomness),
        tx_random,
        encrypted_amount: amount + masks.amount,
        encrypted_randomness: randomness + masks.blind,
        asset_tag,
        info: info.message.clone(),
        index: None,
    };
    Ok((
        coin,
        CoinOpening {
            randomness,
            commitment_blinding,
        },
    ))
}

impl TryFrom<CoinData> for CoinV2 {
    type Error = Error;

    fn try_from(data: CoinData) -> Result<Self> {
        if data.version != Self::VERSION {
            return Err(Error::UnsupportedCoinVersion(data.version));
        }
        Ok(Self {
            public_key: require(data.public_key, "PublicKey")?,
            commitment: require(data.commitment, "Commitment")?,
            tx_random: require(data.tx_random, "TxRandom")?,
            encrypted_amount: require(data.encrypted_amount, "EncryptedAmount")?,
            encrypted_randomness: require(data.encrypted_randomness, "EncryptedRandomness")?,
            asset_tag: data.asset_tag,
            info: data.info.unwrap_or_default(),
            index: data.index,
        })
    }
}

impl From<&CoinV2> for CoinData {
    fn from(coin: &CoinV2) -> Self {
        CoinData {
            version: CoinV2::VERSION,
            index: coin.index,
            public_key: Some(coin.public_key),
            commitment: Some(coin.commitment),
            tx_random: Some(coin.tx_random),
            encrypted_amount: Some(coin.encrypted_amount),
            encrypted_randomness: Some(coin.encrypted_randomness),
            asset_tag: coin.asset_tag,
            info: (!coin.info.is_empty()).then(|| coin.info.clone()),
            ..CoinData::default()
        }
    }
}

impl Serialize for CoinV2 {
    fn serialize<S: Serializer>(&self, s: S) -> core::result::Result<S::Ok, S::Error> {
        CoinData::from(self).serialize(s)
    }
}

impl<'de> Deserialize<'de> for CoinV2 {
    fn deserialize<D: Deserializer<'de>>(d: D) -> core::result::Result<Self, D::Error> {
        CoinV2::try_from(CoinData::deserialize(d)?).map_err(serde::de::Error::custom)
    }
}

use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;

use super::{asset_base, check_info_size, key_image_base, require, CoinData, DecryptedCoin, PaymentInfo, TokenId};
use crate::keys::KeySet;
use crate::primitives::hybrid::{self, HybridCiphertext};
use crate::primitives::{Point, Scalar};
use crate::{Error, Result};

/// Plaintext opening carried in the ciphertext: amount (8, LE) then randomness (32).
const OPENING_BYTES: usize = 8 + 32;

/// Version-1 coin: a Pedersen commitment owned by a long-lived public key.
///
/// The opening is either visible (`value`, `randomness`) or hybrid-encrypted
/// to the owner's transmission key.
#[derive(Clone, Debug, PartialEq)]
pub struct CoinV1 {
    pub(crate) public_key: Point,
    pub(crate) commitment: Point,
    pub(crate) value: Option<u64>,
    pub(crate) randomness: Option<Scalar>,
    pub(crate) ciphertext: Option<HybridCiphertext>,
    pub(crate) info: Vec<u8>,
    pub(crate) token_id: Option<TokenId>,
    pub(crate) index: Option<u64>,
}

impl CoinV1 {
    pub const VERSION: u8 = 1;

    /// Owner's long-lived public key.
    pub fn public_key(&self) -> &Point {
        &self.public_key
    }

    /// `value * asset_base + randomness * g`.
    pub fn commitment(&self) -> &Point {
        &self.commitment
    }

    /// Asset of the coin; `None` is the native asset.
    pub fn token_id(&self) -> Option<&TokenId> {
        self.token_id.as_ref()
    }

    /// True when the opening travels encrypted.
    pub fn is_hidden(&self) -> bool {
        self.value.is_none()
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

    fn opening(&self, keys: &KeySet) -> Result<(u64, Scalar)> {
        if let (Some(value), Some(randomness)) = (self.value, self.randomness) {
            return Ok((value, randomness));
        }

        let ciphertext = self.ciphertext.as_ref().ok_or(Error::DecryptionFailure)?;
        let plaintext = hybrid::decrypt(keys.view_secret(), ciphertext)?;
        if plaintext.len() != OPENING_BYTES {
            return Err(Error::DecryptionFailure);
        }

        let mut amount = [0u8; 8];
        amount.copy_from_slice(&plaintext[..8]);
        let randomness =
            Scalar::from_canonical_bytes(&plaintext[8..]).map_err(|_| Error::DecryptionFailure)?;
        Ok((u64::from_le_bytes(amount), randomness))
    }

    pub(crate) fn decrypt(&self, keys: &KeySet) -> Result<DecryptedCoin> {
        if self.public_key != *keys.public_key() {
            return Err(Error::DecryptionFailure);
        }

        let (value, randomness) = self.opening(keys)?;
        let base = asset_base(self.token_id.as_ref());
        let reopened = base * Scalar::from(value) + Point::mul_base(&randomness);
        if !bool::from(reopened.ct_eq(&self.commitment)) {
            return Err(Error::DecryptionFailure);
        }

        let key_image = key_image_base(&[
            &self.commitment.to_bytes(),
            &self.public_key.to_bytes(),
        ]) * *keys.spend_secret();

        Ok(DecryptedCoin {
            coin: self.clone().into(),
            value,
            randomness,
            commitment_blinding: randomness,
            asset_base: base,
            key_image,
        })
    }
}

/// Creates a version-1 coin paying `info.amount` to `info.address`.
///
/// With `hidden` the opening is encrypted to the recipient's transmission
/// key; otherwise it is carried in the clear.
///
/// # Errors
/// [`Error::ConstructionFailure`] if the payment message exceeds the
/// configured coin info size.
pub fn create_plain_coin<R: CryptoRngCore>(
    info: &PaymentInfo,
    token: Option<&TokenId>,
    hidden: bool,
    rng: &mut R,
) -> Result<CoinV1> {
    check_info_size(&info.message)?;

    let token_id = token.copied().filter(|id| !id.is_native());
    let randomness = Scalar::random(rng);
    let commitment =
        asset_base(token_id.as_ref()) * Scalar::from(info.amount) + Point::mul_base(&randomness);

    let (value, randomness, ciphertext) = if hidden {
        let mut opening = Vec::with_capacity(OPENING_BYTES);
        opening.extend_from_slice(&info.amount.to_le_bytes());
        opening.extend_from_slice(&randomness.to_bytes());
        let ciphertext = hybrid::encrypt(&info.address.transmission_key, &opening, rng)?;
        (None, None, Some(ciphertext))
    } else {
        (Some(info.amount), Some(randomness), None)
    };

    Ok(CoinV1 {
        public_key: info.address.public_key,
        commitment,
        value,
        randomness,
        ciphertext,
        info: info.message.clone(),
        token_id,
        index: None,
    })
}

impl TryFrom<CoinData> for CoinV1 {
    type Error = Error;

    fn try_from(data: CoinData) -> Result<Self> {
        if data.version != Self::VERSION {
            return Err(Error::UnsupportedCoinVersion(data.version));
        }
        let ciphertext = data
            .ciphertext
            .as_deref()
            .map(HybridCiphertext::from_bytes)
            .transpose()
            .map_err(|_| Error::Deserialization("Malformed coin ciphertext".to_string()))?;

        if data.value.is_none() && ciphertext.is_none() {
            return Err(Error::Deserialization(
                "Plain coin carries neither Value nor Ciphertext".to_string(),
            ));
        }
        if data.value.is_some() && data.randomness.is_none() {
            return Err(Error::Deserialization(
                "Plain coin carries Value without Randomness".to_string(),
            ));
        }

        Ok(Self {
            public_key: require(data.public_key, "PublicKey")?,
            commitment: require(data.commitment, "Commitment")?,
            value: data.value,
            randomness: data.randomness,
            ciphertext,
            info: data.info.unwrap_or_default(),
            token_id: data.token_id,
            index: data.index,
        })
    }
}

impl From<&CoinV1> for CoinData {
    fn from(coin: &CoinV1) -> Self {
        CoinData {
            version: CoinV1::VERSION,
            index: coin.index,
            public_key: Some(coin.public_key),
            commitment: Some(coin.commitment),
            value: coin.value,
            randomness: coin.randomness,
            ciphertext: coin.ciphertext.as_ref().map(HybridCiphertext::to_bytes),
            info: (!coin.info.is_empty()).then(|| coin.info.clone()),
            token_id: coin.token_id,
            ..CoinData::default()
        }
    }
}

use std::collections::BTreeSet;

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::proof::{balance_excess, BalanceProof, RangeProof, RangeStatement, RangeWitness};
use super::{
    InputRecord, ProofContext, SubTransaction, TokenTransaction, Transaction, TxBody, TxType,
    TX_VERSION,
};
use crate::coin::{
    asset_base, create_coin_with_opening, Coin, CoinData, PaymentInfo, PaymentInfoData, TokenId,
};
use crate::config::BridgeConfig;
use crate::encoding::{amount_string, base64_bytes, option_base64_bytes};
use crate::keys::KeySet;
use crate::primitives::{Point, Scalar};
use crate::wallet::KeyEncoding;
use crate::{Error, Result};

/// Token transfer part of a transaction.
#[derive(Clone, Debug)]
pub struct TokenParams {
    pub token_id: TokenId,
    pub payments: Vec<PaymentInfo>,
    pub input_coins: Vec<Coin>,
}

/// Everything needed to build a transaction.
#[derive(Clone, Debug)]
pub struct TransactionParams {
    pub sender: KeySet,
    pub payments: Vec<PaymentInfo>,
    pub input_coins: Vec<Coin>,
    pub fee: u64,
    pub info: Vec<u8>,
    /// Absent for native-asset transactions.
    pub token: Option<TokenParams>,
}

/// Host form of [`TokenParams`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TokenParamsData {
    #[serde(rename = "TokenID", default)]
    pub token_id: String,
    #[serde(default)]
    pub payment_info: Vec<PaymentInfoData>,
    #[serde(default)]
    pub input_coins: Vec<CoinData>,
}

/// Host form of [`TransactionParams`].
///
/// Ring-decoy and metadata fields sent by the host are ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionParamsData {
    #[serde(rename = "SenderSK", with = "base64_bytes")]
    pub sender_sk: Vec<u8>,
    #[serde(default)]
    pub payment_info: Vec<PaymentInfoData>,
    #[serde(default)]
    pub input_coins: Vec<CoinData>,
    #[serde(default, with = "amount_string")]
    pub fee: u64,
    #[serde(default, with = "option_base64_bytes")]
    pub info: Option<Vec<u8>>,
    #[serde(default)]
    pub token_params: Option<TokenParamsData>,
}

impl TransactionParams {
    /// Resolves the host form: derives the sender key set, decodes addresses
    /// and parses coins.
    pub fn from_data(data: TransactionParamsData, encoding: &dyn KeyEncoding) -> Result<Self> {
        let sender = KeySet::from_private_bytes(&data.sender_sk, encoding)?;
        let token = data
            .token_params
            .map(|token| TokenParams::from_data(token, encoding))
            .transpose()?;

        Ok(Self {
            sender,
            payments: payments_from_data(&data.payment_info, encoding)?,
            input_coins: coins_from_data(data.input_coins)?,
            fee: data.fee,
            info: data.info.unwrap_or_default(),
            token,
        })
    }
}

impl TokenParams {
    pub fn from_data(data: TokenParamsData, encoding: &dyn KeyEncoding) -> Result<Self> {
        let token_id = TokenId::parse_optional(&data.token_id)?.ok_or_else(|| {
            Error::Deserialization("TokenParams require a non-native TokenID".to_string())
        })?;
        Ok(Self {
            token_id,
            payments: payments_from_data(&data.payment_info, encoding)?,
            input_coins: coins_from_data(data.input_coins)?,
        })
    }
}

fn payments_from_data(data: &[PaymentInfoData], encoding: &dyn KeyEncoding) -> Result<Vec<PaymentInfo>> {
    data.iter()
        .map(|info| PaymentInfo::from_data(info, encoding))
        .collect()
}

fn coins_from_data(data: Vec<CoinData>) -> Result<Vec<Coin>> {
    data.into_iter().map(Coin::try_from).collect()
}

/// How input coins are interpreted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum InputScheme {
    /// Confidential coins spent into confidential coins.
    Confidential,
    /// Plain coins converted into confidential coins of the same asset.
    Plain,
}

/// One artifact to build.
struct Artifact<'a> {
    tx_type: TxType,
    scheme: InputScheme,
    sender: &'a KeySet,
    token: Option<&'a TokenId>,
    payments: &'a [PaymentInfo],
    inputs: &'a [Coin],
    fee: u64,
    info: &'a [u8],
    lock_time: i64,
    token_tx_hash: Option<String>,
}

/// Builds a transfer transaction.
///
/// Without token parameters this is a single native artifact (`n`); with
/// them, a token artifact and the native artifact paying its fee (`tp`).
///
/// # Errors
/// - [`Error::InvalidTimestamp`] if `timestamp` lies outside the configured window
/// - [`Error::ConstructionFailure`] if inputs cannot be opened, amounts do not
///   balance, or configured limits are exceeded
pub fn build_transaction<R: CryptoRngCore>(
    params: &TransactionParams,
    timestamp: i64,
    rng: &mut R,
) -> Result<Transaction> {
    build(params, timestamp, InputScheme::Confidential, crate::config::get(), rng)
}

/// Builds a conversion transaction: plain input coins become confidential
/// output coins of the same asset (`cv`, or `tcv` for tokens).
///
/// # Errors
/// As [`build_transaction`], and [`Error::ConversionMismatch`] if an input
/// coin's asset differs from the asset being converted.
pub fn build_conversion_transaction<R: CryptoRngCore>(
    params: &TransactionParams,
    timestamp: i64,
    rng: &mut R,
) -> Result<Transaction> {
    build(params, timestamp, InputScheme::Plain, crate::config::get(), rng)
}

fn build<R: CryptoRngCore>(
    params: &TransactionParams,
    timestamp: i64,
    scheme: InputScheme,
    config: &BridgeConfig,
    rng: &mut R,
) -> Result<Transaction> {
    check_timestamp(timestamp, config)?;

    let Some(token) = params.token.as_ref() else {
        let tx_type = match scheme {
            InputScheme::Confidential => TxType::Normal,
            InputScheme::Plain => TxType::Conversion,
        };
        debug!(tx_type = tx_type.as_str(), inputs = params.input_coins.len(), outputs = params.payments.len(), "building transaction");

        let tx = build_artifact(
            Artifact {
                tx_type,
                scheme,
                sender: &params.sender,
                token: None,
                payments: &params.payments,
                inputs: &params.input_coins,
                fee: params.fee,
                info: &params.info,
                lock_time: timestamp,
                token_tx_hash: None,
            },
            config,
            rng,
        )?;
        return Ok(Transaction::Native(tx));
    };

    let tx_type = match scheme {
        InputScheme::Confidential => TxType::Token,
        InputScheme::Plain => TxType::TokenConversion,
    };
    debug!(
        tx_type = tx_type.as_str(),
        token_id = %token.token_id,
        inputs = params.input_coins.len(),
        token_inputs = token.input_coins.len(),
        "building token transaction"
    );

    let token_tx = build_artifact(
        Artifact {
            tx_type,
            scheme,
            sender: &params.sender,
            token: Some(&token.token_id),
            payments: &token.payments,
            inputs: &token.input_coins,
            fee: 0,
            info: &[],
            lock_time: timestamp,
            token_tx_hash: None,
        },
        config,
        rng,
    )
    .map_err(bundle_failure("token artifact"))?;

    let token_tx_hash = token_tx.hash()?;
    let fee_tx = build_artifact(
        Artifact {
            tx_type,
            scheme: InputScheme::Confidential,
            sender: &params.sender,
            token: None,
            payments: &params.payments,
            inputs: &params.input_coins,
            fee: params.fee,
            info: &params.info,
            lock_time: timestamp,
            token_tx_hash: Some(token_tx_hash),
        },
        config,
        rng,
    )
    .map_err(bundle_failure("fee artifact"))?;

    Ok(Transaction::Token(TokenTransaction {
        tx_type,
        fee_tx,
        token_tx,
    }))
}

/// Errors inside a token bundle fail the whole bundle; asset mismatches keep their kind.
fn bundle_failure(part: &'static str) -> impl Fn(Error) -> Error {
    move |error| match error {
        Error::ConversionMismatch(_) => error,
        Error::ConstructionFailure(reason) => Error::ConstructionFailure(format!("{part}: {reason}")),
        other => Error::ConstructionFailure(format!("{part}: {other}")),
    }
}

fn check_timestamp(timestamp: i64, config: &BridgeConfig) -> Result<()> {
    if timestamp < config.min_timestamp || timestamp > config.max_timestamp {
        return Err(Error::InvalidTimestamp {
            timestamp,
            min: config.min_timestamp,
            max: config.max_timestamp,
        });
    }
    Ok(())
}

fn check_limits(artifact: &Artifact<'_>, config: &BridgeConfig) -> Result<()> {
    if artifact.inputs.is_empty() {
        return Err(Error::ConstructionFailure("No input coins".to_string()));
    }
    if artifact.inputs.len() > config.max_inputs {
        return Err(Error::ConstructionFailure(format!(
            "{} input coins exceed the limit of {}",
            artifact.inputs.len(),
            config.max_inputs
        )));
    }
    if artifact.payments.len() > config.max_outputs {
        return Err(Error::ConstructionFailure(format!(
            "{} outputs exceed the limit of {}",
            artifact.payments.len(),
            config.max_outputs
        )));
    }
    if artifact.info.len() > config.max_info_size {
        return Err(Error::ConstructionFailure(format!(
            "Info of {} bytes exceeds {}",
            artifact.info.len(),
            config.max_info_size
        )));
    }
    Ok(())
}

fn build_artifact<R: CryptoRngCore>(
    artifact: Artifact<'_>,
    config: &BridgeConfig,
    rng: &mut R,
) -> Result<SubTransaction> {
    check_limits(&artifact, config)?;
    let base = asset_base(artifact.token);

    let mut inputs = Vec::with_capacity(artifact.inputs.len());
    let mut input_blinding = Scalar::ZERO;
    let mut total_in: u128 = 0;
    let mut key_images = BTreeSet::new();

    for (i, coin) in artifact.inputs.iter().enumerate() {
        let expected_version = match artifact.scheme {
            InputScheme::Confidential => 2,
            InputScheme::Plain => 1,
        };
        if coin.version() != expected_version {
            return Err(Error::ConstructionFailure(format!(
                "Input coin {i} has version {}, expected {expected_version}",
                coin.version()
            )));
        }

        let opened = coin.decrypt(artifact.sender).map_err(|_| {
            Error::ConstructionFailure(format!("Input coin {i} cannot be opened by the sender"))
        })?;

        if opened.asset_base != base {
            let reason = format!("Input coin {i} holds a different asset");
            return Err(match artifact.scheme {
                InputScheme::Plain => Error::ConversionMismatch(reason),
                InputScheme::Confidential => Error::ConstructionFailure(reason),
            });
        }
        if !key_images.insert(opened.key_image.to_bytes()) {
            return Err(Error::ConstructionFailure(format!(
                "Input coin {i} is spent twice"
            )));
        }

        total_in += u128::from(opened.value);
        input_blinding = input_blinding + opened.commitment_blinding;
        inputs.push(InputRecord {
            key_image: opened.key_image,
            commitment: *coin.commitment(),
        });
    }

    let total_out: u128 = artifact
        .payments
        .iter()
        .map(|payment| u128::from(payment.amount))
        .sum::<u128>()
        + u128::from(artifact.fee);
    if total_in != total_out {
        return Err(Error::ConstructionFailure(format!(
            "Inputs total {total_in} but outputs plus fee total {total_out}"
        )));
    }

    let mut outputs = Vec::with_capacity(artifact.payments.len());
    let mut witnesses = Vec::with_capacity(artifact.payments.len());
    let mut output_blinding = Scalar::ZERO;
    for payment in artifact.payments {
        let (coin, opening) = create_coin_with_opening(payment, artifact.token, rng)?;
        witnesses.push(RangeWitness {
            value: payment.amount,
            blinding: opening.randomness,
        });
        output_blinding = output_blinding + opening.commitment_blinding;
        outputs.push(coin);
    }

    let context = ProofContext {
        tx_type: artifact.tx_type,
        lock_time: artifact.lock_time,
        fee: artifact.fee,
        info: artifact.info,
        token_id: artifact.token,
        token_tx_hash: artifact.token_tx_hash.as_deref(),
        inputs: &inputs,
        outputs: &outputs,
    }
    .digest();

    let statements: Vec<RangeStatement> = outputs
        .iter()
        .map(|coin| RangeStatement {
            commitment: *coin.commitment(),
            base: coin.value_base(),
        })
        .collect();
    let range_proof = RangeProof::prove(&statements, &witnesses, &context, rng)?;

    let input_commitments: Vec<Point> = inputs.iter().map(|input| input.commitment).collect();
    let output_commitments: Vec<Point> = outputs.iter().map(|coin| *coin.commitment()).collect();
    let excess = balance_excess(&input_commitments, &output_commitments, artifact.fee, &base);
    let balance_proof =
        BalanceProof::prove(&excess, &(input_blinding - output_blinding), &context, rng)?;

    let body = TxBody {
        version: TX_VERSION,
        tx_type: artifact.tx_type,
        lock_time: artifact.lock_time,
        fee: artifact.fee,
        info: artifact.info.to_vec(),
        token_id: artifact.token.copied(),
        token_tx_hash: artifact.token_tx_hash,
        inputs,
        outputs,
        range_proof,
        balance_proof,
    };

    let signing_key = artifact.sender.signing_key();
    let sig = signing_key.sign(&body.signing_digest()?, rng);

    Ok(SubTransaction {
        body,
        sig_pub_key: signing_key.verifying_key(),
        sig,
    })
}

//! Signed, balance-preserving transfer artifacts.
//!
//! A [`Transaction`] is either a single native-asset [`SubTransaction`] or a
//! [`TokenTransaction`] bundling a native fee-paying artifact with a token
//! transfer artifact. Transactions are immutable once built; afterwards they
//! are only hashed, encoded or self-checked.

mod builder;
pub mod proof;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::coin::{asset_base, CoinV2, TokenId};
use crate::encoding::{amount_string, base64_bytes, to_json_bytes};
use crate::primitives::{Point, Signature, VerifyingKey};
use crate::wallet::KeyEncoding;
use crate::{Error, Result};

pub use builder::{
    build_conversion_transaction, build_transaction, TokenParams, TokenParamsData,
    TransactionParams, TransactionParamsData,
};
pub use proof::{BalanceProof, RangeProof, RangeStatement};

/// Version of the transaction format.
pub const TX_VERSION: u8 = 2;

/// Transaction kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TxType {
    /// Native-asset transfer between confidential coins.
    #[serde(rename = "n")]
    Normal,
    /// Plain coins converted into confidential coins.
    #[serde(rename = "cv")]
    Conversion,
    /// Token transfer with a native fee artifact.
    #[serde(rename = "tp")]
    Token,
    /// Token conversion with a native fee artifact.
    #[serde(rename = "tcv")]
    TokenConversion,
}

impl TxType {
    /// Wire tag: `n`, `cv`, `tp` or `tcv`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Normal => "n",
            TxType::Conversion => "cv",
            TxType::Token => "tp",
            TxType::TokenConversion => "tcv",
        }
    }
}

/// A spent coin as recorded in a transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputRecord {
    pub key_image: Point,
    pub commitment: Point,
}

/// Unsigned content of a sub-transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TxBody {
    pub version: u8,
    #[serde(rename = "Type")]
    pub tx_type: TxType,
    pub lock_time: i64,
    #[serde(with = "amount_string")]
    pub fee: u64,
    #[serde(default, with = "base64_bytes")]
    pub info: Vec<u8>,
    #[serde(rename = "TokenID", default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<TokenId>,
    /// Hash of the token artifact this fee artifact pays for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_tx_hash: Option<String>,
    pub inputs: Vec<InputRecord>,
    pub outputs: Vec<CoinV2>,
    pub range_proof: RangeProof,
    pub balance_proof: BalanceProof,
}

/// Public fields the proofs of a sub-transaction are bound to.
pub(crate) struct ProofContext<'a> {
    pub tx_type: TxType,
    pub lock_time: i64,
    pub fee: u64,
    pub info: &'a [u8],
    pub token_id: Option<&'a TokenId>,
    pub token_tx_hash: Option<&'a str>,
    pub inputs: &'a [InputRecord],
    pub outputs: &'a [CoinV2],
}

impl ProofContext<'_> {
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new()
            .chain_update(self.tx_type.as_str())
            .chain_update(self.lock_time.to_le_bytes())
            .chain_update(self.fee.to_le_bytes())
            .chain_update((self.info.len() as u64).to_le_bytes())
            .chain_update(self.info);
        if let Some(token_id) = self.token_id {
            hasher.update(token_id.as_bytes());
        }
        if let Some(hash) = self.token_tx_hash {
            hasher.update(hash.as_bytes());
        }
        for input in self.inputs {
            hasher.update(input.key_image.to_bytes());
            hasher.update(input.commitment.to_bytes());
        }
        for output in self.outputs {
            hasher.update(output.public_key().to_bytes());
            hasher.update(output.commitment().to_bytes());
            hasher.update(output.tx_random().to_bytes());
        }
        hasher.finalize().into()
    }
}

impl TxBody {
    fn proof_context(&self) -> [u8; 32] {
        ProofContext {
            tx_type: self.tx_type,
            lock_time: self.lock_time,
            fee: self.fee,
            info: &self.info,
            token_id: self.token_id.as_ref(),
            token_tx_hash: self.token_tx_hash.as_deref(),
            inputs: &self.inputs,
            outputs: &self.outputs,
        }
        .digest()
    }

    /// Digest the sender signs: SHA-256 of the canonical JSON body.
    pub fn signing_digest(&self) -> Result<[u8; 32]> {
        Ok(Sha256::digest(to_json_bytes(self)?).into())
    }

    fn range_statements(&self) -> Vec<RangeStatement> {
        self.outputs
            .iter()
            .map(|coin| RangeStatement {
                commitment: *coin.commitment(),
                base: coin.value_base(),
            })
            .collect()
    }

    fn excess(&self) -> Point {
        let inputs: Vec<Point> = self.inputs.iter().map(|input| input.commitment).collect();
        let outputs: Vec<Point> = self.outputs.iter().map(|coin| *coin.commitment()).collect();
        proof::balance_excess(&inputs, &outputs, self.fee, &asset_base(self.token_id.as_ref()))
    }
}

/// A signed sub-transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubTransaction {
    #[serde(flatten)]
    pub body: TxBody,
    pub sig_pub_key: VerifyingKey,
    pub sig: Signature,
}

impl SubTransaction {
    /// Hex SHA-256 of the canonical JSON.
    pub fn hash(&self) -> Result<String> {
        hash_json(self)
    }

    /// Re-checks the proofs and signature of this artifact.
    pub fn verify(&self) -> Result<()> {
        let digest = self.body.signing_digest()?;
        if !self.sig_pub_key.verify(&digest, &self.sig) {
            return Err(Error::ConstructionFailure("Invalid sender signature".to_string()));
        }

        let context = self.body.proof_context();
        if !self
            .body
            .range_proof
            .verify(&self.body.range_statements(), &context)
        {
            return Err(Error::ConstructionFailure("Invalid range proof".to_string()));
        }
        if !self.body.balance_proof.verify(&self.body.excess(), &context) {
            return Err(Error::ConstructionFailure("Invalid balance proof".to_string()));
        }
        Ok(())
    }
}

/// Token transfer bundled with the native artifact paying its fee.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TokenTransaction {
    #[serde(rename = "Type")]
    pub tx_type: TxType,
    /// Native fee-paying artifact.
    #[serde(rename = "Tx")]
    pub fee_tx: SubTransaction,
    /// Token transfer artifact.
    #[serde(rename = "TxTokenData")]
    pub token_tx: SubTransaction,
}

/// A built transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transaction {
    Native(SubTransaction),
    Token(TokenTransaction),
}

impl Transaction {
    pub fn tx_type(&self) -> TxType {
        match self {
            Transaction::Native(tx) => tx.body.tx_type,
            Transaction::Token(tx) => tx.tx_type,
        }
    }

    /// Native fee paid by the transaction.
    pub fn fee(&self) -> u64 {
        match self {
            Transaction::Native(tx) => tx.body.fee,
            Transaction::Token(tx) => tx.fee_tx.body.fee,
        }
    }

    /// Canonical JSON serialization.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        to_json_bytes(self)
    }

    /// Hex SHA-256 of the canonical JSON.
    pub fn hash(&self) -> Result<String> {
        hash_json(self)
    }

    /// Checksummed text encoding of the canonical JSON.
    pub fn encode(&self, encoding: &dyn KeyEncoding) -> Result<String> {
        encoding.encode_transaction(&self.to_json_bytes()?)
    }

    /// Re-checks every proof and signature, and that a token bundle's fee
    /// artifact commits to its token artifact.
    ///
    /// This is a self-consistency check only; it does not consult ledger state.
    pub fn verify(&self) -> Result<()> {
        match self {
            Transaction::Native(tx) => tx.verify(),
            Transaction::Token(bundle) => {
                let token_hash = bundle.token_tx.hash()?;
                if bundle.fee_tx.body.token_tx_hash.as_deref() != Some(token_hash.as_str()) {
                    return Err(Error::ConstructionFailure(
                        "Fee artifact is not bound to the token artifact".to_string(),
                    ));
                }
                bundle.token_tx.verify()?;
                bundle.fee_tx.verify()
            }
        }
    }
}

/// Result returned to the host for a built transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TransactionResult {
    #[serde(rename = "b58EncodedTx")]
    pub encoded_tx: String,
    pub hash: String,
}

impl TransactionResult {
    pub fn new(tx: &Transaction, encoding: &dyn KeyEncoding) -> Result<Self> {
        Ok(Self {
            encoded_tx: tx.encode(encoding)?,
            hash: tx.hash()?,
        })
    }
}

fn hash_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(hex::encode(Sha256::digest(to_json_bytes(value)?)))
}

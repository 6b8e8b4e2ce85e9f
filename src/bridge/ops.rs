//! The bridge operations, one unit type per exported name.

use serde::{Deserialize, Serialize};

use super::{Context, Operation};
use crate::coin::{create_coin, decrypt_coin, CoinData, CoinV2, PaymentInfo, PaymentInfoData, TokenId};
use crate::encoding::{base64_bytes, decode_base64, encode_base64, from_json, to_json};
use crate::keys::{derive_key_set, derive_signing_public_key, KeySet, KeySetRecord};
use crate::primitives::group::ELEMENT_BYTES;
use crate::primitives::{hybrid, scalar_multiply_base, BlsKeyPair, HybridCiphertext, Point, Scalar};
use crate::transaction::{
    build_conversion_transaction, build_transaction, TransactionParams, TransactionParamsData,
    TransactionResult,
};
use crate::{Error, Result};

/// Builds a transfer transaction (`n` or `tp`).
pub struct CreateTransaction;

impl Operation for CreateTransaction {
    const NAME: &'static str = "createTransaction";
    type Request = TransactionParamsData;
    type Response = TransactionResult;

    fn decode(payload: &str) -> Result<Self::Request> {
        from_json(payload)
    }

    fn handle(request: Self::Request, ctx: &mut Context<'_>) -> Result<Self::Response> {
        let params = TransactionParams::from_data(request, ctx.encoding)?;
        let tx = build_transaction(&params, ctx.timestamp, &mut ctx.rng)?;
        TransactionResult::new(&tx, ctx.encoding)
    }

    fn encode(response: &Self::Response) -> Result<String> {
        to_json(response)
    }
}

/// Builds a conversion transaction (`cv` or `tcv`).
pub struct CreateConvertTx;

impl Operation for CreateConvertTx {
    const NAME: &'static str = "createConvertTx";
    type Request = TransactionParamsData;
    type Response = TransactionResult;

    fn decode(payload: &str) -> Result<Self::Request> {
        from_json(payload)
    }

    fn handle(request: Self::Request, ctx: &mut Context<'_>) -> Result<Self::Response> {
        let params = TransactionParams::from_data(request, ctx.encoding)?;
        let tx = build_conversion_transaction(&params, ctx.timestamp, &mut ctx.rng)?;
        TransactionResult::new(&tx, ctx.encoding)
    }

    fn encode(response: &Self::Response) -> Result<String> {
        to_json(response)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PrivateKeyRequest {
    #[serde(rename = "PrivateKey", with = "base64_bytes")]
    pub private_key: Vec<u8>,
}

/// Derives a key set from raw private-key bytes.
pub struct NewKeySetFromPrivate;

impl Operation for NewKeySetFromPrivate {
    const NAME: &'static str = "newKeySetFromPrivate";
    type Request = PrivateKeyRequest;
    type Response = KeySetRecord;

    fn decode(payload: &str) -> Result<Self::Request> {
        from_json(payload)
    }

    fn handle(request: Self::Request, ctx: &mut Context<'_>) -> Result<Self::Response> {
        Ok(derive_key_set(&request.private_key, ctx.encoding)?.to_record())
    }

    fn encode(response: &Self::Response) -> Result<String> {
        to_json(response)
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DecryptCoinRequest {
    pub coin: CoinData,
    /// Encoded private key of the owner.
    pub key_set: String,
}

/// Opens a coin with the owner's key; the coin's index is preserved.
pub struct DecryptCoin;

impl Operation for DecryptCoin {
    const NAME: &'static str = "decryptCoin";
    type Request = DecryptCoinRequest;
    type Response = CoinData;

    fn decode(payload: &str) -> Result<Self::Request> {
        from_json(payload)
    }

    fn handle(request: Self::Request, ctx: &mut Context<'_>) -> Result<Self::Response> {
        let keys = KeySet::from_encoded_private_key(&request.key_set, ctx.encoding)?;
        let decrypted = decrypt_coin(request.coin, &keys)?;
        Ok(CoinData::from(&decrypted))
    }

    fn encode(response: &Self::Response) -> Result<String> {
        to_json(response)
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateCoinRequest {
    pub payment_info: PaymentInfoData,
    #[serde(rename = "TokenID", default)]
    pub token_id: String,
}

/// Creates a confidential coin, with a blinded asset tag when a token id is given.
pub struct CreateCoin;

impl Operation for CreateCoin {
    const NAME: &'static str = "createCoin";
    type Request = CreateCoinRequest;
    type Response = CoinV2;

    fn decode(payload: &str) -> Result<Self::Request> {
        from_json(payload)
    }

    fn handle(request: Self::Request, ctx: &mut Context<'_>) -> Result<Self::Response> {
        let info = PaymentInfo::from_data(&request.payment_info, ctx.encoding)?;
        let token = TokenId::parse_optional(&request.token_id)?;
        create_coin(&info, token.as_ref(), &mut ctx.rng)
    }

    fn encode(response: &Self::Response) -> Result<String> {
        to_json(response)
    }
}

/// Deterministic BLS key pair from a base64 seed.
pub struct GenerateBlsKeyPair;

impl Operation for GenerateBlsKeyPair {
    const NAME: &'static str = "generateBLSKeyPairFromSeed";
    type Request = Vec<u8>;
    type Response = BlsKeyPair;

    fn decode(payload: &str) -> Result<Self::Request> {
        decode_base64(payload)
    }

    fn handle(request: Self::Request, _ctx: &mut Context<'_>) -> Result<Self::Response> {
        Ok(BlsKeyPair::from_seed(&request))
    }

    fn encode(response: &Self::Response) -> Result<String> {
        Ok(encode_base64(&response.to_bytes()))
    }
}

/// Splits `base64(key || rest)` into the 32-byte key and the remainder.
fn split_key(payload: &str) -> Result<([u8; ELEMENT_BYTES], Vec<u8>)> {
    let raw = decode_base64(payload)?;
    if raw.len() < ELEMENT_BYTES {
        return Err(Error::Deserialization(format!(
            "Payload must start with a {ELEMENT_BYTES}-byte key, got {} bytes",
            raw.len()
        )));
    }
    let mut key = [0u8; ELEMENT_BYTES];
    key.copy_from_slice(&raw[..ELEMENT_BYTES]);
    Ok((key, raw[ELEMENT_BYTES..].to_vec()))
}

/// Encrypts to a public key: payload is `base64(public key || message)`.
pub struct HybridEncrypt;

impl Operation for HybridEncrypt {
    const NAME: &'static str = "hybridEncrypt";
    type Request = (Point, Vec<u8>);
    type Response = HybridCiphertext;

    fn decode(payload: &str) -> Result<Self::Request> {
        let raw = decode_base64(payload)?;
        if raw.len() < ELEMENT_BYTES {
            return Err(Error::InvalidPublicKey(format!(
                "Expected a {ELEMENT_BYTES}-byte public key, got {} bytes",
                raw.len()
            )));
        }
        let public_key = Point::from_bytes(&raw[..ELEMENT_BYTES])?;
        Ok((public_key, raw[ELEMENT_BYTES..].to_vec()))
    }

    fn handle((public_key, message): Self::Request, ctx: &mut Context<'_>) -> Result<Self::Response> {
        hybrid::encrypt(&public_key, &message, &mut ctx.rng)
    }

    fn encode(response: &Self::Response) -> Result<String> {
        Ok(encode_base64(&response.to_bytes()))
    }
}

/// Decrypts with a private key: payload is `base64(private key || ciphertext)`.
///
/// The private key is reduced modulo the group order.
pub struct HybridDecrypt;

impl Operation for HybridDecrypt {
    const NAME: &'static str = "hybridDecrypt";
    type Request = (Scalar, Vec<u8>);
    type Response = Vec<u8>;

    fn decode(payload: &str) -> Result<Self::Request> {
        let (key, ciphertext) = split_key(payload)?;
        Ok((Scalar::from_bytes_mod_order(key), ciphertext))
    }

    fn handle((private_key, ciphertext): Self::Request, _ctx: &mut Context<'_>) -> Result<Self::Response> {
        hybrid::decrypt_bytes(&private_key, &ciphertext)
    }

    fn encode(response: &Self::Response) -> Result<String> {
        Ok(encode_base64(response))
    }
}

/// Multiplies the base generator by a base64 scalar.
pub struct ScalarMultBase;

impl Operation for ScalarMultBase {
    const NAME: &'static str = "scalarMultBase";
    type Request = Vec<u8>;
    type Response = Point;

    fn decode(payload: &str) -> Result<Self::Request> {
        decode_base64(payload)
    }

    fn handle(request: Self::Request, _ctx: &mut Context<'_>) -> Result<Self::Response> {
        scalar_multiply_base(&request)
    }

    fn encode(response: &Self::Response) -> Result<String> {
        Ok(encode_base64(&response.to_bytes()))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SignPublicKeyData {
    #[serde(rename = "privateKey")]
    pub private_key: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SignPublicKeyRequest {
    pub data: SignPublicKeyData,
}

/// Hex Schnorr public key of an encoded private key.
pub struct GetSignPublicKey;

impl Operation for GetSignPublicKey {
    const NAME: &'static str = "getSignPublicKey";
    type Request = SignPublicKeyRequest;
    type Response = String;

    fn decode(payload: &str) -> Result<Self::Request> {
        from_json(payload)
    }

    fn handle(request: Self::Request, ctx: &mut Context<'_>) -> Result<Self::Response> {
        let private_key = ctx.encoding.decode_private_key(&request.data.private_key)?;
        Ok(hex::encode(derive_signing_public_key(private_key.as_bytes())?))
    }

    fn encode(response: &Self::Response) -> Result<String> {
        Ok(response.clone())
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PoolWithdrawData {
    #[serde(rename = "privateKey")]
    pub private_key: String,
    pub amount: String,
    #[serde(rename = "paymentAddress")]
    pub payment_address: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PoolWithdrawRequest {
    pub data: PoolWithdrawData,
}

/// Signs `paymentAddress || amount` with the Schnorr key of an encoded private key.
pub struct SignPoolWithdraw;

impl SignPoolWithdraw {
    /// Message a withdrawal signature covers.
    pub fn message(payment_address: &str, amount: &str) -> Vec<u8> {
        let mut message = Vec::with_capacity(payment_address.len() + amount.len());
        message.extend_from_slice(payment_address.as_bytes());
        message.extend_from_slice(amount.as_bytes());
        message
    }
}

impl Operation for SignPoolWithdraw {
    const NAME: &'static str = "signPoolWithdraw";
    type Request = PoolWithdrawRequest;
    type Response = String;

    fn decode(payload: &str) -> Result<Self::Request> {
        from_json(payload)
    }

    fn handle(request: Self::Request, ctx: &mut Context<'_>) -> Result<Self::Response> {
        let private_key = ctx.encoding.decode_private_key(&request.data.private_key)?;
        let message = Self::message(&request.data.payment_address, &request.data.amount);
        let signature = private_key.signing_key().sign(&message, &mut ctx.rng);
        Ok(hex::encode(signature.to_bytes()))
    }

    fn encode(response: &Self::Response) -> Result<String> {
        Ok(response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Registry;
    use crate::keys::PrivateKey;
    use crate::primitives::{Signature, VerifyingKey};
    use crate::wallet::{Base58Check, KeyEncoding};

    fn encoded_key(seed: u8) -> String {
        Base58Check::default()
            .encode_private_key(&PrivateKey::from_bytes(&[seed; 64]).unwrap())
            .unwrap()
    }

    #[test]
    fn withdraw_signature_verifies_against_sign_public_key() {
        let registry = Registry::default();
        let key = encoded_key(11);

        let public = registry
            .invoke(
                GetSignPublicKey::NAME,
                &format!(r#"{{"data":{{"privateKey":"{key}"}}}}"#),
                0,
            )
            .unwrap();
        let signature = registry
            .invoke(
                SignPoolWithdraw::NAME,
                &format!(r#"{{"data":{{"privateKey":"{key}","amount":"100","paymentAddress":"abc"}}}}"#),
                0,
            )
            .unwrap();

        let public = VerifyingKey::from_bytes(&hex::decode(public).unwrap()).unwrap();
        let signature = Signature::from_bytes(&hex::decode(signature).unwrap()).unwrap();
        assert!(public.verify(b"abc100", &signature));
        assert!(!public.verify(b"abc101", &signature));
    }

    #[test]
    fn scalar_mult_base_of_one_is_generator() {
        let registry = Registry::default();
        let mut one = [0u8; 32];
        one[0] = 1;
        let result = registry
            .invoke(ScalarMultBase::NAME, &encode_base64(&one), 0)
            .unwrap();
        assert_eq!(
            decode_base64(&result).unwrap(),
            crate::primitives::generator_g().to_bytes()
        );
    }

    #[test]
    fn scalar_mult_base_rejects_non_canonical() {
        let registry = Registry::default();
        assert!(matches!(
            registry.invoke(ScalarMultBase::NAME, &encode_base64(&[0xFF; 32]), 0),
            Err(Error::InvalidScalarEncoding(_))
        ));
    }

    #[test]
    fn hybrid_ops_roundtrip() {
        let registry = Registry::default();
        let secret = [5u8; 32];
        let public = Point::mul_base(&Scalar::from_bytes_mod_order(secret));

        let mut request = public.to_bytes().to_vec();
        request.extend_from_slice(b"hello bridge");
        let ciphertext = registry
            .invoke(HybridEncrypt::NAME, &encode_base64(&request), 0)
            .unwrap();

        let mut request = secret.to_vec();
        request.extend_from_slice(&decode_base64(&ciphertext).unwrap());
        let plaintext = registry
            .invoke(HybridDecrypt::NAME, &encode_base64(&request), 0)
            .unwrap();
        assert_eq!(decode_base64(&plaintext).unwrap(), b"hello bridge");
    }

    #[test]
    fn hybrid_encrypt_rejects_bad_point() {
        let registry = Registry::default();
        assert!(matches!(
            registry.invoke(HybridEncrypt::NAME, &encode_base64(&[0xFF; 40]), 0),
            Err(Error::InvalidPublicKey(_))
        ));
        assert!(matches!(
            registry.invoke(HybridEncrypt::NAME, &encode_base64(&[1; 4]), 0),
            Err(Error::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn bls_op_is_deterministic() {
        let registry = Registry::default();
        let seed = encode_base64(b"committee");
        let a = registry.invoke(GenerateBlsKeyPair::NAME, &seed, 0).unwrap();
        let b = registry.invoke(GenerateBlsKeyPair::NAME, &seed, 0).unwrap();
        assert_eq!(a, b);
        assert_eq!(decode_base64(&a).unwrap().len(), 128);
    }

    #[test]
    fn malformed_json_is_a_deserialization_error() {
        let registry = Registry::default();
        assert!(matches!(
            registry.invoke(NewKeySetFromPrivate::NAME, "{not json", 0),
            Err(Error::Deserialization(_))
        ));
    }
}

mod common;

use common::{init_tracing, key_set, owned_coins, owned_plain_coins, payment_json, rng, sender_sk, NOW};
use privacy_bridge::coin::CoinData;
use privacy_bridge::encoding::{decode_base64, encode_base64};
use privacy_bridge::keys::KeySetRecord;
use privacy_bridge::primitives::{Signature, VerifyingKey};
use privacy_bridge::transaction::TxType;
use privacy_bridge::{
    Base58Check, Coin, Error, KeySet, Registry, Transaction, TransactionResult, TokenId,
};
use serde_json::json;

fn decode_result(result: &str) -> (TransactionResult, Transaction) {
    let result: TransactionResult = serde_json::from_str(result).expect("result parses");
    let json = Base58Check::default()
        .decode(&result.encoded_tx)
        .expect("encoded transaction decodes");
    let tx: Transaction = serde_json::from_slice(&json).expect("transaction parses");
    (result, tx)
}

fn output_total(outputs: &[privacy_bridge::CoinV2], owner: &KeySet) -> u64 {
    outputs
        .iter()
        .map(|coin| {
            Coin::from(coin.clone())
                .decrypt(owner)
                .expect("recipient opens output")
                .value
        })
        .sum()
}

#[test]
fn zero_private_key_is_a_fixed_regression_fixture() {
    init_tracing();
    let registry = Registry::default();
    let request = json!({ "PrivateKey": encode_base64(&[0u8; 64]) }).to_string();

    let first = registry
        .invoke("newKeySetFromPrivate", &request, NOW)
        .expect("zero key is accepted");
    let second = registry
        .invoke("newKeySetFromPrivate", &request, NOW)
        .expect("zero key is accepted");
    assert_eq!(first, second, "Key derivation must be deterministic");

    let record: KeySetRecord = serde_json::from_str(&first).expect("record parses");
    // 0 * G is the identity, whose Ristretto encoding is all zeroes.
    assert_eq!(
        encode_base64(&record.payment_address.public_key.to_bytes()),
        "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="
    );
    assert_eq!(record.private_key, vec![0u8; 64]);
    assert!(!record.payment_address_encoded.is_empty());
}

#[test]
fn short_private_key_is_rejected() {
    let registry = Registry::default();
    let request = json!({ "PrivateKey": encode_base64(&[1u8; 63]) }).to_string();
    assert!(matches!(
        registry.invoke("newKeySetFromPrivate", &request, NOW),
        Err(Error::InvalidKeyLength { expected: 64, actual: 63 })
    ));
}

#[test]
fn created_coin_decrypts_to_its_amount_and_keeps_index() {
    init_tracing();
    let registry = Registry::default();
    let owner = key_set(3);

    let request = json!({ "PaymentInfo": payment_json(&owner, 100) }).to_string();
    let coin = registry.invoke("createCoin", &request, NOW).expect("coin is created");

    let mut coin: CoinData = serde_json::from_str(&coin).expect("coin parses");
    assert_eq!(coin.version, 2);
    assert!(coin.asset_tag.is_none(), "Native coins carry no asset tag");
    coin.index = Some(7);

    let request = json!({
        "Coin": coin,
        "KeySet": common::encoded_private_key(&owner),
    })
    .to_string();
    let decrypted = registry.invoke("decryptCoin", &request, NOW).expect("owner opens coin");
    let decrypted: CoinData = serde_json::from_str(&decrypted).expect("decrypted coin parses");

    assert_eq!(decrypted.value, Some(100));
    assert_eq!(decrypted.index, Some(7));
    assert!(decrypted.key_image.is_some());
    assert!(decrypted.randomness.is_some());
}

#[test]
fn token_coin_roundtrip_through_bridge() {
    let registry = Registry::default();
    let owner = key_set(4);
    let token = TokenId::from_bytes([9; 32]);

    let request = json!({
        "PaymentInfo": payment_json(&owner, 42),
        "TokenID": token.to_string(),
    })
    .to_string();
    let coin: CoinData =
        serde_json::from_str(&registry.invoke("createCoin", &request, NOW).unwrap()).unwrap();
    assert!(coin.asset_tag.is_some(), "Token coins carry a blinded asset tag");

    let decrypted = privacy_bridge::coin::decrypt_coin(coin, &owner).expect("owner opens coin");
    assert_eq!(decrypted.value, 42);
    assert_eq!(decrypted.asset_base, token.asset_base());
}

#[test]
fn plain_coins_roundtrip_in_both_forms() {
    let registry = Registry::default();
    let owner = key_set(5);
    let mut rng = rng(5);

    for coin in owned_plain_coins(&owner, &[11, 12], None, &mut rng) {
        let hidden = coin.ciphertext.is_some();
        let request = json!({
            "Coin": coin,
            "KeySet": common::encoded_private_key(&owner),
        })
        .to_string();
        let decrypted: CoinData =
            serde_json::from_str(&registry.invoke("decryptCoin", &request, NOW).unwrap()).unwrap();
        assert_eq!(decrypted.version, 1);
        assert!(matches!(decrypted.value, Some(11) | Some(12)), "hidden={hidden}");
    }
}

#[test]
fn unknown_coin_version_is_explicit() {
    let registry = Registry::default();
    let owner = key_set(6);
    let request = json!({
        "Coin": { "Version": 3 },
        "KeySet": common::encoded_private_key(&owner),
    })
    .to_string();
    assert!(matches!(
        registry.invoke("decryptCoin", &request, NOW),
        Err(Error::UnsupportedCoinVersion(3))
    ));
}

#[test]
fn balanced_transaction_succeeds_and_unbalanced_fails() {
    init_tracing();
    let registry = Registry::default();
    let sender = key_set(7);
    let recipient = key_set(8);
    let mut rng = rng(7);
    let inputs = owned_coins(&sender, &[60, 50], None, &mut rng);

    let request = json!({
        "SenderSK": sender_sk(&sender),
        "PaymentInfo": [payment_json(&recipient, 100)],
        "InputCoins": inputs,
        "Fee": "10",
    })
    .to_string();
    let result = registry
        .invoke("createTransaction", &request, NOW)
        .expect("balanced transaction builds");

    let (result, tx) = decode_result(&result);
    assert_eq!(result.hash, tx.hash().unwrap());
    assert_eq!(tx.tx_type(), TxType::Normal);
    tx.verify().expect("transaction is self-consistent");

    let Transaction::Native(inner) = &tx else {
        panic!("native transfer expected");
    };
    assert_eq!(inner.body.inputs.len(), 2);
    assert_eq!(output_total(&inner.body.outputs, &recipient) + tx.fee(), 110);

    let request = json!({
        "SenderSK": sender_sk(&sender),
        "PaymentInfo": [payment_json(&recipient, 95)],
        "InputCoins": inputs,
        "Fee": "10",
    })
    .to_string();
    assert!(matches!(
        registry.invoke("createTransaction", &request, NOW),
        Err(Error::ConstructionFailure(_))
    ));
}

#[test]
fn transaction_outside_time_window_fails() {
    let registry = Registry::default();
    let sender = key_set(9);
    let mut rng = rng(9);
    let request = json!({
        "SenderSK": sender_sk(&sender),
        "PaymentInfo": [payment_json(&sender, 5)],
        "InputCoins": owned_coins(&sender, &[5], None, &mut rng),
        "Fee": "0",
    })
    .to_string();
    assert!(matches!(
        registry.invoke("createTransaction", &request, 0),
        Err(Error::InvalidTimestamp { timestamp: 0, .. })
    ));
}

#[test]
fn conversion_turns_plain_coins_into_confidential_outputs() {
    let registry = Registry::default();
    let sender = key_set(10);
    let mut rng = rng(10);

    let request = json!({
        "SenderSK": sender_sk(&sender),
        "PaymentInfo": [payment_json(&sender, 70)],
        "InputCoins": owned_plain_coins(&sender, &[40, 35], None, &mut rng),
        "Fee": "5",
    })
    .to_string();
    let (_, tx) = decode_result(&registry.invoke("createConvertTx", &request, NOW).unwrap());

    assert_eq!(tx.tx_type(), TxType::Conversion);
    tx.verify().expect("conversion is self-consistent");
    let Transaction::Native(inner) = &tx else {
        panic!("native conversion expected");
    };
    assert_eq!(output_total(&inner.body.outputs, &sender), 70);
}

#[test]
fn token_transfer_bundles_fee_and_token_artifacts() {
    init_tracing();
    let registry = Registry::default();
    let sender = key_set(11);
    let recipient = key_set(12);
    let token = TokenId::from_bytes([0x33; 32]);
    let mut rng = rng(11);

    let request = json!({
        "SenderSK": sender_sk(&sender),
        "PaymentInfo": [payment_json(&sender, 15)],
        "InputCoins": owned_coins(&sender, &[20], None, &mut rng),
        "Fee": "5",
        "TokenParams": {
            "TokenID": token.to_string(),
            "PaymentInfo": [payment_json(&recipient, 30)],
            "InputCoins": owned_coins(&sender, &[30], Some(&token), &mut rng),
        },
    })
    .to_string();
    let (_, tx) = decode_result(&registry.invoke("createTransaction", &request, NOW).unwrap());

    assert_eq!(tx.tx_type(), TxType::Token);
    tx.verify().expect("bundle is self-consistent");

    let Transaction::Token(bundle) = &tx else {
        panic!("token bundle expected");
    };
    assert_eq!(
        bundle.fee_tx.body.token_tx_hash.as_deref(),
        Some(bundle.token_tx.hash().unwrap().as_str())
    );
    assert_eq!(bundle.token_tx.body.token_id, Some(token));
    assert_eq!(output_total(&bundle.token_tx.body.outputs, &recipient), 30);
    assert_eq!(output_total(&bundle.fee_tx.body.outputs, &sender), 15);
}

#[test]
fn pool_withdraw_signature_matches_sign_public_key() {
    init_tracing();
    let registry = Registry::default();
    let key = common::encoded_private_key(&key_set(13));

    let public = registry
        .invoke("getSignPublicKey", &json!({ "data": { "privateKey": key } }).to_string(), NOW)
        .unwrap();
    let signature = registry
        .invoke(
            "signPoolWithdraw",
            &json!({ "data": { "privateKey": key, "amount": "100", "paymentAddress": "abc" } })
                .to_string(),
            NOW,
        )
        .unwrap();

    let public = VerifyingKey::from_bytes(&hex::decode(&public).unwrap()).unwrap();
    let signature = Signature::from_bytes(&hex::decode(&signature).unwrap()).unwrap();
    assert!(public.verify(b"abc100", &signature));
    assert!(!public.verify(b"abc1000", &signature));
}

#[test]
fn hybrid_operations_interoperate() {
    let registry = Registry::default();
    let owner = key_set(14);

    let mut request = owner.payment_address().transmission_key.to_bytes().to_vec();
    request.extend_from_slice(b"sealed");
    let ciphertext = registry
        .invoke("hybridEncrypt", &encode_base64(&request), NOW)
        .unwrap();

    let mut request = owner.view_secret().to_bytes().to_vec();
    request.extend_from_slice(&decode_base64(&ciphertext).unwrap());
    let plaintext = registry
        .invoke("hybridDecrypt", &encode_base64(&request), NOW)
        .unwrap();
    assert_eq!(decode_base64(&plaintext).unwrap(), b"sealed");
}

//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use privacy_bridge::coin::CoinData;
use privacy_bridge::encoding::encode_base64;
use privacy_bridge::{Base58Check, Coin, KeyEncoding, KeySet, PaymentInfo, TokenId};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Timestamp inside the default accepted window.
pub const NOW: i64 = 1_700_000_000;

/// Initialize test tracing (call once at the beginning of tests).
///
/// Only logs from the bridge crate are shown. Subsequent calls are safe and
/// will be ignored.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new("privacy_bridge=debug");

    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(filter)
        .try_init();
}

/// Seeded generator for tests that need reproducible randomness.
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Private-key bytes with every byte set to `seed`.
pub fn private_bytes(seed: u8) -> [u8; 64] {
    [seed; 64]
}

pub fn key_set(seed: u8) -> KeySet {
    KeySet::from_private_bytes(&private_bytes(seed), &Base58Check::default())
        .expect("64-byte keys are always valid")
}

pub fn encoded_private_key(keys: &KeySet) -> String {
    Base58Check::default()
        .encode_private_key(keys.private_key())
        .expect("private key encodes")
}

pub fn sender_sk(keys: &KeySet) -> String {
    encode_base64(keys.private_key().as_bytes())
}

/// Confidential coins owned by `owner`, as host records.
pub fn owned_coins(owner: &KeySet, amounts: &[u64], token: Option<&TokenId>, rng: &mut StdRng) -> Vec<CoinData> {
    amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            let info = PaymentInfo::new(*owner.payment_address(), *amount);
            let coin = privacy_bridge::coin::create_coin(&info, token, rng)
                .expect("coin creation succeeds")
                .with_index(i as u64);
            CoinData::from(&Coin::from(coin))
        })
        .collect()
}

/// Plain coins owned by `owner`, alternating visible and hidden openings.
pub fn owned_plain_coins(owner: &KeySet, amounts: &[u64], token: Option<&TokenId>, rng: &mut StdRng) -> Vec<CoinData> {
    amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            let info = PaymentInfo::new(*owner.payment_address(), *amount);
            let coin = privacy_bridge::coin::create_plain_coin(&info, token, i % 2 == 1, rng)
                .expect("plain coin creation succeeds");
            CoinData::from(&Coin::from(coin))
        })
        .collect()
}

/// Host payment entry for `recipient`.
pub fn payment_json(recipient: &KeySet, amount: u64) -> serde_json::Value {
    serde_json::json!({
        "PaymentAddress": recipient.encoded_payment_address(),
        "Amount": amount.to_string(),
    })
}

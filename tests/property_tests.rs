mod common;

use common::{key_set, owned_coins, rng};
use privacy_bridge::coin::{create_coin, create_plain_coin, decrypt_coin, CoinData};
use privacy_bridge::primitives::{hybrid, BlsKeyPair, Signature, SigningKey};
use privacy_bridge::transaction::{build_transaction, TransactionParams};
use privacy_bridge::{Coin, Error, KeySet, PaymentInfo, Point, Scalar, Transaction};
use proptest::prelude::*;

fn scalar_from(seed: u64) -> Scalar {
    Scalar::random(&mut rng(seed))
}

fn transfer(sender: &KeySet, recipient: &KeySet, inputs: &[u64], outputs: &[u64], fee: u64, seed: u64) -> TransactionParams {
    let mut rng = rng(seed);
    TransactionParams {
        sender: sender.clone(),
        payments: outputs
            .iter()
            .map(|amount| PaymentInfo::new(*recipient.payment_address(), *amount))
            .collect(),
        input_coins: owned_coins(sender, inputs, None, &mut rng)
            .into_iter()
            .map(|data| Coin::try_from(data).unwrap())
            .collect(),
        fee,
        info: Vec::new(),
        token: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn signature_verifies_for_any_key_and_message(seed in any::<u64>(), message in prop::collection::vec(any::<u8>(), 0..128)) {
        let mut rng = rng(seed);
        let key = SigningKey::new(Scalar::random(&mut rng), Scalar::random(&mut rng));
        let signature = key.sign(&message, &mut rng);

        prop_assert!(key.verifying_key().verify(&message, &signature));
    }

    #[test]
    fn mutated_message_is_rejected(seed in any::<u64>(), message in prop::collection::vec(any::<u8>(), 1..64), index in any::<prop::sample::Index>()) {
        let mut rng = rng(seed);
        let key = SigningKey::new(Scalar::random(&mut rng), Scalar::random(&mut rng));
        let signature = key.sign(&message, &mut rng);

        let mut mutated = message.clone();
        let i = index.index(mutated.len());
        mutated[i] ^= 0x01;
        prop_assert!(!key.verifying_key().verify(&mutated, &signature));
    }

    #[test]
    fn mutated_signature_is_rejected(seed in any::<u64>(), index in 0usize..96, bit in 0u8..8) {
        let mut rng = rng(seed);
        let key = SigningKey::new(Scalar::random(&mut rng), Scalar::random(&mut rng));
        let signature = key.sign(b"withdraw", &mut rng);

        let mut bytes = signature.to_bytes();
        bytes[index] ^= 1 << bit;
        // A mutation may leave a scalar non-canonical; that is a rejection too.
        if let Ok(mutated) = Signature::from_bytes(&bytes) {
            prop_assert!(!key.verifying_key().verify(b"withdraw", &mutated));
        }
    }

    #[test]
    fn hybrid_tampering_always_fails(seed in any::<u64>(), message in prop::collection::vec(any::<u8>(), 0..96), index in any::<prop::sample::Index>(), bit in 0u8..8) {
        let mut rng = rng(seed);
        let secret = Scalar::random(&mut rng);
        let public = Point::mul_base(&secret);

        let mut bytes = hybrid::encrypt(&public, &message, &mut rng).unwrap().to_bytes();
        let i = index.index(bytes.len());
        bytes[i] ^= 1 << bit;

        prop_assert!(matches!(
            hybrid::decrypt_bytes(&secret, &bytes),
            Err(Error::DecryptionFailure)
        ));
    }

    #[test]
    fn hybrid_encryption_is_randomized(seed in any::<u64>(), message in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut rng = rng(seed);
        let secret = Scalar::random(&mut rng);
        let public = Point::mul_base(&secret);

        let first = hybrid::encrypt(&public, &message, &mut rng).unwrap();
        let second = hybrid::encrypt(&public, &message, &mut rng).unwrap();

        prop_assert_ne!(first.to_bytes(), second.to_bytes());
        prop_assert_eq!(hybrid::decrypt(&secret, &first).unwrap(), message.clone());
        prop_assert_eq!(hybrid::decrypt(&secret, &second).unwrap(), message);
    }

    #[test]
    fn bls_keygen_is_deterministic(seed in prop::collection::vec(any::<u8>(), 0..64)) {
        let first = BlsKeyPair::from_seed(&seed);
        let second = BlsKeyPair::from_seed(&seed);
        prop_assert_eq!(first.to_bytes(), second.to_bytes());
        prop_assert_eq!(first.to_bytes().len(), 128);
    }

    #[test]
    fn confidential_coin_roundtrip(owner in 0u8..=255, amount in any::<u64>(), seed in any::<u64>()) {
        let keys = key_set(owner);
        let info = PaymentInfo::new(*keys.payment_address(), amount);
        let coin = create_coin(&info, None, &mut rng(seed)).unwrap();

        let data = CoinData::from(&Coin::from(coin));
        let json = serde_json::to_string(&data).unwrap();
        let decrypted = decrypt_coin(serde_json::from_str(&json).unwrap(), &keys).unwrap();

        prop_assert_eq!(decrypted.value, amount);
    }

    #[test]
    fn plain_coin_roundtrip(owner in 0u8..=255, amount in any::<u64>(), hidden in any::<bool>(), seed in any::<u64>()) {
        let keys = key_set(owner);
        let info = PaymentInfo::new(*keys.payment_address(), amount);
        let coin = create_plain_coin(&info, None, hidden, &mut rng(seed)).unwrap();

        let decrypted = Coin::from(coin).decrypt(&keys).unwrap();
        prop_assert_eq!(decrypted.value, amount);
    }

    #[test]
    fn scalar_mult_base_is_homomorphic(a in any::<u64>(), b in any::<u64>()) {
        let (a, b) = (scalar_from(a), scalar_from(b));
        prop_assert_eq!(
            Point::mul_base(&(a + b)),
            Point::mul_base(&a) + Point::mul_base(&b)
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn transaction_builds_only_when_amounts_balance(
        seed in any::<u64>(),
        inputs in prop::collection::vec(1u64..10_000, 1..4),
        fee in 0u64..100,
        split in any::<prop::sample::Index>(),
        raise in any::<bool>(),
    ) {
        let sender = key_set(21);
        let recipient = key_set(22);
        let total: u64 = inputs.iter().sum();
        let fee = fee.min(total);
        let spendable = total - fee;
        let first = split.index(spendable as usize + 1) as u64;
        let outputs = [first, spendable - first];

        let params = transfer(&sender, &recipient, &inputs, &outputs, fee, seed);
        let tx = build_transaction(&params, common::NOW, &mut rng(seed)).unwrap();
        prop_assert!(tx.verify().is_ok());

        let Transaction::Native(inner) = &tx else {
            panic!("native transfer expected");
        };
        let received: u64 = inner
            .body
            .outputs
            .iter()
            .map(|coin| Coin::from(coin.clone()).decrypt(&recipient).unwrap().value)
            .sum();
        prop_assert_eq!(received + tx.fee(), total);

        let mut skewed = outputs;
        skewed[0] = if raise || skewed[0] == 0 { skewed[0] + 1 } else { skewed[0] - 1 };
        let params = transfer(&sender, &recipient, &inputs, &skewed, fee, seed);
        let result = build_transaction(&params, common::NOW, &mut rng(seed));
        prop_assert!(
            matches!(&result, Err(Error::ConstructionFailure(reason)) if reason.contains("outputs plus fee")),
            "unexpected result: {:?}",
            result.map(|tx| tx.tx_type())
        );
    }
}

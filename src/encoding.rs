//! Wire encodings shared by the bridge payloads.
//!
//! Binary values travel as standard base64 strings and amounts as decimal
//! strings, so that 64-bit values survive a JavaScript host unchanged.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};

/// Encodes bytes as standard base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard base64, ignoring surrounding whitespace.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| Error::Deserialization(format!("Invalid base64: {e}")))
}

/// Parses a JSON payload into `T`.
pub fn from_json<T: DeserializeOwned>(payload: &str) -> Result<T> {
    serde_json::from_str(payload).map_err(|e| Error::Deserialization(e.to_string()))
}

/// Serializes `value` as JSON text.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))
}

/// Serializes `value` as JSON bytes (the canonical form that is hashed and signed).
pub fn to_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))
}

/// Serde adapter for `Vec<u8>` fields carried as base64.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::encode_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        super::decode_base64(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional base64 fields; empty strings read as absent.
pub mod option_base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => s.serialize_some(&super::encode_base64(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(text) if !text.is_empty() => super::decode_base64(&text)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

/// Serde adapter for `u64` amounts carried as decimal strings.
///
/// Plain JSON numbers are accepted on input as well.
pub mod amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(amount: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        match Amount::deserialize(d)? {
            Amount::Number(n) => Ok(n),
            Amount::Text(text) => text
                .trim()
                .parse()
                .map_err(|e| serde::de::Error::custom(format!("invalid amount {text:?}: {e}"))),
        }
    }
}

/// Optional variant of [`amount_string`].
pub mod option_amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match amount {
            Some(amount) => s.serialize_some(&amount.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::amount_string")] u64);

        Ok(Option::<Wrapper>::deserialize(d)?.map(|Wrapper(amount)| amount))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "amount_string")]
        amount: u64,
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
        #[serde(default, with = "option_base64_bytes")]
        extra: Option<Vec<u8>>,
    }

    #[test]
    fn amounts_are_written_as_strings() {
        let sample = Sample {
            amount: u64::MAX,
            data: vec![1, 2, 3],
            extra: None,
        };
        let json = to_json(&sample).unwrap();
        assert!(json.contains("\"18446744073709551615\""));
        assert_eq!(from_json::<Sample>(&json).unwrap(), sample);
    }

    #[test]
    fn numeric_amounts_are_accepted() {
        let sample: Sample = from_json(r#"{"amount":42,"data":"AQID","extra":""}"#).unwrap();
        assert_eq!(sample.amount, 42);
        assert_eq!(sample.extra, None);
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(matches!(
            decode_base64("not base64!"),
            Err(Error::Deserialization(_))
        ));
    }
}

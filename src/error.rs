//! Error types for the privacy bridge.

/// Main error types for the library.
///
/// Every bridge operation is a single synchronous unit: the first failure
/// aborts the call and is reported to the host as one of these variants.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request payload or an embedded value could not be parsed.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// A result could not be serialized for the host.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Raw private-key material has the wrong size.
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required length in bytes.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// A key or address text could not be encoded or decoded.
    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// Bytes do not describe a valid group element.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Bytes do not describe a canonical scalar.
    #[error("Invalid scalar encoding: {0}")]
    InvalidScalarEncoding(String),

    /// Decryption failed.
    ///
    /// Carries no detail so callers cannot tell which step rejected the input.
    #[error("Decryption failure")]
    DecryptionFailure,

    /// The coin version tag is neither 1 nor 2.
    #[error("Unsupported coin version: {0}")]
    UnsupportedCoinVersion(u8),

    /// Conversion inputs and outputs refer to different assets.
    #[error("Conversion mismatch: {0}")]
    ConversionMismatch(String),

    /// The caller-supplied timestamp lies outside the accepted window.
    #[error("Invalid timestamp {timestamp}: accepted window is [{min}, {max}]")]
    InvalidTimestamp {
        /// Timestamp supplied by the host.
        timestamp: i64,
        /// Lower bound of the window.
        min: i64,
        /// Upper bound of the window.
        max: i64,
    },

    /// A transaction or coin could not be assembled.
    #[error("Construction failure: {0}")]
    ConstructionFailure(String),

    /// No handler is registered under the requested name.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

impl Error {
    /// Short, stable name of the error kind, reported to hosts next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Deserialization(_) => "DeserializationError",
            Error::Serialization(_) => "SerializationError",
            Error::InvalidKeyLength { .. } => "InvalidKeyLength",
            Error::InvalidKeyEncoding(_) => "InvalidKeyEncoding",
            Error::InvalidPublicKey(_) => "InvalidPublicKey",
            Error::InvalidScalarEncoding(_) => "InvalidScalarEncoding",
            Error::DecryptionFailure => "DecryptionFailure",
            Error::UnsupportedCoinVersion(_) => "UnsupportedCoinVersion",
            Error::ConversionMismatch(_) => "ConversionMismatch",
            Error::InvalidTimestamp { .. } => "InvalidTimestamp",
            Error::ConstructionFailure(_) => "ConstructionFailure",
            Error::UnknownOperation(_) => "UnknownOperation",
        }
    }
}


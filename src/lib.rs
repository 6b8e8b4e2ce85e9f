//! Cryptographic request/response bridge for a privacy-preserving ledger.
//!
//! A host (browser, mobile app or another process) calls named operations
//! with one serialized payload and receives a serialized result. The crate
//! derives key sets, creates and opens coins, builds signed and
//! balance-preserving transfer artifacts, and exposes the primitives those
//! artifacts rest on.
//!
//! All group arithmetic uses Ristretto255; BLS key generation uses
//! BLS12-381.
//!
//! # Example
//!
//! ```no_run
//! use privacy_bridge::Registry;
//!
//! let registry = Registry::default();
//! let point = registry.invoke("scalarMultBase", "AQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=", 0)?;
//! println!("{point}");
//! # Ok::<(), privacy_bridge::Error>(())
//! ```

pub mod bridge;
pub mod coin;
pub mod config;
pub mod encoding;
pub mod error;
pub mod keys;
pub mod primitives;
pub mod transaction;
pub mod wallet;

pub use bridge::{Context, Operation, Registry};
pub use coin::{Coin, CoinV1, CoinV2, DecryptedCoin, PaymentInfo, TokenId};
pub use config::BridgeConfig;
pub use error::Error;
pub use keys::{KeySet, PaymentAddress, PrivateKey};
pub use primitives::{Point, Scalar, SecureRng};
pub use transaction::{Transaction, TransactionParams, TransactionResult};
pub use wallet::{Base58Check, KeyEncoding};

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

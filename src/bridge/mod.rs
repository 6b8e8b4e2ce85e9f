//! Name-based dispatch of bridge operations.
//!
//! Hosts call an operation by name with one serialized payload and a numeric
//! timestamp. Each [`Operation`] decodes its payload into a typed request,
//! handles it against the core, and encodes the typed response. The
//! [`Registry`] erases those types behind a name lookup; the core never learns
//! which name it was invoked under.

mod ops;

use std::collections::BTreeMap;
use std::marker::PhantomData;

use rand_core::CryptoRngCore;
use tracing::{debug, warn};

use crate::config::{self, BridgeConfig};
use crate::wallet::{Base58Check, KeyEncoding};
use crate::{Error, Result, SecureRng};

pub use ops::{
    CreateCoin, CreateConvertTx, CreateTransaction, DecryptCoin, GenerateBlsKeyPair,
    GetSignPublicKey, HybridDecrypt, HybridEncrypt, NewKeySetFromPrivate, ScalarMultBase,
    SignPoolWithdraw,
};

/// Per-call capabilities handed to an operation.
pub struct Context<'a> {
    /// Fresh randomness for blinding factors and nonces.
    pub rng: &'a mut dyn CryptoRngCore,
    /// Caller-supplied unix timestamp.
    pub timestamp: i64,
    pub config: &'static BridgeConfig,
    /// Key and transaction text encodings.
    pub encoding: &'a dyn KeyEncoding,
}

/// A typed bridge operation.
pub trait Operation: Send + Sync + 'static {
    /// Name the host invokes the operation under.
    const NAME: &'static str;

    type Request;
    type Response;

    /// Parses the host payload.
    fn decode(payload: &str) -> Result<Self::Request>;

    /// Runs the operation.
    fn handle(request: Self::Request, ctx: &mut Context<'_>) -> Result<Self::Response>;

    /// Renders the result for the host.
    fn encode(response: &Self::Response) -> Result<String>;
}

trait Handler: Send + Sync {
    fn call(&self, payload: &str, ctx: &mut Context<'_>) -> Result<String>;
}

struct Typed<O>(PhantomData<fn() -> O>);

impl<O: Operation> Handler for Typed<O> {
    fn call(&self, payload: &str, ctx: &mut Context<'_>) -> Result<String> {
        let request = O::decode(payload)?;
        let response = O::handle(request, ctx)?;
        O::encode(&response)
    }
}

/// Operation name to handler map.
///
/// Holds no per-call state, so one registry may serve concurrent calls.
pub struct Registry {
    handlers: BTreeMap<&'static str, Box<dyn Handler>>,
    encoding: Box<dyn KeyEncoding>,
}

impl Registry {
    /// Creates an empty registry using `encoding` for key and transaction text.
    pub fn new(encoding: impl KeyEncoding + 'static) -> Self {
        Self {
            handlers: BTreeMap::new(),
            encoding: Box::new(encoding),
        }
    }

    /// Registers `O` under [`Operation::NAME`], replacing any previous handler.
    pub fn register<O: Operation>(&mut self) -> &mut Self {
        self.handlers.insert(O::NAME, Box::new(Typed::<O>(PhantomData)));
        self
    }

    /// Registers every bridge operation.
    pub fn with_default_operations(mut self) -> Self {
        self.register::<CreateTransaction>()
            .register::<CreateConvertTx>()
            .register::<NewKeySetFromPrivate>()
            .register::<DecryptCoin>()
            .register::<CreateCoin>()
            .register::<GenerateBlsKeyPair>()
            .register::<HybridEncrypt>()
            .register::<HybridDecrypt>()
            .register::<ScalarMultBase>()
            .register::<GetSignPublicKey>()
            .register::<SignPoolWithdraw>();
        self
    }

    /// Registered operation names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Invokes `name` with OS-backed randomness bound to the operation name.
    pub fn invoke(&self, name: &str, payload: &str, timestamp: i64) -> Result<String> {
        let mut rng = SecureRng::for_domain(name.as_bytes());
        self.invoke_with_rng(name, payload, timestamp, &mut rng)
    }

    /// Invokes `name` drawing randomness from `rng`.
    ///
    /// # Errors
    /// [`Error::UnknownOperation`] if nothing is registered under `name`,
    /// otherwise the operation's own error.
    pub fn invoke_with_rng(
        &self,
        name: &str,
        payload: &str,
        timestamp: i64,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<String> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| Error::UnknownOperation(name.to_string()))?;

        debug!(operation = name, payload_len = payload.len(), timestamp, "dispatching");

        let mut ctx = Context {
            rng,
            timestamp,
            config: config::get(),
            encoding: self.encoding.as_ref(),
        };
        let result = handler.call(payload, &mut ctx);

        if let Err(ref error) = result {
            warn!(operation = name, kind = error.kind(), %error, "operation failed");
        }
        result
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(Base58Check::from_config()).with_default_operations()
    }
}

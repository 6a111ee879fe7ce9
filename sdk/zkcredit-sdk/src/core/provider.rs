use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

/// Error returned by an EIP-1193 `request` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Notifications a wallet provider emits on its own schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// `accountsChanged` with the new authorized address list
    AccountsChanged(Vec<String>),
    /// `chainChanged` with the new chain id as reported (usually `0x`-hex)
    ChainChanged(String),
    /// `disconnect`
    Disconnect,
}

/// Abstraction over a browser-style wallet provider (EIP-1193).
///
/// The pipeline relies on nothing beyond `request`, the event stream and the
/// trust marker.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Explicit capability flag; a provider that merely answers requests is not trusted.
    fn is_trusted(&self) -> bool;

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Subscribe to `accountsChanged` / `chainChanged` / `disconnect`.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Parse a chain id as wallets report it: `0x`-hex string, decimal string or number.
pub fn parse_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(digits) => u64::from_str_radix(digits, 16).ok(),
                None => s.parse().ok(),
            }
        },
        _ => None,
    }
}

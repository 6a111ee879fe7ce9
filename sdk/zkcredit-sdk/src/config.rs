//! Pipeline configuration, loadable from TOML.

use crate::calldata::DecodeMode;
use crate::core::constants::{
    ANVIL_CHAIN_ID, DEFAULT_CHALLENGE_APP_NAME, DEFAULT_CONFIRMATION_TIMEOUT_SECS,
    DEFAULT_CONTRACT_ADDRESS, DEFAULT_REQUIRED_CONFIRMATIONS,
};
use crate::error::{PipelineError, Result};
use alloy_primitives::Address;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// What a `chainChanged` event does to an established session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainChangePolicy {
    /// Re-run network validation only; the signed session is kept
    #[default]
    Revalidate,
    /// Tear the session down and run the full connect flow again
    Reauthenticate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Loan manager contract receiving `submitCreditScoreProof`
    pub contract_address: Address,

    /// Chain the session must be bound to
    pub chain_id: u64,

    /// Blocks to wait for before a submission counts as confirmed
    pub required_confirmations: u64,

    /// Upper bound on the confirmation wait
    pub confirmation_timeout: Duration,

    pub decode_mode: DecodeMode,

    pub chain_change_policy: ChainChangePolicy,

    /// Application name shown in the sign-in challenge
    pub challenge_app_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            contract_address: DEFAULT_CONTRACT_ADDRESS,
            chain_id: ANVIL_CHAIN_ID,
            required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            decode_mode: DecodeMode::Strict,
            chain_change_policy: ChainChangePolicy::Revalidate,
            challenge_app_name: DEFAULT_CHALLENGE_APP_NAME.to_string(),
        }
    }
}

/// On-disk form; every field is optional and falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    contract_address: Option<String>,
    chain_id: Option<u64>,
    required_confirmations: Option<u64>,
    confirmation_timeout_secs: Option<u64>,
    strict_selector: Option<bool>,
    chain_change_policy: Option<ChainChangePolicy>,
    challenge_app_name: Option<String>,
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        let defaults = Self::default();

        let contract_address = match raw.contract_address {
            Some(address) => Address::from_str(address.trim()).map_err(|_| {
                PipelineError::Config(format!("invalid contract address: {}", address))
            })?,
            None => defaults.contract_address,
        };

        let decode_mode = match raw.strict_selector {
            Some(false) => DecodeMode::Permissive,
            Some(true) => DecodeMode::Strict,
            None => defaults.decode_mode,
        };

        let config = Self {
            contract_address,
            chain_id: raw.chain_id.unwrap_or(defaults.chain_id),
            required_confirmations: raw
                .required_confirmations
                .unwrap_or(defaults.required_confirmations),
            confirmation_timeout: raw
                .confirmation_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.confirmation_timeout),
            decode_mode,
            chain_change_policy: raw
                .chain_change_policy
                .unwrap_or(defaults.chain_change_policy),
            challenge_app_name: raw
                .challenge_app_name
                .unwrap_or(defaults.challenge_app_name),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.contract_address == Address::ZERO {
            return Err(PipelineError::Config("contract address is zero".into()));
        }
        if self.chain_id == 0 {
            return Err(PipelineError::Config("chain id must be non-zero".into()));
        }
        if !(1..=2).contains(&self.required_confirmations) {
            return Err(PipelineError::Config(format!(
                "required confirmations must be 1 or 2, got {}",
                self.required_confirmations
            )));
        }
        if self.confirmation_timeout.is_zero() {
            return Err(PipelineError::Config("confirmation timeout must be positive".into()));
        }
        Ok(())
    }
}

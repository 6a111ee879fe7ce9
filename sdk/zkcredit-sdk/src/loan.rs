//! Read-only queries against the loan manager contract.

use crate::calldata::{address_word, encode_static_call, uint_word};
use crate::config::PipelineConfig;
use crate::core::constants::{BORROWER_TIER_SIGNATURE, COLLATERAL_SIGNATURE, WORD_SIZE};
use crate::core::gateway::{ContractCall, LedgerGateway};
use crate::error::SubmissionError;
use crate::session::SessionManager;
use crate::utils::{format_ether, function_selector};
use alloy_primitives::{Address, U256};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Tier the contract assigns a borrower after a proof was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CreditTier {
    Unknown = 0,
    Favorable = 1,
}

impl TryFrom<U256> for CreditTier {
    type Error = U256;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        if value == U256::ZERO {
            Ok(CreditTier::Unknown)
        } else if value == U256::from(1) {
            Ok(CreditTier::Favorable)
        } else {
            Err(value)
        }
    }
}

impl fmt::Display for CreditTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreditTier::Unknown => write!(f, "Unknown"),
            CreditTier::Favorable => write!(f, "Favorable"),
        }
    }
}

/// Collateral the contract demands for a loan.
///
/// `required_percentage` is in tenths of a percent (1500 = 150%).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollateralRequirement {
    pub required_amount: U256,
    pub required_percentage: U256,
}

impl CollateralRequirement {
    /// Required amount in ether, e.g. `"1.5"`
    pub fn amount_display(&self) -> String {
        format_ether(self.required_amount)
    }

    /// Required percentage, e.g. `"150%"` or `"112.5%"`
    pub fn percentage_display(&self) -> String {
        let ten = U256::from(10);
        let whole = self.required_percentage / ten;
        let tenth = self.required_percentage % ten;
        if tenth.is_zero() {
            format!("{}%", whole)
        } else {
            format!("{}.{}%", whole, tenth)
        }
    }
}

pub struct LoanQueries {
    gateway: Arc<dyn LedgerGateway>,
    session: SessionManager,
    contract: Address,
}

impl LoanQueries {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        session: SessionManager,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            gateway,
            session,
            contract: config.contract_address,
        }
    }

    pub async fn borrower_tier(&self, borrower: Address) -> Result<CreditTier, SubmissionError> {
        let data = encode_static_call(
            function_selector(BORROWER_TIER_SIGNATURE),
            &[address_word(borrower)],
        );
        let words = self.query(BORROWER_TIER_SIGNATURE, data, 1).await?;

        CreditTier::try_from(words[0]).map_err(|value| {
            error!(target: "submission", %borrower, %value, "unknown borrower tier");
            SubmissionError::TransactionFailed
        })
    }

    pub async fn collateral_requirement(
        &self,
        borrower: Address,
        loan_amount_wei: U256,
    ) -> Result<CollateralRequirement, SubmissionError> {
        let data = encode_static_call(
            function_selector(COLLATERAL_SIGNATURE),
            &[address_word(borrower), uint_word(loan_amount_wei)],
        );
        let words = self.query(COLLATERAL_SIGNATURE, data, 2).await?;

        Ok(CollateralRequirement {
            required_amount: words[0],
            required_percentage: words[1],
        })
    }

    /// Run a view call and split its return data into exactly `count` words.
    async fn query(
        &self,
        signature: &'static str,
        data: Vec<u8>,
        count: usize,
    ) -> Result<Vec<U256>, SubmissionError> {
        if self.session.active_session().is_none() {
            return Err(SubmissionError::NotConnected);
        }

        let call = ContractCall {
            to: self.contract,
            signature,
            data: data.into(),
        };
        debug!(target: "submission", signature, to = %self.contract, "loan query");

        let output = self.gateway.call(&call).await.map_err(|e| {
            error!(target: "submission", signature, error = %e, detail = ?e, "loan query failed");
            SubmissionError::TransactionFailed
        })?;

        if output.len() < count * WORD_SIZE {
            error!(
                target: "submission",
                signature,
                len = output.len(),
                "loan query returned short data"
            );
            return Err(SubmissionError::TransactionFailed);
        }

        Ok(output
            .chunks_exact(WORD_SIZE)
            .take(count)
            .map(U256::from_be_slice)
            .collect())
    }
}

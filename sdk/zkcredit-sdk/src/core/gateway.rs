use crate::core::signer::ProofSigner;
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use std::error::Error;

pub type GatewayError = Box<dyn Error + Send + Sync>;

/// A call against the ledger: target contract, the ABI signature it is
/// encoded for, and the full calldata (selector included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub signature: &'static str,
    pub data: Bytes,
}

/// Receipt of a mined transaction. `status` is 1 for success, 0 for revert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub status: u64,
    pub block_number: Option<u64>,
}

/// Handle to a broadcast transaction that has not been awaited yet.
#[async_trait]
pub trait PendingTransaction: Send {
    fn hash(&self) -> B256;

    /// Resolve once the transaction has `confirmations` blocks on top of it.
    async fn wait(self: Box<Self>, confirmations: u64) -> Result<TransactionReceipt, GatewayError>;
}

/// Broadcast and read access to the ledger hosting the loan manager contract.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn send_transaction(
        &self,
        call: &ContractCall,
        signer: &dyn ProofSigner,
    ) -> Result<Box<dyn PendingTransaction>, GatewayError>;

    /// Read-only `eth_call`; returns the raw ABI-encoded return data.
    async fn call(&self, call: &ContractCall) -> Result<Bytes, GatewayError>;
}

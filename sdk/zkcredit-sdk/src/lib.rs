pub mod calldata;
pub mod config;
pub mod core;
pub mod error;
pub mod loan;
pub mod session;
pub mod submission;
pub mod types;
pub mod utils;

pub use crate::calldata::{CalldataBuilder, CalldataDecoder, DecodeMode, ProofValidation};
pub use crate::config::{ChainChangePolicy, PipelineConfig};
pub use crate::core::gateway::{ContractCall, LedgerGateway, PendingTransaction, TransactionReceipt};
pub use crate::core::provider::{ProviderError, ProviderEvent, WalletProvider};
pub use crate::core::signer::{LocalSigner, ProofSigner};
pub use crate::error::{
    ConnectionError, DecodeError, PipelineError, Result, SubmissionError,
};
pub use crate::loan::{CollateralRequirement, CreditTier, LoanQueries};
pub use crate::session::{SessionManager, SessionPhase};
pub use crate::submission::SubmissionOrchestrator;
pub use crate::types::{
    DecodedProof, Session, SubmissionProgress, SubmissionRequest, SubmissionResult,
};
pub use crate::utils::{read_calldata_file, CalldataFile};

//! Submission of decoded proofs to the loan manager contract.
//!
//! ```text
//! input ──decode──> DecodedProof ──┐
//!                                  ├──> SubmissionRequest ──> gateway ──> pending tx ──wait──> receipt
//! SessionManager ──session/signer──┘
//! ```
//!
//! Gateway failures are logged in full here and surface to callers only as
//! the fixed-text variants of [`SubmissionError`].

use crate::calldata::{CalldataBuilder, CalldataDecoder};
use crate::config::PipelineConfig;
use crate::core::constants::SUBMIT_PROOF_SIGNATURE;
use crate::core::gateway::{ContractCall, LedgerGateway, TransactionReceipt};
use crate::core::signer::ProofSigner;
use crate::error::SubmissionError;
use crate::session::SessionManager;
use crate::types::{DecodedProof, Session, SubmissionProgress, SubmissionRequest, SubmissionResult};
use crate::utils::function_selector;
use alloy_primitives::{Address, B256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

const RECEIPT_STATUS_SUCCESS: u64 = 1;
const RECEIPT_STATUS_REVERTED: u64 = 0;

pub struct SubmissionOrchestrator {
    gateway: Arc<dyn LedgerGateway>,
    session: SessionManager,
    decoder: CalldataDecoder,
    contract: Address,
    submit_selector: [u8; 4],
    confirmations: u64,
    confirmation_timeout: Duration,
}

impl SubmissionOrchestrator {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        session: SessionManager,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            gateway,
            session,
            decoder: CalldataDecoder::new(config.decode_mode),
            contract: config.contract_address,
            submit_selector: function_selector(SUBMIT_PROOF_SIGNATURE),
            confirmations: config.required_confirmations,
            confirmation_timeout: config.confirmation_timeout,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Decode `input` (binary, hex or JSON calldata) and submit it.
    pub async fn submit(&self, input: &[u8]) -> Result<SubmissionResult, SubmissionError> {
        let proof = self.decoder.decode_input(input)?;
        self.dispatch(proof, None).await
    }

    /// As [`submit`](Self::submit), reporting the pending hash and the
    /// confirmation on `progress` as they happen.
    pub async fn submit_with_progress(
        &self,
        input: &[u8],
        progress: UnboundedSender<SubmissionProgress>,
    ) -> Result<SubmissionResult, SubmissionError> {
        let proof = self.decoder.decode_input(input)?;
        self.dispatch(proof, Some(&progress)).await
    }

    pub async fn submit_decoded(
        &self,
        proof: DecodedProof,
    ) -> Result<SubmissionResult, SubmissionError> {
        self.dispatch(proof, None).await
    }

    /// Calldata for `submitCreditScoreProof(bytes,uint256[])`
    pub fn build_call(&self, request: &SubmissionRequest) -> ContractCall {
        let data = CalldataBuilder::from_proof(&request.proof)
            .with_selector(self.submit_selector)
            .build();
        ContractCall {
            to: self.contract,
            signature: SUBMIT_PROOF_SIGNATURE,
            data: data.into(),
        }
    }

    async fn dispatch(
        &self,
        proof: DecodedProof,
        progress: Option<&UnboundedSender<SubmissionProgress>>,
    ) -> Result<SubmissionResult, SubmissionError> {
        let (session, signer) = self.ensure_session().await?;
        let request = SubmissionRequest::new(proof, session)?;
        let call = self.build_call(&request);

        let pending = self
            .gateway
            .send_transaction(&call, signer.as_ref())
            .await
            .map_err(|e| {
                error!(target: "submission", error = %e, detail = ?e, "failed to dispatch proof");
                SubmissionError::TransactionFailed
            })?;

        let hash = pending.hash();
        info!(
            target: "submission",
            %hash,
            from = %request.session.address,
            proof_len = request.proof.proof.len(),
            inputs = request.proof.public_inputs.len(),
            "proof submitted, awaiting confirmation"
        );
        notify(progress, SubmissionProgress::Dispatched { hash });

        let receipt = match tokio::time::timeout(
            self.confirmation_timeout,
            pending.wait(self.confirmations),
        )
        .await
        {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => {
                error!(target: "submission", %hash, error = %e, detail = ?e, "confirmation failed");
                return Err(SubmissionError::TransactionFailed);
            },
            Err(_) => {
                warn!(
                    target: "submission",
                    %hash,
                    timeout_secs = self.confirmation_timeout.as_secs(),
                    "confirmation timed out"
                );
                return Err(SubmissionError::TransactionUnconfirmed { hash });
            },
        };

        self.interpret_receipt(hash, receipt, progress)
    }

    fn interpret_receipt(
        &self,
        hash: B256,
        receipt: TransactionReceipt,
        progress: Option<&UnboundedSender<SubmissionProgress>>,
    ) -> Result<SubmissionResult, SubmissionError> {
        match receipt.status {
            RECEIPT_STATUS_SUCCESS => {
                info!(target: "submission", %hash, block = ?receipt.block_number, "proof accepted");
                notify(progress, SubmissionProgress::Confirmed { hash, succeeded: true });
                Ok(SubmissionResult {
                    transaction_hash: hash,
                    confirmed: true,
                    succeeded: true,
                    block_number: receipt.block_number,
                })
            },
            RECEIPT_STATUS_REVERTED => {
                warn!(target: "submission", %hash, block = ?receipt.block_number, "proof transaction reverted");
                notify(progress, SubmissionProgress::Confirmed { hash, succeeded: false });
                Err(SubmissionError::TransactionReverted { hash })
            },
            status => {
                error!(target: "submission", %hash, status, "unexpected receipt status");
                Err(SubmissionError::TransactionFailed)
            },
        }
    }

    /// Current verified session and its signer, connecting first if needed
    async fn ensure_session(&self) -> Result<(Session, Arc<dyn ProofSigner>), SubmissionError> {
        if let Some(active) = self.session.active_binding() {
            return Ok(active);
        }

        info!(target: "submission", "no verified session, connecting");
        if let Err(e) = self.session.try_connect().await {
            warn!(target: "submission", error = %e, "cannot submit without a session");
            return Err(SubmissionError::NotConnected);
        }
        self.session.active_binding().ok_or(SubmissionError::NotConnected)
    }
}

fn notify(progress: Option<&UnboundedSender<SubmissionProgress>>, event: SubmissionProgress) {
    if let Some(progress) = progress {
        // A dropped receiver only means nobody is watching
        let _ = progress.send(event);
    }
}

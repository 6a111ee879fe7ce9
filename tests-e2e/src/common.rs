use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use zkcredit_sdk::calldata::uint_word;
use zkcredit_sdk::core::constants::{
    error_codes, methods, ANVIL_CHAIN_ID, BORROWER_TIER_SIGNATURE, COLLATERAL_SIGNATURE,
    SUBMIT_PROOF_SIGNATURE, WORD_SIZE,
};
use zkcredit_sdk::core::gateway::GatewayError;
use zkcredit_sdk::utils::{function_selector, keccak256};
use zkcredit_sdk::{
    CalldataBuilder, CalldataDecoder, ContractCall, CreditTier, LedgerGateway, LoanQueries,
    LocalSigner, PendingTransaction, PipelineConfig, ProofSigner, ProviderError, ProviderEvent,
    SessionManager, SubmissionOrchestrator, TransactionReceipt, WalletProvider,
};

/// Collateral percentages (tenths of a percent) the dev ledger charges per tier
const FAVORABLE_COLLATERAL: u64 = 1200;
const DEFAULT_COLLATERAL: u64 = 1500;

/// Calldata for a proof whose first public input is the credit verdict
pub fn proof_calldata(verdict: u64) -> Vec<u8> {
    let proof: Vec<u8> = (0..rand::random::<u8>().max(1)).map(|_| rand::random()).collect();
    CalldataBuilder::new()
        .with_proof(proof)
        .add_public_input(U256::from(verdict))
        .add_public_input(U256::from(rand::random::<u64>()))
        .build()
}

pub fn random_signer() -> Result<LocalSigner> {
    LocalSigner::from_slice(&rand::random::<[u8; 32]>()).map_err(|e| anyhow!(e))
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) -> Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            return Err(anyhow!("timed out waiting for {}", what));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

/// Expect `fut` to fail, returning its error
pub async fn expect_err<T, E: std::fmt::Debug>(
    fut: impl Future<Output = std::result::Result<T, E>>,
) -> Result<E> {
    match fut.await {
        Ok(_) => Err(anyhow!("operation succeeded unexpectedly")),
        Err(e) => {
            info!("expected error received: {:?}", e);
            Ok(e)
        },
    }
}

//=============================================================================
// Dev wallet
//=============================================================================

/// Browser-wallet stand-in: one active key, a current chain, and the chains it knows.
pub struct DevWallet {
    signer: Mutex<Arc<LocalSigner>>,
    chain_id: Mutex<u64>,
    known_chains: Vec<u64>,
    events: broadcast::Sender<ProviderEvent>,
}

impl DevWallet {
    pub fn new(signer: LocalSigner, chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            signer: Mutex::new(Arc::new(signer)),
            chain_id: Mutex::new(chain_id),
            known_chains: vec![1, ANVIL_CHAIN_ID],
            events,
        }
    }

    fn current_signer(&self) -> Arc<LocalSigner> {
        self.signer.lock().map(|s| s.clone()).unwrap_or_else(|p| p.into_inner().clone())
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id.lock().map(|c| *c).unwrap_or_else(|p| *p.into_inner())
    }

    fn set_chain(&self, chain_id: u64) {
        if let Ok(mut current) = self.chain_id.lock() {
            *current = chain_id;
        }
    }

    pub fn address(&self) -> Address {
        self.current_signer().address()
    }

    /// The user picks another network in the wallet UI
    pub fn user_switches_chain(&self, chain_id: u64) {
        self.set_chain(chain_id);
        let _ = self.events.send(ProviderEvent::ChainChanged(format!("0x{:x}", chain_id)));
    }

    /// The user picks another account in the wallet UI
    pub fn user_switches_account(&self, signer: LocalSigner) {
        let address = signer.address();
        if let Ok(mut current) = self.signer.lock() {
            *current = Arc::new(signer);
        }
        let _ = self.events.send(ProviderEvent::AccountsChanged(vec![address.to_string()]));
    }
}

#[async_trait]
impl WalletProvider for DevWallet {
    fn is_trusted(&self) -> bool {
        true
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        match method {
            methods::REQUEST_ACCOUNTS => Ok(json!([self.address().to_string()])),
            methods::CHAIN_ID => Ok(json!(format!("0x{:x}", self.chain_id()))),
            methods::SWITCH_CHAIN => {
                let requested = params[0]["chainId"]
                    .as_str()
                    .and_then(|s| s.strip_prefix("0x"))
                    .and_then(|s| u64::from_str_radix(s, 16).ok())
                    .ok_or_else(|| ProviderError::new(-32602, "invalid chainId"))?;
                if !self.known_chains.contains(&requested) {
                    return Err(ProviderError::new(
                        error_codes::UNRECOGNIZED_CHAIN,
                        format!("Unrecognized chain ID 0x{:x}", requested),
                    ));
                }
                self.set_chain(requested);
                Ok(Value::Null)
            },
            methods::PERSONAL_SIGN => {
                let message = params[0]
                    .as_str()
                    .and_then(|s| s.strip_prefix("0x"))
                    .and_then(|s| hex::decode(s).ok())
                    .ok_or_else(|| ProviderError::new(-32602, "invalid message"))?;
                let signature = self.current_signer().sign_personal(&message);
                Ok(json!(format!("0x{}", hex::encode(signature))))
            },
            other => Err(ProviderError::new(
                error_codes::USER_REJECTED,
                format!("method {} not supported", other),
            )),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

//=============================================================================
// Dev ledger
//=============================================================================

/// In-memory loan manager: a proof whose first public input is non-zero
/// earns its sender the favorable tier; anything else reverts.
pub struct DevLedger {
    contract: Address,
    decoder: CalldataDecoder,
    state: Mutex<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    block: u64,
    tiers: HashMap<Address, CreditTier>,
}

impl DevLedger {
    pub fn new(contract: Address) -> Self {
        Self {
            contract,
            decoder: CalldataDecoder::default()
                .with_selector(function_selector(SUBMIT_PROOF_SIGNATURE)),
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn block_number(&self) -> u64 {
        self.state.lock().map(|s| s.block).unwrap_or_default()
    }

    fn tier(&self, borrower: &Address) -> CreditTier {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.tiers.get(borrower).copied())
            .unwrap_or(CreditTier::Unknown)
    }

    fn read_address(data: &[u8], word: usize) -> Result<Address, GatewayError> {
        let start = 4 + word * WORD_SIZE;
        let bytes = data
            .get(start + 12..start + WORD_SIZE)
            .ok_or("calldata too short")?;
        Ok(Address::from_slice(bytes))
    }

    fn read_uint(data: &[u8], word: usize) -> Result<U256, GatewayError> {
        let start = 4 + word * WORD_SIZE;
        let bytes = data.get(start..start + WORD_SIZE).ok_or("calldata too short")?;
        Ok(U256::from_be_slice(bytes))
    }
}

#[async_trait]
impl LedgerGateway for DevLedger {
    async fn send_transaction(
        &self,
        call: &ContractCall,
        signer: &dyn ProofSigner,
    ) -> Result<Box<dyn PendingTransaction>, GatewayError> {
        if call.to != self.contract {
            return Err(format!("no contract at {}", call.to).into());
        }

        let accepted = match self.decoder.decode(&call.data) {
            Ok(proof) => proof.public_inputs.first().is_some_and(|v| !v.is_zero()),
            Err(_) => false,
        };

        let mut state = self.state.lock().map_err(|_| "ledger state poisoned")?;
        state.block += 1;
        if accepted {
            state.tiers.insert(signer.address(), CreditTier::Favorable);
        }

        let mut preimage = call.data.to_vec();
        preimage.extend_from_slice(&state.block.to_be_bytes());
        let hash = B256::from(keccak256(&preimage));

        Ok(Box::new(DevPending {
            receipt: TransactionReceipt {
                transaction_hash: hash,
                status: u64::from(accepted),
                block_number: Some(state.block),
            },
        }))
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes, GatewayError> {
        let selector = call.data.get(..4).ok_or("calldata too short")?;

        if selector == function_selector(BORROWER_TIER_SIGNATURE) {
            let borrower = Self::read_address(&call.data, 0)?;
            let tier = self.tier(&borrower) as u64;
            return Ok(uint_word(U256::from(tier)).to_vec().into());
        }

        if selector == function_selector(COLLATERAL_SIGNATURE) {
            let borrower = Self::read_address(&call.data, 0)?;
            let amount = Self::read_uint(&call.data, 1)?;
            let percentage = match self.tier(&borrower) {
                CreditTier::Favorable => FAVORABLE_COLLATERAL,
                CreditTier::Unknown => DEFAULT_COLLATERAL,
            };
            let required = amount * U256::from(percentage) / U256::from(1000);

            let mut output = uint_word(required).to_vec();
            output.extend_from_slice(&uint_word(U256::from(percentage)));
            return Ok(output.into());
        }

        Err(format!("execution reverted: unknown selector 0x{}", hex::encode(selector)).into())
    }
}

struct DevPending {
    receipt: TransactionReceipt,
}

#[async_trait]
impl PendingTransaction for DevPending {
    fn hash(&self) -> B256 {
        self.receipt.transaction_hash
    }

    async fn wait(
        self: Box<Self>,
        _confirmations: u64,
    ) -> Result<TransactionReceipt, GatewayError> {
        Ok(self.receipt)
    }
}

//=============================================================================
// Context
//=============================================================================

pub struct TestContext {
    pub config: PipelineConfig,
    pub wallet: Arc<DevWallet>,
    pub ledger: Arc<DevLedger>,
    pub session: SessionManager,
    pub orchestrator: SubmissionOrchestrator,
    pub queries: LoanQueries,
}

impl TestContext {
    /// Wire a fresh wallet and ledger with the wallet starting on `wallet_chain`
    pub fn new(config: PipelineConfig, wallet_chain: u64) -> Result<Self> {
        config.validate()?;

        let wallet = Arc::new(DevWallet::new(random_signer()?, wallet_chain));
        let ledger = Arc::new(DevLedger::new(config.contract_address));

        let provider: Arc<dyn WalletProvider> = wallet.clone();
        let gateway: Arc<dyn LedgerGateway> = ledger.clone();
        let session = SessionManager::new(Some(provider), &config);
        session.spawn_event_listener();

        Ok(Self {
            orchestrator: SubmissionOrchestrator::new(gateway.clone(), session.clone(), &config),
            queries: LoanQueries::new(gateway, session.clone(), &config),
            config,
            wallet,
            ledger,
            session,
        })
    }
}

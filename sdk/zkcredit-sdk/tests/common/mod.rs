#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use zkcredit_sdk::core::constants::{error_codes, methods, ANVIL_CHAIN_ID};
use zkcredit_sdk::core::gateway::GatewayError;
use zkcredit_sdk::utils::keccak256;
use zkcredit_sdk::{
    CalldataBuilder, ContractCall, LedgerGateway, LocalSigner, PendingTransaction,
    PipelineConfig, ProofSigner, ProviderError, ProviderEvent, TransactionReceipt,
    WalletProvider,
};

/// First Anvil dev account
pub const ANVIL_KEY: [u8; 32] = [
    0xac, 0x09, 0x74, 0xbe, 0xc3, 0x9a, 0x17, 0xe3, 0x6b, 0xa4, 0xa6, 0xb4, 0xd2, 0x38, 0xff, 0x94,
    0x4b, 0xac, 0xb4, 0x78, 0xcb, 0xed, 0x5e, 0xfc, 0xae, 0x78, 0x4d, 0x7b, 0xf4, 0xf2, 0xff, 0x80,
];

/// Text the mock gateway puts in its failures; must never reach users
pub const INTERNAL_FAILURE: &str = "rpc node 10.0.0.7 returned: nonce too low (account 0xdead)";

pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        required_confirmations: 1,
        confirmation_timeout: Duration::from_millis(200),
        ..PipelineConfig::default()
    }
}

/// Well-formed calldata: proof `AA BB CC`, one public input of 42
pub fn sample_calldata() -> Vec<u8> {
    CalldataBuilder::new()
        .with_proof(vec![0xAA, 0xBB, 0xCC])
        .add_public_input(U256::from(42))
        .build()
}

//=============================================================================
// Wallet provider
//=============================================================================

/// How the mock answers `wallet_switchEthereumChain`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchBehaviour {
    Accept,
    Reject(i64),
    /// Answers success but stays on the old chain
    Ignore,
}

struct ProviderState {
    chain_id: u64,
    accounts: Option<Vec<String>>,
    switch: SwitchBehaviour,
    /// Key used for `personal_sign` when it differs from the account key
    sign_with: Option<LocalSigner>,
    requests: Vec<String>,
}

/// In-memory EIP-1193 provider backed by a local key
pub struct MockProvider {
    signer: LocalSigner,
    trusted: bool,
    state: Mutex<ProviderState>,
    events: broadcast::Sender<ProviderEvent>,
    gate: Option<Arc<Notify>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::on_chain(ANVIL_CHAIN_ID)
    }

    pub fn on_chain(chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            signer: LocalSigner::from_slice(&ANVIL_KEY).unwrap(),
            trusted: true,
            state: Mutex::new(ProviderState {
                chain_id,
                accounts: None,
                switch: SwitchBehaviour::Accept,
                sign_with: None,
                requests: Vec::new(),
            }),
            events,
            gate: None,
        }
    }

    pub fn untrusted(mut self) -> Self {
        self.trusted = false;
        self
    }

    pub fn with_accounts(self, accounts: Vec<String>) -> Self {
        self.state.lock().unwrap().accounts = Some(accounts);
        self
    }

    pub fn with_switch(self, switch: SwitchBehaviour) -> Self {
        self.state.lock().unwrap().switch = switch;
        self
    }

    /// Sign challenges with a key other than the account's
    pub fn with_foreign_signer(self, secret: [u8; 32]) -> Self {
        self.state.lock().unwrap().sign_with = Some(LocalSigner::from_slice(&secret).unwrap());
        self
    }

    /// Hold `eth_requestAccounts` until the gate is notified
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Change the chain as if the user switched in the wallet UI (no event)
    pub fn set_chain(&self, chain_id: u64) {
        self.state.lock().unwrap().chain_id = chain_id;
    }

    pub fn set_switch(&self, switch: SwitchBehaviour) {
        self.state.lock().unwrap().switch = switch;
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests().iter().filter(|m| m.as_str() == method).count()
    }

    fn switch_chain(&self, params: &Value) -> Result<Value, ProviderError> {
        let mut state = self.state.lock().unwrap();
        match state.switch {
            SwitchBehaviour::Accept => {
                let requested = params[0]["chainId"]
                    .as_str()
                    .and_then(|s| s.strip_prefix("0x"))
                    .and_then(|s| u64::from_str_radix(s, 16).ok())
                    .ok_or_else(|| ProviderError::new(-32602, "bad chainId"))?;
                state.chain_id = requested;
                Ok(Value::Null)
            },
            SwitchBehaviour::Reject(code) => Err(ProviderError::new(code, "switch refused")),
            SwitchBehaviour::Ignore => Ok(Value::Null),
        }
    }

    fn personal_sign(&self, params: &Value) -> Result<Value, ProviderError> {
        let message = params[0]
            .as_str()
            .and_then(|s| s.strip_prefix("0x"))
            .and_then(|s| hex::decode(s).ok())
            .ok_or_else(|| ProviderError::new(-32602, "bad message"))?;

        let state = self.state.lock().unwrap();
        let signer = state.sign_with.as_ref().unwrap_or(&self.signer);
        Ok(json!(format!("0x{}", hex::encode(signer.sign_personal(&message)))))
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    fn is_trusted(&self) -> bool {
        self.trusted
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.state.lock().unwrap().requests.push(method.to_string());

        match method {
            methods::REQUEST_ACCOUNTS => {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                let accounts = self
                    .state
                    .lock()
                    .unwrap()
                    .accounts
                    .clone()
                    .unwrap_or_else(|| vec![self.signer.address().to_string()]);
                Ok(json!(accounts))
            },
            methods::CHAIN_ID => Ok(json!(format!("0x{:x}", self.state.lock().unwrap().chain_id))),
            methods::SWITCH_CHAIN => self.switch_chain(&params),
            methods::PERSONAL_SIGN => self.personal_sign(&params),
            other => Err(ProviderError::new(
                error_codes::USER_REJECTED,
                format!("unsupported method {}", other),
            )),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

//=============================================================================
// Ledger gateway
//=============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    /// Mined with the given receipt status
    Mined(u64),
    /// Dispatch itself fails
    FailDispatch,
    /// Dispatched, but confirmation never arrives
    Hang,
}

pub struct SentTransaction {
    pub call: ContractCall,
    pub from: Address,
}

pub struct MockGateway {
    mode: GatewayMode,
    call_output: Option<Bytes>,
    sent: Mutex<Vec<SentTransaction>>,
    calls: Mutex<Vec<ContractCall>>,
}

impl MockGateway {
    pub fn new(mode: GatewayMode) -> Self {
        Self {
            mode,
            call_output: None,
            sent: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Return data for view calls; `None` makes them fail
    pub fn with_call_output(mut self, output: Vec<u8>) -> Self {
        self.call_output = Some(output.into());
        self
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_sent(&self) -> Option<(ContractCall, Address)> {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|tx| (tx.call.clone(), tx.from))
    }

    pub fn last_call(&self) -> Option<ContractCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    async fn send_transaction(
        &self,
        call: &ContractCall,
        signer: &dyn ProofSigner,
    ) -> Result<Box<dyn PendingTransaction>, GatewayError> {
        if self.mode == GatewayMode::FailDispatch {
            return Err(INTERNAL_FAILURE.into());
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(SentTransaction {
            call: call.clone(),
            from: signer.address(),
        });
        let mut preimage = call.data.to_vec();
        preimage.extend_from_slice(&(sent.len() as u64).to_be_bytes());

        Ok(Box::new(MockPending {
            hash: B256::from(keccak256(&preimage)),
            block: sent.len() as u64,
            mode: self.mode,
        }))
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes, GatewayError> {
        self.calls.lock().unwrap().push(call.clone());
        self.call_output.clone().ok_or_else(|| INTERNAL_FAILURE.into())
    }
}

struct MockPending {
    hash: B256,
    block: u64,
    mode: GatewayMode,
}

#[async_trait]
impl PendingTransaction for MockPending {
    fn hash(&self) -> B256 {
        self.hash
    }

    async fn wait(
        self: Box<Self>,
        _confirmations: u64,
    ) -> Result<TransactionReceipt, GatewayError> {
        match self.mode {
            GatewayMode::Mined(status) => Ok(TransactionReceipt {
                transaction_hash: self.hash,
                status,
                block_number: Some(self.block),
            }),
            GatewayMode::Hang => std::future::pending().await,
            GatewayMode::FailDispatch => Err(INTERNAL_FAILURE.into()),
        }
    }
}

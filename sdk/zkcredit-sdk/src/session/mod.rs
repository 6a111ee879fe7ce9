//! Connection and session lifecycle against a wallet provider.
//!
//! ```text
//! Disconnected ─connect─> Connecting ─> NetworkChecking ─> SignatureChallenge ─> Connected
//!      ^                                                                          │
//!      └────────────── accountsChanged / disconnect / failed attempt ─────────────┤
//!                                                                                 │
//!                 NetworkInvalid <─ failed ─ NetworkChecking <─── chainChanged ───┘
//! ```
//!
//! Every transition runs under one async transition lock, and provider events
//! are drained in arrival order by a single listener task, so transitions
//! never interleave.

mod challenge;
mod provider_signer;

pub use challenge::ChallengeIssuer;
pub use provider_signer::ProviderSigner;

use crate::config::{ChainChangePolicy, PipelineConfig};
use crate::core::constants::{error_codes, methods};
use crate::core::provider::{parse_chain_id, ProviderEvent, WalletProvider};
use crate::core::signer::ProofSigner;
use crate::error::ConnectionError;
use crate::types::Session;
use alloy_primitives::Address;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Observable lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Disconnected,
    Connecting,
    NetworkChecking,
    SignatureChallenge,
    Connected,
    /// A session exists but the wallet left the required network; unusable for submission
    NetworkInvalid,
}

#[derive(Clone, Default)]
struct SessionSlot {
    phase: SessionPhase,
    session: Option<Session>,
    signer: Option<Arc<dyn ProofSigner>>,
}

/// Marks a connect attempt as in flight; released on drop, whatever the outcome.
struct ConnectAttempt<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ConnectAttempt<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct SessionInner {
    provider: Option<Arc<dyn WalletProvider>>,
    chain_id: u64,
    chain_change_policy: ChainChangePolicy,
    challenge: ChallengeIssuer,
    connecting: AtomicBool,
    transition: Mutex<()>,
    slot: watch::Sender<SessionSlot>,
    phase: watch::Sender<SessionPhase>,
}

/// Owner of the one live [`Session`].
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    /// `provider` is `None` when no wallet is installed.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, config: &PipelineConfig) -> Self {
        let (slot, _) = watch::channel(SessionSlot::default());
        let (phase, _) = watch::channel(SessionPhase::default());
        Self {
            inner: Arc::new(SessionInner {
                provider,
                chain_id: config.chain_id,
                chain_change_policy: config.chain_change_policy,
                challenge: ChallengeIssuer::new(config.challenge_app_name.clone()),
                connecting: AtomicBool::new(false),
                transition: Mutex::new(()),
                slot,
                phase,
            }),
        }
    }

    //=========================================================================
    // Queries
    //=========================================================================

    pub fn phase(&self) -> SessionPhase {
        self.inner.slot.borrow().phase
    }

    /// Watch phase changes (for progress UI)
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.inner.phase.subscribe()
    }

    pub fn is_connecting(&self) -> bool {
        self.inner.connecting.load(Ordering::Acquire)
    }

    /// The current session, only while it is usable for submission
    pub fn active_session(&self) -> Option<Session> {
        let slot = self.inner.slot.borrow();
        match slot.phase {
            SessionPhase::Connected => slot.session,
            _ => None,
        }
    }

    /// Signer of the active session
    pub fn signer(&self) -> Option<Arc<dyn ProofSigner>> {
        self.active_binding().map(|(_, signer)| signer)
    }

    /// The active session together with its signer, read from one snapshot
    /// so the pair always belongs to the same connect.
    pub fn active_binding(&self) -> Option<(Session, Arc<dyn ProofSigner>)> {
        let slot = self.inner.slot.borrow();
        match (slot.phase, slot.session, &slot.signer) {
            (SessionPhase::Connected, Some(session), Some(signer)) => {
                Some((session, signer.clone()))
            },
            _ => None,
        }
    }

    /// Address of the current session, including one in network limbo
    pub fn account(&self) -> Option<Address> {
        self.inner.slot.borrow().session.map(|s| s.address)
    }

    //=========================================================================
    // Connect
    //=========================================================================

    /// Run the connect flow; false on any failure or if an attempt is already running.
    pub async fn connect(&self) -> bool {
        self.try_connect().await.is_ok()
    }

    /// Run the connect flow, reporting why it failed.
    ///
    /// A second call while one is in flight returns `AlreadyConnecting`
    /// immediately and does not touch the session.
    pub async fn try_connect(&self) -> Result<Session, ConnectionError> {
        let attempt = ConnectAttempt::acquire(&self.inner.connecting).ok_or_else(|| {
            debug!(target: "session", "connect already in flight");
            ConnectionError::AlreadyConnecting
        })?;

        let transition = self.inner.transition.lock().await;
        let result = self.run_connect().await;
        match &result {
            Ok(session) => info!(
                target: "session",
                address = %session.address,
                chain_id = session.chain_id,
                "session established"
            ),
            Err(e) => {
                warn!(target: "session", error = %e, "connect failed");
                self.reset();
            },
        }

        // A waiter on the lock must never see the flag still set
        drop(attempt);
        drop(transition);
        result
    }

    async fn run_connect(&self) -> Result<Session, ConnectionError> {
        let provider = self.trusted_provider()?;
        self.begin_attempt();

        let address = self.request_accounts(provider.as_ref()).await?;

        self.set_phase(SessionPhase::NetworkChecking);
        let chain_id = self.validate_network(provider.as_ref()).await?;

        self.set_phase(SessionPhase::SignatureChallenge);
        let signer: Arc<dyn ProofSigner> = Arc::new(ProviderSigner::new(provider, address));
        self.inner.challenge.verify(signer.as_ref()).await?;

        let session = Session {
            address: signer.address(),
            chain_id,
            connected: true,
            verified: true,
        };
        self.install(session, signer);
        Ok(session)
    }

    fn trusted_provider(&self) -> Result<Arc<dyn WalletProvider>, ConnectionError> {
        let provider = self
            .inner
            .provider
            .clone()
            .ok_or(ConnectionError::ProviderUnavailable)?;
        if !provider.is_trusted() {
            return Err(ConnectionError::UntrustedProvider);
        }
        Ok(provider)
    }

    /// First authorized address
    async fn request_accounts(
        &self,
        provider: &dyn WalletProvider,
    ) -> Result<Address, ConnectionError> {
        let value = provider
            .request(methods::REQUEST_ACCOUNTS, Value::Array(vec![]))
            .await
            .map_err(|e| {
                warn!(target: "session", code = e.code, message = %e.message, "account request failed");
                ConnectionError::RequestFailed
            })?;

        let accounts: Vec<String> = match value {
            Value::Null => Vec::new(),
            value => serde_json::from_value(value).map_err(|_| ConnectionError::RequestFailed)?,
        };
        let first = accounts.first().ok_or(ConnectionError::NoAccounts)?;
        Address::from_str(first).map_err(|_| {
            warn!(target: "session", account = %first, "provider returned a malformed address");
            ConnectionError::RequestFailed
        })
    }

    async fn read_chain_id(&self, provider: &dyn WalletProvider) -> Result<u64, ConnectionError> {
        let value = provider
            .request(methods::CHAIN_ID, Value::Array(vec![]))
            .await
            .map_err(|e| {
                warn!(target: "session", code = e.code, message = %e.message, "chain id request failed");
                ConnectionError::RequestFailed
            })?;
        parse_chain_id(&value).ok_or(ConnectionError::RequestFailed)
    }

    /// Ensure the wallet is on the required chain, asking it to switch if not.
    async fn validate_network(&self, provider: &dyn WalletProvider) -> Result<u64, ConnectionError> {
        let required = self.inner.chain_id;
        let current = self.read_chain_id(provider).await?;
        if current == required {
            return Ok(current);
        }

        info!(target: "session", current, required, "requesting network switch");
        let params = json!([{ "chainId": format!("0x{:x}", required) }]);
        if let Err(e) = provider.request(methods::SWITCH_CHAIN, params).await {
            if e.code == error_codes::UNRECOGNIZED_CHAIN {
                warn!(target: "session", chain_id = required, "network not added to wallet");
            } else {
                warn!(target: "session", code = e.code, message = %e.message, "network switch rejected");
            }
            return Err(ConnectionError::NetworkSwitchRejected);
        }

        // The switch only counts once the wallet reports the new chain
        let confirmed = self.read_chain_id(provider).await?;
        if confirmed != required {
            warn!(target: "session", confirmed, required, "wallet acknowledged switch but chain unchanged");
            return Err(ConnectionError::WrongNetwork);
        }
        Ok(confirmed)
    }

    //=========================================================================
    // Events
    //=========================================================================

    /// Tear the session down (user-initiated)
    pub async fn disconnect(&self) {
        let _transition = self.inner.transition.lock().await;
        info!(target: "session", "disconnecting");
        self.reset();
    }

    /// Apply one provider notification.
    pub async fn handle_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(_) => {
                info!(target: "session", "account changed, reconnecting");
                self.teardown_and_reconnect().await;
            },
            ProviderEvent::Disconnect => {
                info!(target: "session", "provider disconnected, reconnecting");
                self.teardown_and_reconnect().await;
            },
            ProviderEvent::ChainChanged(chain) => {
                info!(target: "session", chain = %chain, "chain changed");
                match self.inner.chain_change_policy {
                    ChainChangePolicy::Revalidate => self.revalidate_network().await,
                    ChainChangePolicy::Reauthenticate => self.teardown_and_reconnect().await,
                }
            },
        }
    }

    /// Drain the provider's event stream on a background task, in order.
    ///
    /// Returns `None` when there is no provider to listen to.
    pub fn spawn_event_listener(&self) -> Option<JoinHandle<()>> {
        let mut events = self.inner.provider.as_ref()?.subscribe();
        let manager = self.clone();
        Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => manager.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(target: "session", skipped, "provider events dropped")
                    },
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(target: "session", "provider event stream closed");
        }))
    }

    async fn teardown_and_reconnect(&self) {
        {
            let _transition = self.inner.transition.lock().await;
            self.reset();
        }
        self.connect().await;
    }

    /// Re-run network validation for an existing session, keeping its signer.
    async fn revalidate_network(&self) {
        let _transition = self.inner.transition.lock().await;
        if self.inner.slot.borrow().session.is_none() {
            debug!(target: "session", "no session to revalidate");
            return;
        }
        let Ok(provider) = self.trusted_provider() else {
            self.reset();
            return;
        };

        self.set_phase(SessionPhase::NetworkChecking);
        match self.validate_network(provider.as_ref()).await {
            Ok(chain_id) => {
                self.inner.slot.send_modify(|slot| {
                    if let Some(session) = slot.session.as_mut() {
                        session.chain_id = chain_id;
                    }
                });
                self.set_phase(SessionPhase::Connected);
            },
            Err(e) => {
                warn!(target: "session", error = %e, "session left on an invalid network");
                self.set_phase(SessionPhase::NetworkInvalid);
            },
        }
    }

    //=========================================================================
    // Slot updates
    //=========================================================================

    fn set_phase(&self, phase: SessionPhase) {
        self.inner.slot.send_modify(|slot| slot.phase = phase);
        self.inner.phase.send_replace(phase);
    }

    fn begin_attempt(&self) {
        self.inner.slot.send_modify(|slot| {
            slot.session = None;
            slot.signer = None;
        });
        self.set_phase(SessionPhase::Connecting);
    }

    fn install(&self, session: Session, signer: Arc<dyn ProofSigner>) {
        self.inner.slot.send_modify(|slot| {
            slot.session = Some(session);
            slot.signer = Some(signer);
        });
        self.set_phase(SessionPhase::Connected);
    }

    fn reset(&self) {
        self.inner.slot.send_modify(|slot| {
            slot.session = None;
            slot.signer = None;
        });
        self.set_phase(SessionPhase::Disconnected);
    }
}

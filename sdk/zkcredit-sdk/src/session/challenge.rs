use crate::core::signer::ProofSigner;
use crate::error::ConnectionError;
use crate::utils;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Issues the human-readable sign-in challenge.
///
/// Nonces are wall-clock milliseconds, bumped when needed so that no two
/// challenges from one process share a nonce.
#[derive(Debug)]
pub struct ChallengeIssuer {
    app_name: String,
    last_nonce: AtomicU64,
}

impl ChallengeIssuer {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            last_nonce: AtomicU64::new(0),
        }
    }

    pub fn next_nonce(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();

        let previous = self
            .last_nonce
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.saturating_add(1))
    }

    pub fn message(&self, nonce: u64) -> String {
        format!("Connect to {}\nNonce: {}", self.app_name, nonce)
    }

    /// Have `signer` sign a fresh challenge and check the recovered address.
    pub async fn verify(&self, signer: &dyn ProofSigner) -> Result<(), ConnectionError> {
        let message = self.message(self.next_nonce());

        let signature = signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| {
                warn!(target: "session", error = %e, "signature request failed");
                ConnectionError::RequestFailed
            })?;

        match utils::recover_personal_signer(message.as_bytes(), &signature) {
            Some(recovered) if recovered == signer.address() => Ok(()),
            recovered => {
                warn!(
                    target: "session",
                    expected = %signer.address(),
                    recovered = ?recovered,
                    "challenge signature does not match signer"
                );
                Err(ConnectionError::SignatureMismatch)
            },
        }
    }
}

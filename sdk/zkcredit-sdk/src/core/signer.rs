use crate::utils;
use alloy_primitives::Address;
use async_trait::async_trait;
use libsecp256k1::{Message, PublicKey, SecretKey};

/// Abstraction for an entity that can sign messages for one address.
/// This allows the SDK to work with:
/// 1. A wallet provider account (`personal_sign`)
/// 2. Local keys (tests, CLI)
#[async_trait]
pub trait ProofSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Sign an EIP-191 personal message.
    /// Returns the 65-byte `r || s || v` signature, or Err if signing failed or was refused.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, String>;
}

/// Signer backed by an in-process secp256k1 key
pub struct LocalSigner {
    secret: SecretKey,
    address: Address,
}

impl LocalSigner {
    pub fn new(secret: SecretKey) -> Self {
        let address = utils::public_key_address(&PublicKey::from_secret_key(&secret));
        Self { secret, address }
    }

    pub fn from_slice(secret: &[u8]) -> Result<Self, String> {
        SecretKey::parse_slice(secret)
            .map(Self::new)
            .map_err(|e| format!("invalid secret key: {:?}", e))
    }

    /// Produce the 65-byte signature synchronously
    pub fn sign_personal(&self, message: &[u8]) -> Vec<u8> {
        let hashed = Message::parse(&utils::personal_message_hash(message));
        let (signature, recovery) = libsecp256k1::sign(&hashed, &self.secret);
        let mut out = signature.serialize().to_vec();
        out.push(recovery.serialize() + 27);
        out
    }
}

#[async_trait]
impl ProofSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        Ok(self.sign_personal(message))
    }
}

use crate::core::constants::methods;
use crate::core::provider::WalletProvider;
use crate::core::signer::ProofSigner;
use alloy_primitives::Address;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Signer for one authorized account of a wallet provider, via `personal_sign`
pub struct ProviderSigner {
    provider: Arc<dyn WalletProvider>,
    address: Address,
}

impl ProviderSigner {
    pub fn new(provider: Arc<dyn WalletProvider>, address: Address) -> Self {
        Self { provider, address }
    }
}

#[async_trait]
impl ProofSigner for ProviderSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        let params = json!([format!("0x{}", hex::encode(message)), self.address.to_string()]);
        let value = self
            .provider
            .request(methods::PERSONAL_SIGN, params)
            .await
            .map_err(|e| e.to_string())?;

        let signature = value.as_str().ok_or("signature is not a string")?;
        let digits = signature.strip_prefix("0x").unwrap_or(signature);
        hex::decode(digits).map_err(|e| format!("malformed signature: {}", e))
    }
}

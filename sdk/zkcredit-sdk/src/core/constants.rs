use alloy_primitives::{address, Address};

/// Selector every accepted calldata buffer must start with (`verifyProof(bytes,uint256[])`).
pub const CALLDATA_SELECTOR: [u8; 4] = [0x1e, 0x8e, 0x1e, 0x13];

/// Entry point the decoded proof is submitted to.
pub const SUBMIT_PROOF_SIGNATURE: &str = "submitCreditScoreProof(bytes,uint256[])";
pub const BORROWER_TIER_SIGNATURE: &str = "getBorrowerTier(address)";
pub const COLLATERAL_SIGNATURE: &str = "calculateCollateralRequirement(address,uint256)";

// First contract deployed on a fresh Anvil node
pub const DEFAULT_CONTRACT_ADDRESS: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");
pub const ANVIL_CHAIN_ID: u64 = 31337;

pub const DEFAULT_REQUIRED_CONFIRMATIONS: u64 = 2;
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CHALLENGE_APP_NAME: &str = "ZKML Credit Score App";

/// Largest integer a double-precision float represents exactly (2^53 - 1).
pub const SAFE_INTEGER_MAX: u64 = (1 << 53) - 1;

pub const WORD_SIZE: usize = 32;

/// EIP-1193 methods used by the session state machine
pub mod methods {
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const CHAIN_ID: &str = "eth_chainId";
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
    pub const PERSONAL_SIGN: &str = "personal_sign";
}

/// EIP-1193 / EIP-3326 provider error codes
pub mod error_codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
}

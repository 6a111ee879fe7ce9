use thiserror::Error;

/// Structural failures while turning calldata into a [`DecodedProof`].
///
/// Positions are absolute byte offsets into the decoded buffer.
///
/// [`DecodedProof`]: crate::types::DecodedProof
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer ends before a required word is fully present
    #[error("Calldata truncated: needed {needed} bytes, got {actual}")]
    TruncatedInput { needed: usize, actual: usize },

    /// First four bytes are not the expected function selector
    #[error("Invalid function selector: expected 0x{}, got 0x{}", hex::encode(.expected), hex::encode(.found))]
    SelectorMismatch { expected: [u8; 4], found: [u8; 4] },

    /// A head word points outside the buffer, or does not fit in 32 bits
    #[error("Argument offset at byte {position} is out of bounds")]
    OffsetOutOfBounds { position: usize },

    /// A length or count word describes more data than the buffer holds
    #[error("Length word at byte {position} exceeds the calldata bounds")]
    LengthOverflow { position: usize },

    /// Proof length word is zero
    #[error("Invalid proof: empty proof data")]
    EmptyProof,

    /// Input is neither ABI calldata, hex text, nor a recognised JSON object
    #[error("Unsupported calldata format: {0}")]
    UnsupportedFormat(String),

    /// Checked narrowing of a public input to `u64` failed
    #[error("Public input {index} does not fit in 64 bits")]
    InputOverflow { index: usize },
}

/// Reasons a connect attempt failed. Every variant leaves the session reset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Wallet provider not available")]
    ProviderUnavailable,

    #[error("Invalid or potentially malicious provider detected")]
    UntrustedProvider,

    #[error("No accounts available")]
    NoAccounts,

    #[error("Please connect to the correct network")]
    WrongNetwork,

    #[error("Network switch was rejected by the wallet")]
    NetworkSwitchRejected,

    #[error("A connection attempt is already in progress")]
    AlreadyConnecting,

    #[error("Signature verification failed")]
    SignatureMismatch,

    /// Provider answered with something that is not a valid response
    #[error("Wallet request failed")]
    RequestFailed,
}

/// Failures of the submission pipeline as shown to the user.
///
/// The text of these variants is fixed; provider and gateway detail is
/// logged, never embedded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Invalid calldata: {0}")]
    InvalidCalldata(#[from] DecodeError),

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Failed to process transaction")]
    TransactionFailed,

    #[error("Transaction reverted on-chain")]
    TransactionReverted { hash: alloy_primitives::B256 },

    #[error("Transaction was not confirmed in time")]
    TransactionUnconfirmed { hash: alloy_primitives::B256 },
}

impl SubmissionError {
    /// Whether retrying with the same input may succeed.
    ///
    /// Dispatch problems are retryable; an on-chain revert or bad input is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubmissionError::NotConnected
                | SubmissionError::TransactionFailed
                | SubmissionError::TransactionUnconfirmed { .. }
        )
    }
}

/// SDK-wide error type
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading an input file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, PipelineError>;

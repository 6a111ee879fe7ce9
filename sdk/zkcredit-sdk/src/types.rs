use crate::core::constants::SAFE_INTEGER_MAX;
use crate::error::{DecodeError, SubmissionError};
use alloy_primitives::{Address, B256, U256};

/// Structurally valid proof payload extracted from calldata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedProof {
    /// Proof payload, exactly the length its length word declared (never empty)
    pub proof: Vec<u8>,

    /// Public inputs, full 256-bit precision
    pub public_inputs: Vec<U256>,

    /// False only when decoded permissively from a buffer with a foreign selector
    pub selector_matched: bool,
}

impl DecodedProof {
    pub fn new(proof: Vec<u8>, public_inputs: Vec<U256>) -> Result<Self, DecodeError> {
        if proof.is_empty() {
            return Err(DecodeError::EmptyProof);
        }
        Ok(Self {
            proof,
            public_inputs,
            selector_matched: true,
        })
    }

    /// Check if a public input would lose precision as a double-precision float
    pub fn exceeds_safe_integer(&self, index: usize) -> bool {
        self.public_inputs
            .get(index)
            .is_some_and(|value| *value > U256::from(SAFE_INTEGER_MAX))
    }

    /// Indices of the public inputs that are only approximately representable
    /// outside of 256-bit arithmetic
    pub fn approximate_inputs(&self) -> Vec<usize> {
        (0..self.public_inputs.len())
            .filter(|&i| self.exceeds_safe_integer(i))
            .collect()
    }

    /// Narrow every public input to `u64`, failing on the first that does not fit
    pub fn public_inputs_u64(&self) -> Result<Vec<u64>, DecodeError> {
        self.public_inputs
            .iter()
            .enumerate()
            .map(|(index, value)| {
                u64::try_from(*value).map_err(|_| DecodeError::InputOverflow { index })
            })
            .collect()
    }
}

/// Authenticated wallet identity bound to a verified network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub address: Address,
    pub chain_id: u64,
    pub connected: bool,

    /// Set only after the signature challenge recovered `address`
    pub verified: bool,
}

/// A decoded proof bound to the verified session that will submit it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub proof: DecodedProof,
    pub session: Session,
}

impl SubmissionRequest {
    pub fn new(proof: DecodedProof, session: Session) -> Result<Self, SubmissionError> {
        if !session.connected || !session.verified {
            return Err(SubmissionError::NotConnected);
        }
        Ok(Self { proof, session })
    }
}

/// Outcome of a dispatched submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionResult {
    pub transaction_hash: B256,
    pub confirmed: bool,

    /// Only meaningful once `confirmed` is true
    pub succeeded: bool,

    pub block_number: Option<u64>,
}

/// Progress notifications emitted while a submission is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionProgress {
    Dispatched { hash: B256 },
    Confirmed { hash: B256, succeeded: bool },
}

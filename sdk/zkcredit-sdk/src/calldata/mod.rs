pub mod decoder;
pub mod encoder;
mod text;

pub use decoder::CalldataDecoder;
pub use encoder::{address_word, encode_static_call, uint_word, CalldataBuilder};

use crate::error::DecodeError;
use crate::types::DecodedProof;
use serde::Deserialize;

/// How a selector mismatch is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Mismatch is a `SelectorMismatch` error
    #[default]
    Strict,
    /// Mismatch is reported through `DecodedProof::selector_matched`
    Permissive,
}

/// Validation result in the shape the upload form consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofValidation {
    pub is_valid: bool,
    pub data: Option<DecodedProof>,
    pub error: Option<String>,
}

impl From<Result<DecodedProof, DecodeError>> for ProofValidation {
    fn from(result: Result<DecodedProof, DecodeError>) -> Self {
        match result {
            Ok(data) => Self {
                is_valid: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Self {
                is_valid: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

impl CalldataDecoder {
    /// Parse pasted text and report the outcome as a [`ProofValidation`]
    pub fn validate_and_parse(&self, input: &str) -> ProofValidation {
        self.decode_text(input).into()
    }
}

use crate::core::constants::{CALLDATA_SELECTOR, WORD_SIZE};
use crate::types::DecodedProof;
use alloy_primitives::{Address, U256};

/// Head size of `f(bytes, uint256[])`: two offset words.
const HEAD_SIZE: usize = 2 * WORD_SIZE;

/// Fluent builder for `(bytes, uint256[])` calldata.
///
/// Produces the same layout [`CalldataDecoder`] walks, with the proof
/// placed directly after the head and the inputs after the padded proof.
///
/// [`CalldataDecoder`]: crate::calldata::CalldataDecoder
#[derive(Debug, Clone)]
pub struct CalldataBuilder {
    selector: [u8; 4],
    proof: Vec<u8>,
    public_inputs: Vec<U256>,
}

impl Default for CalldataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CalldataBuilder {
    pub fn new() -> Self {
        Self {
            selector: CALLDATA_SELECTOR,
            proof: Vec::new(),
            public_inputs: Vec::new(),
        }
    }

    /// Start from an already decoded proof
    pub fn from_proof(proof: &DecodedProof) -> Self {
        Self::new()
            .with_proof(proof.proof.clone())
            .with_public_inputs(proof.public_inputs.clone())
    }

    pub fn with_selector(mut self, selector: [u8; 4]) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_proof(mut self, proof: Vec<u8>) -> Self {
        self.proof = proof;
        self
    }

    pub fn with_public_inputs(mut self, inputs: Vec<U256>) -> Self {
        self.public_inputs = inputs;
        self
    }

    pub fn add_public_input(mut self, input: U256) -> Self {
        self.public_inputs.push(input);
        self
    }

    /// Build the serialized calldata.
    pub fn build(self) -> Vec<u8> {
        let padded_proof = padded_len(self.proof.len());
        let proof_offset = HEAD_SIZE;
        let inputs_offset = proof_offset + WORD_SIZE + padded_proof;

        let total = 4 + inputs_offset + WORD_SIZE + self.public_inputs.len() * WORD_SIZE;
        let mut buffer = Vec::with_capacity(total);

        buffer.extend_from_slice(&self.selector);
        buffer.extend_from_slice(&usize_word(proof_offset));
        buffer.extend_from_slice(&usize_word(inputs_offset));

        buffer.extend_from_slice(&usize_word(self.proof.len()));
        buffer.extend_from_slice(&self.proof);
        buffer.resize(buffer.len() + padded_proof - self.proof.len(), 0);

        buffer.extend_from_slice(&usize_word(self.public_inputs.len()));
        for input in &self.public_inputs {
            buffer.extend_from_slice(&uint_word(*input));
        }

        buffer
    }
}

/// Encode a call whose arguments are all static words
pub fn encode_static_call(selector: [u8; 4], words: &[[u8; WORD_SIZE]]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(4 + words.len() * WORD_SIZE);
    buffer.extend_from_slice(&selector);
    for word in words {
        buffer.extend_from_slice(word);
    }
    buffer
}

pub fn uint_word(value: U256) -> [u8; WORD_SIZE] {
    value.to_be_bytes::<WORD_SIZE>()
}

pub fn address_word(address: Address) -> [u8; WORD_SIZE] {
    let mut word = [0u8; WORD_SIZE];
    word[12..].copy_from_slice(address.as_slice());
    word
}

fn usize_word(value: usize) -> [u8; WORD_SIZE] {
    uint_word(U256::from(value))
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD_SIZE) * WORD_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(padded_len(0), 0);
        assert_eq!(padded_len(1), 32);
        assert_eq!(padded_len(32), 32);
        assert_eq!(padded_len(33), 64);
    }

    #[test]
    fn test_layout_offsets() {
        let data = CalldataBuilder::new()
            .with_proof(vec![0x11; 40])
            .add_public_input(U256::from(5))
            .build();

        // selector + head + len + 64 padded bytes + count + one input
        assert_eq!(data.len(), 4 + 64 + 32 + 64 + 32 + 32);
        assert_eq!(&data[..4], &CALLDATA_SELECTOR);
        assert_eq!(data[35], 0x40);
        assert_eq!(data[67], 0x40 + 32 + 64);
        assert_eq!(data[99], 40);
        assert!(data[140..164].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_address_word() {
        let address = Address::repeat_byte(0xab);
        let word = address_word(address);
        assert!(word[..12].iter().all(|&b| b == 0));
        assert!(word[12..].iter().all(|&b| b == 0xab));
    }

    #[test]
    fn test_static_call() {
        let data = encode_static_call([1, 2, 3, 4], &[uint_word(U256::from(9))]);
        assert_eq!(data.len(), 36);
        assert_eq!(data[35], 9);
    }
}

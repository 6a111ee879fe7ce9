use crate::calldata::text;
use crate::calldata::DecodeMode;
use crate::core::constants::{CALLDATA_SELECTOR, WORD_SIZE};
use crate::error::DecodeError;
use crate::types::DecodedProof;
use alloy_primitives::U256;
use tracing::{debug, warn};

/// Start of the arguments area; every offset in the head is relative to it.
const ARGS_START: usize = 4;

/// Offsets, lengths and counts are 32-bit quantities stored in 32-byte words.
/// These leading bytes of such a word must be zero.
const NARROW_WORD_HIGH_BYTES: usize = WORD_SIZE - 4;

/// Decoder for calldata shaped as `f(bytes, uint256[])`.
///
/// Layout:
/// ```text
/// [0, 4)     selector
/// [4, 36)    offset of the proof bytes, relative to byte 4
/// [36, 68)   offset of the public inputs, relative to byte 4
/// @proof     length word L, then L bytes (zero padded to a word boundary)
/// @inputs    count word N, then N big-endian 256-bit words
/// ```
///
/// Decoding is pure: no state, no I/O, safe to call repeatedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalldataDecoder {
    selector: [u8; 4],
    mode: DecodeMode,
}

impl Default for CalldataDecoder {
    fn default() -> Self {
        Self::new(DecodeMode::Strict)
    }
}

impl CalldataDecoder {
    pub fn new(mode: DecodeMode) -> Self {
        Self {
            selector: CALLDATA_SELECTOR,
            mode,
        }
    }

    /// Accept calldata for a different `(bytes, uint256[])` entry point
    pub fn with_selector(mut self, selector: [u8; 4]) -> Self {
        self.selector = selector;
        self
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Decode raw ABI calldata by walking its head words
    pub fn decode(&self, buffer: &[u8]) -> Result<DecodedProof, DecodeError> {
        let found = read_selector(buffer)?;
        let selector_matched = found == self.selector;
        if !selector_matched {
            match self.mode {
                DecodeMode::Strict => {
                    return Err(DecodeError::SelectorMismatch {
                        expected: self.selector,
                        found,
                    })
                },
                DecodeMode::Permissive => warn!(
                    target: "calldata",
                    expected = %hex::encode(self.selector),
                    found = %hex::encode(found),
                    "function selector mismatch, continuing in permissive mode"
                ),
            }
        }

        let proof_head = read_head(buffer, ARGS_START)?;
        let inputs_head = read_head(buffer, ARGS_START + WORD_SIZE)?;
        let proof_start = resolve_offset(buffer, proof_head, ARGS_START)?;
        let inputs_start = resolve_offset(buffer, inputs_head, ARGS_START + WORD_SIZE)?;

        let proof = read_bytes_argument(buffer, proof_start)?;
        let public_inputs = read_uint_array_argument(buffer, inputs_start)?;

        debug!(
            target: "calldata",
            proof_len = proof.len(),
            inputs = public_inputs.len(),
            "decoded calldata"
        );

        let mut decoded = DecodedProof::new(proof, public_inputs)?;
        decoded.selector_matched = selector_matched;
        warn_on_approximate(&decoded);
        Ok(decoded)
    }

    /// Decode textual calldata: `0x` hex of the binary layout, or a JSON object
    /// with `proof` and `publicInputs` fields.
    pub fn decode_text(&self, input: &str) -> Result<DecodedProof, DecodeError> {
        let input = input.trim();
        if text::has_hex_prefix(input) {
            let bytes = text::decode_hex(input)?;
            return self.decode(&bytes);
        }

        let decoded = text::parse_json(input)?;
        warn_on_approximate(&decoded);
        Ok(decoded)
    }

    /// Decode an uploaded buffer that may hold either binary calldata or its
    /// textual forms.
    pub fn decode_input(&self, input: &[u8]) -> Result<DecodedProof, DecodeError> {
        match std::str::from_utf8(input) {
            Ok(text) if text::looks_textual(text) => self.decode_text(text),
            _ => self.decode(input),
        }
    }
}

fn warn_on_approximate(decoded: &DecodedProof) {
    let approximate = decoded.approximate_inputs();
    if !approximate.is_empty() {
        warn!(
            target: "calldata",
            indices = ?approximate,
            "public inputs exceed the safe integer range"
        );
    }
}

fn read_selector(buffer: &[u8]) -> Result<[u8; 4], DecodeError> {
    buffer
        .get(..ARGS_START)
        .and_then(|s| s.try_into().ok())
        .ok_or(DecodeError::TruncatedInput {
            needed: ARGS_START,
            actual: buffer.len(),
        })
}

fn read_word(buffer: &[u8], position: usize) -> Option<&[u8; WORD_SIZE]> {
    let end = position.checked_add(WORD_SIZE)?;
    buffer.get(position..end)?.try_into().ok()
}

/// The low four bytes of a word, or None if any higher byte is set.
fn narrow_word(word: &[u8; WORD_SIZE]) -> Option<usize> {
    let (high, low) = word.split_at(NARROW_WORD_HIGH_BYTES);
    if high.iter().any(|&b| b != 0) {
        return None;
    }
    let low: [u8; 4] = low.try_into().ok()?;
    usize::try_from(u32::from_be_bytes(low)).ok()
}

fn read_head(buffer: &[u8], head_position: usize) -> Result<&[u8; WORD_SIZE], DecodeError> {
    read_word(buffer, head_position).ok_or(DecodeError::TruncatedInput {
        needed: head_position + WORD_SIZE,
        actual: buffer.len(),
    })
}

/// Resolve a head word into the absolute position of its argument.
fn resolve_offset(
    buffer: &[u8],
    word: &[u8; WORD_SIZE],
    head_position: usize,
) -> Result<usize, DecodeError> {
    let out_of_bounds = DecodeError::OffsetOutOfBounds {
        position: head_position,
    };

    let start = narrow_word(word)
        .and_then(|offset| offset.checked_add(ARGS_START))
        .ok_or_else(|| out_of_bounds.clone())?;

    // The length/count word at the target must be fully present
    match start.checked_add(WORD_SIZE) {
        Some(end) if end <= buffer.len() => Ok(start),
        _ => Err(out_of_bounds),
    }
}

/// Read a length or count word and return `(value, first byte after the word)`.
fn read_length(buffer: &[u8], position: usize) -> Result<(usize, usize), DecodeError> {
    let overflow = DecodeError::LengthOverflow { position };
    let word = read_word(buffer, position).ok_or_else(|| overflow.clone())?;
    let value = narrow_word(word).ok_or(overflow)?;
    Ok((value, position + WORD_SIZE))
}

fn read_bytes_argument(buffer: &[u8], position: usize) -> Result<Vec<u8>, DecodeError> {
    let (len, data_start) = read_length(buffer, position)?;
    if len == 0 {
        return Err(DecodeError::EmptyProof);
    }

    // Padding after the payload is not required to be present
    data_start
        .checked_add(len)
        .and_then(|end| buffer.get(data_start..end))
        .map(<[u8]>::to_vec)
        .ok_or(DecodeError::LengthOverflow { position })
}

fn read_uint_array_argument(buffer: &[u8], position: usize) -> Result<Vec<U256>, DecodeError> {
    let (count, data_start) = read_length(buffer, position)?;
    let overflow = DecodeError::LengthOverflow { position };

    let data = count
        .checked_mul(WORD_SIZE)
        .and_then(|size| data_start.checked_add(size))
        .and_then(|end| buffer.get(data_start..end))
        .ok_or(overflow)?;

    Ok(data
        .chunks_exact(WORD_SIZE)
        .map(U256::from_be_slice)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calldata::CalldataBuilder;
    use assert_matches::assert_matches;

    fn word(value: u64) -> [u8; 32] {
        U256::from(value).to_be_bytes::<32>()
    }

    /// Calldata built word by word: proof 0xAABBCC, public inputs [42]
    fn scenario_calldata() -> Vec<u8> {
        let mut data = vec![0x1e, 0x8e, 0x1e, 0x13];
        data.extend_from_slice(&word(0x40));
        data.extend_from_slice(&word(0x80));
        data.extend_from_slice(&word(3));
        let mut padded = [0u8; 32];
        padded[..3].copy_from_slice(&[0xAA, 0xBB, 0xCC]);
        data.extend_from_slice(&padded);
        data.extend_from_slice(&word(1));
        data.extend_from_slice(&word(42));
        data
    }

    #[test]
    fn test_decode_reference_scenario() {
        let decoded = CalldataDecoder::default().decode(&scenario_calldata()).unwrap();
        assert_eq!(decoded.proof, vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(decoded.public_inputs, vec![U256::from(42)]);
        assert!(decoded.selector_matched);
    }

    #[test]
    fn test_builder_matches_hand_layout() {
        let built = CalldataBuilder::new()
            .with_proof(vec![0xAA, 0xBB, 0xCC])
            .add_public_input(U256::from(42))
            .build();
        assert_eq!(built, scenario_calldata());
    }

    #[test]
    fn test_short_buffer() {
        let err = CalldataDecoder::default().decode(&[0x1e, 0x8e]).unwrap_err();
        assert_eq!(err, DecodeError::TruncatedInput { needed: 4, actual: 2 });
    }

    #[test]
    fn test_selector_strict_and_permissive() {
        let mut data = scenario_calldata();
        data[0] = 0xff;

        let err = CalldataDecoder::new(DecodeMode::Strict).decode(&data).unwrap_err();
        assert_matches!(err, DecodeError::SelectorMismatch { found, .. } if found == [0xff, 0x8e, 0x1e, 0x13]);

        let decoded = CalldataDecoder::new(DecodeMode::Permissive).decode(&data).unwrap();
        assert!(!decoded.selector_matched);
        assert_eq!(decoded.proof, vec![0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_every_truncation_is_an_error() {
        let data = scenario_calldata();
        let decoder = CalldataDecoder::default();
        for cut in 0..data.len() {
            let result = decoder.decode(&data[..cut]);
            assert!(result.is_err(), "truncation at {} decoded", cut);
        }
    }

    #[test]
    fn test_truncated_head() {
        let data = scenario_calldata();
        let decoder = CalldataDecoder::default();
        for cut in [36, 40, 67] {
            let err = decoder.decode(&data[..cut]).unwrap_err();
            assert_eq!(err, DecodeError::TruncatedInput { needed: 68, actual: cut });
        }

        // Both head words present, first target missing
        let err = decoder.decode(&data[..68]).unwrap_err();
        assert_eq!(err, DecodeError::OffsetOutOfBounds { position: 4 });
    }

    #[test]
    fn test_offset_past_end() {
        let mut data = scenario_calldata();
        data[4..36].copy_from_slice(&word(0x1000));
        let err = CalldataDecoder::default().decode(&data).unwrap_err();
        assert_eq!(err, DecodeError::OffsetOutOfBounds { position: 4 });
    }

    #[test]
    fn test_offset_high_bytes_rejected() {
        let mut data = scenario_calldata();
        // 2^32 + 0x40 would truncate to a valid offset
        data[36 + 27] = 1;
        let err = CalldataDecoder::default().decode(&data).unwrap_err();
        assert_eq!(err, DecodeError::OffsetOutOfBounds { position: 36 });
    }

    #[test]
    fn test_length_high_bytes_rejected() {
        let mut data = scenario_calldata();
        data[68] = 0x01;
        let err = CalldataDecoder::default().decode(&data).unwrap_err();
        assert_eq!(err, DecodeError::LengthOverflow { position: 68 });
    }

    #[test]
    fn test_proof_length_exceeds_buffer() {
        let mut data = scenario_calldata();
        data[68..100].copy_from_slice(&word(500));
        let err = CalldataDecoder::default().decode(&data).unwrap_err();
        assert_eq!(err, DecodeError::LengthOverflow { position: 68 });
    }

    #[test]
    fn test_input_count_exceeds_buffer() {
        let mut data = scenario_calldata();
        data[132..164].copy_from_slice(&word(2));
        let err = CalldataDecoder::default().decode(&data).unwrap_err();
        assert_eq!(err, DecodeError::LengthOverflow { position: 132 });
    }

    #[test]
    fn test_huge_count_does_not_overflow() {
        let mut data = scenario_calldata();
        data[132..164].copy_from_slice(&word(u32::MAX as u64));
        let err = CalldataDecoder::default().decode(&data).unwrap_err();
        assert_eq!(err, DecodeError::LengthOverflow { position: 132 });
    }

    #[test]
    fn test_empty_proof() {
        let data = CalldataBuilder::new().add_public_input(U256::from(1)).build();
        let err = CalldataDecoder::default().decode(&data).unwrap_err();
        assert_eq!(err, DecodeError::EmptyProof);
    }

    #[test]
    fn test_full_width_inputs_preserved() {
        let data = CalldataBuilder::new()
            .with_proof(vec![1, 2, 3])
            .add_public_input(U256::MAX)
            .add_public_input(U256::from(7))
            .build();
        let decoded = CalldataDecoder::default().decode(&data).unwrap();
        assert_eq!(decoded.public_inputs, vec![U256::MAX, U256::from(7)]);
        assert_eq!(decoded.approximate_inputs(), vec![0]);
    }

    #[test]
    fn test_decoding_is_repeatable() {
        let data = scenario_calldata();
        let decoder = CalldataDecoder::default();
        assert_eq!(decoder.decode(&data), decoder.decode(&data));
    }

    #[test]
    fn test_plain_text_input_is_unsupported() {
        let decoder = CalldataDecoder::default();
        let upload = decoder.decode_input(b"not calldata").unwrap_err();
        let pasted = decoder.decode_text("not calldata").unwrap_err();
        assert_matches!(upload, DecodeError::UnsupportedFormat(_));
        assert_eq!(upload, pasted);

        // Binary calldata still takes the head walk
        assert!(decoder.decode_input(&scenario_calldata()).is_ok());
    }
}

//! Textual calldata forms: `0x` hex and the JSON `{ proof, publicInputs }` object.

use crate::error::DecodeError;
use crate::types::DecodedProof;
use alloy_primitives::U256;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonCalldata {
    proof: JsonProof,
    public_inputs: Vec<JsonInput>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonProof {
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInput {
    Number(u64),
    Text(String),
}

pub(crate) fn has_hex_prefix(input: &str) -> bool {
    input.starts_with("0x") || input.starts_with("0X")
}

/// Whether a UTF-8 buffer should go through the textual path.
///
/// Printable text that is neither hex nor JSON is textual too, so it fails as
/// an unsupported format instead of as a selector mismatch. Binary calldata
/// always carries control bytes (zero high bytes in its head words).
pub(crate) fn looks_textual(input: &str) -> bool {
    let trimmed = input.trim_start();
    has_hex_prefix(trimmed) || trimmed.starts_with('{') || is_printable(input)
}

fn is_printable(input: &str) -> bool {
    !input.is_empty()
        && input
            .chars()
            .all(|c| !c.is_control() || c.is_ascii_whitespace())
}

pub(crate) fn decode_hex(input: &str) -> Result<Vec<u8>, DecodeError> {
    let digits = input.get(2..).unwrap_or_default();
    hex::decode(digits)
        .map_err(|e| DecodeError::UnsupportedFormat(format!("invalid hex calldata: {}", e)))
}

pub(crate) fn parse_json(input: &str) -> Result<DecodedProof, DecodeError> {
    let parsed: JsonCalldata = serde_json::from_str(input).map_err(|_| {
        DecodeError::UnsupportedFormat(
            "expected 0x-prefixed calldata or a JSON object with proof and publicInputs".into(),
        )
    })?;

    let proof = match parsed.proof {
        JsonProof::Text(text) if has_hex_prefix(&text) => decode_hex(&text)?,
        JsonProof::Text(text) => text.into_bytes(),
        JsonProof::Bytes(bytes) => bytes,
    };

    let public_inputs = parsed
        .public_inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| parse_input(index, input))
        .collect::<Result<Vec<_>, _>>()?;

    DecodedProof::new(proof, public_inputs)
}

fn parse_input(index: usize, input: JsonInput) -> Result<U256, DecodeError> {
    match input {
        JsonInput::Number(n) => Ok(U256::from(n)),
        // U256 parsing accepts decimal and 0x-prefixed hex
        JsonInput::Text(text) => U256::from_str(text.trim()).map_err(|_| {
            DecodeError::UnsupportedFormat(format!("public input {} is not an integer", index))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_json_hex_proof() {
        let decoded = parse_json(r#"{"proof":"0xaabbcc","publicInputs":[42, "7"]}"#).unwrap();
        assert_eq!(decoded.proof, vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(decoded.public_inputs, vec![U256::from(42), U256::from(7)]);
    }

    #[test]
    fn test_json_byte_array_proof() {
        let decoded = parse_json(r#"{"proof":[1,2,255],"publicInputs":[]}"#).unwrap();
        assert_eq!(decoded.proof, vec![1, 2, 255]);
        assert!(decoded.public_inputs.is_empty());
    }

    #[test]
    fn test_json_plain_text_proof_is_utf8() {
        let decoded = parse_json(r#"{"proof":"abc","publicInputs":[1]}"#).unwrap();
        assert_eq!(decoded.proof, b"abc".to_vec());
    }

    #[test]
    fn test_json_large_input_as_string() {
        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        let json = format!(r#"{{"proof":[1],"publicInputs":["{}", "0x10"]}}"#, max);
        let decoded = parse_json(&json).unwrap();
        assert_eq!(decoded.public_inputs, vec![U256::MAX, U256::from(16)]);
    }

    #[test]
    fn test_json_rejections() {
        assert_matches!(
            parse_json(r#"{"proof":[1]}"#),
            Err(DecodeError::UnsupportedFormat(_))
        );
        assert_matches!(
            parse_json(r#"{"proof":[1,256],"publicInputs":[]}"#),
            Err(DecodeError::UnsupportedFormat(_))
        );
        assert_matches!(
            parse_json(r#"{"proof":[1],"publicInputs":["seven"]}"#),
            Err(DecodeError::UnsupportedFormat(_))
        );
        assert_eq!(
            parse_json(r#"{"proof":[],"publicInputs":[1]}"#),
            Err(DecodeError::EmptyProof)
        );
        assert_matches!(parse_json("not json"), Err(DecodeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(decode_hex("0x00ff").unwrap(), vec![0x00, 0xff]);
        assert_matches!(decode_hex("0xabc"), Err(DecodeError::UnsupportedFormat(_)));
        assert_matches!(decode_hex("0xzz"), Err(DecodeError::UnsupportedFormat(_)));
        assert!(looks_textual("  0x1e8e"));
        assert!(looks_textual("\n{\"proof\":[]}"));
        assert!(looks_textual("not calldata"));
        assert!(!looks_textual(""));
        assert!(!looks_textual("\u{1e}\0\0\0"));
    }
}

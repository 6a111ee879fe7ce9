use crate::error::Result;
use alloy_primitives::{Address, U256};
use libsecp256k1::{Message, PublicKey, RecoveryId, Signature};
use sha3::{Digest, Keccak256};
use std::path::Path;

//=============================================================================
// Calldata Files
//=============================================================================

/// Contents of an uploaded calldata file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalldataFile {
    pub bytes: Vec<u8>,

    /// `0x`-prefixed lowercase hex of `bytes`
    pub hex: String,
}

/// Read a calldata file wholesale into memory
pub fn read_calldata_file(path: impl AsRef<Path>) -> Result<CalldataFile> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    tracing::info!(target: "calldata", path = %path.display(), len = bytes.len(), "read calldata file");

    let hex = format!("0x{}", hex::encode(&bytes));
    Ok(CalldataFile { bytes, hex })
}

//=============================================================================
// Hashing & Signatures
//=============================================================================

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// First four bytes of the keccak hash of a canonical function signature
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// EIP-191 hash of a personal message
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Address owning an uncompressed secp256k1 public key
pub fn public_key_address(public_key: &PublicKey) -> Address {
    let serialized = public_key.serialize();
    let hash = keccak256(&serialized[1..]);
    Address::from_slice(&hash[12..])
}

/// Recover the address that produced a 65-byte `r || s || v` personal-message signature.
///
/// `v` may be either 0/1 or 27/28.
pub fn recover_personal_signer(message: &[u8], signature: &[u8]) -> Option<Address> {
    let (rs, v) = match signature {
        [rs @ .., v] if rs.len() == 64 => (rs, *v),
        _ => return None,
    };
    let recovery = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return None,
    };

    let signature = Signature::parse_standard_slice(rs).ok()?;
    let recovery_id = RecoveryId::parse(recovery).ok()?;
    let message = Message::parse(&personal_message_hash(message));

    let public_key = libsecp256k1::recover(&message, &signature, &recovery_id).ok()?;
    Some(public_key_address(&public_key))
}

//=============================================================================
// Ether Amounts
//=============================================================================

const ETHER_DECIMALS: usize = 18;

fn wei_per_ether() -> U256 {
    U256::from(10u64).pow(U256::from(ETHER_DECIMALS))
}

/// Format a wei amount in ether, keeping at least one fractional digit ("1.5", "2.0")
pub fn format_ether(wei: U256) -> String {
    let unit = wei_per_ether();
    let whole = wei / unit;
    let fraction = format!("{:0>width$}", (wei % unit).to_string(), width = ETHER_DECIMALS);
    let fraction = fraction.trim_end_matches('0');
    let fraction = if fraction.is_empty() { "0" } else { fraction };
    format!("{}.{}", whole, fraction)
}

/// Parse a decimal ether amount into wei. At most 18 fractional digits.
pub fn parse_ether(amount: &str) -> Option<U256> {
    let amount = amount.trim();
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.len() > ETHER_DECIMALS
        || !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).ok()?
    };
    let fraction = format!("{:0<width$}", fraction, width = ETHER_DECIMALS);
    let fraction = U256::from_str_radix(&fraction, 10).ok()?;

    whole.checked_mul(wei_per_ether())?.checked_add(fraction)
}

//! External Chain Address Codec
//!
//! Every external chain this contract can serve is described by an entry in an
//! immutable registry built by [`chain_registry`]. The entry decides how
//! destination, fee-receiver and token-contract addresses are validated and how
//! they are packed into 20-byte ABI `address` words for checkpoints.
//!
//! ## Address Formats
//!
//! | Format | Text form                          | Raw bytes            |
//! |--------|------------------------------------|----------------------|
//! | Evm    | `0x` + 40 hex chars (EIP-55)       | 20-byte address      |
//! | Tron   | base58check, version byte `0x41`   | 20 bytes after `0x41`|

use std::collections::BTreeMap;

use cosmwasm_schema::cw_serde;

use crate::error::ContractError;
use crate::hash::keccak256;

/// Version byte prefixed to Tron addresses before base58check encoding.
pub const TRON_ADDRESS_PREFIX: u8 = 0x41;

const CHAIN_NAME_MIN_LEN: usize = 2;
const CHAIN_NAME_MAX_LEN: usize = 33;

/// Address encoding used by an external chain
#[cw_serde]
#[derive(Copy, Eq)]
pub enum AddressFormat {
    Evm,
    Tron,
}

/// Builds the chain-name registry.
///
/// The map is constructed once per call site and never mutated; instantiate
/// resolves the configured chain name against it and stores the result.
pub fn chain_registry() -> BTreeMap<&'static str, AddressFormat> {
    BTreeMap::from([
        ("arbitrum", AddressFormat::Evm),
        ("avalanche", AddressFormat::Evm),
        ("bsc", AddressFormat::Evm),
        ("eth", AddressFormat::Evm),
        ("optimism", AddressFormat::Evm),
        ("polygon", AddressFormat::Evm),
        ("tron", AddressFormat::Tron),
    ])
}

/// Validates a chain name against `[a-zA-Z][a-zA-Z0-9/]{1,32}`.
pub fn validate_chain_name(chain_name: &str) -> Result<(), ContractError> {
    let invalid = || ContractError::InvalidChainName {
        chain_name: chain_name.to_string(),
    };
    let mut chars = chain_name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(invalid()),
    }
    if chain_name.len() < CHAIN_NAME_MIN_LEN || chain_name.len() > CHAIN_NAME_MAX_LEN {
        return Err(invalid());
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '/') {
        return Err(invalid());
    }
    Ok(())
}

/// Resolves the address format for `chain_name`.
pub fn resolve_chain(
    registry: &BTreeMap<&'static str, AddressFormat>,
    chain_name: &str,
) -> Result<AddressFormat, ContractError> {
    validate_chain_name(chain_name)?;
    registry
        .get(chain_name)
        .copied()
        .ok_or_else(|| ContractError::UnsupportedChain {
            chain_name: chain_name.to_string(),
        })
}

impl AddressFormat {
    /// Validates `addr` and returns its canonical text form.
    pub fn validate(&self, addr: &str) -> Result<String, ContractError> {
        match self {
            AddressFormat::Evm => {
                let raw = parse_evm_address(addr)?;
                let checksummed = to_checksum_address(&raw);
                let hex_part = &addr[2..];
                let is_uniform = hex_part == hex_part.to_lowercase()
                    || hex_part == hex_part.to_uppercase();
                if !is_uniform && addr != checksummed {
                    return Err(ContractError::invalid_address(format!(
                        "EVM address checksum mismatch: {}",
                        addr
                    )));
                }
                Ok(checksummed)
            }
            AddressFormat::Tron => {
                let raw = parse_tron_address(addr)?;
                Ok(encode_tron_address(&raw))
            }
        }
    }

    /// Decodes `addr` into the 20 bytes used as an ABI `address`.
    pub fn to_bytes20(&self, addr: &str) -> Result<[u8; 20], ContractError> {
        match self {
            AddressFormat::Evm => parse_evm_address(addr),
            AddressFormat::Tron => parse_tron_address(addr),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFormat::Evm => "evm",
            AddressFormat::Tron => "tron",
        }
    }
}

// ============================================================================
// EVM
// ============================================================================

/// Parse a 0x-prefixed hex EVM address to 20 bytes
pub fn parse_evm_address(addr: &str) -> Result<[u8; 20], ContractError> {
    let hex_str = addr.strip_prefix("0x").ok_or_else(|| {
        ContractError::invalid_address(format!("EVM address must start with 0x: {}", addr))
    })?;

    if hex_str.len() != 40 {
        return Err(ContractError::invalid_address(format!(
            "Invalid EVM address length: expected 40 hex chars, got {}",
            hex_str.len()
        )));
    }

    let bytes = hex::decode(hex_str)
        .map_err(|e| ContractError::invalid_address(format!("Invalid hex: {}", e)))?;

    let mut result = [0u8; 20];
    result.copy_from_slice(&bytes);
    Ok(result)
}

/// Encode 20 bytes as an EIP-55 mixed-case checksummed address
pub fn to_checksum_address(bytes: &[u8; 20]) -> String {
    let lower = hex::encode(bytes);
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

// ============================================================================
// Tron
// ============================================================================

/// Decode a base58check Tron address (`T...`) to its 20 address bytes
pub fn parse_tron_address(addr: &str) -> Result<[u8; 20], ContractError> {
    let decoded = bs58::decode(addr)
        .with_check(Some(TRON_ADDRESS_PREFIX))
        .into_vec()
        .map_err(|e| ContractError::invalid_address(format!("Invalid Tron address: {}", e)))?;

    if decoded.len() != 21 {
        return Err(ContractError::invalid_address(format!(
            "Invalid Tron address length: expected 21 bytes, got {}",
            decoded.len()
        )));
    }

    let mut result = [0u8; 20];
    result.copy_from_slice(&decoded[1..]);
    Ok(result)
}

/// Encode 20 address bytes as a base58check Tron address
pub fn encode_tron_address(bytes: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(TRON_ADDRESS_PREFIX);
    payload.extend_from_slice(bytes);
    bs58::encode(payload).with_check().into_string()
}

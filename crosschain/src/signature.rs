//! Recovery of external signer addresses from checkpoint signatures
//!
//! Oracles sign checkpoints with their external-chain key using the Ethereum
//! personal-message scheme:
//! `keccak256("\x19Ethereum Signed Message:\n32" ‖ checkpoint)`.
//! The signature is `r ‖ s ‖ v` (65 bytes), with `v` either raw (0/1) or
//! offset by 27.

use cosmwasm_std::Api;

use crate::error::ContractError;
use crate::hash::keccak256;

const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

const SIGNATURE_LEN: usize = 65;

/// Digest actually signed for `checkpoint`
pub fn signed_message_hash(checkpoint: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(SIGNED_MESSAGE_PREFIX.len() + 32);
    data.extend_from_slice(SIGNED_MESSAGE_PREFIX);
    data.extend_from_slice(checkpoint);
    keccak256(&data)
}

/// Recovers the 20-byte external address that produced `signature` over `checkpoint`.
pub fn external_address_from_signature(
    api: &dyn Api,
    checkpoint: &[u8; 32],
    signature: &[u8],
) -> Result<[u8; 20], ContractError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(ContractError::InvalidSignature {
            reason: format!(
                "expected {} bytes, got {}",
                SIGNATURE_LEN,
                signature.len()
            ),
        });
    }

    let recovery_param = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        v => {
            return Err(ContractError::InvalidSignature {
                reason: format!("invalid recovery id {}", v),
            })
        }
    };

    let digest = signed_message_hash(checkpoint);
    let pubkey = api
        .secp256k1_recover_pubkey(&digest, &signature[..64], recovery_param)
        .map_err(|e| ContractError::InvalidSignature {
            reason: e.to_string(),
        })?;

    // uncompressed: 0x04 ‖ X ‖ Y
    if pubkey.len() != 65 || pubkey[0] != 0x04 {
        return Err(ContractError::InvalidSignature {
            reason: "recovered key is not an uncompressed secp256k1 point".to_string(),
        });
    }

    let hash = keccak256(&pubkey[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Ok(address)
}

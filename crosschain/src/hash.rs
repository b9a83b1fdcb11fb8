//! Checkpoint computation for external-chain signers
//!
//! Checkpoints are the digests oracles sign so that the bridge contract on the
//! external chain can verify a batch (or an oracle-set update). They must be
//! byte-for-byte identical to the Solidity side:
//!
//! ```solidity
//! keccak256(abi.encode(
//!     gravityId,            // bytes32
//!     "transactionBatch",   // bytes32
//!     amounts,              // uint256[]
//!     destinations,         // address[]
//!     fees,                 // uint256[]
//!     batchNonce,           // uint256
//!     tokenContract,        // address
//!     batchTimeout,         // uint256
//!     feeReceiver           // address
//! ));
//!
//! keccak256(abi.encode(
//!     gravityId,            // bytes32
//!     "checkpoint",         // bytes32
//!     valsetNonce,          // uint256
//!     validators,           // address[]
//!     powers                // uint256[]
//! ));
//! ```
//!
//! # abi.encode layout
//! Every static value occupies one 32-byte word in the head. A dynamic array
//! places a 32-byte offset (relative to the start of the encoding) in the head
//! and appends `length ‖ elements` to the tail, in argument order.
//!
//! Transfer order is part of the digest: the external contract executes the
//! transfers in the signed order.

use tiny_keccak::{Hasher, Keccak};

use crate::address_codec::AddressFormat;
use crate::error::ContractError;
use crate::state::{OracleSetMember, OutgoingBatch};

/// Type tag for batch checkpoints
pub const BATCH_CHECKPOINT_TAG: &str = "transactionBatch";

/// Type tag for oracle-set checkpoints
pub const ORACLE_SET_CHECKPOINT_TAG: &str = "checkpoint";

const WORD: usize = 32;

/// Compute keccak256 hash of arbitrary data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// A value in a Solidity ABI argument list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiToken {
    /// `uint256`, left-padded
    Uint(u128),
    /// `address`, left-padded 20 bytes
    Address([u8; 20]),
    /// `bytes32`
    FixedBytes([u8; 32]),
    /// `T[]` of static elements
    Array(Vec<AbiToken>),
}

impl AbiToken {
    fn head_word(&self) -> [u8; 32] {
        let mut word = [0u8; WORD];
        match self {
            AbiToken::Uint(value) => word[16..].copy_from_slice(&value.to_be_bytes()),
            AbiToken::Address(addr) => word[12..].copy_from_slice(addr),
            AbiToken::FixedBytes(bytes) => word.copy_from_slice(bytes),
            AbiToken::Array(_) => {}
        }
        word
    }
}

fn uint_word(value: usize) -> [u8; 32] {
    AbiToken::Uint(value as u128).head_word()
}

/// `abi.encode(tokens...)`
pub fn abi_encode(tokens: &[AbiToken]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            AbiToken::Array(items) => {
                head.extend_from_slice(&uint_word(head_len + tail.len()));
                tail.extend_from_slice(&uint_word(items.len()));
                tail.extend_from_slice(&abi_encode(items));
            }
            _ => head.extend_from_slice(&token.head_word()),
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Right-pads an ASCII identifier into a `bytes32`
pub fn str_to_fixed_bytes32(s: &str) -> Result<[u8; 32], ContractError> {
    let bytes = s.as_bytes();
    if bytes.len() > WORD {
        return Err(ContractError::invalid(format!(
            "'{}' does not fit in bytes32 ({} bytes)",
            s,
            bytes.len()
        )));
    }
    let mut out = [0u8; WORD];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

/// ABI payload hashed by [`batch_checkpoint`]
pub fn batch_checkpoint_payload(
    gravity_id: &str,
    batch: &OutgoingBatch,
    format: AddressFormat,
) -> Result<Vec<u8>, ContractError> {
    let mut amounts = Vec::with_capacity(batch.transactions.len());
    let mut destinations = Vec::with_capacity(batch.transactions.len());
    let mut fees = Vec::with_capacity(batch.transactions.len());
    for tx in &batch.transactions {
        amounts.push(AbiToken::Uint(tx.amount.u128()));
        destinations.push(AbiToken::Address(format.to_bytes20(&tx.dest_address)?));
        fees.push(AbiToken::Uint(tx.fee.u128()));
    }

    Ok(abi_encode(&[
        AbiToken::FixedBytes(str_to_fixed_bytes32(gravity_id)?),
        AbiToken::FixedBytes(str_to_fixed_bytes32(BATCH_CHECKPOINT_TAG)?),
        AbiToken::Array(amounts),
        AbiToken::Array(destinations),
        AbiToken::Array(fees),
        AbiToken::Uint(batch.batch_nonce as u128),
        AbiToken::Address(format.to_bytes20(&batch.token_contract)?),
        AbiToken::Uint(batch.batch_timeout as u128),
        AbiToken::Address(format.to_bytes20(&batch.fee_receiver)?),
    ]))
}

/// Digest oracles sign to confirm `batch`
pub fn batch_checkpoint(
    gravity_id: &str,
    batch: &OutgoingBatch,
    format: AddressFormat,
) -> Result<[u8; 32], ContractError> {
    Ok(keccak256(&batch_checkpoint_payload(gravity_id, batch, format)?))
}

/// Digest oracles sign to confirm an oracle-set update
pub fn oracle_set_checkpoint(
    gravity_id: &str,
    nonce: u64,
    members: &[OracleSetMember],
    format: AddressFormat,
) -> Result<[u8; 32], ContractError> {
    let addresses = members
        .iter()
        .map(|m| format.to_bytes20(&m.external_address).map(AbiToken::Address))
        .collect::<Result<Vec<_>, _>>()?;
    let powers = members
        .iter()
        .map(|m| AbiToken::Uint(m.power as u128))
        .collect();

    let payload = abi_encode(&[
        AbiToken::FixedBytes(str_to_fixed_bytes32(gravity_id)?),
        AbiToken::FixedBytes(str_to_fixed_bytes32(ORACLE_SET_CHECKPOINT_TAG)?),
        AbiToken::Uint(nonce as u128),
        AbiToken::Array(addresses),
        AbiToken::Array(powers),
    ]);
    Ok(keccak256(&payload))
}

/// Convert 32-byte hash to hex string (for attributes/logging)
pub fn bytes32_to_hex(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::OutgoingTransfer;
    use cosmwasm_std::{Addr, Uint128};

    const DEST_A: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const DEST_B: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
    const TOKEN: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";
    const RECEIVER: &str = "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb";

    fn transfer(id: u64, dest: &str, amount: u128, fee: u128) -> OutgoingTransfer {
        OutgoingTransfer {
            id,
            sender: Addr::unchecked("sender"),
            dest_address: dest.to_string(),
            token_contract: TOKEN.to_string(),
            amount: Uint128::from(amount),
            fee: Uint128::from(fee),
        }
    }

    fn batch(transactions: Vec<OutgoingTransfer>) -> OutgoingBatch {
        OutgoingBatch {
            batch_nonce: 7,
            batch_timeout: 3890,
            transactions,
            token_contract: TOKEN.to_string(),
            fee_receiver: RECEIVER.to_string(),
            block: 130,
        }
    }

    fn word(payload: &[u8], index: usize) -> &[u8] {
        &payload[index * 32..(index + 1) * 32]
    }

    fn uint_at(payload: &[u8], index: usize) -> u128 {
        let w = word(payload, index);
        assert_eq!(&w[..16], &[0u8; 16]);
        u128::from_be_bytes(w[16..].try_into().unwrap())
    }

    /// keccak256("hello") = 0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8
    #[test]
    fn test_keccak256_basic() {
        assert_eq!(
            bytes32_to_hex(&keccak256(b"hello")),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_str_to_fixed_bytes32() {
        let id = str_to_fixed_bytes32("fx-bridge-eth").unwrap();
        assert_eq!(&id[..13], b"fx-bridge-eth");
        assert_eq!(&id[13..], &[0u8; 19]);

        assert!(str_to_fixed_bytes32(&"x".repeat(32)).is_ok());
        assert!(str_to_fixed_bytes32(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_abi_encode_dynamic_array_layout() {
        // abi.encode(uint256 5, uint256[] [1, 2], address 0x11..)
        let payload = abi_encode(&[
            AbiToken::Uint(5),
            AbiToken::Array(vec![AbiToken::Uint(1), AbiToken::Uint(2)]),
            AbiToken::Address([0x11; 20]),
        ]);

        assert_eq!(payload.len(), 6 * 32);
        assert_eq!(uint_at(&payload, 0), 5);
        // offset of the array: right after the 3 head words
        assert_eq!(uint_at(&payload, 1), 96);
        assert_eq!(&word(&payload, 2)[..12], &[0u8; 12]);
        assert_eq!(&word(&payload, 2)[12..], &[0x11; 20]);
        assert_eq!(uint_at(&payload, 3), 2);
        assert_eq!(uint_at(&payload, 4), 1);
        assert_eq!(uint_at(&payload, 5), 2);
    }

    #[test]
    fn test_batch_checkpoint_payload_layout() {
        let b = batch(vec![
            transfer(1, DEST_A, 1_000, 50),
            transfer(2, DEST_B, 2_000, 30),
        ]);
        let payload = batch_checkpoint_payload("fx-bridge-eth", &b, AddressFormat::Evm).unwrap();

        // 9 head words + 3 arrays of (length + 2 elements)
        assert_eq!(payload.len(), (9 + 3 * 3) * 32);
        assert_eq!(
            word(&payload, 0),
            &str_to_fixed_bytes32("fx-bridge-eth").unwrap()
        );
        assert_eq!(
            word(&payload, 1),
            &str_to_fixed_bytes32("transactionBatch").unwrap()
        );
        // offsets of amounts / destinations / fees
        assert_eq!(uint_at(&payload, 2), 9 * 32);
        assert_eq!(uint_at(&payload, 3), 12 * 32);
        assert_eq!(uint_at(&payload, 4), 15 * 32);
        assert_eq!(uint_at(&payload, 5), 7);
        assert_eq!(uint_at(&payload, 7), 3890);

        // amounts
        assert_eq!(uint_at(&payload, 9), 2);
        assert_eq!(uint_at(&payload, 10), 1_000);
        assert_eq!(uint_at(&payload, 11), 2_000);
        // destinations
        assert_eq!(uint_at(&payload, 12), 2);
        assert_eq!(
            &word(&payload, 13)[12..],
            &AddressFormat::Evm.to_bytes20(DEST_A).unwrap()
        );
        // fees
        assert_eq!(uint_at(&payload, 15), 2);
        assert_eq!(uint_at(&payload, 16), 50);
        assert_eq!(uint_at(&payload, 17), 30);
    }

    #[test]
    fn test_batch_checkpoint_is_deterministic() {
        let b = batch(vec![
            transfer(1, DEST_A, 1_000, 50),
            transfer(2, DEST_B, 2_000, 30),
        ]);
        let first = batch_checkpoint("fx-bridge-eth", &b, AddressFormat::Evm).unwrap();
        let second = batch_checkpoint("fx-bridge-eth", &b.clone(), AddressFormat::Evm).unwrap();
        assert_eq!(first, second);

        // different domain separator
        let other = batch_checkpoint("fx-bridge-bsc", &b, AddressFormat::Evm).unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_batch_checkpoint_is_order_sensitive() {
        let forward = batch(vec![
            transfer(1, DEST_A, 1_000, 50),
            transfer(2, DEST_B, 2_000, 30),
        ]);
        let reversed = batch(vec![
            transfer(2, DEST_B, 2_000, 30),
            transfer(1, DEST_A, 1_000, 50),
        ]);

        assert_ne!(
            batch_checkpoint("fx-bridge-eth", &forward, AddressFormat::Evm).unwrap(),
            batch_checkpoint("fx-bridge-eth", &reversed, AddressFormat::Evm).unwrap()
        );
    }

    #[test]
    fn test_batch_checkpoint_rejects_malformed_address() {
        let b = batch(vec![transfer(1, "not-an-address", 1_000, 50)]);
        let err = batch_checkpoint("fx-bridge-eth", &b, AddressFormat::Evm).unwrap_err();
        assert!(matches!(err, ContractError::InvalidAddress { .. }));
    }

    #[test]
    fn test_oracle_set_checkpoint_differs_from_batch_tag() {
        let members = vec![
            OracleSetMember {
                external_address: DEST_A.to_string(),
                power: 60,
            },
            OracleSetMember {
                external_address: DEST_B.to_string(),
                power: 40,
            },
        ];
        let a = oracle_set_checkpoint("fx-bridge-eth", 1, &members, AddressFormat::Evm).unwrap();
        let b = oracle_set_checkpoint("fx-bridge-eth", 2, &members, AddressFormat::Evm).unwrap();
        assert_ne!(a, b);

        let mut swapped = members.clone();
        swapped.swap(0, 1);
        let c = oracle_set_checkpoint("fx-bridge-eth", 1, &swapped, AddressFormat::Evm).unwrap();
        assert_ne!(a, c);
    }
}

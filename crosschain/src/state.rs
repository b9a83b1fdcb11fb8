//! State definitions for the crosschain outgoing-batch contract
//!
//! This module defines the persisted types and the storage layout:
//! the transfer pool and its fee index, batches keyed by `(contract, nonce)`
//! and by creation height, the height sync pair and the slash cursor.

use common::AssetInfo;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Binary, Uint128};
use cw_storage_plus::{Item, Map};

use crate::address_codec::AddressFormat;
use crate::error::ContractError;

// ============================================================================
// Core Configuration
// ============================================================================

/// Contract configuration
#[cw_serde]
pub struct Config {
    /// Admin address for contract management
    pub admin: Addr,
    /// External chain served by this contract (e.g. "eth", "tron")
    pub chain_name: String,
    /// Address format resolved from `chain_name` at instantiate
    pub address_format: AddressFormat,
    /// Domain separator shared with the external bridge contract
    pub gravity_id: String,
}

/// Timing and batching parameters
#[cw_serde]
pub struct Params {
    /// Average local block time in milliseconds
    pub average_block_time: u64,
    /// Average external block time in milliseconds
    pub average_external_block_time: u64,
    /// Target batch lifetime on the external chain in milliseconds
    pub external_batch_timeout: u64,
    /// Number of local blocks oracles have to confirm a batch before it enters the slash window
    pub signed_window: u64,
    /// Largest accepted `max_elements` for a batch request
    pub max_batch_size: u32,
    /// Height from which transfers paying less than the request's base fee are skipped.
    /// `None` keeps the fee floor disabled.
    pub fee_floor_activation_height: Option<u64>,
}

impl Params {
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.average_block_time == 0 {
            return Err(ContractError::InvalidParams {
                reason: "average_block_time must be positive".to_string(),
            });
        }
        if self.average_external_block_time == 0 {
            return Err(ContractError::InvalidParams {
                reason: "average_external_block_time must be positive".to_string(),
            });
        }
        if self.external_batch_timeout == 0 {
            return Err(ContractError::InvalidParams {
                reason: "external_batch_timeout must be positive".to_string(),
            });
        }
        if self.max_batch_size == 0 || self.max_batch_size > OUTGOING_TX_BATCH_SIZE {
            return Err(ContractError::InvalidParams {
                reason: format!("max_batch_size must be between 1 and {}", OUTGOING_TX_BATCH_SIZE),
            });
        }
        Ok(())
    }

    /// Whether the base-fee floor applies to batches built at `height`.
    pub fn fee_floor_active(&self, height: u64) -> bool {
        matches!(self.fee_floor_activation_height, Some(activation) if height >= activation)
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            average_block_time: DEFAULT_AVERAGE_BLOCK_TIME,
            average_external_block_time: DEFAULT_AVERAGE_EXTERNAL_BLOCK_TIME,
            external_batch_timeout: DEFAULT_EXTERNAL_BATCH_TIMEOUT,
            signed_window: DEFAULT_SIGNED_WINDOW,
            max_batch_size: OUTGOING_TX_BATCH_SIZE,
            fee_floor_activation_height: None,
        }
    }
}

// ============================================================================
// Pool & Batch Types
// ============================================================================

/// A pending transfer to the external chain
#[cw_serde]
pub struct OutgoingTransfer {
    /// Unique, monotonically assigned id
    pub id: u64,
    /// Local account that paid for the transfer
    pub sender: Addr,
    /// Recipient on the external chain
    pub dest_address: String,
    /// External token contract the transfer settles in
    pub token_contract: String,
    /// Amount delivered to `dest_address`
    pub amount: Uint128,
    /// Fee paid to whoever relays the batch
    pub fee: Uint128,
}

/// An ordered set of transfers awaiting execution on the external chain
#[cw_serde]
pub struct OutgoingBatch {
    pub batch_nonce: u64,
    /// Timeout in external-chain blocks
    pub batch_timeout: u64,
    pub transactions: Vec<OutgoingTransfer>,
    pub token_contract: String,
    pub fee_receiver: String,
    /// Local block height the batch was stored at
    pub block: u64,
}

impl OutgoingBatch {
    pub fn total_fee(&self) -> Uint128 {
        self.transactions.iter().map(|tx| tx.fee).sum()
    }

    pub fn tx_ids(&self) -> Vec<u64> {
        self.transactions.iter().map(|tx| tx.id).collect()
    }
}

/// Local asset backing an external token contract
#[cw_serde]
pub struct BridgeToken {
    pub asset: AssetInfo,
    pub external_contract: String,
}

/// A registered oracle
#[cw_serde]
pub struct Oracle {
    pub address: Addr,
    /// Signing address on the external chain
    pub external_address: String,
    pub power: u64,
}

/// One entry of an oracle-set checkpoint
#[cw_serde]
pub struct OracleSetMember {
    pub external_address: String,
    pub power: u64,
}

/// An oracle's signature over a batch checkpoint
#[cw_serde]
pub struct BatchConfirm {
    pub oracle: Addr,
    pub external_address: String,
    pub signature: Binary,
}

// ============================================================================
// Constants
// ============================================================================

/// Contract name for cw2 migration info
pub const CONTRACT_NAME: &str = "crates.io:crosschain-outgoing-batch";

/// Contract version for cw2 migration info
pub const CONTRACT_VERSION: &str = "1.0.0";

/// Upper bound on transfers per batch
pub const OUTGOING_TX_BATCH_SIZE: u32 = 100;

/// 5 seconds
pub const DEFAULT_AVERAGE_BLOCK_TIME: u64 = 5_000;

/// 15 seconds
pub const DEFAULT_AVERAGE_EXTERNAL_BLOCK_TIME: u64 = 15_000;

/// 12 hours
pub const DEFAULT_EXTERNAL_BATCH_TIMEOUT: u64 = 43_200_000;

pub const DEFAULT_SIGNED_WINDOW: u64 = 20_000;

// ============================================================================
// Core State Storage
// ============================================================================

pub const CONFIG: Item<Config> = Item::new("config");

pub const PARAMS: Item<Params> = Item::new("params");

/// Registered oracles
/// Key: oracle address, Value: Oracle
pub const ORACLES: Map<&Addr, Oracle> = Map::new("oracles");

/// Bumped whenever the oracle set changes
pub const ORACLE_SET_NONCE: Item<u64> = Item::new("oracle_set_nonce");

/// Bridge tokens
/// Key: external token contract, Value: BridgeToken
pub const BRIDGE_TOKENS: Map<&str, BridgeToken> = Map::new("bridge_tokens");

/// Reverse token lookup
/// Key: local asset key (denom or CW20 address), Value: external token contract
pub const TOKEN_BY_ASSET: Map<&str, String> = Map::new("token_by_asset");

/// Value of executed transfers per external token contract (amount + fee)
pub const BRIDGED_TOTALS: Map<&str, Uint128> = Map::new("bridged_totals");

// ============================================================================
// Transfer Pool
// ============================================================================

/// Last assigned transfer id
pub const LAST_TX_ID: Item<u64> = Item::new("last_tx_id");

/// Every live transfer, unbatched or batched
/// Key: transfer id, Value: OutgoingTransfer
pub const POOL_TXS: Map<u64, OutgoingTransfer> = Map::new("pool_txs");

/// Unbatched transfers ordered for selection
/// Key: (token contract, u128::MAX - fee, position), Value: transfer id
/// Ascending keys walk fees high to low, then bucket position.
pub const UNBATCHED_INDEX: Map<(&str, u128, i64), u64> = Map::new("unbatched_index");

/// Index entry of each unbatched transfer
/// Key: transfer id, Value: (u128::MAX - fee, position)
pub const UNBATCHED_POSITION: Map<u64, (u128, i64)> = Map::new("unbatched_position");

/// Last position handed to an appended transfer
pub const LAST_UNBATCHED_POSITION: Item<i64> = Item::new("last_unbatched_position");

// ============================================================================
// Batches
// ============================================================================

/// Key: (token contract, nonce), Value: OutgoingBatch
pub const BATCHES: Map<(&str, u64), OutgoingBatch> = Map::new("batches");

/// Secondary index for slash-window scans
/// Key: creation height, Value: (token contract, nonce)
pub const BATCH_BLOCK_INDEX: Map<u64, (String, u64)> = Map::new("batch_block_index");

/// Last assigned nonce per token contract
pub const LAST_BATCH_NONCE: Map<&str, u64> = Map::new("last_batch_nonce");

/// Key: (token contract, nonce, oracle), Value: BatchConfirm
pub const BATCH_CONFIRMS: Map<(&str, u64, &Addr), BatchConfirm> = Map::new("batch_confirms");

/// Height up to which batches were evaluated for slashing
pub const LAST_SLASHED_BATCH_BLOCK: Item<u64> = Item::new("last_slashed_batch_block");

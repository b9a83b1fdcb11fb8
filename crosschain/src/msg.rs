//! Message types for the crosschain outgoing-batch contract
//!
//! Users send transfers into the pool, oracles drive batching, confirmation
//! and execution, and the admin manages the oracle set, tokens and params.

use common::AssetInfo;
use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Binary, Uint128};

use crate::address_codec::AddressFormat;
use crate::height::HeightSync;
use crate::state::{BatchConfirm, BridgeToken, Oracle, OutgoingBatch, OutgoingTransfer, Params};

// ============================================================================
// Instantiate & Migrate
// ============================================================================

#[cw_serde]
pub struct MigrateMsg {}

#[cw_serde]
pub struct InstantiateMsg {
    /// Admin address for contract management
    pub admin: String,
    /// External chain name, resolved against the chain registry (e.g. "eth")
    pub chain_name: String,
    /// Domain separator shared with the external bridge contract (at most 32 bytes)
    pub gravity_id: String,
    pub params: Params,
    pub oracles: Vec<OracleInit>,
    pub bridge_tokens: Vec<BridgeTokenInit>,
}

#[cw_serde]
pub struct OracleInit {
    pub address: String,
    pub external_address: String,
    pub power: u64,
}

#[cw_serde]
pub struct BridgeTokenInit {
    pub asset: AssetInfo,
    pub external_contract: String,
}

// ============================================================================
// Execute Messages
// ============================================================================

#[cw_serde]
pub enum ExecuteMsg {
    // ========================================================================
    // Transfers
    // ========================================================================
    /// Queue a transfer of the attached native coin to `dest` on the external chain.
    ///
    /// The attached amount covers both the transfer and `bridge_fee`.
    SendToExternal { dest: String, bridge_fee: Uint128 },

    /// Queue a transfer of CW20 tokens (called via CW20 send)
    Receive(cw20::Cw20ReceiveMsg),

    /// Withdraw an unbatched transfer and refund amount + fee to its sender
    CancelSendToExternal { transaction_id: u64 },

    // ========================================================================
    // Oracle Operations
    // ========================================================================
    /// Build a new batch for `token_contract` from the pool
    ///
    /// Response data carries the JSON-encoded batch.
    RequestBatch {
        token_contract: String,
        minimum_fee: Uint128,
        fee_receiver: String,
        base_fee: Uint128,
        /// Defaults to `params.max_batch_size`
        max_elements: Option<u32>,
    },

    /// Submit the oracle's signature over a batch checkpoint
    ConfirmBatch {
        token_contract: String,
        nonce: u64,
        external_address: String,
        signature: Binary,
    },

    /// Report the current external chain height
    ObserveExternalHeight { external_height: u64 },

    /// Report that a batch executed on the external chain
    BatchExecuted { token_contract: String, nonce: u64 },

    // ========================================================================
    // Admin Operations
    // ========================================================================
    /// Advance the slash cursor after the slashing decision for a window
    SetLastSlashedBatchBlock { height: u64 },

    AddOracle {
        address: String,
        external_address: String,
        power: u64,
    },

    RemoveOracle { address: String },

    AddBridgeToken {
        asset: AssetInfo,
        external_contract: String,
    },

    UpdateParams { params: Params },

    UpdateAdmin { admin: String },
}

/// CW20 receive hook payload
#[cw_serde]
pub enum ReceiveMsg {
    SendToExternal { dest: String, bridge_fee: Uint128 },
}

// ============================================================================
// Query Messages
// ============================================================================

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[returns(ConfigResponse)]
    Config {},

    #[returns(Params)]
    Params {},

    #[returns(OraclesResponse)]
    Oracles {
        /// Oracle address of the last entry of the previous page
        start_after: Option<String>,
        limit: Option<u32>,
    },

    /// Checkpoint of the current oracle set
    #[returns(CheckpointResponse)]
    OracleSetCheckpoint {},

    #[returns(BridgeTokenResponse)]
    BridgeToken { external_contract: String },

    // ========================================================================
    // Pool
    // ========================================================================
    /// Unbatched transfers of a token contract in selection order
    #[returns(PoolTransactionsResponse)]
    PoolTransactions {
        token_contract: String,
        /// Id of the last transfer of the previous page
        start_after: Option<u64>,
        limit: Option<u32>,
    },

    /// What a batch request would collect right now
    #[returns(BatchFeesResponse)]
    BatchFees {
        token_contract: String,
        base_fee: Uint128,
    },

    // ========================================================================
    // Batches
    // ========================================================================
    #[returns(OutgoingTxBatchResponse)]
    OutgoingTxBatch { token_contract: String, nonce: u64 },

    /// All stored batches, highest key first
    #[returns(OutgoingTxBatchesResponse)]
    OutgoingTxBatches {
        start_after: Option<BatchKey>,
        limit: Option<u32>,
    },

    #[returns(OutgoingTxBatchResponse)]
    LastOutgoingBatch { token_contract: String },

    #[returns(CheckpointResponse)]
    BatchCheckpoint { token_contract: String, nonce: u64 },

    #[returns(BatchConfirmsResponse)]
    BatchConfirms {
        token_contract: String,
        nonce: u64,
        /// Oracle address of the last confirm of the previous page
        start_after: Option<String>,
        limit: Option<u32>,
    },

    #[returns(BridgedTotalResponse)]
    BridgedTotal { token_contract: String },

    // ========================================================================
    // Heights
    // ========================================================================
    /// Batches in the slash window, ascending by creation height.
    /// `max_height` defaults to `current height - signed_window`.
    #[returns(OutgoingTxBatchesResponse)]
    UnslashedBatches { max_height: Option<u64> },

    #[returns(LastSlashedBatchBlockResponse)]
    LastSlashedBatchBlock {},

    #[returns(LastObservedHeightResponse)]
    LastObservedHeight {},

    /// Timeout a batch built in the current block would get (0 if unavailable)
    #[returns(ProjectedBatchTimeoutResponse)]
    ProjectedBatchTimeout {},
}

// ============================================================================
// Response Types
// ============================================================================

#[cw_serde]
pub struct ConfigResponse {
    pub admin: Addr,
    pub chain_name: String,
    pub address_format: AddressFormat,
    pub gravity_id: String,
}

#[cw_serde]
pub struct OraclesResponse {
    pub oracles: Vec<Oracle>,
}

#[cw_serde]
pub struct CheckpointResponse {
    /// 0x-prefixed hex digest
    pub checkpoint: String,
}

#[cw_serde]
pub struct BridgeTokenResponse {
    pub token: Option<BridgeToken>,
}

#[cw_serde]
pub struct PoolTransactionsResponse {
    pub transactions: Vec<OutgoingTransfer>,
}

#[cw_serde]
pub struct BatchFeesResponse {
    pub token_contract: String,
    pub total_fee: Uint128,
    pub tx_count: u32,
}

#[cw_serde]
pub struct OutgoingTxBatchResponse {
    pub batch: Option<OutgoingBatch>,
}

/// Pagination cursor over stored batches
#[cw_serde]
pub struct BatchKey {
    pub token_contract: String,
    pub nonce: u64,
}

#[cw_serde]
pub struct OutgoingTxBatchesResponse {
    pub batches: Vec<OutgoingBatch>,
}

#[cw_serde]
pub struct BatchConfirmsResponse {
    pub confirms: Vec<BatchConfirm>,
}

#[cw_serde]
pub struct BridgedTotalResponse {
    pub token_contract: String,
    pub total: Uint128,
}

#[cw_serde]
pub struct LastSlashedBatchBlockResponse {
    pub height: u64,
}

#[cw_serde]
pub struct LastObservedHeightResponse {
    pub height: Option<HeightSync>,
}

#[cw_serde]
pub struct ProjectedBatchTimeoutResponse {
    pub local_height: u64,
    pub batch_timeout: u64,
}

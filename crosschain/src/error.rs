//! Error types for the crosschain outgoing-batch contract
//!
//! The four batch-engine kinds (`Invalid`, `Empty`, `Unknown`, `Duplicate`) carry
//! a reason string so the failing command reports what went wrong.

use cosmwasm_std::{OverflowError, StdError, Uint128};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    // ========================================================================
    // Batch Engine Errors
    // ========================================================================

    #[error("invalid: {reason}")]
    Invalid { reason: String },

    #[error("empty: {reason}")]
    Empty { reason: String },

    #[error("unknown: {reason}")]
    Unknown { reason: String },

    #[error("duplicate: {reason}")]
    Duplicate { reason: String },

    /// Canceling an older batch failed while executing a newer one.
    #[error("failed to cancel batch {token_contract} {nonce} while executing {executed_nonce}: {reason}")]
    CancelFailed {
        token_contract: String,
        nonce: u64,
        executed_nonce: u64,
        reason: String,
    },

    // ========================================================================
    // Authorization Errors
    // ========================================================================

    #[error("Unauthorized: only admin can perform this action")]
    Unauthorized,

    #[error("Unauthorized: caller is not an oracle")]
    NotOracle,

    #[error("Unauthorized: only the sender of transfer {id} can cancel it")]
    NotTransferSender { id: u64 },

    // ========================================================================
    // Configuration Errors
    // ========================================================================

    #[error("Invalid chain name: {chain_name}")]
    InvalidChainName { chain_name: String },

    #[error("Unrecognized cross chain type: {chain_name}")]
    UnsupportedChain { chain_name: String },

    #[error("Invalid params: {reason}")]
    InvalidParams { reason: String },

    #[error("Oracle already registered: {address}")]
    OracleAlreadyRegistered { address: String },

    #[error("Oracle not registered: {address}")]
    OracleNotRegistered { address: String },

    #[error("Bridge token already registered: {token}")]
    TokenAlreadyRegistered { token: String },

    #[error("Token not supported: {token}")]
    TokenNotSupported { token: String },

    // ========================================================================
    // Transfer Errors
    // ========================================================================

    #[error("Invalid address: {reason}")]
    InvalidAddress { reason: String },

    #[error("No funds sent")]
    NoFundsSent,

    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Bridge fee {fee} must be lower than the sent amount {total}")]
    FeeExceedsAmount { fee: Uint128, total: Uint128 },

    #[error("Transfer {id} is already part of a batch")]
    TransferInBatch { id: u64 },

    // ========================================================================
    // Signature Errors
    // ========================================================================

    #[error("Invalid signature: {reason}")]
    InvalidSignature { reason: String },

    #[error("Batch confirm already submitted by {oracle}")]
    DuplicateConfirm { oracle: String },
}

impl ContractError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        ContractError::Invalid {
            reason: reason.into(),
        }
    }

    pub fn empty(reason: impl Into<String>) -> Self {
        ContractError::Empty {
            reason: reason.into(),
        }
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        ContractError::Unknown {
            reason: reason.into(),
        }
    }

    pub fn duplicate(reason: impl Into<String>) -> Self {
        ContractError::Duplicate {
            reason: reason.into(),
        }
    }

    pub fn invalid_address(reason: impl Into<String>) -> Self {
        ContractError::InvalidAddress {
            reason: reason.into(),
        }
    }
}

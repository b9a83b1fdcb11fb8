//! Crosschain Outgoing-Batch Contract
//!
//! Collects transfers bound for an external chain, groups them into
//! fee-ordered batches and tracks those batches until the external bridge
//! contract executes them.
//!
//! # Outgoing Flow
//! 1. User escrows `amount + fee` with `SendToExternal` (or a CW20 send)
//! 2. The transfer waits in the unbatched pool, ordered by fee
//! 3. An oracle calls `RequestBatch`; the highest-fee transfers form a batch
//!    with a timeout projected onto the external chain's clock
//! 4. Oracles sign the batch checkpoint and submit `ConfirmBatch`
//! 5. After the batch executes externally, `BatchExecuted` finalizes it and
//!    returns the transfers of older batches to the pool
//!
//! # Slashing Support
//! Batches are indexed by creation height so the slashing collaborator can
//! query the batches created since the last evaluated height.

pub mod address_codec;
pub mod batch;
pub mod contract;
pub mod error;
mod execute;
pub mod hash;
pub mod height;
pub mod msg;
pub mod pool;
mod query;
pub mod signature;
pub mod state;

pub use crate::error::ContractError;
pub use crate::hash::{batch_checkpoint, keccak256};
pub use crate::signature::signed_message_hash;

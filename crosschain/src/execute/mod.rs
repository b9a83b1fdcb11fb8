//! Execute handlers for the crosschain outgoing-batch contract.
//!
//! Handlers are organized by caller:
//! - `transfer` - users queueing and withdrawing transfers
//! - `batch` - oracles requesting, confirming and finalizing batches
//! - `oracle` - oracle checks and external height reports
//! - `admin` - oracle set, bridge tokens, params and slash cursor

mod admin;
mod batch;
mod oracle;
mod transfer;

pub use admin::*;
pub use batch::*;
pub use oracle::*;
pub use transfer::*;

//! External chain height tracking
//!
//! Batch timeouts are expressed in external-chain blocks. The contract only
//! knows its own height, so it projects the external height from the last
//! jointly observed `(local, external)` pair and the two average block times.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{StdResult, Storage};
use cw_storage_plus::Item;

use crate::error::ContractError;
use crate::state::Params;

/// Last jointly observed local and external heights
#[cw_serde]
pub struct HeightSync {
    pub local_height: u64,
    pub external_height: u64,
}

pub const LAST_OBSERVED_HEIGHT: Item<HeightSync> = Item::new("last_observed_height");

pub fn last_observed(storage: &dyn Storage) -> StdResult<Option<HeightSync>> {
    LAST_OBSERVED_HEIGHT.may_load(storage)
}

/// Records an external height observed at `local_height`.
///
/// External heights never go backwards.
pub fn set_last_observed(
    storage: &mut dyn Storage,
    local_height: u64,
    external_height: u64,
) -> Result<HeightSync, ContractError> {
    if external_height == 0 {
        return Err(ContractError::invalid("external height must be positive"));
    }
    if let Some(prev) = last_observed(storage)? {
        if external_height < prev.external_height {
            return Err(ContractError::invalid(format!(
                "external height {} is behind last observed {}",
                external_height, prev.external_height
            )));
        }
    }

    let sync = HeightSync {
        local_height,
        external_height,
    };
    LAST_OBSERVED_HEIGHT.save(storage, &sync)?;
    Ok(sync)
}

/// Projects the external-chain timeout height for a batch built at `local_height`.
///
/// ```text
/// elapsed_ms         = (local_height - sync.local) * average_block_time
/// projected_external = sync.external + elapsed_ms / average_external_block_time
/// timeout            = projected_external + external_batch_timeout / average_external_block_time
/// ```
///
/// Returns 0 when no pair was observed yet, when `local_height` is behind the
/// sync point, or on overflow. Callers must treat 0 as unavailable.
pub fn project_external_timeout(
    sync: Option<&HeightSync>,
    params: &Params,
    local_height: u64,
) -> u64 {
    let sync = match sync {
        Some(sync) if sync.local_height != 0 && sync.external_height != 0 => sync,
        _ => return 0,
    };

    let project = || -> Option<u64> {
        let elapsed_ms = local_height
            .checked_sub(sync.local_height)?
            .checked_mul(params.average_block_time)?;
        let projected_external = sync
            .external_height
            .checked_add(elapsed_ms.checked_div(params.average_external_block_time)?)?;
        let blocks_to_add = params
            .external_batch_timeout
            .checked_div(params.average_external_block_time)?;
        projected_external.checked_add(blocks_to_add)
    };

    project().unwrap_or(0)
}

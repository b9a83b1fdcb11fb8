//! Oracle checks and external height reports.

use cosmwasm_std::{Addr, DepsMut, Env, MessageInfo, Response, Storage};

use crate::error::ContractError;
use crate::height::set_last_observed;
use crate::state::{Oracle, ORACLES};

/// Loads the oracle record of `sender`, failing with `NotOracle` if absent.
pub fn ensure_oracle(storage: &dyn Storage, sender: &Addr) -> Result<Oracle, ContractError> {
    ORACLES
        .may_load(storage, sender)?
        .ok_or(ContractError::NotOracle)
}

/// Record the external height observed at the current block.
pub fn execute_observe_external_height(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    external_height: u64,
) -> Result<Response, ContractError> {
    ensure_oracle(deps.storage, &info.sender)?;

    let sync = set_last_observed(deps.storage, env.block.height, external_height)?;

    Ok(Response::new()
        .add_attribute("method", "observe_external_height")
        .add_attribute("oracle", info.sender)
        .add_attribute("local_height", sync.local_height.to_string())
        .add_attribute("external_height", sync.external_height.to_string()))
}

//! Admin operations handlers.
//!
//! This module handles:
//! - Oracle set management
//! - Bridge token registration
//! - Params and admin updates
//! - Slash cursor advances

use common::AssetInfo;
use cosmwasm_std::{Api, DepsMut, MessageInfo, Response, StdResult, Storage};

use crate::address_codec::AddressFormat;
use crate::batch::set_last_slashed_batch_block;
use crate::error::ContractError;
use crate::state::{
    BridgeToken, Config, Oracle, Params, BRIDGE_TOKENS, CONFIG, ORACLES, ORACLE_SET_NONCE,
    PARAMS, TOKEN_BY_ASSET,
};

fn ensure_admin(config: &Config, info: &MessageInfo) -> Result<(), ContractError> {
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized);
    }
    Ok(())
}

fn bump_oracle_set_nonce(storage: &mut dyn Storage) -> StdResult<u64> {
    let nonce = ORACLE_SET_NONCE.may_load(storage)?.unwrap_or_default() + 1;
    ORACLE_SET_NONCE.save(storage, &nonce)?;
    Ok(nonce)
}

// ============================================================================
// Registration (shared with instantiate)
// ============================================================================

pub fn register_oracle(
    storage: &mut dyn Storage,
    api: &dyn Api,
    format: AddressFormat,
    address: &str,
    external_address: &str,
    power: u64,
) -> Result<Oracle, ContractError> {
    let address = api.addr_validate(address)?;
    if ORACLES.has(storage, &address) {
        return Err(ContractError::OracleAlreadyRegistered {
            address: address.to_string(),
        });
    }
    if power == 0 {
        return Err(ContractError::invalid("oracle power must be positive"));
    }

    let oracle = Oracle {
        address,
        external_address: format.validate(external_address)?,
        power,
    };
    ORACLES.save(storage, &oracle.address, &oracle)?;
    bump_oracle_set_nonce(storage)?;
    Ok(oracle)
}

pub fn register_bridge_token(
    storage: &mut dyn Storage,
    api: &dyn Api,
    format: AddressFormat,
    asset: AssetInfo,
    external_contract: &str,
) -> Result<BridgeToken, ContractError> {
    let external_contract = format.validate(external_contract)?;
    let asset = match asset {
        AssetInfo::Cw20 { contract_addr } => AssetInfo::Cw20 {
            contract_addr: api.addr_validate(contract_addr.as_str())?,
        },
        native => native,
    };

    if BRIDGE_TOKENS.has(storage, &external_contract) {
        return Err(ContractError::TokenAlreadyRegistered {
            token: external_contract,
        });
    }
    let asset_key = asset.key();
    if TOKEN_BY_ASSET.has(storage, &asset_key) {
        return Err(ContractError::TokenAlreadyRegistered { token: asset_key });
    }

    let token = BridgeToken {
        asset,
        external_contract,
    };
    BRIDGE_TOKENS.save(storage, &token.external_contract, &token)?;
    TOKEN_BY_ASSET.save(storage, &asset_key, &token.external_contract)?;
    Ok(token)
}

// ============================================================================
// Oracle Set
// ============================================================================

pub fn execute_add_oracle(
    deps: DepsMut,
    info: MessageInfo,
    address: String,
    external_address: String,
    power: u64,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_admin(&config, &info)?;

    let oracle = register_oracle(
        deps.storage,
        deps.api,
        config.address_format,
        &address,
        &external_address,
        power,
    )?;

    Ok(Response::new()
        .add_attribute("method", "add_oracle")
        .add_attribute("oracle", oracle.address)
        .add_attribute("external_address", oracle.external_address)
        .add_attribute("power", power.to_string()))
}

pub fn execute_remove_oracle(
    deps: DepsMut,
    info: MessageInfo,
    address: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_admin(&config, &info)?;

    let address = deps.api.addr_validate(&address)?;
    if !ORACLES.has(deps.storage, &address) {
        return Err(ContractError::OracleNotRegistered {
            address: address.to_string(),
        });
    }
    ORACLES.remove(deps.storage, &address);
    bump_oracle_set_nonce(deps.storage)?;

    Ok(Response::new()
        .add_attribute("method", "remove_oracle")
        .add_attribute("oracle", address))
}

// ============================================================================
// Bridge Tokens
// ============================================================================

pub fn execute_add_bridge_token(
    deps: DepsMut,
    info: MessageInfo,
    asset: AssetInfo,
    external_contract: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_admin(&config, &info)?;

    let token = register_bridge_token(
        deps.storage,
        deps.api,
        config.address_format,
        asset,
        &external_contract,
    )?;

    Ok(Response::new()
        .add_attribute("method", "add_bridge_token")
        .add_attribute("asset", token.asset.to_string())
        .add_attribute("external_contract", token.external_contract))
}

// ============================================================================
// Configuration
// ============================================================================

pub fn execute_update_params(
    deps: DepsMut,
    info: MessageInfo,
    params: Params,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_admin(&config, &info)?;

    params.validate()?;
    PARAMS.save(deps.storage, &params)?;

    Ok(Response::new().add_attribute("method", "update_params"))
}

pub fn execute_update_admin(
    deps: DepsMut,
    info: MessageInfo,
    admin: String,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    ensure_admin(&config, &info)?;

    config.admin = deps.api.addr_validate(&admin)?;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "update_admin")
        .add_attribute("admin", config.admin))
}

/// Advance the slash cursor once the slashing decision for a window is made.
pub fn execute_set_last_slashed_batch_block(
    deps: DepsMut,
    info: MessageInfo,
    height: u64,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_admin(&config, &info)?;

    set_last_slashed_batch_block(deps.storage, height)?;

    Ok(Response::new()
        .add_attribute("method", "set_last_slashed_batch_block")
        .add_attribute("height", height.to_string()))
}

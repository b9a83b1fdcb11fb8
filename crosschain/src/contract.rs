//! Crosschain Outgoing-Batch Contract - Entry Points
//!
//! The implementation is modularized into:
//! - `execute/` - Execute message handlers
//! - `query` - Query message handlers
//! - `pool`, `batch`, `height`, `hash` - the batch engine they drive

use cosmwasm_std::{
    entry_point, to_json_binary, Binary, Deps, DepsMut, Env, MessageInfo, Response, StdResult,
};
use cw2::set_contract_version;

use crate::address_codec::{chain_registry, resolve_chain};
use crate::error::ContractError;
use crate::execute::{
    execute_add_bridge_token, execute_add_oracle, execute_batch_executed,
    execute_cancel_send_to_external, execute_confirm_batch, execute_observe_external_height,
    execute_receive, execute_remove_oracle, execute_request_batch, execute_send_to_external,
    execute_set_last_slashed_batch_block, execute_update_admin, execute_update_params,
    register_bridge_token, register_oracle,
};
use crate::hash::str_to_fixed_bytes32;
use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
use crate::query::{
    query_batch_checkpoint, query_batch_confirms, query_batch_fees, query_bridge_token,
    query_bridged_total, query_config, query_last_observed_height, query_last_outgoing_batch,
    query_last_slashed_batch_block, query_oracle_set_checkpoint, query_oracles,
    query_outgoing_tx_batch, query_outgoing_tx_batches, query_params, query_pool_transactions,
    query_projected_batch_timeout, query_unslashed_batches,
};
use crate::state::{Config, CONFIG, CONTRACT_NAME, CONTRACT_VERSION, PARAMS};

// ============================================================================
// Instantiate
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let admin = deps.api.addr_validate(&msg.admin)?;

    // Resolve the external chain once; later validation reads it from config
    let address_format = resolve_chain(&chain_registry(), &msg.chain_name)?;

    // Must fit the bytes32 domain separator
    str_to_fixed_bytes32(&msg.gravity_id)?;

    msg.params.validate()?;
    PARAMS.save(deps.storage, &msg.params)?;

    let config = Config {
        admin,
        chain_name: msg.chain_name,
        address_format,
        gravity_id: msg.gravity_id,
    };
    CONFIG.save(deps.storage, &config)?;

    for oracle in &msg.oracles {
        register_oracle(
            deps.storage,
            deps.api,
            address_format,
            &oracle.address,
            &oracle.external_address,
            oracle.power,
        )?;
    }

    for token in msg.bridge_tokens {
        register_bridge_token(
            deps.storage,
            deps.api,
            address_format,
            token.asset,
            &token.external_contract,
        )?;
    }

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("admin", config.admin)
        .add_attribute("chain_name", config.chain_name)
        .add_attribute("address_format", address_format.as_str())
        .add_attribute("gravity_id", config.gravity_id)
        .add_attribute("oracle_count", msg.oracles.len().to_string()))
}

// ============================================================================
// Execute
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        // Transfers
        ExecuteMsg::SendToExternal { dest, bridge_fee } => {
            execute_send_to_external(deps, info, dest, bridge_fee)
        }
        ExecuteMsg::Receive(cw20_msg) => execute_receive(deps, info, cw20_msg),
        ExecuteMsg::CancelSendToExternal { transaction_id } => {
            execute_cancel_send_to_external(deps, info, transaction_id)
        }

        // Oracle operations
        ExecuteMsg::RequestBatch {
            token_contract,
            minimum_fee,
            fee_receiver,
            base_fee,
            max_elements,
        } => execute_request_batch(
            deps,
            env,
            info,
            token_contract,
            minimum_fee,
            fee_receiver,
            base_fee,
            max_elements,
        ),
        ExecuteMsg::ConfirmBatch {
            token_contract,
            nonce,
            external_address,
            signature,
        } => execute_confirm_batch(deps, info, token_contract, nonce, external_address, signature),
        ExecuteMsg::ObserveExternalHeight { external_height } => {
            execute_observe_external_height(deps, env, info, external_height)
        }
        ExecuteMsg::BatchExecuted {
            token_contract,
            nonce,
        } => execute_batch_executed(deps, info, token_contract, nonce),

        // Admin operations
        ExecuteMsg::SetLastSlashedBatchBlock { height } => {
            execute_set_last_slashed_batch_block(deps, info, height)
        }
        ExecuteMsg::AddOracle {
            address,
            external_address,
            power,
        } => execute_add_oracle(deps, info, address, external_address, power),
        ExecuteMsg::RemoveOracle { address } => execute_remove_oracle(deps, info, address),
        ExecuteMsg::AddBridgeToken {
            asset,
            external_contract,
        } => execute_add_bridge_token(deps, info, asset, external_contract),
        ExecuteMsg::UpdateParams { params } => execute_update_params(deps, info, params),
        ExecuteMsg::UpdateAdmin { admin } => execute_update_admin(deps, info, admin),
    }
}

// ============================================================================
// Query
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        // Configuration
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        QueryMsg::Params {} => to_json_binary(&query_params(deps)?),
        QueryMsg::Oracles { start_after, limit } => {
            to_json_binary(&query_oracles(deps, start_after, limit)?)
        }
        QueryMsg::OracleSetCheckpoint {} => to_json_binary(&query_oracle_set_checkpoint(deps)?),
        QueryMsg::BridgeToken { external_contract } => {
            to_json_binary(&query_bridge_token(deps, external_contract)?)
        }

        // Pool
        QueryMsg::PoolTransactions {
            token_contract,
            start_after,
            limit,
        } => to_json_binary(&query_pool_transactions(
            deps,
            token_contract,
            start_after,
            limit,
        )?),
        QueryMsg::BatchFees {
            token_contract,
            base_fee,
        } => to_json_binary(&query_batch_fees(deps, env, token_contract, base_fee)?),

        // Batches
        QueryMsg::OutgoingTxBatch {
            token_contract,
            nonce,
        } => to_json_binary(&query_outgoing_tx_batch(deps, token_contract, nonce)?),
        QueryMsg::OutgoingTxBatches { start_after, limit } => {
            to_json_binary(&query_outgoing_tx_batches(deps, start_after, limit)?)
        }
        QueryMsg::LastOutgoingBatch { token_contract } => {
            to_json_binary(&query_last_outgoing_batch(deps, token_contract)?)
        }
        QueryMsg::BatchCheckpoint {
            token_contract,
            nonce,
        } => to_json_binary(&query_batch_checkpoint(deps, token_contract, nonce)?),
        QueryMsg::BatchConfirms {
            token_contract,
            nonce,
            start_after,
            limit,
        } => to_json_binary(&query_batch_confirms(
            deps,
            token_contract,
            nonce,
            start_after,
            limit,
        )?),
        QueryMsg::BridgedTotal { token_contract } => {
            to_json_binary(&query_bridged_total(deps, token_contract)?)
        }

        // Heights
        QueryMsg::UnslashedBatches { max_height } => {
            to_json_binary(&query_unslashed_batches(deps, env, max_height)?)
        }
        QueryMsg::LastSlashedBatchBlock {} => {
            to_json_binary(&query_last_slashed_batch_block(deps)?)
        }
        QueryMsg::LastObservedHeight {} => to_json_binary(&query_last_observed_height(deps)?),
        QueryMsg::ProjectedBatchTimeout {} => {
            to_json_binary(&query_projected_batch_timeout(deps, env)?)
        }
    }
}

// ============================================================================
// Migrate
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    Ok(Response::new()
        .add_attribute("method", "migrate")
        .add_attribute("version", CONTRACT_VERSION))
}

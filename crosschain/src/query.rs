//! Query handlers for the crosschain outgoing-batch contract.

use cosmwasm_std::{Deps, Env, Order, StdError, StdResult, Uint128};
use cw_storage_plus::Bound;

use crate::batch::{
    get_outgoing_tx_batch, last_outgoing_batch, last_slashed_batch_block, outgoing_tx_batches,
    select_batch_txs, unslashed_batches,
};
use crate::error::ContractError;
use crate::hash::{batch_checkpoint, bytes32_to_hex, oracle_set_checkpoint};
use crate::height::{last_observed, project_external_timeout};
use crate::msg::{
    BatchConfirmsResponse, BatchFeesResponse, BridgeTokenResponse, BridgedTotalResponse,
    BatchKey, CheckpointResponse, ConfigResponse, LastObservedHeightResponse, LastSlashedBatchBlockResponse,
    OraclesResponse, OutgoingTxBatchResponse, OutgoingTxBatchesResponse,
    PoolTransactionsResponse, ProjectedBatchTimeoutResponse,
};
use crate::pool::pool_transactions;
use crate::state::{
    OracleSetMember, Params, BATCH_CONFIRMS, BRIDGED_TOTALS, BRIDGE_TOKENS, CONFIG, ORACLES,
    ORACLE_SET_NONCE, PARAMS,
};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 50;

fn page_limit(limit: Option<u32>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize
}

fn to_std(err: ContractError) -> StdError {
    StdError::generic_err(err.to_string())
}

/// Canonical form of an external address argument.
fn canonical_address(deps: Deps, addr: &str) -> StdResult<String> {
    let config = CONFIG.load(deps.storage)?;
    config.address_format.validate(addr).map_err(to_std)
}

// ============================================================================
// Configuration
// ============================================================================

pub fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        admin: config.admin,
        chain_name: config.chain_name,
        address_format: config.address_format,
        gravity_id: config.gravity_id,
    })
}

pub fn query_params(deps: Deps) -> StdResult<Params> {
    PARAMS.load(deps.storage)
}

pub fn query_oracles(
    deps: Deps,
    start_after: Option<String>,
    limit: Option<u32>,
) -> StdResult<OraclesResponse> {
    let limit = page_limit(limit);
    let start_after = start_after
        .map(|addr| deps.api.addr_validate(&addr))
        .transpose()?;
    let start = start_after.as_ref().map(Bound::exclusive);

    let oracles = ORACLES
        .range(deps.storage, start, None, Order::Ascending)
        .take(limit)
        .map(|item| item.map(|(_, oracle)| oracle))
        .collect::<StdResult<Vec<_>>>()?;
    Ok(OraclesResponse { oracles })
}

/// Checkpoint over the current oracle set, ordered by power (descending) then address.
pub fn query_oracle_set_checkpoint(deps: Deps) -> StdResult<CheckpointResponse> {
    let config = CONFIG.load(deps.storage)?;
    let nonce = ORACLE_SET_NONCE.may_load(deps.storage)?.unwrap_or_default();

    let mut members = ORACLES
        .range(deps.storage, None, None, Order::Ascending)
        .map(|item| {
            item.map(|(_, oracle)| OracleSetMember {
                external_address: oracle.external_address,
                power: oracle.power,
            })
        })
        .collect::<StdResult<Vec<_>>>()?;
    members.sort_by(|a, b| {
        b.power
            .cmp(&a.power)
            .then_with(|| a.external_address.cmp(&b.external_address))
    });

    let checkpoint =
        oracle_set_checkpoint(&config.gravity_id, nonce, &members, config.address_format)
            .map_err(to_std)?;
    Ok(CheckpointResponse {
        checkpoint: bytes32_to_hex(&checkpoint),
    })
}

pub fn query_bridge_token(deps: Deps, external_contract: String) -> StdResult<BridgeTokenResponse> {
    let external_contract = canonical_address(deps, &external_contract)?;
    Ok(BridgeTokenResponse {
        token: BRIDGE_TOKENS.may_load(deps.storage, &external_contract)?,
    })
}

// ============================================================================
// Pool
// ============================================================================

/// Unbatched transfers in selection order, paged by transfer id.
pub fn query_pool_transactions(
    deps: Deps,
    token_contract: String,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<PoolTransactionsResponse> {
    let token_contract = canonical_address(deps, &token_contract)?;
    let transactions =
        pool_transactions(deps.storage, &token_contract, start_after, page_limit(limit))
            .map_err(to_std)?;
    Ok(PoolTransactionsResponse { transactions })
}

/// Fees a batch request with `base_fee` would collect at the current height.
pub fn query_batch_fees(
    deps: Deps,
    env: Env,
    token_contract: String,
    base_fee: Uint128,
) -> StdResult<BatchFeesResponse> {
    let token_contract = canonical_address(deps, &token_contract)?;
    let params = PARAMS.load(deps.storage)?;

    let selected = select_batch_txs(
        deps.storage,
        &params,
        env.block.height,
        &token_contract,
        params.max_batch_size,
        base_fee,
    )?;

    Ok(BatchFeesResponse {
        token_contract,
        total_fee: selected.iter().map(|tx| tx.fee).sum(),
        tx_count: selected.len() as u32,
    })
}

// ============================================================================
// Batches
// ============================================================================

pub fn query_outgoing_tx_batch(
    deps: Deps,
    token_contract: String,
    nonce: u64,
) -> StdResult<OutgoingTxBatchResponse> {
    let token_contract = canonical_address(deps, &token_contract)?;
    Ok(OutgoingTxBatchResponse {
        batch: get_outgoing_tx_batch(deps.storage, &token_contract, nonce)?,
    })
}

pub fn query_outgoing_tx_batches(
    deps: Deps,
    start_after: Option<BatchKey>,
    limit: Option<u32>,
) -> StdResult<OutgoingTxBatchesResponse> {
    let start_after = start_after
        .map(|key| {
            let token = canonical_address(deps, &key.token_contract)?;
            Ok::<_, StdError>((token, key.nonce))
        })
        .transpose()?;
    let start = start_after
        .as_ref()
        .map(|(token, nonce)| (token.as_str(), *nonce));
    Ok(OutgoingTxBatchesResponse {
        batches: outgoing_tx_batches(deps.storage, start, page_limit(limit))?,
    })
}

pub fn query_last_outgoing_batch(
    deps: Deps,
    token_contract: String,
) -> StdResult<OutgoingTxBatchResponse> {
    let token_contract = canonical_address(deps, &token_contract)?;
    Ok(OutgoingTxBatchResponse {
        batch: last_outgoing_batch(deps.storage, &token_contract)?,
    })
}

pub fn query_batch_checkpoint(
    deps: Deps,
    token_contract: String,
    nonce: u64,
) -> StdResult<CheckpointResponse> {
    let config = CONFIG.load(deps.storage)?;
    let token_contract = canonical_address(deps, &token_contract)?;
    let batch = get_outgoing_tx_batch(deps.storage, &token_contract, nonce)?
        .ok_or_else(|| StdError::not_found(format!("batch {} of {}", nonce, token_contract)))?;

    let checkpoint =
        batch_checkpoint(&config.gravity_id, &batch, config.address_format).map_err(to_std)?;
    Ok(CheckpointResponse {
        checkpoint: bytes32_to_hex(&checkpoint),
    })
}

pub fn query_batch_confirms(
    deps: Deps,
    token_contract: String,
    nonce: u64,
    start_after: Option<String>,
    limit: Option<u32>,
) -> StdResult<BatchConfirmsResponse> {
    let token_contract = canonical_address(deps, &token_contract)?;
    let limit = page_limit(limit);
    let start_after = start_after
        .map(|addr| deps.api.addr_validate(&addr))
        .transpose()?;
    let start = start_after.as_ref().map(Bound::exclusive);

    let confirms = BATCH_CONFIRMS
        .prefix((token_contract.as_str(), nonce))
        .range(deps.storage, start, None, Order::Ascending)
        .take(limit)
        .map(|item| item.map(|(_, confirm)| confirm))
        .collect::<StdResult<Vec<_>>>()?;
    Ok(BatchConfirmsResponse { confirms })
}

pub fn query_bridged_total(deps: Deps, token_contract: String) -> StdResult<BridgedTotalResponse> {
    let token_contract = canonical_address(deps, &token_contract)?;
    let total = BRIDGED_TOTALS
        .may_load(deps.storage, &token_contract)?
        .unwrap_or_default();
    Ok(BridgedTotalResponse {
        token_contract,
        total,
    })
}

// ============================================================================
// Heights
// ============================================================================

pub fn query_unslashed_batches(
    deps: Deps,
    env: Env,
    max_height: Option<u64>,
) -> StdResult<OutgoingTxBatchesResponse> {
    let max_height = match max_height {
        Some(height) => height,
        None => {
            let params = PARAMS.load(deps.storage)?;
            env.block.height.saturating_sub(params.signed_window)
        }
    };
    Ok(OutgoingTxBatchesResponse {
        batches: unslashed_batches(deps.storage, max_height)?,
    })
}

pub fn query_last_slashed_batch_block(deps: Deps) -> StdResult<LastSlashedBatchBlockResponse> {
    Ok(LastSlashedBatchBlockResponse {
        height: last_slashed_batch_block(deps.storage)?,
    })
}

pub fn query_last_observed_height(deps: Deps) -> StdResult<LastObservedHeightResponse> {
    Ok(LastObservedHeightResponse {
        height: last_observed(deps.storage)?,
    })
}

pub fn query_projected_batch_timeout(
    deps: Deps,
    env: Env,
) -> StdResult<ProjectedBatchTimeoutResponse> {
    let params = PARAMS.load(deps.storage)?;
    let sync = last_observed(deps.storage)?;
    Ok(ProjectedBatchTimeoutResponse {
        local_height: env.block.height,
        batch_timeout: project_external_timeout(sync.as_ref(), &params, env.block.height),
    })
}

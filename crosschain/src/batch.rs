//! Outgoing batch lifecycle
//!
//! A batch is built from the unbatched pool of one token contract, stored under
//! `(token_contract, nonce)` plus a creation-height index, and leaves the store
//! either executed (its transfers become final) or canceled (its transfers go
//! back to the front of the pool).
//!
//! ## Build
//! Every check runs against a read-only selection before anything is written,
//! so a failed build leaves the pool and the store untouched.
//!
//! ## Execution
//! Executing nonce N on the external chain makes every older batch of the same
//! token contract obsolete. They are canceled newest first, so the transfers of
//! the oldest batch end up at the very front of their fee buckets. A cancel
//! failure aborts the whole execution.

use cosmwasm_std::{Env, Event, Order, StdResult, Storage, Uint128};
use cw_storage_plus::Bound;

use crate::error::ContractError;
use crate::height::{last_observed, project_external_timeout};
use crate::pool::{
    iterate_by_fee, prepend_to_unbatched_index, remove_from_unbatched_index, remove_pool_entry,
};
use crate::state::{
    OutgoingBatch, OutgoingTransfer, Params, BATCHES, BATCH_BLOCK_INDEX, BATCH_CONFIRMS,
    BRIDGED_TOTALS, LAST_BATCH_NONCE, LAST_SLASHED_BATCH_BLOCK,
};

// ============================================================================
// Selection & Build
// ============================================================================

/// Picks up to `max_elements` unbatched transfers of `contract`, fee descending.
///
/// Once the fee floor is active at `height`, transfers paying less than
/// `base_fee` are not eligible. Nothing is written.
pub fn select_batch_txs(
    storage: &dyn Storage,
    params: &Params,
    height: u64,
    contract: &str,
    max_elements: u32,
    base_fee: Uint128,
) -> StdResult<Vec<OutgoingTransfer>> {
    let fee_floor = params.fee_floor_active(height);
    let mut selected = Vec::new();

    for tx in iterate_by_fee(storage, contract) {
        if selected.len() >= max_elements as usize {
            break;
        }
        let tx = tx?;
        // fee descending: nothing after this one clears the floor either
        if fee_floor && tx.fee < base_fee {
            break;
        }
        selected.push(tx);
    }
    Ok(selected)
}

/// Builds and stores a new batch for `contract`.
#[allow(clippy::too_many_arguments)]
pub fn build_outgoing_tx_batch(
    storage: &mut dyn Storage,
    env: &Env,
    params: &Params,
    contract: &str,
    max_elements: u32,
    minimum_fee: Uint128,
    fee_receiver: &str,
    base_fee: Uint128,
) -> Result<(OutgoingBatch, Event), ContractError> {
    let height = env.block.height;

    if max_elements == 0 {
        return Err(ContractError::invalid("max elements value"));
    }

    let selected = select_batch_txs(storage, params, height, contract, max_elements, base_fee)?;
    let total_fee: Uint128 = selected.iter().map(|tx| tx.fee).sum();

    if let Some(last) = last_outgoing_batch(storage, contract)? {
        if total_fee <= last.total_fee() {
            return Err(ContractError::invalid(format!(
                "new batch would not be more profitable: {} <= {} of batch {}",
                total_fee,
                last.total_fee(),
                last.batch_nonce
            )));
        }
    }

    if selected.is_empty() {
        return Err(ContractError::empty("no batch tx"));
    }
    if total_fee < minimum_fee {
        return Err(ContractError::invalid(format!(
            "total fee {} is below minimum fee {}",
            total_fee, minimum_fee
        )));
    }

    let sync = last_observed(storage)?;
    let batch_timeout = project_external_timeout(sync.as_ref(), params, height);
    if batch_timeout == 0 {
        return Err(ContractError::invalid("batch timeout height 0"));
    }

    if BATCH_BLOCK_INDEX.has(storage, height) {
        return Err(ContractError::duplicate(format!(
            "block height {} already has a batch",
            height
        )));
    }

    // commit
    for tx in &selected {
        remove_from_unbatched_index(storage, contract, tx.fee, tx.id)?;
    }
    let batch_nonce = next_batch_nonce(storage, contract)?;
    let batch = store_batch(
        storage,
        height,
        OutgoingBatch {
            batch_nonce,
            batch_timeout,
            transactions: selected,
            token_contract: contract.to_string(),
            fee_receiver: fee_receiver.to_string(),
            block: height,
        },
    )?;

    let event = Event::new("outgoing_batch")
        .add_attribute("nonce", batch.batch_nonce.to_string())
        .add_attribute("token_contract", &batch.token_contract)
        .add_attribute("tx_ids", join_ids(&batch.tx_ids()))
        .add_attribute("batch_timeout", batch.batch_timeout.to_string());

    Ok((batch, event))
}

// ============================================================================
// Batch Store
// ============================================================================

/// Assigns the next nonce for `contract` (first nonce is 1).
pub fn next_batch_nonce(storage: &mut dyn Storage, contract: &str) -> StdResult<u64> {
    let nonce = LAST_BATCH_NONCE
        .may_load(storage, contract)?
        .unwrap_or_default()
        + 1;
    LAST_BATCH_NONCE.save(storage, contract, &nonce)?;
    Ok(nonce)
}

/// Persists `batch` under both keys, stamping it with the creation `height`.
pub fn store_batch(
    storage: &mut dyn Storage,
    height: u64,
    mut batch: OutgoingBatch,
) -> Result<OutgoingBatch, ContractError> {
    if BATCH_BLOCK_INDEX.has(storage, height) {
        return Err(ContractError::duplicate(format!(
            "block height {} already has a batch",
            height
        )));
    }
    batch.block = height;

    BATCHES.save(
        storage,
        (batch.token_contract.as_str(), batch.batch_nonce),
        &batch,
    )?;
    BATCH_BLOCK_INDEX.save(
        storage,
        height,
        &(batch.token_contract.clone(), batch.batch_nonce),
    )?;
    Ok(batch)
}

pub fn get_outgoing_tx_batch(
    storage: &dyn Storage,
    contract: &str,
    nonce: u64,
) -> StdResult<Option<OutgoingBatch>> {
    BATCHES.may_load(storage, (contract, nonce))
}

/// Removes `batch` from both keys together with its confirms.
pub fn delete_batch(storage: &mut dyn Storage, batch: &OutgoingBatch) -> StdResult<()> {
    let contract = batch.token_contract.as_str();
    BATCHES.remove(storage, (contract, batch.batch_nonce));

    let indexed = BATCH_BLOCK_INDEX.may_load(storage, batch.block)?;
    if let Some((indexed_contract, indexed_nonce)) = indexed {
        if indexed_contract == contract && indexed_nonce == batch.batch_nonce {
            BATCH_BLOCK_INDEX.remove(storage, batch.block);
        }
    }

    let oracles = BATCH_CONFIRMS
        .prefix((contract, batch.batch_nonce))
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<Vec<_>>>()?;
    for oracle in oracles {
        BATCH_CONFIRMS.remove(storage, (contract, batch.batch_nonce, &oracle));
    }
    Ok(())
}

/// Up to `limit` stored batches, highest key first, strictly below `start_after`.
pub fn outgoing_tx_batches(
    storage: &dyn Storage,
    start_after: Option<(&str, u64)>,
    limit: usize,
) -> StdResult<Vec<OutgoingBatch>> {
    BATCHES
        .range(storage, None, start_after.map(Bound::exclusive), Order::Descending)
        .take(limit)
        .map(|item| item.map(|(_, batch)| batch))
        .collect()
}

/// Batch of `contract` with the highest nonce.
pub fn last_outgoing_batch(
    storage: &dyn Storage,
    contract: &str,
) -> StdResult<Option<OutgoingBatch>> {
    BATCHES
        .prefix(contract)
        .range(storage, None, None, Order::Descending)
        .next()
        .transpose()
        .map(|item| item.map(|(_, batch)| batch))
}

// ============================================================================
// Execution & Cancellation
// ============================================================================

/// Finalizes batch `nonce` of `contract` after it executed on the external chain.
///
/// Returns the executed batch and the events of every batch it retired.
pub fn outgoing_tx_batch_executed(
    storage: &mut dyn Storage,
    contract: &str,
    nonce: u64,
) -> Result<(OutgoingBatch, Vec<Event>), ContractError> {
    let batch = get_outgoing_tx_batch(storage, contract, nonce)?.ok_or_else(|| {
        ContractError::unknown(format!("batch {} of {}", nonce, contract))
    })?;

    let mut bridged = Uint128::zero();
    for tx in &batch.transactions {
        remove_pool_entry(storage, tx.id);
        bridged = bridged.checked_add(tx.amount)?.checked_add(tx.fee)?;
    }
    BRIDGED_TOTALS.update(storage, contract, |total| -> StdResult<_> {
        Ok(total.unwrap_or_default().checked_add(bridged)?)
    })?;

    // each cancel prepends, so the oldest batch must be re-inserted last
    let older = BATCHES
        .prefix(contract)
        .keys(storage, None, Some(Bound::exclusive(nonce)), Order::Descending)
        .collect::<StdResult<Vec<u64>>>()?;

    let mut events = Vec::with_capacity(older.len() + 1);
    for older_nonce in older {
        let event = cancel_outgoing_tx_batch(storage, contract, older_nonce).map_err(|err| {
            ContractError::CancelFailed {
                token_contract: contract.to_string(),
                nonce: older_nonce,
                executed_nonce: nonce,
                reason: err.to_string(),
            }
        })?;
        events.push(event);
    }

    delete_batch(storage, &batch)?;
    events.push(
        Event::new("outgoing_batch_executed")
            .add_attribute("nonce", nonce.to_string())
            .add_attribute("token_contract", contract)
            .add_attribute("tx_ids", join_ids(&batch.tx_ids())),
    );

    Ok((batch, events))
}

/// Cancels batch `nonce` of `contract`, returning its transfers to the pool.
pub fn cancel_outgoing_tx_batch(
    storage: &mut dyn Storage,
    contract: &str,
    nonce: u64,
) -> Result<Event, ContractError> {
    let batch = get_outgoing_tx_batch(storage, contract, nonce)?.ok_or_else(|| {
        ContractError::unknown(format!("batch {} of {}", nonce, contract))
    })?;

    prepend_to_unbatched_index(storage, &batch.transactions)?;
    delete_batch(storage, &batch)?;

    Ok(Event::new("outgoing_batch_canceled")
        .add_attribute("nonce", nonce.to_string())
        .add_attribute("token_contract", contract)
        .add_attribute("tx_ids", join_ids(&batch.tx_ids())))
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

// ============================================================================
// Slash Window
// ============================================================================

pub fn last_slashed_batch_block(storage: &dyn Storage) -> StdResult<u64> {
    Ok(LAST_SLASHED_BATCH_BLOCK
        .may_load(storage)?
        .unwrap_or_default())
}

/// Advances the slash cursor. It never moves backwards.
pub fn set_last_slashed_batch_block(
    storage: &mut dyn Storage,
    height: u64,
) -> Result<(), ContractError> {
    let current = last_slashed_batch_block(storage)?;
    if height < current {
        return Err(ContractError::invalid(format!(
            "slash cursor {} is behind {}",
            height, current
        )));
    }
    LAST_SLASHED_BATCH_BLOCK.save(storage, &height)?;
    Ok(())
}

/// Batches created after the slash cursor and at or below `max_height`,
/// ascending by creation height.
pub fn unslashed_batches(storage: &dyn Storage, max_height: u64) -> StdResult<Vec<OutgoingBatch>> {
    let last_slashed = last_slashed_batch_block(storage)?;
    if max_height <= last_slashed {
        return Ok(vec![]);
    }

    BATCH_BLOCK_INDEX
        .range(
            storage,
            Some(Bound::exclusive(last_slashed)),
            Some(Bound::inclusive(max_height)),
            Order::Ascending,
        )
        .map(|item| {
            let (_, (contract, nonce)) = item?;
            BATCHES.load(storage, (contract.as_str(), nonce))
        })
        .collect()
}

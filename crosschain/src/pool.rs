//! Unbatched transfer pool
//!
//! Pending transfers live in two places:
//! - `POOL_TXS` keeps the transfer record for as long as it is alive
//!   (unbatched or claimed by a batch).
//! - `UNBATCHED_INDEX` orders the transfers that are not part of a batch.
//!   Entries are keyed by `(token_contract, u128::MAX - fee, position)`, so an
//!   ascending range over one contract walks fee-descending and the position
//!   breaks ties. `UNBATCHED_POSITION` maps an id back to its entry.
//!
//! New transfers take a position after every existing one. Transfers returned
//! by a canceled batch take positions before the front of their bucket, so they
//! are picked first at their fee. Every add or remove touches a single entry.

use std::collections::BTreeMap;

use cosmwasm_std::{Addr, Order, StdResult, Storage, Uint128};
use cw_storage_plus::Bound;

use crate::error::ContractError;
use crate::state::{
    OutgoingTransfer, LAST_TX_ID, LAST_UNBATCHED_POSITION, POOL_TXS, UNBATCHED_INDEX,
    UNBATCHED_POSITION,
};

/// Index key component for `fee`; higher fees sort first.
fn fee_key(fee: Uint128) -> u128 {
    u128::MAX - fee.u128()
}

fn insert_index_entry(
    storage: &mut dyn Storage,
    contract: &str,
    fee_key: u128,
    position: i64,
    id: u64,
) -> StdResult<()> {
    UNBATCHED_INDEX.save(storage, (contract, fee_key, position), &id)?;
    UNBATCHED_POSITION.save(storage, id, &(fee_key, position))
}

/// Assigns the next transfer id (first id is 1).
pub fn next_tx_id(storage: &mut dyn Storage) -> StdResult<u64> {
    let id = LAST_TX_ID.may_load(storage)?.unwrap_or_default() + 1;
    LAST_TX_ID.save(storage, &id)?;
    Ok(id)
}

/// Stores `tx` and appends it to the back of its fee bucket.
pub fn add_unbatched_tx(storage: &mut dyn Storage, tx: &OutgoingTransfer) -> StdResult<()> {
    POOL_TXS.save(storage, tx.id, tx)?;

    let position = LAST_UNBATCHED_POSITION
        .may_load(storage)?
        .unwrap_or_default()
        + 1;
    LAST_UNBATCHED_POSITION.save(storage, &position)?;
    insert_index_entry(storage, &tx.token_contract, fee_key(tx.fee), position, tx.id)
}

/// Removes `id` from the unbatched index.
///
/// Fails with `Unknown` if the id is not waiting in the `(contract, fee)` bucket.
pub fn remove_from_unbatched_index(
    storage: &mut dyn Storage,
    contract: &str,
    fee: Uint128,
    id: u64,
) -> Result<(), ContractError> {
    let not_found = || {
        ContractError::unknown(format!(
            "transfer {} not in unbatched pool of {} at fee {}",
            id, contract, fee
        ))
    };

    let (entry_fee, position) = UNBATCHED_POSITION
        .may_load(storage, id)?
        .ok_or_else(not_found)?;
    let key = (contract, entry_fee, position);
    if entry_fee != fee_key(fee) || UNBATCHED_INDEX.may_load(storage, key)? != Some(id) {
        return Err(not_found());
    }

    UNBATCHED_INDEX.remove(storage, key);
    UNBATCHED_POSITION.remove(storage, id);
    Ok(())
}

/// Re-inserts `txs` at the front of their fee buckets.
///
/// Transfers sharing a bucket keep their relative order in `txs`.
pub fn prepend_to_unbatched_index(
    storage: &mut dyn Storage,
    txs: &[OutgoingTransfer],
) -> StdResult<()> {
    let mut groups: BTreeMap<(&str, u128), Vec<u64>> = BTreeMap::new();
    for tx in txs {
        groups
            .entry((tx.token_contract.as_str(), fee_key(tx.fee)))
            .or_default()
            .push(tx.id);
    }

    for ((contract, entry_fee), ids) in groups {
        let front = UNBATCHED_INDEX
            .prefix((contract, entry_fee))
            .keys(storage, None, None, Order::Ascending)
            .next()
            .transpose()?
            .unwrap_or(1);
        let first = front - ids.len() as i64;
        for (offset, id) in ids.into_iter().enumerate() {
            insert_index_entry(storage, contract, entry_fee, first + offset as i64, id)?;
        }
    }
    Ok(())
}

/// Drops the transfer record once the transfer is final or refunded.
pub fn remove_pool_entry(storage: &mut dyn Storage, id: u64) {
    POOL_TXS.remove(storage, id);
}

fn unbatched_after<'a>(
    storage: &'a dyn Storage,
    contract: &str,
    start: Option<(u128, i64)>,
) -> impl Iterator<Item = StdResult<OutgoingTransfer>> + 'a {
    UNBATCHED_INDEX
        .sub_prefix(contract)
        .range(storage, start.map(Bound::exclusive), None, Order::Ascending)
        .map(move |item| {
            let (_, id) = item?;
            POOL_TXS.load(storage, id)
        })
}

/// Unbatched transfers of `contract`, fee descending, bucket order within a fee.
///
/// The view is lazy: callers that stop early only load what they consumed.
pub fn iterate_by_fee<'a>(
    storage: &'a dyn Storage,
    contract: &str,
) -> impl Iterator<Item = StdResult<OutgoingTransfer>> + 'a {
    unbatched_after(storage, contract, None)
}

/// Up to `limit` unbatched transfers of `contract` in selection order,
/// starting after transfer `start_after`.
pub fn pool_transactions(
    storage: &dyn Storage,
    contract: &str,
    start_after: Option<u64>,
    limit: usize,
) -> Result<Vec<OutgoingTransfer>, ContractError> {
    let start = match start_after {
        Some(id) => {
            let position = UNBATCHED_POSITION
                .may_load(storage, id)?
                .filter(|(entry_fee, position)| {
                    UNBATCHED_INDEX.has(storage, (contract, *entry_fee, *position))
                })
                .ok_or_else(|| {
                    ContractError::unknown(format!(
                        "transfer {} not in unbatched pool of {}",
                        id, contract
                    ))
                })?;
            Some(position)
        }
        None => None,
    };

    let txs = unbatched_after(storage, contract, start)
        .take(limit)
        .collect::<StdResult<Vec<_>>>()?;
    Ok(txs)
}

/// Withdraws an unbatched transfer on behalf of its sender.
///
/// Returns the removed transfer so the caller can refund `amount + fee`.
pub fn cancel_unbatched(
    storage: &mut dyn Storage,
    id: u64,
    sender: &Addr,
) -> Result<OutgoingTransfer, ContractError> {
    let tx = POOL_TXS
        .may_load(storage, id)?
        .ok_or_else(|| ContractError::unknown(format!("transfer {}", id)))?;

    if tx.sender != *sender {
        return Err(ContractError::NotTransferSender { id });
    }

    remove_from_unbatched_index(storage, &tx.token_contract, tx.fee, id)
        .map_err(|_| ContractError::TransferInBatch { id })?;
    remove_pool_entry(storage, id);

    Ok(tx)
}

//! Transfer handlers (SendToExternal, Receive and CancelSendToExternal).
//!
//! The contract escrows `amount + fee` when a transfer is queued and refunds
//! the same value when the sender withdraws it before it is batched.

use cosmwasm_std::{from_json, Addr, DepsMut, Event, MessageInfo, Response, Uint128};
use cw20::Cw20ReceiveMsg;

use crate::error::ContractError;
use crate::msg::ReceiveMsg;
use crate::pool::{add_unbatched_tx, cancel_unbatched, next_tx_id};
use crate::state::{OutgoingTransfer, BRIDGE_TOKENS, CONFIG, TOKEN_BY_ASSET};

/// Queue a transfer paid with a single native coin.
pub fn execute_send_to_external(
    deps: DepsMut,
    info: MessageInfo,
    dest: String,
    bridge_fee: Uint128,
) -> Result<Response, ContractError> {
    if info.funds.is_empty() {
        return Err(ContractError::NoFundsSent);
    }
    if info.funds.len() > 1 {
        return Err(ContractError::InvalidAmount {
            reason: "Only one token type allowed per transaction".to_string(),
        });
    }
    let coin = &info.funds[0];

    queue_transfer(deps, info.sender.clone(), &coin.denom, coin.amount, dest, bridge_fee)
}

/// Queue a transfer paid with CW20 tokens (CW20 receive hook).
pub fn execute_receive(
    deps: DepsMut,
    info: MessageInfo,
    cw20_msg: Cw20ReceiveMsg,
) -> Result<Response, ContractError> {
    let sender = deps.api.addr_validate(&cw20_msg.sender)?;
    let receive_msg: ReceiveMsg = from_json(&cw20_msg.msg)?;

    match receive_msg {
        ReceiveMsg::SendToExternal { dest, bridge_fee } => queue_transfer(
            deps,
            sender,
            info.sender.as_str(),
            cw20_msg.amount,
            dest,
            bridge_fee,
        ),
    }
}

fn queue_transfer(
    deps: DepsMut,
    sender: Addr,
    asset_key: &str,
    total: Uint128,
    dest: String,
    bridge_fee: Uint128,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;

    let token_contract = TOKEN_BY_ASSET
        .may_load(deps.storage, asset_key)?
        .ok_or_else(|| ContractError::TokenNotSupported {
            token: asset_key.to_string(),
        })?;

    if total.is_zero() {
        return Err(ContractError::NoFundsSent);
    }
    if bridge_fee >= total {
        return Err(ContractError::FeeExceedsAmount {
            fee: bridge_fee,
            total,
        });
    }
    let amount = total - bridge_fee;

    let dest_address = config.address_format.validate(&dest)?;

    let tx = OutgoingTransfer {
        id: next_tx_id(deps.storage)?,
        sender,
        dest_address,
        token_contract,
        amount,
        fee: bridge_fee,
    };
    add_unbatched_tx(deps.storage, &tx)?;

    Ok(Response::new()
        .add_event(
            Event::new("send_to_external")
                .add_attribute("id", tx.id.to_string())
                .add_attribute("sender", tx.sender.as_str())
                .add_attribute("dest", &tx.dest_address)
                .add_attribute("token_contract", &tx.token_contract)
                .add_attribute("amount", tx.amount.to_string())
                .add_attribute("fee", tx.fee.to_string()),
        )
        .add_attribute("method", "send_to_external")
        .add_attribute("id", tx.id.to_string()))
}

/// Withdraw an unbatched transfer and refund `amount + fee` to its sender.
pub fn execute_cancel_send_to_external(
    deps: DepsMut,
    info: MessageInfo,
    transaction_id: u64,
) -> Result<Response, ContractError> {
    let tx = cancel_unbatched(deps.storage, transaction_id, &info.sender)?;

    let token = BRIDGE_TOKENS
        .may_load(deps.storage, &tx.token_contract)?
        .ok_or_else(|| ContractError::TokenNotSupported {
            token: tx.token_contract.clone(),
        })?;
    let refund = tx.amount.checked_add(tx.fee)?;
    let msg = token.asset.transfer_msg(&tx.sender, refund)?;

    Ok(Response::new()
        .add_message(msg)
        .add_event(
            Event::new("cancel_send_to_external")
                .add_attribute("id", tx.id.to_string())
                .add_attribute("sender", tx.sender.as_str())
                .add_attribute("token_contract", &tx.token_contract)
                .add_attribute("refund", refund.to_string()),
        )
        .add_attribute("method", "cancel_send_to_external")
        .add_attribute("id", transaction_id.to_string()))
}

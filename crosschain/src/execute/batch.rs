//! Batch handlers (RequestBatch, ConfirmBatch and BatchExecuted).
//!
//! All three are oracle-only. Token contract and fee receiver arguments are
//! normalized through the configured address format before they touch storage,
//! so keys always use the canonical external address form.

use cosmwasm_std::{
    to_json_binary, Binary, DepsMut, Env, Event, MessageInfo, Response, Storage, Uint128,
};

use crate::batch::{build_outgoing_tx_batch, get_outgoing_tx_batch, outgoing_tx_batch_executed};
use crate::error::ContractError;
use crate::execute::oracle::ensure_oracle;
use crate::hash::{batch_checkpoint, bytes32_to_hex};
use crate::signature::external_address_from_signature;
use crate::state::{BatchConfirm, Config, BATCH_CONFIRMS, BRIDGE_TOKENS, CONFIG, PARAMS};

fn bridge_token_contract(
    storage: &dyn Storage,
    config: &Config,
    token_contract: &str,
) -> Result<String, ContractError> {
    let token_contract = config.address_format.validate(token_contract)?;
    if !BRIDGE_TOKENS.has(storage, &token_contract) {
        return Err(ContractError::TokenNotSupported {
            token: token_contract,
        });
    }
    Ok(token_contract)
}

/// Build a batch from the pool of `token_contract`.
#[allow(clippy::too_many_arguments)]
pub fn execute_request_batch(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    token_contract: String,
    minimum_fee: Uint128,
    fee_receiver: String,
    base_fee: Uint128,
    max_elements: Option<u32>,
) -> Result<Response, ContractError> {
    ensure_oracle(deps.storage, &info.sender)?;
    let config = CONFIG.load(deps.storage)?;
    let params = PARAMS.load(deps.storage)?;

    let token_contract = bridge_token_contract(deps.storage, &config, &token_contract)?;
    let fee_receiver = config.address_format.validate(&fee_receiver)?;

    let max_elements = max_elements.unwrap_or(params.max_batch_size);
    if max_elements > params.max_batch_size {
        return Err(ContractError::invalid(format!(
            "max elements {} exceeds max batch size {}",
            max_elements, params.max_batch_size
        )));
    }

    let (batch, event) = build_outgoing_tx_batch(
        deps.storage,
        &env,
        &params,
        &token_contract,
        max_elements,
        minimum_fee,
        &fee_receiver,
        base_fee,
    )?;

    Ok(Response::new()
        .set_data(to_json_binary(&batch)?)
        .add_event(event)
        .add_attribute("method", "request_batch")
        .add_attribute("token_contract", &batch.token_contract)
        .add_attribute("nonce", batch.batch_nonce.to_string())
        .add_attribute("tx_count", batch.transactions.len().to_string())
        .add_attribute("total_fee", batch.total_fee().to_string()))
}

/// Store the sender's signature over the checkpoint of batch `nonce`.
pub fn execute_confirm_batch(
    deps: DepsMut,
    info: MessageInfo,
    token_contract: String,
    nonce: u64,
    external_address: String,
    signature: Binary,
) -> Result<Response, ContractError> {
    let oracle = ensure_oracle(deps.storage, &info.sender)?;
    let config = CONFIG.load(deps.storage)?;
    let format = config.address_format;

    let external_address = format.validate(&external_address)?;
    if external_address != oracle.external_address {
        return Err(ContractError::InvalidSignature {
            reason: format!(
                "{} is not the external address of oracle {}",
                external_address, oracle.address
            ),
        });
    }

    let token_contract = format.validate(&token_contract)?;
    let batch = get_outgoing_tx_batch(deps.storage, &token_contract, nonce)?.ok_or_else(|| {
        ContractError::unknown(format!("batch {} of {}", nonce, token_contract))
    })?;

    if BATCH_CONFIRMS.has(deps.storage, (token_contract.as_str(), nonce, &info.sender)) {
        return Err(ContractError::DuplicateConfirm {
            oracle: info.sender.to_string(),
        });
    }

    let checkpoint = batch_checkpoint(&config.gravity_id, &batch, format)?;
    let signer = external_address_from_signature(deps.api, &checkpoint, &signature)?;
    if signer != format.to_bytes20(&external_address)? {
        return Err(ContractError::InvalidSignature {
            reason: format!("signature does not match {}", external_address),
        });
    }

    BATCH_CONFIRMS.save(
        deps.storage,
        (token_contract.as_str(), nonce, &info.sender),
        &BatchConfirm {
            oracle: info.sender.clone(),
            external_address: external_address.clone(),
            signature,
        },
    )?;

    Ok(Response::new()
        .add_event(
            Event::new("batch_confirm")
                .add_attribute("nonce", nonce.to_string())
                .add_attribute("token_contract", &token_contract)
                .add_attribute("oracle", info.sender.as_str())
                .add_attribute("external_address", &external_address)
                .add_attribute("checkpoint", bytes32_to_hex(&checkpoint)),
        )
        .add_attribute("method", "confirm_batch")
        .add_attribute("nonce", nonce.to_string()))
}

/// Finalize batch `nonce` after it executed on the external chain.
pub fn execute_batch_executed(
    deps: DepsMut,
    info: MessageInfo,
    token_contract: String,
    nonce: u64,
) -> Result<Response, ContractError> {
    ensure_oracle(deps.storage, &info.sender)?;
    let config = CONFIG.load(deps.storage)?;
    let token_contract = config.address_format.validate(&token_contract)?;

    let (batch, events) = outgoing_tx_batch_executed(deps.storage, &token_contract, nonce)?;

    Ok(Response::new()
        .add_events(events)
        .add_attribute("method", "batch_executed")
        .add_attribute("token_contract", token_contract)
        .add_attribute("nonce", nonce.to_string())
        .add_attribute("tx_count", batch.transactions.len().to_string()))
}

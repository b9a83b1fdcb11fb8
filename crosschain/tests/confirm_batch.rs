//! Batch confirmation tests: oracles sign the batch checkpoint with their
//! external (secp256k1) key and submit the signature on chain.

use common::AssetInfo;
use cosmwasm_std::{coins, Addr, Binary, Uint128};
use cw_multi_test::{App, ContractWrapper, Executor};
use k256::ecdsa::SigningKey;

use crosschain::address_codec::{to_checksum_address, AddressFormat};
use crosschain::msg::{
    BatchConfirmsResponse, BridgeTokenInit, CheckpointResponse, ExecuteMsg, InstantiateMsg,
    OracleInit, OutgoingTxBatchResponse, QueryMsg,
};
use crosschain::state::{OutgoingBatch, Params};
use crosschain::{batch_checkpoint, keccak256, signed_message_hash};

const DENOM: &str = "uusdt";
const GRAVITY_ID: &str = "fx-bridge-eth";
const TOKEN: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";
const DEST: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
const FEE_RECEIVER: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

fn contract_crosschain() -> Box<dyn cw_multi_test::Contract<cosmwasm_std::Empty>> {
    let contract = ContractWrapper::new(
        crosschain::contract::execute,
        crosschain::contract::instantiate,
        crosschain::contract::query,
    );
    Box::new(contract)
}

fn external_address(key: &SigningKey) -> String {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut raw = [0u8; 20];
    raw.copy_from_slice(&hash[12..]);
    to_checksum_address(&raw)
}

fn sign(key: &SigningKey, checkpoint: &[u8; 32]) -> Binary {
    let (sig, recid) = key
        .sign_prehash_recoverable(&signed_message_hash(checkpoint))
        .unwrap();
    let mut out = sig.to_bytes().to_vec();
    out.push(recid.to_byte() + 27);
    Binary::from(out)
}

struct Suite {
    app: App,
    contract: Addr,
    oracle: Addr,
    oracle_key: SigningKey,
    second_oracle: Addr,
    second_key: SigningKey,
}

/// Two oracles, one native bridge token and batch 1 already built.
fn setup() -> Suite {
    let mut app = App::default();

    let admin = Addr::unchecked("admin");
    let oracle = Addr::unchecked("oracle");
    let second_oracle = Addr::unchecked("oracle2");
    let user = Addr::unchecked("user");
    let oracle_key = SigningKey::from_slice(&[0x42; 32]).unwrap();
    let second_key = SigningKey::from_slice(&[0x17; 32]).unwrap();

    app.init_modules(|router, _, storage| {
        router
            .bank
            .init_balance(storage, &user, coins(1_000_000, DENOM))
            .unwrap();
    });

    let code_id = app.store_code(contract_crosschain());
    let contract = app
        .instantiate_contract(
            code_id,
            admin.clone(),
            &InstantiateMsg {
                admin: admin.to_string(),
                chain_name: "eth".to_string(),
                gravity_id: GRAVITY_ID.to_string(),
                params: Params::default(),
                oracles: vec![
                    OracleInit {
                        address: oracle.to_string(),
                        external_address: external_address(&oracle_key),
                        power: 100,
                    },
                    OracleInit {
                        address: second_oracle.to_string(),
                        external_address: external_address(&second_key),
                        power: 50,
                    },
                ],
                bridge_tokens: vec![BridgeTokenInit {
                    asset: AssetInfo::Native {
                        denom: DENOM.to_string(),
                    },
                    external_contract: TOKEN.to_string(),
                }],
            },
            &[],
            "crosschain",
            None,
        )
        .unwrap();

    app.execute_contract(
        user.clone(),
        contract.clone(),
        &ExecuteMsg::SendToExternal {
            dest: DEST.to_string(),
            bridge_fee: Uint128::from(25u128),
        },
        &coins(1_025, DENOM),
    )
    .unwrap();
    app.execute_contract(
        oracle.clone(),
        contract.clone(),
        &ExecuteMsg::ObserveExternalHeight {
            external_height: 1_000,
        },
        &[],
    )
    .unwrap();
    app.execute_contract(
        oracle.clone(),
        contract.clone(),
        &ExecuteMsg::RequestBatch {
            token_contract: TOKEN.to_string(),
            minimum_fee: Uint128::zero(),
            fee_receiver: FEE_RECEIVER.to_string(),
            base_fee: Uint128::zero(),
            max_elements: None,
        },
        &[],
    )
    .unwrap();

    Suite {
        app,
        contract,
        oracle,
        oracle_key,
        second_oracle,
        second_key,
    }
}

impl Suite {
    fn checkpoint(&self) -> [u8; 32] {
        let res: CheckpointResponse = self
            .app
            .wrap()
            .query_wasm_smart(
                &self.contract,
                &QueryMsg::BatchCheckpoint {
                    token_contract: TOKEN.to_string(),
                    nonce: 1,
                },
            )
            .unwrap();
        let bytes = hex::decode(res.checkpoint.trim_start_matches("0x")).unwrap();
        bytes.try_into().unwrap()
    }

    fn confirm(
        &mut self,
        sender: &Addr,
        external_address: String,
        signature: Binary,
    ) -> Result<(), String> {
        self.app
            .execute_contract(
                sender.clone(),
                self.contract.clone(),
                &ExecuteMsg::ConfirmBatch {
                    token_contract: TOKEN.to_string(),
                    nonce: 1,
                    external_address,
                    signature,
                },
                &[],
            )
            .map(|_| ())
            .map_err(|e| e.root_cause().to_string())
    }

    fn confirms(&self) -> Vec<String> {
        let res: BatchConfirmsResponse = self
            .app
            .wrap()
            .query_wasm_smart(
                &self.contract,
                &QueryMsg::BatchConfirms {
                    token_contract: TOKEN.to_string(),
                    nonce: 1,
                    start_after: None,
                    limit: None,
                },
            )
            .unwrap();
        res.confirms
            .into_iter()
            .map(|c| c.external_address)
            .collect()
    }
}

#[test]
fn test_checkpoint_query_matches_local_computation() {
    let suite = setup();
    let res: OutgoingTxBatchResponse = suite
        .app
        .wrap()
        .query_wasm_smart(
            &suite.contract,
            &QueryMsg::OutgoingTxBatch {
                token_contract: TOKEN.to_string(),
                nonce: 1,
            },
        )
        .unwrap();
    let batch: OutgoingBatch = res.batch.unwrap();

    let expected = batch_checkpoint(GRAVITY_ID, &batch, AddressFormat::Evm).unwrap();
    assert_eq!(suite.checkpoint(), expected);
}

#[test]
fn test_confirm_batch_accepts_valid_signatures() {
    let mut suite = setup();
    let checkpoint = suite.checkpoint();

    let oracle = suite.oracle.clone();
    let signature = sign(&suite.oracle_key, &checkpoint);
    suite
        .confirm(&oracle, external_address(&suite.oracle_key), signature)
        .unwrap();

    // lowercase external address is normalized before comparison
    let second = suite.second_oracle.clone();
    let signature = sign(&suite.second_key, &checkpoint);
    suite
        .confirm(
            &second,
            external_address(&suite.second_key).to_lowercase(),
            signature,
        )
        .unwrap();

    let mut expected = vec![
        external_address(&suite.oracle_key),
        external_address(&suite.second_key),
    ];
    expected.sort();
    let mut confirms = suite.confirms();
    confirms.sort();
    assert_eq!(confirms, expected);
}

#[test]
fn test_confirm_batch_rejects_duplicate() {
    let mut suite = setup();
    let checkpoint = suite.checkpoint();
    let oracle = suite.oracle.clone();
    let signature = sign(&suite.oracle_key, &checkpoint);

    suite
        .confirm(&oracle, external_address(&suite.oracle_key), signature.clone())
        .unwrap();
    let err = suite
        .confirm(&oracle, external_address(&suite.oracle_key), signature)
        .unwrap_err();
    assert!(err.contains("already submitted"));
}

#[test]
fn test_confirm_batch_rejects_foreign_signature() {
    let mut suite = setup();
    let checkpoint = suite.checkpoint();
    let oracle = suite.oracle.clone();

    // signed by the second oracle's key, claimed by the first
    let signature = sign(&suite.second_key, &checkpoint);
    let err = suite
        .confirm(&oracle, external_address(&suite.oracle_key), signature)
        .unwrap_err();
    assert!(err.contains("signature does not match"));

    // claiming another oracle's external address
    let signature = sign(&suite.second_key, &checkpoint);
    let err = suite
        .confirm(&oracle, external_address(&suite.second_key), signature)
        .unwrap_err();
    assert!(err.contains("is not the external address of oracle"));

    assert!(suite.confirms().is_empty());
}

#[test]
fn test_confirm_batch_rejects_non_oracle_and_unknown_batch() {
    let mut suite = setup();
    let checkpoint = suite.checkpoint();
    let signature = sign(&suite.oracle_key, &checkpoint);

    let err = suite
        .confirm(
            &Addr::unchecked("user"),
            external_address(&suite.oracle_key),
            signature.clone(),
        )
        .unwrap_err();
    assert!(err.contains("not an oracle"));

    let err = suite
        .app
        .execute_contract(
            suite.oracle.clone(),
            suite.contract.clone(),
            &ExecuteMsg::ConfirmBatch {
                token_contract: TOKEN.to_string(),
                nonce: 2,
                external_address: external_address(&suite.oracle_key),
                signature,
            },
            &[],
        )
        .unwrap_err();
    assert!(err.root_cause().to_string().starts_with("unknown"));
}

#[test]
fn test_batch_confirms_query_pages_by_oracle() {
    let mut suite = setup();
    let checkpoint = suite.checkpoint();
    for (sender, key) in [
        (suite.oracle.clone(), suite.oracle_key.clone()),
        (suite.second_oracle.clone(), suite.second_key.clone()),
    ] {
        let signature = sign(&key, &checkpoint);
        suite
            .confirm(&sender, external_address(&key), signature)
            .unwrap();
    }

    let page = |start_after: Option<String>| -> Vec<String> {
        let res: BatchConfirmsResponse = suite
            .app
            .wrap()
            .query_wasm_smart(
                &suite.contract,
                &QueryMsg::BatchConfirms {
                    token_contract: TOKEN.to_string(),
                    nonce: 1,
                    start_after,
                    limit: Some(1),
                },
            )
            .unwrap();
        res.confirms
            .into_iter()
            .map(|c| c.external_address)
            .collect()
    };

    assert_eq!(page(None), vec![external_address(&suite.oracle_key)]);
    assert_eq!(
        page(Some(suite.oracle.to_string())),
        vec![external_address(&suite.second_key)]
    );
    assert!(page(Some(suite.second_oracle.to_string())).is_empty());
}

#[test]
fn test_confirms_removed_when_batch_executes() {
    let mut suite = setup();
    let checkpoint = suite.checkpoint();
    let oracle = suite.oracle.clone();
    let signature = sign(&suite.oracle_key, &checkpoint);
    suite
        .confirm(&oracle, external_address(&suite.oracle_key), signature)
        .unwrap();
    assert_eq!(suite.confirms().len(), 1);

    suite
        .app
        .execute_contract(
            suite.oracle.clone(),
            suite.contract.clone(),
            &ExecuteMsg::BatchExecuted {
                token_contract: TOKEN.to_string(),
                nonce: 1,
            },
            &[],
        )
        .unwrap();
    assert!(suite.confirms().is_empty());
}

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use httpmock::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;

use common::{address, capture, harness, own_address, settings, single_reply, FakeChain};
use ledger_pilot::actions::{
    BalanceAction, BatchTransferAction, DeployTokenAction, FaucetAction, TransferAction,
};
use ledger_pilot::cache;
use ledger_pilot::chain::Operation;
use ledger_pilot::error::ErrorKind;
use ledger_pilot::keys::Address;
use ledger_pilot::interfaces::actions::{Action, Message, Plugin, State};
use ledger_pilot::plugins::{ActionRegistry, WalletPlugin};
use ledger_pilot::price::PriceQuote;

fn message(text: &str) -> Message {
    Message::new("user-1", text)
}

#[tokio::test]
async fn balance_of_unknown_account_reports_zero() {
    let stranger = address(42);
    let h = harness(
        settings(json!({})),
        FakeChain::default(),
        vec![json!({"address": stranger.to_string(), "token_address": null})],
    );
    let action = BalanceAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    let ok = action
        .handle(&message("what does that wallet hold?"), &State::default(), callback)
        .await;

    assert!(ok);
    let reply = single_reply(&replies);
    assert!(reply.is_success());
    assert_eq!(reply.content["raw_balance"], json!("0"));
    assert!(reply.text.contains("0.0000"));
    assert!(reply.content.get("usd").is_none());
}

#[tokio::test]
async fn own_balance_includes_usd_value_from_cached_price() {
    let h = harness(
        settings(json!({})),
        FakeChain::default().with_account(own_address(), 3_000_000_000, 0),
        vec![json!({"address": null, "token_address": null})],
    );
    cache::set_typed(
        h.cache.as_ref(),
        &cache::price_key("mina-protocol"),
        &PriceQuote {
            usd: Decimal::from_str("0.25").unwrap(),
            fetched_at: 0,
        },
        Duration::from_secs(60),
    )
    .await
    .expect("seed price");

    let action = BalanceAction::new(h.runtime.clone());
    let (callback, replies) = capture();
    assert!(
        action
            .handle(&message("what's my balance?"), &State::default(), callback)
            .await
    );

    let reply = single_reply(&replies);
    assert_eq!(reply.content["balance"], json!("3.000000000"));
    assert_eq!(
        Decimal::from_str(reply.content["usd"].as_str().unwrap()).unwrap(),
        Decimal::from_str("0.75").unwrap()
    );
    assert!(reply.text.contains("3.0000"));
    assert!(reply.text.contains("$0.7500"));

    let prompt = h.extractor.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains(&own_address().to_string()));
    assert!(prompt.contains("what's my balance?"));
}

#[tokio::test]
async fn transfer_submits_signed_transaction_with_account_nonce() {
    let recipient = address(7);
    let h = harness(
        settings(json!({"LEDGER_WAIT_FOR_INCLUSION": "true"})),
        FakeChain::default().with_account(own_address(), 10_000_000_000, 5),
        vec![json!({"recipient": recipient.to_string(), "amount": "1.5", "token_address": null})],
    );
    let action = TransferAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(action.handle(&message("send 1.5 to them"), &State::default(), callback).await);

    let submitted = h.chain.submitted();
    assert_eq!(submitted.len(), 1);
    let tx = &submitted[0].transaction;
    assert_eq!(tx.nonce, 5);
    assert_eq!(tx.fee, 1000);
    assert_eq!(tx.sender, own_address());
    assert_eq!(
        tx.operations,
        vec![Operation::Transfer {
            to: recipient,
            amount: 1_500_000_000,
            token: None
        }]
    );
    assert_eq!(h.chain.inclusion_waits.load(Ordering::SeqCst), 1);

    let reply = single_reply(&replies);
    assert_eq!(reply.content["hash"], json!(submitted[0].hash().unwrap()));
}

#[tokio::test]
async fn transfer_from_missing_sender_fails_before_submission() {
    let h = harness(
        settings(json!({})),
        FakeChain::default(),
        vec![json!({"recipient": address(7).to_string(), "amount": 1, "token_address": null})],
    );
    let action = TransferAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(!action.handle(&message("send 1"), &State::default(), callback).await);

    let reply = single_reply(&replies);
    assert_eq!(reply.error_kind(), Some(ErrorKind::AccountNotFound));
    assert!(h.chain.submitted().is_empty());
    assert_eq!(h.chain.reads().last(), Some(&own_address()));
}

#[tokio::test]
async fn token_balance_is_read_from_token_ledger_with_token_decimals() {
    let token = address(60);
    let h = harness(
        settings(json!({})),
        FakeChain::default()
            .with_account(own_address(), 5_000_000_000, 0)
            .with_token(token, "SIX", 6)
            .with_token_balance(own_address(), token, 2_500_000),
        vec![json!({"address": null, "token_address": token.to_string()})],
    );
    let action = BalanceAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(action.handle(&message("how many SIX do I have?"), &State::default(), callback).await);

    let reply = single_reply(&replies);
    assert_eq!(reply.content["token"], json!(token.to_string()));
    assert_eq!(reply.content["raw_balance"], json!("2500000"));
    assert_eq!(reply.content["decimals"], json!(6));
    assert_eq!(
        Decimal::from_str(reply.content["balance"].as_str().unwrap()).unwrap(),
        Decimal::from_str("2.5").unwrap()
    );
    assert!(reply.content.get("usd").is_none());
    assert!(h.chain.token_reads.lock().unwrap().contains(&Some(token)));
}

#[tokio::test]
async fn token_transfer_scales_by_the_token_decimals() {
    let recipient = address(61);
    let h = harness(
        settings(json!({})),
        FakeChain::default().with_account(own_address(), 10_000_000_000, 0),
        vec![json!({
            "symbol": "six",
            "decimals": 6,
            "recipient": null,
            "initial_supply": "1000"
        })],
    );

    let deploy = DeployTokenAction::new(h.runtime.clone());
    let (callback, replies) = capture();
    assert!(deploy.handle(&message("launch SIX"), &State::default(), callback).await);
    let token: Address = single_reply(&replies).content["token_address"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(h.chain.token_balance(own_address(), token), 1_000_000_000);

    h.extractor.push_reply(json!({
        "recipient": recipient.to_string(),
        "amount": "1",
        "token_address": token.to_string()
    }));
    let transfer = TransferAction::new(h.runtime.clone());
    let (callback, replies) = capture();
    assert!(transfer.handle(&message("send 1 SIX"), &State::default(), callback).await);

    let submitted = h.chain.submitted();
    assert_eq!(
        submitted[1].transaction.operations,
        vec![Operation::Transfer {
            to: recipient,
            amount: 1_000_000,
            token: Some(token)
        }]
    );
    assert_eq!(h.chain.token_balance(recipient, token), 1_000_000);
    assert_eq!(h.chain.token_balance(own_address(), token), 999_000_000);
    assert!(single_reply(&replies).is_success());
}

#[tokio::test]
async fn transfer_of_unknown_token_is_rejected_before_submission() {
    let h = harness(
        settings(json!({})),
        FakeChain::default().with_account(own_address(), 10_000_000_000, 0),
        vec![json!({
            "recipient": address(62).to_string(),
            "amount": "1",
            "token_address": address(63).to_string()
        })],
    );
    let action = TransferAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(!action.handle(&message("send 1 of that token"), &State::default(), callback).await);
    assert_eq!(
        single_reply(&replies).error_kind(),
        Some(ErrorKind::AccountNotFound)
    );
    assert!(h.chain.submitted().is_empty());
}

#[tokio::test]
async fn invalid_extraction_never_touches_the_chain() {
    let h = harness(
        settings(json!({})),
        FakeChain::default().with_account(own_address(), 10, 0),
        vec![json!({"recipient": "not-an-address!", "amount": "1", "token_address": null})],
    );
    let action = TransferAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(!action.handle(&message("send 1 to bob"), &State::default(), callback).await);
    let reply = single_reply(&replies);
    assert_eq!(reply.error_kind(), Some(ErrorKind::ExtractionInvalid));
    assert!(h.chain.submitted().is_empty());
}

#[tokio::test]
async fn transfer_rejects_amounts_finer_than_token_decimals() {
    let h = harness(
        settings(json!({"LEDGER_DECIMALS": "2"})),
        FakeChain::default().with_account(own_address(), 10_000, 0),
        vec![json!({"recipient": address(7).to_string(), "amount": "0.001", "token_address": null})],
    );
    let action = TransferAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(!action.handle(&message("send 0.001"), &State::default(), callback).await);
    assert_eq!(
        single_reply(&replies).error_kind(),
        Some(ErrorKind::ExtractionInvalid)
    );
}

#[tokio::test]
async fn batch_stops_at_first_rejection_and_reports_progress() {
    let (a, b, c) = (address(11), address(12), address(13));
    let h = harness(
        settings(json!({})),
        FakeChain::default()
            .with_account(own_address(), 100_000_000_000, 9)
            .rejecting(b),
        vec![json!({
            "recipients": [a.to_string(), b.to_string(), c.to_string()],
            "amount": "2"
        })],
    );
    let action = BatchTransferAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(!action.handle(&message("send 2 to each"), &State::default(), callback).await);

    let submitted = h.chain.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].transaction.nonce, 9);
    assert!(matches!(
        &submitted[0].transaction.operations[0],
        Operation::Transfer { to, amount: 2_000_000_000, .. } if *to == a
    ));

    let reply = single_reply(&replies);
    assert_eq!(reply.error_kind(), Some(ErrorKind::ChainRejected));
    assert_eq!(reply.content["failed_recipient"], json!(b.to_string()));
    assert_eq!(
        reply.content["submitted"],
        json!([{"recipient": a.to_string(), "hash": submitted[0].hash().unwrap()}])
    );
}

#[tokio::test]
async fn batch_increments_nonce_per_recipient() {
    let recipients: Vec<String> = (20..23).map(|seed| address(seed).to_string()).collect();
    let h = harness(
        settings(json!({})),
        FakeChain::default().with_account(own_address(), 100_000_000_000, 3),
        vec![json!({"recipients": recipients, "amount": 0.5})],
    );
    let action = BatchTransferAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(action.handle(&message("airdrop"), &State::default(), callback).await);
    let nonces: Vec<u64> = h
        .chain
        .submitted()
        .iter()
        .map(|tx| tx.transaction.nonce)
        .collect();
    assert_eq!(nonces, vec![3, 4, 5]);
    assert_eq!(
        single_reply(&replies).content["submitted"]
            .as_array()
            .unwrap()
            .len(),
        3
    );
}

#[tokio::test]
async fn batch_with_one_bad_address_submits_nothing() {
    let h = harness(
        settings(json!({})),
        FakeChain::default().with_account(own_address(), 100, 0),
        vec![json!({"recipients": [address(1).to_string(), "???"], "amount": "1"})],
    );
    let action = BatchTransferAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(!action.handle(&message("send"), &State::default(), callback).await);
    assert!(h.chain.submitted().is_empty());
    assert_eq!(
        single_reply(&replies).error_kind(),
        Some(ErrorKind::ExtractionInvalid)
    );
}

#[tokio::test]
async fn deploy_token_signs_with_sender_token_and_admin_keys() {
    let h = harness(
        settings(json!({})),
        FakeChain::default().with_account(own_address(), 10_000_000_000, 2),
        vec![json!({
            "symbol": "pilot",
            "decimals": 6,
            "recipient": null,
            "initial_supply": "1000"
        })],
    );
    let action = DeployTokenAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(action.handle(&message("launch PILOT"), &State::default(), callback).await);

    let submitted = h.chain.submitted();
    assert_eq!(submitted.len(), 1);
    let signed = &submitted[0];
    assert_eq!(signed.signatures.len(), 3);
    assert_eq!(signed.transaction.nonce, 2);

    let reply = single_reply(&replies);
    let token = reply.content["token_address"].as_str().unwrap().to_string();
    let admin = reply.content["admin_address"].as_str().unwrap().to_string();
    assert_ne!(token, admin);
    match signed.transaction.operations.as_slice() {
        [Operation::DeployToken {
            token: deployed,
            admin: admin_key,
            symbol,
            decimals,
        }, Operation::Mint { to, amount, .. }] => {
            assert_eq!(deployed.to_string(), token);
            assert_eq!(admin_key.to_string(), admin);
            assert_eq!(symbol, "PILOT");
            assert_eq!(*decimals, 6);
            assert_eq!(*to, own_address());
            assert_eq!(*amount, 1_000_000_000);
        }
        other => panic!("unexpected operations: {other:?}"),
    }
}

#[tokio::test]
async fn faucet_posts_network_and_address() {
    let server = MockServer::start_async().await;
    let target = address(30);
    let faucet = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/faucet")
                .json_body(json!({"network": "lightnet", "address": target.to_string()}));
            then.status(200)
                .json_body(json!({"status": "success", "message": "sent 100 tokens"}));
        })
        .await;

    let h = harness(
        settings(json!({"LEDGER_FAUCET_URL": server.url("/faucet")})),
        FakeChain::default(),
        vec![json!({"address": target.to_string()})],
    );
    let action = FaucetAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(action.handle(&message("fund that wallet"), &State::default(), callback).await);
    faucet.assert_async().await;
    let reply = single_reply(&replies);
    assert!(reply.text.contains("sent 100 tokens"));
    assert_eq!(reply.content["address"], json!(target.to_string()));
}

#[tokio::test]
async fn faucet_on_mainnet_is_a_configuration_error() {
    let h = harness(
        settings(json!({
            "LEDGER_NETWORK": "mainnet",
            "LEDGER_RPC_URL": "https://node.example/rpc"
        })),
        FakeChain::default(),
        vec![json!({"address": null})],
    );
    let action = FaucetAction::new(h.runtime.clone());
    let (callback, replies) = capture();

    assert!(!action.handle(&message("get me test funds"), &State::default(), callback).await);
    assert_eq!(
        single_reply(&replies).error_kind(),
        Some(ErrorKind::Configuration)
    );
    assert_eq!(h.extractor.calls(), 0);
}

#[tokio::test]
async fn invalid_settings_fail_validation_and_report_config() {
    let h = harness(
        json!({"LEDGER_NETWORK": "lightnet"}),
        FakeChain::default(),
        vec![],
    );
    let action = BalanceAction::new(h.runtime.clone());
    assert!(!action.validate(&message("balance?")));

    let (callback, replies) = capture();
    assert!(!action.handle(&message("balance?"), &State::default(), callback).await);
    assert_eq!(
        single_reply(&replies).error_kind(),
        Some(ErrorKind::Configuration)
    );
}

#[tokio::test]
async fn plugin_registers_all_actions_and_wallet_provider() {
    let h = harness(settings(json!({})), FakeChain::default(), vec![]);
    let registry = ActionRegistry::new();
    let plugin = WalletPlugin::new(h.runtime.clone());

    assert!(plugin.initialize(&registry).await);
    assert_eq!(
        registry.list_actions().await,
        vec![
            "BATCH_SEND_TOKEN",
            "DEPLOY_TOKEN",
            "GET_BALANCE",
            "REQUEST_FAUCET",
            "SEND_TOKEN"
        ]
    );
    assert!(registry.get_action("transfer_token").await.is_some());
    for name in registry.list_actions().await {
        let action = registry.get_action(&name).await.unwrap();
        assert!(!action.examples().is_empty());
        assert!(!action.description().is_empty());
    }

    let providers = registry.providers().await;
    assert_eq!(providers.len(), 1);
    let context = providers[0]
        .get(&message("hi"), &State::default())
        .await
        .expect("wallet context");
    assert!(context.contains(&own_address().to_string()));

    assert!(!plugin.initialize(&registry).await);
}

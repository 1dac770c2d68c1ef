use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use stx_sweeper::config::{Config, Network, PacingConfig};
use stx_sweeper::error::{Error, Result};
use stx_sweeper::node::NodeApi;
use stx_sweeper::sweep::{BatchOrchestrator, SweepAction};
use stx_sweeper::tx::SignedTransfer;
use stx_sweeper::wallet::AccountRecord;

const TEST_PHRASE: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Scripted network stand-in. Responses are served in call order and
/// every call is counted, so tests can assert which pipeline stages ran.
#[derive(Default)]
struct MockState {
    balances: Mutex<VecDeque<Result<u128>>>,
    fees: Mutex<VecDeque<Result<u128>>>,
    broadcasts: Mutex<VecDeque<Result<String>>>,
    balance_calls: AtomicU32,
    fee_calls: AtomicU32,
    broadcast_calls: AtomicU32,
}

#[derive(Clone, Default)]
struct MockNode(Arc<MockState>);

impl MockNode {
    fn push_balance(&self, response: Result<u128>) {
        self.0.balances.lock().unwrap().push_back(response);
    }

    fn push_fee(&self, response: Result<u128>) {
        self.0.fees.lock().unwrap().push_back(response);
    }

    fn push_broadcast(&self, response: Result<String>) {
        self.0.broadcasts.lock().unwrap().push_back(response);
    }

    fn balance_calls(&self) -> u32 {
        self.0.balance_calls.load(Ordering::SeqCst)
    }

    fn fee_calls(&self) -> u32 {
        self.0.fee_calls.load(Ordering::SeqCst)
    }

    fn broadcast_calls(&self) -> u32 {
        self.0.broadcast_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeApi for MockNode {
    async fn fetch_balance(&self, _address: &str) -> Result<u128> {
        self.0.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.0
            .balances
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected balance call")
    }

    async fn estimate_fee(&self, _transfer: &SignedTransfer) -> Result<u128> {
        self.0.fee_calls.fetch_add(1, Ordering::SeqCst);
        self.0
            .fees
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected fee estimation call")
    }

    async fn broadcast(&self, _transfer: &SignedTransfer) -> Result<String> {
        self.0.broadcast_calls.fetch_add(1, Ordering::SeqCst);
        self.0
            .broadcasts
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected broadcast call")
    }
}

fn test_config() -> Config {
    Config {
        recipient: "SPRECIPIENTADDRESS".to_string(),
        network: Network::Mainnet,
        pacing: PacingConfig {
            inter_account_delay_secs: 0,
        },
        ..Config::default()
    }
}

fn account(name: &str, owner: &str, phrase: &str) -> AccountRecord {
    AccountRecord {
        name: name.to_string(),
        owner: owner.to_string(),
        secret_phrase: phrase.to_string(),
    }
}

#[tokio::test]
async fn test_end_to_end_two_account_scenario() {
    let node = MockNode::default();
    node.push_balance(Ok(5_000_000));
    node.push_fee(Ok(200));
    node.push_broadcast(Ok("0xdeadbeef".to_string()));
    node.push_balance(Ok(100));
    node.push_fee(Ok(180));

    let accounts = vec![
        account("Michael", "owner-1", TEST_PHRASE),
        account("Prisilla", "owner-2", TEST_PHRASE),
    ];

    let orchestrator = BatchOrchestrator::new(node.clone(), &test_config());
    let report = orchestrator.run(&accounts, SweepAction::SweepAndReport).await;

    assert_eq!(report.accounts.len(), 2);

    let first = &report.accounts[0];
    assert!(first.is_success());
    assert_eq!(first.initial_balance, 5_000_000);
    assert_eq!(first.fee, 200);
    assert_eq!(first.transferred_amount, 4_999_800);
    assert_eq!(first.txid, "0xdeadbeef");
    assert!(first.address.starts_with("SP"));

    let second = &report.accounts[1];
    assert!(!second.is_success());
    assert_eq!(second.initial_balance, 100);
    assert_eq!(second.fee, 180);
    assert_eq!(second.transferred_amount, 0);
    assert_eq!(
        second.error.as_deref(),
        Some("Insufficient balance for transaction fees")
    );

    assert_eq!(report.summary.total_transferred, 4_999_800);
    assert_eq!(report.summary.total_fees, 200);
    assert_eq!(report.summary.successful_transfers, 1);
    assert_eq!(report.summary.total_accounts, 2);

    // The fee was estimated fresh for each account; only the fundable
    // plan reached the broadcast entry point
    assert_eq!(node.balance_calls(), 2);
    assert_eq!(node.fee_calls(), 2);
    assert_eq!(node.broadcast_calls(), 1);
}

#[tokio::test]
async fn test_failures_are_isolated_and_order_preserved() {
    let node = MockNode::default();
    node.push_balance(Ok(1_000_000));
    node.push_fee(Ok(100));
    node.push_broadcast(Ok("0xaaa".to_string()));
    node.push_balance(Err(Error::Network("connection refused".into())));
    node.push_balance(Ok(2_000_000));
    node.push_fee(Ok(100));
    node.push_broadcast(Ok("0xbbb".to_string()));

    let accounts = vec![
        account("first", "o1", TEST_PHRASE),
        account("second", "o2", TEST_PHRASE),
        account("third", "o3", TEST_PHRASE),
    ];

    let orchestrator = BatchOrchestrator::new(node.clone(), &test_config());
    let report = orchestrator.run(&accounts, SweepAction::SweepAndReport).await;

    let names: Vec<&str> = report.accounts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);

    assert!(report.accounts[0].is_success());
    assert!(!report.accounts[1].is_success());
    assert!(report.accounts[2].is_success());
    assert!(report.accounts[1]
        .error
        .as_deref()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn test_empty_credential_makes_no_network_calls() {
    let node = MockNode::default();

    let accounts = vec![account("empty", "o1", "")];

    let orchestrator = BatchOrchestrator::new(node.clone(), &test_config());
    let report = orchestrator.run(&accounts, SweepAction::SweepAndReport).await;

    assert_eq!(report.accounts.len(), 1);
    assert!(!report.accounts[0].is_success());
    let error = report.accounts[0].error.as_deref().unwrap();
    assert!(error.contains("Invalid credential"));
    assert!(error.contains("empty secret phrase"));

    assert_eq!(node.balance_calls(), 0);
    assert_eq!(node.fee_calls(), 0);
    assert_eq!(node.broadcast_calls(), 0);
}

#[tokio::test]
async fn test_malformed_mnemonic_makes_no_network_calls() {
    let node = MockNode::default();

    let accounts = vec![account("garbage", "o1", "this is not a mnemonic at all")];

    let orchestrator = BatchOrchestrator::new(node.clone(), &test_config());
    let report = orchestrator.run(&accounts, SweepAction::SweepAndReport).await;

    assert!(!report.accounts[0].is_success());
    assert!(report.accounts[0]
        .error
        .as_deref()
        .unwrap()
        .contains("Invalid credential"));
    assert_eq!(node.balance_calls(), 0);
}

#[tokio::test]
async fn test_unfundable_plan_never_reaches_executor() {
    let node = MockNode::default();
    node.push_balance(Ok(100));
    node.push_fee(Ok(180));

    let accounts = vec![account("poor", "o1", TEST_PHRASE)];

    let orchestrator = BatchOrchestrator::new(node.clone(), &test_config());
    let report = orchestrator.run(&accounts, SweepAction::SweepAndReport).await;

    assert_eq!(
        report.accounts[0].error.as_deref(),
        Some("Insufficient balance for transaction fees")
    );
    assert_eq!(node.broadcast_calls(), 0);
}

#[tokio::test]
async fn test_balance_only_skips_fee_and_broadcast() {
    let node = MockNode::default();
    node.push_balance(Ok(42));

    let accounts = vec![account("watched", "o1", TEST_PHRASE)];

    let orchestrator = BatchOrchestrator::new(node.clone(), &test_config());
    let report = orchestrator.run(&accounts, SweepAction::BalanceOnly).await;

    let entry = &report.accounts[0];
    assert!(entry.is_success());
    assert_eq!(entry.initial_balance, 42);
    assert_eq!(entry.transferred_amount, 0);
    assert_eq!(entry.fee, 0);
    assert!(entry.txid.is_empty());

    assert_eq!(node.balance_calls(), 1);
    assert_eq!(node.fee_calls(), 0);
    assert_eq!(node.broadcast_calls(), 0);
}

#[tokio::test]
async fn test_rejected_broadcast_records_reason_verbatim() {
    let node = MockNode::default();
    node.push_balance(Ok(1_000_000));
    node.push_fee(Ok(100));
    node.push_broadcast(Err(Error::BroadcastRejected("NotEnoughFunds".into())));

    let accounts = vec![account("rejected", "o1", TEST_PHRASE)];

    let orchestrator = BatchOrchestrator::new(node.clone(), &test_config());
    let report = orchestrator.run(&accounts, SweepAction::SweepAndReport).await;

    let entry = &report.accounts[0];
    assert!(!entry.is_success());
    assert_eq!(entry.error.as_deref(), Some("NotEnoughFunds"));
    assert_eq!(entry.transferred_amount, 0);
}

#[tokio::test]
async fn test_broadcast_transport_failure_is_recorded() {
    let node = MockNode::default();
    node.push_balance(Ok(1_000_000));
    node.push_fee(Ok(100));
    node.push_broadcast(Err(Error::Network("request timed out".into())));

    let accounts = vec![account("flaky", "o1", TEST_PHRASE)];

    let orchestrator = BatchOrchestrator::new(node.clone(), &test_config());
    let report = orchestrator.run(&accounts, SweepAction::SweepAndReport).await;

    assert!(!report.accounts[0].is_success());
    assert!(report.accounts[0]
        .error
        .as_deref()
        .unwrap()
        .contains("Network failure"));
}

#[tokio::test]
async fn test_exhausted_rate_limit_fails_the_account() {
    let node = MockNode::default();
    node.push_balance(Err(Error::RateLimitExceeded { attempts: 5 }));

    let accounts = vec![account("limited", "o1", TEST_PHRASE)];

    let orchestrator = BatchOrchestrator::new(node.clone(), &test_config());
    let report = orchestrator.run(&accounts, SweepAction::SweepAndReport).await;

    assert!(!report.accounts[0].is_success());
    assert!(report.accounts[0]
        .error
        .as_deref()
        .unwrap()
        .contains("Rate limit exceeded after 5 attempts"));
}

#[tokio::test]
async fn test_cancellation_stops_before_next_account() {
    let node = MockNode::default();

    let accounts = vec![
        account("never-started", "o1", TEST_PHRASE),
        account("also-skipped", "o2", TEST_PHRASE),
    ];

    let orchestrator = BatchOrchestrator::new(node.clone(), &test_config());
    orchestrator.cancellation_token().cancel();

    let report = orchestrator.run(&accounts, SweepAction::SweepAndReport).await;

    assert!(report.accounts.is_empty());
    assert_eq!(node.balance_calls(), 0);
}

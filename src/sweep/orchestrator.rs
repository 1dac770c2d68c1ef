//! Batch orchestration
//!
//! Processes the account list strictly one at a time: resolve, fetch
//! balance, estimate fee, plan, execute, record. A failure anywhere in
//! one account's pipeline is recorded and the batch moves on; no
//! account can abort the run.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, Network};
use crate::error::Error;
use crate::fee;
use crate::node::NodeApi;
use crate::sweep::executor::{self, TransferOutcome};
use crate::sweep::planner;
use crate::sweep::report::{AccountReport, RunReport};
use crate::wallet::{self, AccountRecord};

/// Terminal action applied to each account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    /// Full pipeline: estimate, plan, broadcast
    SweepAndReport,
    /// Stop after the balance fetch; nothing is sent
    BalanceOnly,
}

pub struct BatchOrchestrator<N> {
    node: N,
    recipient: String,
    memo: String,
    network: Network,
    pacing: Duration,
    cancel: CancellationToken,
}

impl<N: NodeApi> BatchOrchestrator<N> {
    pub fn new(node: N, config: &Config) -> Self {
        Self {
            node,
            recipient: config.recipient.clone(),
            memo: config.memo.clone(),
            network: config.network,
            pacing: config.pacing.delay(),
            cancel: CancellationToken::new(),
        }
    }

    /// Token a caller can cancel to stop the batch between accounts
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process every account in order and return the finalized report.
    ///
    /// Always produces exactly one report entry per processed account;
    /// cancellation takes effect between accounts, never mid-pipeline.
    pub async fn run(&self, accounts: &[AccountRecord], action: SweepAction) -> RunReport {
        let mut run = RunReport::new(&self.recipient, &self.memo);

        info!(
            total = accounts.len(),
            recipient = %self.recipient,
            "starting batch"
        );

        for (index, record) in accounts.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(
                    processed = index,
                    remaining = accounts.len() - index,
                    "cancellation requested, stopping batch"
                );
                break;
            }

            info!(
                "processing account {}/{}: {} (owner: {})",
                index + 1,
                accounts.len(),
                record.name,
                record.owner
            );

            let report = self.process_account(record, action).await;
            match (&report.error, report.is_success()) {
                (_, true) => info!(account = %record.name, "account recorded: success"),
                (Some(e), false) => warn!(account = %record.name, "account recorded: failed ({})", e),
                (None, false) => warn!(account = %record.name, "account recorded: failed"),
            }
            run.push(report);

            // Proactive pacing between accounts, independent of the
            // reactive rate-limit backoff in the HTTP layer
            if index + 1 < accounts.len() {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.pacing) => {}
                }
            }
        }

        run.finalize();
        run
    }

    /// One account's pass through the pipeline. Signing material is
    /// scoped to this call and zeroed when it returns.
    async fn process_account(&self, record: &AccountRecord, action: SweepAction) -> AccountReport {
        let mut report = AccountReport::new(record);

        // Resolve
        let account = match wallet::resolve(&record.secret_phrase, self.network) {
            Ok(account) => account,
            Err(e) => {
                warn!(account = %record.name, "credential rejected: {}", e);
                report.fail(e.report_message());
                return report;
            }
        };
        report.address = account.address.clone();

        // FetchBalance
        let balance = match self.node.fetch_balance(&account.address).await {
            Ok(balance) => balance,
            Err(e) => {
                error!(address = %account.address, "balance fetch failed: {}", e);
                report.fail(e.report_message());
                return report;
            }
        };
        report.initial_balance = balance;
        info!(address = %account.address, balance = %balance, "fetched balance");

        if action == SweepAction::BalanceOnly {
            report.succeed("");
            return report;
        }

        // EstimateFee
        let fee = match fee::estimate_transfer_fee(
            &self.node,
            &account,
            &self.recipient,
            &self.memo,
            self.network,
        )
        .await
        {
            Ok(fee) => fee,
            Err(e) => {
                error!(address = %account.address, "fee estimation failed: {}", e);
                report.fail(e.report_message());
                return report;
            }
        };
        report.fee = fee;

        // Plan
        let plan = planner::plan(balance, fee);
        let Some(amount) = plan.amount() else {
            warn!(
                address = %account.address,
                balance = %balance,
                fee = %fee,
                "insufficient balance to cover the fee"
            );
            report.fail(Error::InsufficientFunds.to_string());
            return report;
        };

        // Execute
        match executor::execute(
            &self.node,
            &account,
            &self.recipient,
            amount,
            &self.memo,
            self.network,
        )
        .await
        {
            TransferOutcome::Success { txid } => {
                info!(txid = %txid, amount = %amount, "transfer accepted");
                report.transferred_amount = amount;
                report.succeed(txid);
            }
            TransferOutcome::Rejected { reason } => {
                error!(address = %account.address, "transfer rejected: {}", reason);
                report.fail(reason);
            }
            TransferOutcome::Failed { error: message } => {
                error!(address = %account.address, "transfer failed: {}", message);
                report.fail(message);
            }
        }

        report
    }
}

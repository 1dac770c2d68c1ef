//! Run reporting and aggregation
//!
//! One `AccountReport` per processed account, appended in input order
//! and immutable once recorded. The summary is pure post-processing
//! over the completed sequence; it never touches the network.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::wallet::AccountRecord;

/// Base units per whole token, for human-readable narration
const MICRO_PER_TOKEN: u128 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Failed,
}

/// Outcome record for one account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReport {
    pub name: String,
    pub owner: String,
    pub address: String,
    pub initial_balance: u128,
    pub transferred_amount: u128,
    pub fee: u128,
    pub txid: String,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AccountReport {
    /// Start a report in the failed state; it flips to success only
    /// when the account's pipeline completes.
    pub fn new(record: &AccountRecord) -> Self {
        Self {
            name: record.name.clone(),
            owner: record.owner.clone(),
            address: String::new(),
            initial_balance: 0,
            transferred_amount: 0,
            fee: 0,
            txid: String::new(),
            status: ReportStatus::Failed,
            error: None,
        }
    }

    pub fn succeed(&mut self, txid: impl Into<String>) {
        self.status = ReportStatus::Success;
        self.txid = txid.into();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ReportStatus::Failed;
        self.error = Some(error.into());
    }

    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Success
    }
}

/// Per-group totals, keyed by owner id or person name
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub key: String,
    pub total_initial_balance: u128,
    pub total_transferred: u128,
    pub total_fees: u128,
    pub account_count: u32,
    pub successful_transfers: u32,
}

impl GroupSummary {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            total_initial_balance: 0,
            total_transferred: 0,
            total_fees: 0,
            account_count: 0,
            successful_transfers: 0,
        }
    }

    fn absorb(&mut self, report: &AccountReport) {
        self.total_initial_balance += report.initial_balance;
        self.account_count += 1;
        // Transfers and fees are only realized on success
        if report.is_success() {
            self.total_transferred += report.transferred_amount;
            self.total_fees += report.fee;
            self.successful_transfers += 1;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_accounts: u32,
    pub total_transferred: u128,
    pub total_fees: u128,
    pub successful_transfers: u32,
    pub by_owner: Vec<GroupSummary>,
    pub by_name: Vec<GroupSummary>,
}

/// The durable artifact of one run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub recipient: String,
    pub memo: String,
    pub accounts: Vec<AccountReport>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn new(recipient: &str, memo: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            recipient: recipient.to_string(),
            memo: memo.to_string(),
            accounts: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    pub fn push(&mut self, report: AccountReport) {
        self.accounts.push(report);
    }

    pub fn failed_accounts(&self) -> usize {
        self.accounts.iter().filter(|a| !a.is_success()).count()
    }

    /// Compute the summary over the recorded accounts
    pub fn finalize(&mut self) {
        let mut summary = RunSummary {
            total_accounts: self.accounts.len() as u32,
            ..RunSummary::default()
        };

        for report in &self.accounts {
            fold_group(&mut summary.by_owner, &report.owner, report);
            fold_group(&mut summary.by_name, &report.name, report);
            if report.is_success() {
                summary.total_transferred += report.transferred_amount;
                summary.total_fees += report.fee;
                summary.successful_transfers += 1;
            }
        }

        self.summary = summary;
    }

    /// Write the report as one JSON document named with the run timestamp
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let stamp = self
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let path = dir.join(format!("sweep-report-{}.json", stamp));

        std::fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }

    /// Narrate the summary to the log, grouped by name and by owner
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Transfer summary by person:");
        for group in &self.summary.by_name {
            info!(
                "  {}: transferred {} STX, fees {} STX, {}/{} successful",
                group.key,
                display_tokens(group.total_transferred),
                display_tokens(group.total_fees),
                group.successful_transfers,
                group.account_count,
            );
        }

        info!("Transfer summary by owner:");
        for group in &self.summary.by_owner {
            info!(
                "  {}: initial {} STX, transferred {} STX, {}/{} successful",
                group.key,
                display_tokens(group.total_initial_balance),
                display_tokens(group.total_transferred),
                group.successful_transfers,
                group.account_count,
            );
        }

        info!(
            "Grand total: transferred {} STX, fees {} STX across {} accounts",
            display_tokens(self.summary.total_transferred),
            display_tokens(self.summary.total_fees),
            self.summary.total_accounts,
        );
    }
}

/// Accumulate a report into its group, preserving first-appearance order
fn fold_group(groups: &mut Vec<GroupSummary>, key: &str, report: &AccountReport) {
    let index = match groups.iter().position(|g| g.key == key) {
        Some(index) => index,
        None => {
            groups.push(GroupSummary::new(key));
            groups.len() - 1
        }
    };
    groups[index].absorb(report);
}

/// Render base units as a whole-token decimal string
fn display_tokens(micro: u128) -> String {
    format!("{}.{:06}", micro / MICRO_PER_TOKEN, micro % MICRO_PER_TOKEN)
}

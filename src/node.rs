//! Network API client
//!
//! Balance queries, fee estimation and transaction broadcast against a
//! Hiro-style REST API. The trait seam exists so the orchestrator can
//! run against a counting stand-in under test.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{RateLimitedClient, RetryPolicy};
use crate::tx::SignedTransfer;

/// Outbound operations of the ledger's API service
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Current spendable balance in base units
    async fn fetch_balance(&self, address: &str) -> Result<u128>;

    /// Fee in base units the given transfer would require
    async fn estimate_fee(&self, transfer: &SignedTransfer) -> Result<u128>;

    /// Submit a signed transfer. Returns the transaction id on
    /// acceptance; a structured rejection surfaces as
    /// `Error::BroadcastRejected` with the service's reason verbatim.
    async fn broadcast(&self, transfer: &SignedTransfer) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    stx: StxBalance,
}

#[derive(Debug, Deserialize)]
struct StxBalance {
    balance: String,
}

#[derive(Debug, Deserialize)]
struct FeeEstimationsResponse {
    estimations: Vec<FeeEstimation>,
}

#[derive(Debug, Deserialize)]
struct FeeEstimation {
    fee: u64,
}

#[derive(Debug, Deserialize)]
struct BroadcastAccepted {
    txid: String,
}

#[derive(Debug, Deserialize)]
struct BroadcastRejection {
    error: String,
    #[serde(default)]
    reason: Option<String>,
}

/// HTTP implementation over the rate-limited client
pub struct HttpNodeApi {
    base: String,
    http: RateLimitedClient,
    fallback_fee_rate: u128,
}

impl HttpNodeApi {
    pub fn new(config: &Config) -> Self {
        let decorator = config
            .api_key
            .as_deref()
            .map(RateLimitedClient::bearer_decorator);

        let policy = RetryPolicy {
            max_attempts: config.retry.max_attempts,
            backoff: config.retry.backoff(),
        };

        Self {
            base: config.api_base().trim_end_matches('/').to_string(),
            http: RateLimitedClient::new(policy, decorator),
            fallback_fee_rate: config.fallback_fee_rate as u128,
        }
    }

    /// Ask the fee endpoint what the given transfer would cost
    async fn primary_fee(&self, transfer: &SignedTransfer) -> Result<u128> {
        let estimated_len = transfer.payload.signing_bytes()?.len();
        let body = json!({
            "transaction_payload": &transfer.payload,
            "estimated_len": estimated_len,
        });

        let response = self
            .http
            .post_json(&format!("{}/v2/fees/transaction", self.base), &body)
            .await?;

        if !response.status().is_success() {
            return Err(Error::FeeEstimation(format!(
                "fee endpoint returned {}",
                response.status()
            )));
        }

        let estimations: FeeEstimationsResponse = response
            .json()
            .await
            .map_err(|e| Error::FeeEstimation(e.to_string()))?;

        // The service returns low/middle/high estimations; take the middle
        let estimation = estimations
            .estimations
            .get(1)
            .or_else(|| estimations.estimations.first())
            .ok_or_else(|| Error::FeeEstimation("no estimations in response".into()))?;

        Ok(estimation.fee as u128)
    }

    /// Fallback path: scalar per-byte rate times the serialized size
    async fn fallback_fee(&self, transfer: &SignedTransfer) -> Result<u128> {
        let response = self
            .http
            .get(&format!("{}/v2/fees/transfer", self.base))
            .await?;

        if !response.status().is_success() {
            return Err(Error::FeeEstimation(format!(
                "fee rate endpoint returned {}",
                response.status()
            )));
        }

        let rate: u64 = response
            .json()
            .await
            .map_err(|e| Error::FeeEstimation(e.to_string()))?;

        let rate = (rate as u128).max(self.fallback_fee_rate);
        let estimated_len = transfer.payload.signing_bytes()?.len() as u128;
        Ok(rate * estimated_len)
    }
}

#[async_trait]
impl NodeApi for HttpNodeApi {
    async fn fetch_balance(&self, address: &str) -> Result<u128> {
        let url = format!("{}/extended/v1/address/{}/balances", self.base, address);
        let response = self.http.get(&url).await?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "balance endpoint returned {}",
                response.status()
            )));
        }

        let balances: BalancesResponse = response
            .json()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        balances.stx.balance.parse::<u128>().map_err(|e| {
            Error::Serialization(format!(
                "bad balance value {:?}: {}",
                balances.stx.balance, e
            ))
        })
    }

    async fn estimate_fee(&self, transfer: &SignedTransfer) -> Result<u128> {
        match self.primary_fee(transfer).await {
            Ok(fee) => {
                debug!(fee = %fee, "fee estimated");
                Ok(fee)
            }
            // The rate-limit budget is already spent; falling back would
            // hammer the same host again
            Err(e @ Error::RateLimitExceeded { .. }) => Err(e),
            Err(e) => {
                warn!("primary fee estimation failed ({}), using transfer fee rate", e);
                self.fallback_fee(transfer).await
            }
        }
    }

    async fn broadcast(&self, transfer: &SignedTransfer) -> Result<String> {
        let url = format!("{}/v2/transactions", self.base);
        let response = self.http.post_json(&url, transfer).await?;
        let status = response.status();

        if status.is_success() {
            let accepted: BroadcastAccepted = response
                .json()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;
            return Ok(accepted.txid);
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let reason = match serde_json::from_str::<BroadcastRejection>(&body) {
            Ok(rejection) => match rejection.reason {
                Some(detail) => format!("{}: {}", rejection.error, detail),
                None => rejection.error,
            },
            Err(_) => format!("broadcast returned {}: {}", status, body),
        };

        Err(Error::BroadcastRejected(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balances_response_shape() {
        let json = r#"{"stx": {"balance": "5000000", "locked": "0"}, "fungible_tokens": {}}"#;
        let parsed: BalancesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.stx.balance, "5000000");
    }

    #[test]
    fn test_fee_estimations_shape() {
        let json = r#"{"estimations": [{"fee": 180}, {"fee": 200}, {"fee": 250}]}"#;
        let parsed: FeeEstimationsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.estimations[1].fee, 200);
    }

    #[test]
    fn test_rejection_shape() {
        let json = r#"{"error": "transaction rejected", "reason": "NotEnoughFunds"}"#;
        let parsed: BroadcastRejection = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.error, "transaction rejected");
        assert_eq!(parsed.reason.as_deref(), Some("NotEnoughFunds"));
    }

    #[test]
    fn test_rejection_without_reason() {
        let json = r#"{"error": "InvalidNonce"}"#;
        let parsed: BroadcastRejection = serde_json::from_str(json).unwrap();
        assert!(parsed.reason.is_none());
    }
}

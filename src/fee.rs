//! Dynamic fee estimation
//!
//! Builds a throwaway transfer of nominal size to the real recipient
//! and asks the network what it would cost. Recomputed for every
//! account; fees move with network conditions and payload size.

use tracing::debug;

use crate::config::Network;
use crate::error::{Error, Result};
use crate::node::NodeApi;
use crate::tx::{TokenTransfer, FEE_PROBE_AMOUNT};
use crate::wallet::ResolvedAccount;

/// Estimate the fee the final sweep transfer will require.
///
/// The probe carries the real recipient and memo so its serialized
/// shape matches the eventual transfer; the amount is a placeholder
/// because the real amount cannot be known until the fee is.
pub async fn estimate_transfer_fee<N: NodeApi + ?Sized>(
    node: &N,
    account: &ResolvedAccount,
    recipient: &str,
    memo: &str,
    network: Network,
) -> Result<u128> {
    let probe = TokenTransfer {
        sender: account.address.clone(),
        recipient: recipient.to_string(),
        amount: FEE_PROBE_AMOUNT,
        memo: memo.to_string(),
        network,
    };

    let signed = account.sign_transfer(&probe)?;

    let fee = node.estimate_fee(&signed).await.map_err(|e| match e {
        Error::RateLimitExceeded { .. } | Error::FeeEstimation(_) => e,
        other => Error::FeeEstimation(other.to_string()),
    })?;

    debug!(fee = %fee, "estimated transfer fee");
    Ok(fee)
}

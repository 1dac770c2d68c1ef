//! Final transfer construction and submission

use tracing::info;

use crate::config::Network;
use crate::error::Error;
use crate::node::NodeApi;
use crate::tx::TokenTransfer;
use crate::wallet::ResolvedAccount;

/// Terminal result of one submission attempt.
///
/// None of these trigger a retry of the transfer itself; only the
/// underlying HTTP layer retries, and only on rate limiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Accepted by the network entry point
    Success { txid: String },
    /// Explicitly rejected; the reason comes verbatim from the service
    Rejected { reason: String },
    /// Anything else that went wrong during build or submit
    Failed { error: String },
}

/// Build, sign and submit the sweep transfer for exactly the planned
/// amount
pub async fn execute<N: NodeApi + ?Sized>(
    node: &N,
    account: &ResolvedAccount,
    recipient: &str,
    amount: u128,
    memo: &str,
    network: Network,
) -> TransferOutcome {
    let transfer = TokenTransfer {
        sender: account.address.clone(),
        recipient: recipient.to_string(),
        amount,
        memo: memo.to_string(),
        network,
    };

    let signed = match account.sign_transfer(&transfer) {
        Ok(signed) => signed,
        Err(e) => {
            return TransferOutcome::Failed {
                error: Error::Unexpected(e.to_string()).to_string(),
            }
        }
    };

    info!(amount = %amount, recipient, "broadcasting sweep transfer");

    match node.broadcast(&signed).await {
        Ok(txid) => TransferOutcome::Success { txid },
        Err(Error::BroadcastRejected(reason)) => TransferOutcome::Rejected { reason },
        Err(e) => TransferOutcome::Failed {
            error: e.to_string(),
        },
    }
}

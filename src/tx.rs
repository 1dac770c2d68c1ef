//! Transfer payloads
//!
//! The wire format the network entry point accepts: an unsigned
//! transfer payload plus the detached signature and public key produced
//! by the sending account.

use serde::{Deserialize, Serialize};

use crate::config::Network;
use crate::error::Result;

/// Nominal amount used for fee-probe transfers. The fee follows the
/// serialized shape and current network conditions, not the amount, so
/// a minimally-sized probe of representative shape is sufficient.
pub const FEE_PROBE_AMOUNT: u128 = 1_000;

/// Unsigned token transfer payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub sender: String,
    pub recipient: String,
    pub amount: u128,
    pub memo: String,
    pub network: Network,
}

impl TokenTransfer {
    /// Canonical bytes covered by the transfer signature
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Transfer payload ready for broadcast
#[derive(Debug, Clone, Serialize)]
pub struct SignedTransfer {
    pub payload: TokenTransfer,
    pub public_key: String,
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_bytes_are_stable() {
        let transfer = TokenTransfer {
            sender: "SPSENDER".to_string(),
            recipient: "SPRECIPIENT".to_string(),
            amount: 4_999_800,
            memo: "102687864".to_string(),
            network: Network::Mainnet,
        };

        assert_eq!(
            transfer.signing_bytes().unwrap(),
            transfer.signing_bytes().unwrap()
        );
    }

    #[test]
    fn test_amount_serializes_as_integer() {
        let transfer = TokenTransfer {
            sender: "SPSENDER".to_string(),
            recipient: "SPRECIPIENT".to_string(),
            amount: 5_000_000,
            memo: String::new(),
            network: Network::Testnet,
        };

        let json = serde_json::to_string(&transfer).unwrap();
        assert!(json.contains("\"amount\":5000000"));
        assert!(json.contains("\"network\":\"testnet\""));
    }
}

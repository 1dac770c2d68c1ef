//! Wallet roster types
//!
//! The stored account list is an ordered JSON array read once at
//! startup.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// One stored account from the wallet list.
///
/// The `privateKey` field holds a mnemonic phrase, not a raw key; the
/// name is kept for compatibility with existing wallet files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub name: String,
    pub owner: String,
    #[serde(rename = "privateKey")]
    pub secret_phrase: String,
}

/// Load the ordered account list from a JSON file
pub fn load_accounts(path: &Path) -> Result<Vec<AccountRecord>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let accounts: Vec<AccountRecord> = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_field_names() {
        let json = r#"{
            "name": "Michael",
            "owner": "owner-1",
            "privateKey": "word1 word2 word3"
        }"#;

        let record: AccountRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "Michael");
        assert_eq!(record.owner, "owner-1");
        assert_eq!(record.secret_phrase, "word1 word2 word3");
    }

    #[test]
    fn test_list_order_preserved() {
        let json = r#"[
            {"name": "a", "owner": "o1", "privateKey": ""},
            {"name": "b", "owner": "o2", "privateKey": ""},
            {"name": "c", "owner": "o1", "privateKey": ""}
        ]"#;

        let accounts: Vec<AccountRecord> = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}

//! Wallet roster and account resolution

pub mod resolver;
pub mod types;

pub use resolver::{resolve, ResolvedAccount};
pub use types::{load_accounts, AccountRecord};

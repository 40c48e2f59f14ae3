//! Ledger configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! ledger_account = "hourledger"
//! workflow = "claim"        # or "direct"
//! manual_time = "self"      # or "manager"
//! payment_memo = "hourledger payout"
//! ```

use crate::domain::name::Name;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// How approved hours turn into payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutWorkflow {
    /// pending -> approved -> paid on the user's `claim`.
    #[default]
    Claim,
    /// `approve` pays the approved hours out immediately.
    Direct,
}

/// Who may record hours with `add_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualTimeAuthority {
    /// Users report their own hours.
    #[default]
    #[serde(rename = "self")]
    SelfReported,
    /// Any manager of the project records hours on a user's behalf.
    Manager,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// The ledger's own account at the token service. Transfers from it are ignored.
    pub ledger_account: Name,
    pub workflow: PayoutWorkflow,
    pub manual_time: ManualTimeAuthority,
    /// Memo attached to every outbound payment.
    pub payment_memo: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ledger_account: default_ledger_account(),
            workflow: PayoutWorkflow::default(),
            manual_time: ManualTimeAuthority::default(),
            payment_memo: "hourledger payout".to_string(),
        }
    }
}

fn default_ledger_account() -> Name {
    Name::from_static("hourledger")
}

impl LedgerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

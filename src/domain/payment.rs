use crate::domain::money::Money;
use crate::domain::name::Name;
use serde::{Deserialize, Serialize};

/// An outbound transfer owed by the ledger, queued until the token service accepts it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentInstruction {
    pub id: u64,
    pub project: Name,
    pub recipient: Name,
    pub amount: Money,
    pub memo: String,
}

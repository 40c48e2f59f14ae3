use super::batch::{SequenceKind, WriteBatch};
use super::name::{Name, PairKey};
use super::payment::PaymentInstruction;
use super::project::{ManagerGrant, MemberEntry, Project};
use super::time::Timestamp;
use crate::error::Result;
use async_trait::async_trait;

/// Durable keyed storage for projects, grants, memberships and the payment outbox.
///
/// Reads always see the last committed state. Writes only happen through
/// [`LedgerStore::commit`], which applies a whole batch or nothing.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn project(&self, name: &Name) -> Result<Option<Project>>;
    async fn manager_grant(&self, id: u64) -> Result<Option<ManagerGrant>>;
    async fn manager_grant_by_pair(&self, key: &PairKey) -> Result<Option<ManagerGrant>>;
    async fn member_entry(&self, id: u64) -> Result<Option<MemberEntry>>;
    async fn member_entry_by_pair(&self, key: &PairKey) -> Result<Option<MemberEntry>>;
    /// The id the next insert into `kind` should use.
    async fn next_id(&self, kind: SequenceKind) -> Result<u64>;
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    async fn projects(&self) -> Result<Vec<Project>>;
    async fn manager_grants(&self) -> Result<Vec<ManagerGrant>>;
    async fn member_entries(&self) -> Result<Vec<MemberEntry>>;
    /// Outbox entries not yet accepted by the token service, oldest first.
    async fn pending_payments(&self) -> Result<Vec<PaymentInstruction>>;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;

/// The external token contract that actually moves funds.
#[async_trait]
pub trait TokenService: Send + Sync {
    async fn send_payment(&self, payment: &PaymentInstruction) -> Result<()>;
}

pub type TokenServiceBox = Box<dyn TokenService>;

/// The single source of "now" for an operation.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

pub type ClockBox = Box<dyn Clock>;

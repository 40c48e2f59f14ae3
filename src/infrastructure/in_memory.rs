use crate::domain::batch::{Mutation, SequenceKind, WriteBatch};
use crate::domain::name::{Name, PairKey};
use crate::domain::payment::PaymentInstruction;
use crate::domain::ports::{LedgerStore, TokenService};
use crate::domain::project::{ManagerGrant, MemberEntry, Project};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Default)]
struct Tables {
    projects: BTreeMap<Name, Project>,
    grants: BTreeMap<u64, ManagerGrant>,
    grants_by_pair: BTreeMap<PairKey, u64>,
    members: BTreeMap<u64, MemberEntry>,
    members_by_pair: BTreeMap<PairKey, u64>,
    payments: BTreeMap<u64, PaymentInstruction>,
    sequences: HashMap<SequenceKind, u64>,
}

impl Tables {
    /// Rejects a batch that would break a key or index, before anything is applied.
    fn check(&self, batch: &WriteBatch) -> Result<()> {
        let mut new_grants = HashSet::new();
        let mut new_members = HashSet::new();
        for mutation in batch.mutations() {
            match mutation {
                Mutation::InsertGrant(grant) => {
                    let key = grant.key();
                    if self.grants.contains_key(&grant.id)
                        || self.grants_by_pair.contains_key(&key)
                        || !new_grants.insert(key.clone())
                    {
                        return Err(LedgerError::AlreadyExists(format!(
                            "manager grant {key}"
                        )));
                    }
                }
                Mutation::InsertMember(entry) => {
                    let key = entry.key();
                    if self.members.contains_key(&entry.id)
                        || self.members_by_pair.contains_key(&key)
                        || !new_members.insert(key.clone())
                    {
                        return Err(LedgerError::AlreadyExists(format!("member {key}")));
                    }
                }
                Mutation::UpdateMember(entry) | Mutation::DeleteMember(entry) => {
                    if !self.members.contains_key(&entry.id) {
                        return Err(LedgerError::NotFound(format!("member #{}", entry.id)));
                    }
                }
                Mutation::DeleteGrant(grant) => {
                    if !self.grants.contains_key(&grant.id) {
                        return Err(LedgerError::NotFound(format!(
                            "manager grant #{}",
                            grant.id
                        )));
                    }
                }
                Mutation::EnqueuePayment(payment) => {
                    if self.payments.contains_key(&payment.id) {
                        return Err(LedgerError::AlreadyExists(format!(
                            "payment #{}",
                            payment.id
                        )));
                    }
                }
                Mutation::PutProject(_) | Mutation::CompletePayment(_) => {}
            }
        }
        Ok(())
    }

    fn advance(&mut self, kind: SequenceKind, id: u64) {
        let next = self.sequences.entry(kind).or_default();
        *next = (*next).max(id + 1);
    }

    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::PutProject(project) => {
                self.projects.insert(project.name.clone(), project);
            }
            Mutation::InsertGrant(grant) => {
                self.advance(SequenceKind::ManagerGrant, grant.id);
                self.grants_by_pair.insert(grant.key(), grant.id);
                self.grants.insert(grant.id, grant);
            }
            Mutation::DeleteGrant(grant) => {
                if let Some(stored) = self.grants.remove(&grant.id) {
                    self.grants_by_pair.remove(&stored.key());
                }
            }
            Mutation::InsertMember(entry) => {
                self.advance(SequenceKind::MemberEntry, entry.id);
                self.members_by_pair.insert(entry.key(), entry.id);
                self.members.insert(entry.id, entry);
            }
            Mutation::UpdateMember(entry) => {
                self.members.insert(entry.id, entry);
            }
            Mutation::DeleteMember(entry) => {
                if let Some(stored) = self.members.remove(&entry.id) {
                    self.members_by_pair.remove(&stored.key());
                }
            }
            Mutation::EnqueuePayment(payment) => {
                self.advance(SequenceKind::Payment, payment.id);
                self.payments.insert(payment.id, payment);
            }
            Mutation::CompletePayment(id) => {
                self.payments.remove(&id);
            }
        }
    }
}

/// A thread-safe in-memory ledger store.
///
/// All tables sit behind one `RwLock`, so a commit is checked and applied
/// under a single write guard and readers never observe half a batch.
/// `Clone` shares the underlying tables.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn project(&self, name: &Name) -> Result<Option<Project>> {
        let tables = self.tables.read().await;
        Ok(tables.projects.get(name).cloned())
    }

    async fn manager_grant(&self, id: u64) -> Result<Option<ManagerGrant>> {
        let tables = self.tables.read().await;
        Ok(tables.grants.get(&id).cloned())
    }

    async fn manager_grant_by_pair(&self, key: &PairKey) -> Result<Option<ManagerGrant>> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants_by_pair
            .get(key)
            .and_then(|id| tables.grants.get(id))
            .cloned())
    }

    async fn member_entry(&self, id: u64) -> Result<Option<MemberEntry>> {
        let tables = self.tables.read().await;
        Ok(tables.members.get(&id).cloned())
    }

    async fn member_entry_by_pair(&self, key: &PairKey) -> Result<Option<MemberEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .members_by_pair
            .get(key)
            .and_then(|id| tables.members.get(id))
            .cloned())
    }

    async fn next_id(&self, kind: SequenceKind) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.sequences.get(&kind).copied().unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check(&batch)?;
        for mutation in batch.into_mutations() {
            tables.apply(mutation);
        }
        Ok(())
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        let tables = self.tables.read().await;
        Ok(tables.projects.values().cloned().collect())
    }

    async fn manager_grants(&self) -> Result<Vec<ManagerGrant>> {
        let tables = self.tables.read().await;
        Ok(tables.grants.values().cloned().collect())
    }

    async fn member_entries(&self) -> Result<Vec<MemberEntry>> {
        let tables = self.tables.read().await;
        Ok(tables.members.values().cloned().collect())
    }

    async fn pending_payments(&self) -> Result<Vec<PaymentInstruction>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.values().cloned().collect())
    }
}

/// A token service that accepts every payment and remembers it.
///
/// Stands in for the real token contract in the CLI and in tests.
/// `Clone` shares the recorded payments.
#[derive(Default, Clone)]
pub struct InMemoryTokenService {
    sent: Arc<Mutex<Vec<PaymentInstruction>>>,
}

impl InMemoryTokenService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every payment accepted so far, in delivery order.
    pub async fn sent(&self) -> Vec<PaymentInstruction> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl TokenService for InMemoryTokenService {
    async fn send_payment(&self, payment: &PaymentInstruction) -> Result<()> {
        self.sent.lock().await.push(payment.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn grant(id: u64, manager: &str) -> ManagerGrant {
        ManagerGrant::new(id, name("proj"), name(manager), false)
    }

    #[tokio::test]
    async fn test_in_memory_project_store() {
        let store = InMemoryLedgerStore::new();
        let project = Project::new(name("proj"), Some("10.0000 USD@token".parse().unwrap()));

        let mut batch = WriteBatch::new();
        batch.put_project(project.clone());
        store.commit(batch).await.unwrap();

        assert_eq!(store.project(&name("proj")).await.unwrap(), Some(project));
        assert!(store.project(&name("other")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pair_index_lookup() {
        let store = InMemoryLedgerStore::new();
        let entry = MemberEntry::new(0, name("proj"), name("alice"));

        let mut batch = WriteBatch::new();
        batch.insert_member(entry.clone());
        store.commit(batch).await.unwrap();

        let key = PairKey::new(&name("alice"), &name("proj"));
        assert_eq!(store.member_entry_by_pair(&key).await.unwrap(), Some(entry));
        let swapped = PairKey::new(&name("proj"), &name("alice"));
        assert!(store.member_entry_by_pair(&swapped).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let store = InMemoryLedgerStore::new();
        assert_eq!(store.next_id(SequenceKind::ManagerGrant).await.unwrap(), 0);

        let mut batch = WriteBatch::new();
        batch.insert_grant(grant(0, "mgr"));
        store.commit(batch).await.unwrap();
        assert_eq!(store.next_id(SequenceKind::ManagerGrant).await.unwrap(), 1);

        let mut batch = WriteBatch::new();
        batch.delete_grant(grant(0, "mgr"));
        store.commit(batch).await.unwrap();
        assert!(store.manager_grant(0).await.unwrap().is_none());
        assert_eq!(store.next_id(SequenceKind::ManagerGrant).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejected_batch_writes_nothing() {
        let store = InMemoryLedgerStore::new();
        let mut batch = WriteBatch::new();
        batch.insert_grant(grant(0, "mgr"));
        store.commit(batch).await.unwrap();

        // The project write comes first but must not survive the duplicate grant.
        let mut batch = WriteBatch::new();
        batch
            .put_project(Project::new(name("proj"), None))
            .insert_grant(grant(1, "mgr"));
        let result = store.commit(batch).await;

        assert!(matches!(result, Err(LedgerError::AlreadyExists(_))));
        assert!(store.project(&name("proj")).await.unwrap().is_none());
        assert_eq!(store.manager_grants().await.unwrap().len(), 1);
        assert_eq!(store.next_id(SequenceKind::ManagerGrant).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_of_missing_member_rejected() {
        let store = InMemoryLedgerStore::new();
        let mut batch = WriteBatch::new();
        batch.update_member(MemberEntry::new(7, name("proj"), name("alice")));
        assert!(matches!(
            store.commit(batch).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_payment_outbox() {
        let store = InMemoryLedgerStore::new();
        let payment = PaymentInstruction {
            id: 0,
            project: name("proj"),
            recipient: name("alice"),
            amount: "1.0000 USD@token".parse().unwrap(),
            memo: "pay".to_string(),
        };

        let mut batch = WriteBatch::new();
        batch.enqueue_payment(payment.clone());
        store.commit(batch).await.unwrap();
        assert_eq!(store.pending_payments().await.unwrap(), vec![payment]);

        let mut batch = WriteBatch::new();
        batch.complete_payment(0);
        store.commit(batch).await.unwrap();
        assert!(store.pending_payments().await.unwrap().is_empty());
        assert_eq!(store.next_id(SequenceKind::Payment).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_token_service_records_payments() {
        let service = InMemoryTokenService::new();
        let payment = PaymentInstruction {
            id: 3,
            project: name("proj"),
            recipient: name("bob"),
            amount: "2.5000 USD@token".parse().unwrap(),
            memo: "pay".to_string(),
        };
        service.send_payment(&payment).await.unwrap();
        assert_eq!(service.sent().await, vec![payment]);
    }
}

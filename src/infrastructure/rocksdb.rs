use crate::domain::batch::{Mutation, SequenceKind, WriteBatch};
use crate::domain::name::{Name, PairKey};
use crate::domain::payment::PaymentInstruction;
use crate::domain::ports::LedgerStore;
use crate::domain::project::{ManagerGrant, MemberEntry, Project};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for projects, keyed by name.
pub const CF_PROJECTS: &str = "projects";
/// Column Family for manager grants, keyed by id.
pub const CF_GRANTS: &str = "manager_grants";
/// Index from (manager, project) to grant id.
pub const CF_GRANTS_BY_PAIR: &str = "manager_grants_by_pair";
/// Column Family for memberships, keyed by id.
pub const CF_MEMBERS: &str = "member_entries";
/// Index from (user, project) to member id.
pub const CF_MEMBERS_BY_PAIR: &str = "member_entries_by_pair";
/// Payment outbox, keyed by id.
pub const CF_PAYMENTS: &str = "payments";
/// Next free id per table.
pub const CF_SEQUENCES: &str = "sequences";

const COLUMN_FAMILIES: [&str; 7] = [
    CF_PROJECTS,
    CF_GRANTS,
    CF_GRANTS_BY_PAIR,
    CF_MEMBERS,
    CF_MEMBERS_BY_PAIR,
    CF_PAYMENTS,
    CF_SEQUENCES,
];

/// A persistent ledger store backed by RocksDB.
///
/// Each table and each secondary index lives in its own Column Family.
/// Values are JSON. A commit is validated against the current state and then
/// written as one `rocksdb::WriteBatch`, which RocksDB applies atomically.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

fn internal(msg: String) -> LedgerError {
    LedgerError::Internal(Box::new(std::io::Error::other(msg)))
}

fn id_from_bytes(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| internal(format!("expected 8-byte id, found {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| internal(format!("{name} column family not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn contains(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key)?.is_some())
    }

    fn all_json<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    fn lookup_pair<T: DeserializeOwned>(
        &self,
        index_cf: &str,
        table_cf: &str,
        key: &PairKey,
    ) -> Result<Option<T>> {
        let index = self.cf(index_cf)?;
        match self.db.get_cf(index, key.to_bytes())? {
            Some(id) => self.get_json(table_cf, &id_from_bytes(&id)?.to_be_bytes()),
            None => Ok(None),
        }
    }

    fn sequence(&self, kind: SequenceKind) -> Result<u64> {
        let cf = self.cf(CF_SEQUENCES)?;
        match self.db.get_cf(cf, kind.as_str())? {
            Some(bytes) => id_from_bytes(&bytes),
            None => Ok(0),
        }
    }

    fn put_json<T: Serialize>(
        &self,
        batch: &mut rocksdb::WriteBatch,
        cf_name: &str,
        key: &[u8],
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(cf, key, serde_json::to_vec(value)?);
        Ok(())
    }

    fn check(&self, batch: &WriteBatch) -> Result<()> {
        let mut new_grants = HashSet::new();
        let mut new_members = HashSet::new();
        for mutation in batch.mutations() {
            match mutation {
                Mutation::InsertGrant(grant) => {
                    let key = grant.key();
                    if self.contains(CF_GRANTS, &grant.id.to_be_bytes())?
                        || self.contains(CF_GRANTS_BY_PAIR, &key.to_bytes())?
                        || !new_grants.insert(key.clone())
                    {
                        return Err(LedgerError::AlreadyExists(format!(
                            "manager grant {key}"
                        )));
                    }
                }
                Mutation::InsertMember(entry) => {
                    let key = entry.key();
                    if self.contains(CF_MEMBERS, &entry.id.to_be_bytes())?
                        || self.contains(CF_MEMBERS_BY_PAIR, &key.to_bytes())?
                        || !new_members.insert(key.clone())
                    {
                        return Err(LedgerError::AlreadyExists(format!("member {key}")));
                    }
                }
                Mutation::UpdateMember(entry) | Mutation::DeleteMember(entry) => {
                    if !self.contains(CF_MEMBERS, &entry.id.to_be_bytes())? {
                        return Err(LedgerError::NotFound(format!("member #{}", entry.id)));
                    }
                }
                Mutation::DeleteGrant(grant) => {
                    if !self.contains(CF_GRANTS, &grant.id.to_be_bytes())? {
                        return Err(LedgerError::NotFound(format!(
                            "manager grant #{}",
                            grant.id
                        )));
                    }
                }
                Mutation::EnqueuePayment(payment) => {
                    if self.contains(CF_PAYMENTS, &payment.id.to_be_bytes())? {
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
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn project(&self, name: &Name) -> Result<Option<Project>> {
        self.get_json(CF_PROJECTS, name.as_str().as_bytes())
    }

    async fn manager_grant(&self, id: u64) -> Result<Option<ManagerGrant>> {
        self.get_json(CF_GRANTS, &id.to_be_bytes())
    }

    async fn manager_grant_by_pair(&self, key: &PairKey) -> Result<Option<ManagerGrant>> {
        self.lookup_pair(CF_GRANTS_BY_PAIR, CF_GRANTS, key)
    }

    async fn member_entry(&self, id: u64) -> Result<Option<MemberEntry>> {
        self.get_json(CF_MEMBERS, &id.to_be_bytes())
    }

    async fn member_entry_by_pair(&self, key: &PairKey) -> Result<Option<MemberEntry>> {
        self.lookup_pair(CF_MEMBERS_BY_PAIR, CF_MEMBERS, key)
    }

    async fn next_id(&self, kind: SequenceKind) -> Result<u64> {
        self.sequence(kind)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        self.check(&batch)?;

        let mut write = rocksdb::WriteBatch::default();
        let mut sequences: HashMap<SequenceKind, u64> = HashMap::new();
        let mut bump = |kind: SequenceKind, id: u64| {
            let next = sequences.entry(kind).or_default();
            *next = (*next).max(id + 1);
        };

        for mutation in batch.into_mutations() {
            match mutation {
                Mutation::PutProject(project) => {
                    self.put_json(
                        &mut write,
                        CF_PROJECTS,
                        project.name.as_str().as_bytes(),
                        &project,
                    )?;
                }
                Mutation::InsertGrant(grant) => {
                    bump(SequenceKind::ManagerGrant, grant.id);
                    let id = grant.id.to_be_bytes();
                    self.put_json(&mut write, CF_GRANTS, &id, &grant)?;
                    write.put_cf(self.cf(CF_GRANTS_BY_PAIR)?, grant.key().to_bytes(), id);
                }
                Mutation::DeleteGrant(grant) => {
                    write.delete_cf(self.cf(CF_GRANTS)?, grant.id.to_be_bytes());
                    write.delete_cf(self.cf(CF_GRANTS_BY_PAIR)?, grant.key().to_bytes());
                }
                Mutation::InsertMember(entry) => {
                    bump(SequenceKind::MemberEntry, entry.id);
                    let id = entry.id.to_be_bytes();
                    self.put_json(&mut write, CF_MEMBERS, &id, &entry)?;
                    write.put_cf(self.cf(CF_MEMBERS_BY_PAIR)?, entry.key().to_bytes(), id);
                }
                Mutation::UpdateMember(entry) => {
                    self.put_json(&mut write, CF_MEMBERS, &entry.id.to_be_bytes(), &entry)?;
                }
                Mutation::DeleteMember(entry) => {
                    write.delete_cf(self.cf(CF_MEMBERS)?, entry.id.to_be_bytes());
                    write.delete_cf(self.cf(CF_MEMBERS_BY_PAIR)?, entry.key().to_bytes());
                }
                Mutation::EnqueuePayment(payment) => {
                    bump(SequenceKind::Payment, payment.id);
                    self.put_json(&mut write, CF_PAYMENTS, &payment.id.to_be_bytes(), &payment)?;
                }
                Mutation::CompletePayment(id) => {
                    write.delete_cf(self.cf(CF_PAYMENTS)?, id.to_be_bytes());
                }
            }
        }

        for (kind, next) in sequences {
            if next > self.sequence(kind)? {
                write.put_cf(self.cf(CF_SEQUENCES)?, kind.as_str(), next.to_be_bytes());
            }
        }

        self.db.write(write)?;
        Ok(())
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        self.all_json(CF_PROJECTS)
    }

    async fn manager_grants(&self) -> Result<Vec<ManagerGrant>> {
        self.all_json(CF_GRANTS)
    }

    async fn member_entries(&self) -> Result<Vec<MemberEntry>> {
        self.all_json(CF_MEMBERS)
    }

    async fn pending_payments(&self) -> Result<Vec<PaymentInstruction>> {
        self.all_json(CF_PAYMENTS)
    }
}

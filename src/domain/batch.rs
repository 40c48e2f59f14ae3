use crate::domain::payment::PaymentInstruction;
use crate::domain::project::{ManagerGrant, MemberEntry, Project};
use serde::{Deserialize, Serialize};

/// Tables that hand out surrogate ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceKind {
    ManagerGrant,
    MemberEntry,
    Payment,
}

impl SequenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceKind::ManagerGrant => "manager_grant",
            SequenceKind::MemberEntry => "member_entry",
            SequenceKind::Payment => "payment",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    PutProject(Project),
    InsertGrant(ManagerGrant),
    DeleteGrant(ManagerGrant),
    InsertMember(MemberEntry),
    UpdateMember(MemberEntry),
    DeleteMember(MemberEntry),
    EnqueuePayment(PaymentInstruction),
    CompletePayment(u64),
}

/// The writes of one operation, committed by the store as a unit.
///
/// Inserting a record with id `n` advances that table's sequence to `n + 1`,
/// so ids stay unique even after the record is deleted again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_project(&mut self, project: Project) -> &mut Self {
        self.mutations.push(Mutation::PutProject(project));
        self
    }

    pub fn insert_grant(&mut self, grant: ManagerGrant) -> &mut Self {
        self.mutations.push(Mutation::InsertGrant(grant));
        self
    }

    pub fn delete_grant(&mut self, grant: ManagerGrant) -> &mut Self {
        self.mutations.push(Mutation::DeleteGrant(grant));
        self
    }

    pub fn insert_member(&mut self, entry: MemberEntry) -> &mut Self {
        self.mutations.push(Mutation::InsertMember(entry));
        self
    }

    pub fn update_member(&mut self, entry: MemberEntry) -> &mut Self {
        self.mutations.push(Mutation::UpdateMember(entry));
        self
    }

    pub fn delete_member(&mut self, entry: MemberEntry) -> &mut Self {
        self.mutations.push(Mutation::DeleteMember(entry));
        self
    }

    pub fn enqueue_payment(&mut self, payment: PaymentInstruction) -> &mut Self {
        self.mutations.push(Mutation::EnqueuePayment(payment));
        self
    }

    pub fn complete_payment(&mut self, id: u64) -> &mut Self {
        self.mutations.push(Mutation::CompletePayment(id));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

use crate::domain::name::{Name, PairKey};
use crate::domain::ports::LedgerStore;
use crate::domain::project::ManagerGrant;
use crate::error::{LedgerError, Result};

/// Resolves owner and manager authority over a project from the stored grants.
///
/// Actors are assumed to be authenticated already; this only answers whether
/// the authenticated identity holds the role an operation needs.
pub struct AccessControl<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> AccessControl<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self { store }
    }

    async fn grant(&self, project: &Name, actor: &Name) -> Result<Option<ManagerGrant>> {
        self.store
            .manager_grant_by_pair(&PairKey::new(actor, project))
            .await
    }

    pub async fn is_owner(&self, project: &Name, actor: &Name) -> Result<bool> {
        Ok(self
            .grant(project, actor)
            .await?
            .is_some_and(|grant| grant.is_owner))
    }

    /// Owners count as managers.
    pub async fn is_manager(&self, project: &Name, actor: &Name) -> Result<bool> {
        Ok(self.grant(project, actor).await?.is_some())
    }

    pub async fn require_owner(&self, project: &Name, actor: &Name, reason: &str) -> Result<ManagerGrant> {
        match self.grant(project, actor).await? {
            Some(grant) if grant.is_owner => Ok(grant),
            _ => Err(LedgerError::Unauthorized(reason.to_string())),
        }
    }

    pub async fn require_manager(
        &self,
        project: &Name,
        actor: &Name,
        reason: &str,
    ) -> Result<ManagerGrant> {
        self.grant(project, actor)
            .await?
            .ok_or_else(|| LedgerError::Unauthorized(reason.to_string()))
    }
}

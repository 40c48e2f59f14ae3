use super::engine::LedgerEngine;
use crate::domain::batch::{SequenceKind, WriteBatch};
use crate::domain::money::{Amount, Money};
use crate::domain::name::{Name, PairKey};
use crate::domain::project::{ManagerGrant, MemberEntry, Project};
use crate::error::{LedgerError, Result};
use tracing::debug;

impl LedgerEngine {
    pub(super) async fn plan_create(
        &self,
        project: &Name,
        owner: &Name,
        hourly_rate: Option<Money>,
    ) -> Result<WriteBatch> {
        if self.store.project(project).await?.is_some() {
            return Err(LedgerError::AlreadyExists(format!(
                "a project named {project} already exists"
            )));
        }
        if let Some(rate) = &hourly_rate {
            Amount::new(rate.amount()).map_err(|_| {
                LedgerError::PreconditionFailed("hourly rate must be positive".to_string())
            })?;
            rate.currency().symbol.validate()?;
        }

        let id = self.store.next_id(SequenceKind::ManagerGrant).await?;
        debug!(%project, %owner, grant = id, "creating project");

        let mut batch = WriteBatch::new();
        batch
            .put_project(Project::new(project.clone(), hourly_rate))
            .insert_grant(ManagerGrant::new(id, project.clone(), owner.clone(), true));
        Ok(batch)
    }

    pub(super) async fn plan_add_user(
        &self,
        project: &Name,
        manager: &Name,
        user: &Name,
    ) -> Result<WriteBatch> {
        self.require_project(project, "project not found").await?;
        self.access()
            .require_manager(project, manager, "only project managers can add users")
            .await?;

        let key = PairKey::new(user, project);
        if self.store.member_entry_by_pair(&key).await?.is_some() {
            return Err(LedgerError::AlreadyExists(format!(
                "{user} is already a member of {project}"
            )));
        }

        let id = self.store.next_id(SequenceKind::MemberEntry).await?;
        let mut batch = WriteBatch::new();
        batch.insert_member(MemberEntry::new(id, project.clone(), user.clone()));
        Ok(batch)
    }

    pub(super) async fn plan_remove_user(
        &self,
        project: &Name,
        manager: &Name,
        user: &Name,
    ) -> Result<WriteBatch> {
        self.access()
            .require_manager(project, manager, "only project managers can remove users")
            .await?;

        let entry = self.require_member(project, user).await?;
        // Approved-but-unpaid time and an open clock interval do not block removal.
        if entry.pending != 0 {
            return Err(LedgerError::PreconditionFailed(format!(
                "{user} has {} pending seconds",
                entry.pending
            )));
        }

        let mut batch = WriteBatch::new();
        batch.delete_member(entry);
        Ok(batch)
    }

    pub(super) async fn plan_add_manager(
        &self,
        project: &Name,
        owner: &Name,
        manager: &Name,
    ) -> Result<WriteBatch> {
        self.access()
            .require_owner(project, owner, "only the project owner can add managers")
            .await?;

        let key = PairKey::new(manager, project);
        if self.store.manager_grant_by_pair(&key).await?.is_some() {
            return Err(LedgerError::AlreadyExists(format!(
                "{manager} is already a manager of {project}"
            )));
        }

        let id = self.store.next_id(SequenceKind::ManagerGrant).await?;
        let mut batch = WriteBatch::new();
        batch.insert_grant(ManagerGrant::new(id, project.clone(), manager.clone(), false));
        Ok(batch)
    }

    pub(super) async fn plan_remove_manager(
        &self,
        project: &Name,
        owner: &Name,
        manager: &Name,
    ) -> Result<WriteBatch> {
        self.access()
            .require_owner(project, owner, "only the project owner can remove managers")
            .await?;

        let grant = self
            .store
            .manager_grant_by_pair(&PairKey::new(manager, project))
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!("{manager} is not a manager of {project}"))
            })?;
        if grant.is_owner {
            return Err(LedgerError::PreconditionFailed(
                "the project owner cannot be removed".to_string(),
            ));
        }

        let mut batch = WriteBatch::new();
        batch.delete_grant(grant);
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use crate::application::testing::{Harness, name, usd};
    use crate::domain::batch::SequenceKind;
    use crate::domain::ports::LedgerStore;
    use crate::error::LedgerError;

    #[tokio::test]
    async fn test_create_project_with_rate() {
        let h = Harness::new().await;
        let proj = name("proj");
        h.engine
            .create(&proj, &name("owner"), Some(usd("10.0000")))
            .await
            .unwrap();

        let project = h.engine.project(&proj).await.unwrap().unwrap();
        assert_eq!(project.hourly_rate, Some(usd("10.0000")));
        assert_eq!(project.balance, Some(usd("0.0000")));

        let grant = h.engine.manager(&proj, &name("owner")).await.unwrap().unwrap();
        assert_eq!(grant.id, 0);
        assert!(grant.is_owner);
    }

    #[tokio::test]
    async fn test_create_project_without_rate() {
        let h = Harness::new().await;
        h.engine.create(&name("proj"), &name("owner"), None).await.unwrap();
        let project = h.engine.project(&name("proj")).await.unwrap().unwrap();
        assert_eq!(project.hourly_rate, None);
        assert_eq!(project.balance, None);
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let h = Harness::new().await;
        let proj = name("proj");
        let owner = name("owner");

        let result = h.engine.create(&proj, &owner, Some(usd("0.0000"))).await;
        assert!(matches!(result, Err(LedgerError::PreconditionFailed(_))));

        h.engine.create(&proj, &owner, None).await.unwrap();
        let result = h.engine.create(&proj, &name("other"), None).await;
        assert!(matches!(result, Err(LedgerError::AlreadyExists(_))));
        assert_eq!(
            h.store.next_id(SequenceKind::ManagerGrant).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_add_and_remove_user() {
        let h = Harness::new().await;
        let (proj, owner) = (name("proj"), name("owner"));
        h.engine.create(&proj, &owner, None).await.unwrap();

        let result = h.engine.add_user(&name("nope"), &owner, &owner).await;
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
        let result = h.engine.add_user(&proj, &name("alice"), &name("bob")).await;
        assert!(matches!(result, Err(LedgerError::Unauthorized(_))));

        h.engine.add_user(&proj, &owner, &name("alice")).await.unwrap();
        let result = h.engine.add_user(&proj, &owner, &name("alice")).await;
        assert!(matches!(result, Err(LedgerError::AlreadyExists(_))));

        h.engine.add_user(&proj, &owner, &name("bob")).await.unwrap();
        let result = h.engine.remove_user(&proj, &name("bob"), &name("bob")).await;
        assert!(matches!(result, Err(LedgerError::Unauthorized(_))));

        h.engine.remove_user(&proj, &owner, &name("bob")).await.unwrap();
        assert!(h.engine.member(&proj, &name("bob")).await.unwrap().is_none());

        let result = h.engine.remove_user(&proj, &owner, &name("carol")).await;
        assert!(matches!(result, Err(LedgerError::NotFound(_))));

        // Re-adding gets a fresh id.
        h.engine.add_user(&proj, &owner, &name("bob")).await.unwrap();
        let bob = h.engine.member(&proj, &name("bob")).await.unwrap().unwrap();
        assert_eq!(bob.id, 2);
    }

    #[tokio::test]
    async fn test_remove_user_blocked_by_pending_only() {
        let h = Harness::new().await;
        let (proj, owner, alice) = (name("proj"), name("owner"), name("alice"));
        h.engine.create(&proj, &owner, None).await.unwrap();
        h.engine.add_user(&proj, &owner, &alice).await.unwrap();
        h.engine.add_time(&proj, &alice, &alice, 100, None).await.unwrap();

        let result = h.engine.remove_user(&proj, &owner, &alice).await;
        assert!(matches!(result, Err(LedgerError::PreconditionFailed(_))));

        // Approved time and an open interval do not block.
        h.engine.approve(&proj, &owner, &alice, None).await.unwrap();
        h.engine.clock_in(&proj, &alice).await.unwrap();
        h.engine.remove_user(&proj, &owner, &alice).await.unwrap();
        assert!(h.engine.member(&proj, &alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_manager_lifecycle() {
        let h = Harness::new().await;
        let (proj, owner) = (name("proj"), name("owner"));
        let (mgr1, mgr2) = (name("mgr1"), name("mgr2"));
        h.engine.create(&proj, &owner, None).await.unwrap();

        let result = h.engine.add_manager(&proj, &owner, &owner).await;
        assert!(matches!(result, Err(LedgerError::AlreadyExists(_))));

        h.engine.add_manager(&proj, &owner, &mgr1).await.unwrap();
        let grant = h.engine.manager(&proj, &mgr1).await.unwrap().unwrap();
        assert_eq!((grant.id, grant.is_owner), (1, false));

        let result = h.engine.add_manager(&proj, &mgr1, &mgr2).await;
        assert!(matches!(result, Err(LedgerError::Unauthorized(_))));

        h.engine.add_manager(&proj, &owner, &mgr2).await.unwrap();
        let result = h.engine.remove_manager(&proj, &mgr1, &mgr2).await;
        assert!(matches!(result, Err(LedgerError::Unauthorized(_))));

        h.engine.remove_manager(&proj, &owner, &mgr2).await.unwrap();
        let result = h.engine.remove_manager(&proj, &owner, &mgr2).await;
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
        assert!(!h.engine.is_manager(&proj, &mgr2).await.unwrap());
    }

    #[tokio::test]
    async fn test_owner_grant_cannot_be_removed() {
        let h = Harness::new().await;
        let (proj, owner) = (name("proj"), name("owner"));
        h.engine.create(&proj, &owner, None).await.unwrap();

        let result = h.engine.remove_manager(&proj, &owner, &owner).await;
        assert!(matches!(result, Err(LedgerError::PreconditionFailed(_))));
        assert!(h.engine.is_owner(&proj, &owner).await.unwrap());
    }
}

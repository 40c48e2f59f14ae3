use crate::application::access::AccessControl;
use crate::config::LedgerConfig;
use crate::domain::batch::{Mutation, WriteBatch};
use crate::domain::command::Command;
use crate::domain::money::Money;
use crate::domain::name::{Name, PairKey};
use crate::domain::payment::PaymentInstruction;
use crate::domain::ports::{ClockBox, LedgerStoreBox, TokenServiceBox};
use crate::domain::project::{ManagerGrant, MemberEntry, Project};
use crate::domain::time::Timestamp;
use crate::error::{LedgerError, Result};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The committed state of the ledger at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub projects: Vec<Project>,
    pub managers: Vec<ManagerGrant>,
    pub members: Vec<MemberEntry>,
    pub pending_payments: Vec<PaymentInstruction>,
}

/// The main entry point of the ledger.
///
/// `LedgerEngine` owns the store, the token service and the clock. Every
/// operation runs under a single writer lock: it reads `now` once, reads the
/// records it needs, validates everything and produces one `WriteBatch` that
/// the store commits atomically. A rejected operation writes nothing.
pub struct LedgerEngine {
    pub(super) store: LedgerStoreBox,
    token_service: TokenServiceBox,
    clock: ClockBox,
    pub(super) config: LedgerConfig,
    writer: Mutex<()>,
}

impl LedgerEngine {
    /// Creates a new `LedgerEngine`.
    ///
    /// # Arguments
    ///
    /// * `store` - Where projects, grants, memberships and the payment outbox live.
    /// * `token_service` - Receives outbound payments.
    /// * `clock` - The single source of `now`.
    /// * `config` - Workflow and authorization settings.
    pub fn new(
        store: LedgerStoreBox,
        token_service: TokenServiceBox,
        clock: ClockBox,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            token_service,
            clock,
            config,
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub(super) fn access(&self) -> AccessControl<'_> {
        AccessControl::new(self.store.as_ref())
    }

    /// Runs one operation to completion.
    ///
    /// Payments enqueued by the operation are handed to the token service
    /// right after the commit. A delivery failure does not undo the
    /// operation; the payment stays queued for [`LedgerEngine::dispatch_payments`].
    pub async fn execute(&self, command: Command) -> Result<()> {
        let _writer = self.writer.lock().await;
        let now = self.clock.now();
        let op = command.name();

        let batch = match self.plan(now, command).await {
            Ok(batch) => batch,
            Err(err) => {
                debug!(op, error = %err, "operation rejected");
                return Err(err);
            }
        };

        let pays = batch
            .mutations()
            .iter()
            .any(|m| matches!(m, Mutation::EnqueuePayment(_)));
        let writes = batch.len();
        if !batch.is_empty() {
            self.store.commit(batch).await?;
        }
        info!(op, at = %now, writes, "operation committed");

        if pays && let Err(err) = self.dispatch_locked().await {
            warn!(error = %err, "payment dispatch failed, payments stay queued");
        }
        Ok(())
    }

    async fn plan(&self, now: Timestamp, command: Command) -> Result<WriteBatch> {
        match command {
            Command::Create {
                project,
                owner,
                hourly_rate,
            } => self.plan_create(&project, &owner, hourly_rate).await,
            Command::AddUser {
                project,
                manager,
                user,
            } => self.plan_add_user(&project, &manager, &user).await,
            Command::RemoveUser {
                project,
                manager,
                user,
            } => self.plan_remove_user(&project, &manager, &user).await,
            Command::AddManager {
                project,
                owner,
                manager,
            } => self.plan_add_manager(&project, &owner, &manager).await,
            Command::RemoveManager {
                project,
                owner,
                manager,
            } => self.plan_remove_manager(&project, &owner, &manager).await,
            Command::ClockIn { project, user } => self.plan_clock_in(now, &project, &user).await,
            Command::ClockOut {
                project,
                user,
                description,
            } => {
                self.plan_clock_out(now, &project, &user, description.as_deref())
                    .await
            }
            Command::AddTime {
                project,
                actor,
                user,
                seconds,
                description,
            } => {
                self.plan_add_time(&project, &actor, &user, seconds, description.as_deref())
                    .await
            }
            Command::Approve {
                project,
                manager,
                user,
                seconds,
            } => self.plan_approve(&project, &manager, &user, seconds).await,
            Command::Decline {
                project,
                manager,
                user,
                seconds,
            } => self.plan_decline(&project, &manager, &user, seconds).await,
            Command::Claim {
                project,
                user,
                seconds,
            } => self.plan_claim(&project, &user, seconds).await,
            Command::SetUserRate {
                project,
                manager,
                user,
                hourly_rate,
            } => {
                self.plan_set_user_rate(&project, &manager, &user, hourly_rate)
                    .await
            }
            Command::Deposit {
                from,
                project_tag,
                amount,
            } => self.plan_deposit(&from, &project_tag, amount).await,
        }
    }

    /// Delivers queued payments to the token service, oldest first.
    ///
    /// Stops at the first delivery failure so payments leave in order.
    /// Returns how many were delivered.
    pub async fn dispatch_payments(&self) -> Result<usize> {
        let _writer = self.writer.lock().await;
        self.dispatch_locked().await
    }

    async fn dispatch_locked(&self) -> Result<usize> {
        let mut delivered = 0;
        for payment in self.store.pending_payments().await? {
            if let Err(err) = self.token_service.send_payment(&payment).await {
                warn!(
                    payment = payment.id,
                    recipient = %payment.recipient,
                    error = %err,
                    "token service refused payment"
                );
                break;
            }
            let mut batch = WriteBatch::new();
            batch.complete_payment(payment.id);
            self.store.commit(batch).await?;
            info!(
                payment = payment.id,
                recipient = %payment.recipient,
                amount = %payment.amount,
                "payment delivered"
            );
            delivered += 1;
        }
        Ok(delivered)
    }

    pub(super) async fn require_project(&self, name: &Name, reason: &str) -> Result<Project> {
        self.store
            .project(name)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("{reason}: {name}")))
    }

    pub(super) async fn require_member(&self, project: &Name, user: &Name) -> Result<MemberEntry> {
        self.store
            .member_entry_by_pair(&PairKey::new(user, project))
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "the user {user} is not a member of the project {project}"
                ))
            })
    }

    // Queries

    pub async fn project(&self, name: &Name) -> Result<Option<Project>> {
        self.store.project(name).await
    }

    pub async fn member(&self, project: &Name, user: &Name) -> Result<Option<MemberEntry>> {
        self.store
            .member_entry_by_pair(&PairKey::new(user, project))
            .await
    }

    pub async fn manager(&self, project: &Name, manager: &Name) -> Result<Option<ManagerGrant>> {
        self.store
            .manager_grant_by_pair(&PairKey::new(manager, project))
            .await
    }

    pub async fn is_owner(&self, project: &Name, actor: &Name) -> Result<bool> {
        self.access().is_owner(project, actor).await
    }

    pub async fn is_manager(&self, project: &Name, actor: &Name) -> Result<bool> {
        self.access().is_manager(project, actor).await
    }

    /// Consumes nothing; reads the full committed state.
    pub async fn snapshot(&self) -> Result<LedgerSnapshot> {
        let _writer = self.writer.lock().await;
        Ok(LedgerSnapshot {
            projects: self.store.projects().await?,
            managers: self.store.manager_grants().await?,
            members: self.store.member_entries().await?,
            pending_payments: self.store.pending_payments().await?,
        })
    }

    // Operations

    pub async fn create(&self, project: &Name, owner: &Name, hourly_rate: Option<Money>) -> Result<()> {
        self.execute(Command::Create {
            project: project.clone(),
            owner: owner.clone(),
            hourly_rate,
        })
        .await
    }

    pub async fn add_user(&self, project: &Name, manager: &Name, user: &Name) -> Result<()> {
        self.execute(Command::AddUser {
            project: project.clone(),
            manager: manager.clone(),
            user: user.clone(),
        })
        .await
    }

    pub async fn remove_user(&self, project: &Name, manager: &Name, user: &Name) -> Result<()> {
        self.execute(Command::RemoveUser {
            project: project.clone(),
            manager: manager.clone(),
            user: user.clone(),
        })
        .await
    }

    pub async fn add_manager(&self, project: &Name, owner: &Name, manager: &Name) -> Result<()> {
        self.execute(Command::AddManager {
            project: project.clone(),
            owner: owner.clone(),
            manager: manager.clone(),
        })
        .await
    }

    pub async fn remove_manager(&self, project: &Name, owner: &Name, manager: &Name) -> Result<()> {
        self.execute(Command::RemoveManager {
            project: project.clone(),
            owner: owner.clone(),
            manager: manager.clone(),
        })
        .await
    }

    pub async fn clock_in(&self, project: &Name, user: &Name) -> Result<()> {
        self.execute(Command::ClockIn {
            project: project.clone(),
            user: user.clone(),
        })
        .await
    }

    pub async fn clock_out(&self, project: &Name, user: &Name, description: Option<&str>) -> Result<()> {
        self.execute(Command::ClockOut {
            project: project.clone(),
            user: user.clone(),
            description: description.map(str::to_string),
        })
        .await
    }

    pub async fn add_time(
        &self,
        project: &Name,
        actor: &Name,
        user: &Name,
        seconds: i64,
        description: Option<&str>,
    ) -> Result<()> {
        self.execute(Command::AddTime {
            project: project.clone(),
            actor: actor.clone(),
            user: user.clone(),
            seconds,
            description: description.map(str::to_string),
        })
        .await
    }

    pub async fn approve(
        &self,
        project: &Name,
        manager: &Name,
        user: &Name,
        seconds: Option<i64>,
    ) -> Result<()> {
        self.execute(Command::Approve {
            project: project.clone(),
            manager: manager.clone(),
            user: user.clone(),
            seconds,
        })
        .await
    }

    pub async fn decline(&self, project: &Name, manager: &Name, user: &Name, seconds: i64) -> Result<()> {
        self.execute(Command::Decline {
            project: project.clone(),
            manager: manager.clone(),
            user: user.clone(),
            seconds,
        })
        .await
    }

    pub async fn claim(&self, project: &Name, user: &Name, seconds: Option<i64>) -> Result<()> {
        self.execute(Command::Claim {
            project: project.clone(),
            user: user.clone(),
            seconds,
        })
        .await
    }

    pub async fn set_user_rate(
        &self,
        project: &Name,
        manager: &Name,
        user: &Name,
        hourly_rate: Money,
    ) -> Result<()> {
        self.execute(Command::SetUserRate {
            project: project.clone(),
            manager: manager.clone(),
            user: user.clone(),
            hourly_rate,
        })
        .await
    }

    /// Handles a transfer notification from the token service.
    pub async fn on_deposit(&self, from: &Name, project_tag: &str, amount: Money) -> Result<()> {
        self.execute(Command::Deposit {
            from: from.clone(),
            project_tag: project_tag.to_string(),
            amount,
        })
        .await
    }
}

use super::engine::LedgerEngine;
use crate::config::PayoutWorkflow;
use crate::domain::batch::{SequenceKind, WriteBatch};
use crate::domain::money::{Amount, Money};
use crate::domain::name::Name;
use crate::domain::payment::PaymentInstruction;
use crate::domain::project::{MemberEntry, Project};
use crate::error::{LedgerError, Result};
use tracing::{debug, info};

impl LedgerEngine {
    pub(super) async fn plan_approve(
        &self,
        project: &Name,
        manager: &Name,
        user: &Name,
        seconds: Option<i64>,
    ) -> Result<WriteBatch> {
        self.access()
            .require_manager(project, manager, "only project managers can approve time")
            .await?;
        let mut entry = self.require_member(project, user).await?;
        let approved = entry.approve(seconds)?;

        let mut batch = WriteBatch::new();
        if self.config.workflow == PayoutWorkflow::Direct && approved > 0 {
            let mut payroll = self.require_project(project, "project not found").await?;
            entry.settle(Some(approved))?;
            self.disburse(&mut payroll, &entry, approved, &mut batch)
                .await?;
            batch.put_project(payroll);
        }
        batch.update_member(entry);
        Ok(batch)
    }

    pub(super) async fn plan_decline(
        &self,
        project: &Name,
        manager: &Name,
        user: &Name,
        seconds: i64,
    ) -> Result<WriteBatch> {
        self.access()
            .require_manager(project, manager, "only project managers can decline time")
            .await?;
        let mut entry = self.require_member(project, user).await?;
        entry.decline(seconds)?;
        debug!(%project, %user, seconds, "time declined");

        let mut batch = WriteBatch::new();
        batch.update_member(entry);
        Ok(batch)
    }

    pub(super) async fn plan_claim(
        &self,
        project: &Name,
        user: &Name,
        seconds: Option<i64>,
    ) -> Result<WriteBatch> {
        let mut payroll = self.require_project(project, "project not found").await?;
        let mut entry = self.require_member(project, user).await?;
        payroll.payroll()?;
        let seconds = entry.settle(seconds)?;

        let mut batch = WriteBatch::new();
        self.disburse(&mut payroll, &entry, seconds, &mut batch)
            .await?;
        batch.put_project(payroll).update_member(entry);
        Ok(batch)
    }

    pub(super) async fn plan_set_user_rate(
        &self,
        project: &Name,
        manager: &Name,
        user: &Name,
        hourly_rate: Money,
    ) -> Result<WriteBatch> {
        let payroll = self.require_project(project, "project not found").await?;
        self.access()
            .require_manager(project, manager, "only project managers can set rates")
            .await?;
        let project_rate = payroll.hourly_rate.as_ref().ok_or_else(|| {
            LedgerError::InvalidCurrency(format!("project {project} has no hourly rate"))
        })?;
        Amount::new(hourly_rate.amount()).map_err(|_| {
            LedgerError::InvalidCurrency("hourly rate must be positive".to_string())
        })?;
        project_rate.ensure_same_currency(hourly_rate.currency())?;

        let mut entry = self.require_member(project, user).await?;
        info!(%project, %user, rate = %hourly_rate, "member rate set");
        entry.hourly_rate = Some(hourly_rate);

        let mut batch = WriteBatch::new();
        batch.update_member(entry);
        Ok(batch)
    }

    /// Debits the pay for `seconds` from `payroll` and queues the payment.
    ///
    /// A payment that rounds to zero debits nothing and queues nothing.
    async fn disburse(
        &self,
        payroll: &mut Project,
        entry: &MemberEntry,
        seconds: i64,
        batch: &mut WriteBatch,
    ) -> Result<()> {
        payroll.payroll()?;
        let rate = entry
            .effective_rate(payroll)
            .cloned()
            .ok_or_else(|| LedgerError::Unclaimable(format!("project {} has no hourly rate", payroll.name)))?;
        let amount = rate.prorate(seconds)?;
        if amount.is_zero() {
            debug!(project = %payroll.name, user = %entry.user, seconds, "payment rounds to zero");
            return Ok(());
        }
        payroll.debit(&amount)?;

        let id = self.store.next_id(SequenceKind::Payment).await?;
        info!(
            project = %payroll.name,
            user = %entry.user,
            seconds,
            %amount,
            payment = id,
            "payment queued"
        );
        batch.enqueue_payment(PaymentInstruction {
            id,
            project: payroll.name.clone(),
            recipient: entry.user.clone(),
            amount,
            memo: self.config.payment_memo.clone(),
        });
        Ok(())
    }
}

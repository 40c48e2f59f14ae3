use super::engine::LedgerEngine;
use crate::domain::batch::WriteBatch;
use crate::domain::money::{Amount, Money};
use crate::domain::name::Name;
use crate::error::{LedgerError, Result};
use tracing::{debug, info};

impl LedgerEngine {
    /// Credits a project's balance from an incoming transfer.
    ///
    /// The transfer memo is the project tag. Transfers sent by the ledger's
    /// own account are its outbound payments echoing back and are ignored.
    pub(super) async fn plan_deposit(
        &self,
        from: &Name,
        project_tag: &str,
        amount: Money,
    ) -> Result<WriteBatch> {
        if *from == self.config.ledger_account {
            debug!(%from, "ignoring transfer from the ledger account");
            return Ok(WriteBatch::new());
        }

        let project = project_tag
            .trim()
            .parse::<Name>()
            .map_err(|_| LedgerError::NotFound(format!("no project tagged '{project_tag}'")))?;
        let mut payroll = self
            .require_project(&project, "deposit tagged with an unknown project")
            .await?;
        self.access()
            .require_manager(&project, from, "only project managers can fund a project")
            .await?;
        Amount::new(amount.amount())?;
        if let Some(balance) = &payroll.balance {
            balance.ensure_same_currency(amount.currency())?;
        }
        payroll.credit(&amount)?;
        info!(%project, %from, %amount, "deposit credited");

        let mut batch = WriteBatch::new();
        batch.put_project(payroll);
        Ok(batch)
    }
}

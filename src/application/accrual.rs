use super::engine::LedgerEngine;
use crate::config::ManualTimeAuthority;
use crate::domain::batch::WriteBatch;
use crate::domain::name::Name;
use crate::domain::time::Timestamp;
use crate::error::{LedgerError, Result};
use tracing::{debug, info};

impl LedgerEngine {
    /// Clocking in again while already in restarts the interval; the earlier
    /// open interval is discarded.
    pub(super) async fn plan_clock_in(
        &self,
        now: Timestamp,
        project: &Name,
        user: &Name,
    ) -> Result<WriteBatch> {
        if !now.is_set() {
            return Err(LedgerError::PreconditionFailed(
                "the clock reads the epoch".to_string(),
            ));
        }
        let mut entry = self.require_member(project, user).await?;
        if entry.is_clocked_in() {
            debug!(%project, %user, since = %entry.last_clock, "discarding open interval");
        }
        entry.clock_in(now);

        let mut batch = WriteBatch::new();
        batch.update_member(entry);
        Ok(batch)
    }

    pub(super) async fn plan_clock_out(
        &self,
        now: Timestamp,
        project: &Name,
        user: &Name,
        description: Option<&str>,
    ) -> Result<WriteBatch> {
        let mut entry = self.require_member(project, user).await?;
        let elapsed = entry.clock_out(now)?;
        info!(%project, %user, seconds = elapsed, description, "clocked out");

        let mut batch = WriteBatch::new();
        batch.update_member(entry);
        Ok(batch)
    }

    pub(super) async fn plan_add_time(
        &self,
        project: &Name,
        actor: &Name,
        user: &Name,
        seconds: i64,
        description: Option<&str>,
    ) -> Result<WriteBatch> {
        if seconds <= 0 {
            return Err(LedgerError::PreconditionFailed(
                "seconds must be positive".to_string(),
            ));
        }

        match self.config.manual_time {
            ManualTimeAuthority::SelfReported => {
                if actor != user {
                    return Err(LedgerError::Unauthorized(
                        "users can only add time for themselves".to_string(),
                    ));
                }
            }
            ManualTimeAuthority::Manager => {
                self.access()
                    .require_manager(project, actor, "only project managers can add time")
                    .await?;
            }
        }

        let mut entry = self.require_member(project, user).await?;
        entry.accrue(seconds)?;
        info!(%project, %user, %actor, seconds, description, "time added");

        let mut batch = WriteBatch::new();
        batch.update_member(entry);
        Ok(batch)
    }
}

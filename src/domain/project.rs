use crate::domain::money::Money;
use crate::domain::name::{Name, PairKey};
use crate::domain::time::Timestamp;
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};

/// A project and its payroll float.
///
/// `balance` is present exactly when `hourly_rate` is, and always in the
/// rate's currency. Projects without a rate track time but cannot pay out.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Project {
    pub name: Name,
    pub hourly_rate: Option<Money>,
    pub balance: Option<Money>,
}

impl Project {
    pub fn new(name: Name, hourly_rate: Option<Money>) -> Self {
        let balance = hourly_rate
            .as_ref()
            .map(|rate| Money::zero(rate.currency().clone()));
        Self {
            name,
            hourly_rate,
            balance,
        }
    }

    /// The configured rate and balance, or `Unclaimable` if the project has none.
    pub fn payroll(&self) -> Result<(&Money, &Money), LedgerError> {
        match (&self.hourly_rate, &self.balance) {
            (Some(rate), Some(balance)) => Ok((rate, balance)),
            _ => Err(LedgerError::Unclaimable(format!(
                "project {} has no hourly rate",
                self.name
            ))),
        }
    }

    /// Adds a deposit to the balance.
    pub fn credit(&mut self, amount: &Money) -> Result<(), LedgerError> {
        let balance = self.balance.as_ref().ok_or_else(|| {
            LedgerError::InvalidCurrency(format!(
                "project {} has no currency configured",
                self.name
            ))
        })?;
        self.balance = Some(balance.checked_add(amount)?);
        Ok(())
    }

    /// Removes a payout from the balance if it is covered.
    pub fn debit(&mut self, amount: &Money) -> Result<(), LedgerError> {
        let (_, balance) = self.payroll()?;
        let remaining = balance.checked_sub(amount).map_err(|err| match err {
            LedgerError::InsufficientFunds(_) => LedgerError::InsufficientFunds(format!(
                "project {} holds {balance}, payment needs {amount}",
                self.name
            )),
            other => other,
        })?;
        self.balance = Some(remaining);
        Ok(())
    }
}

/// Manager (or owner) authority over a project.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ManagerGrant {
    pub id: u64,
    pub project: Name,
    pub manager: Name,
    pub is_owner: bool,
}

impl ManagerGrant {
    pub fn new(id: u64, project: Name, manager: Name, is_owner: bool) -> Self {
        Self {
            id,
            project,
            manager,
            is_owner,
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(&self.manager, &self.project)
    }
}

/// A user's membership in a project and their accrued time.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct MemberEntry {
    pub id: u64,
    pub project: Name,
    pub user: Name,
    /// Seconds accrued but not yet approved.
    pub pending: i64,
    /// Seconds approved but not yet paid.
    pub approved: i64,
    /// Start of the open clock interval, or `Timestamp::UNSET`.
    pub last_clock: Timestamp,
    /// Overrides the project rate when set.
    #[serde(default)]
    pub hourly_rate: Option<Money>,
}

impl MemberEntry {
    pub fn new(id: u64, project: Name, user: Name) -> Self {
        Self {
            id,
            project,
            user,
            pending: 0,
            approved: 0,
            last_clock: Timestamp::UNSET,
            hourly_rate: None,
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(&self.user, &self.project)
    }

    pub fn is_clocked_in(&self) -> bool {
        self.last_clock.is_set()
    }

    /// Opens a clock interval at `now`, replacing any interval already open.
    pub fn clock_in(&mut self, now: Timestamp) {
        self.last_clock = now;
    }

    /// Closes the open interval and adds its length to `pending`.
    pub fn clock_out(&mut self, now: Timestamp) -> Result<i64, LedgerError> {
        if !self.is_clocked_in() {
            return Err(LedgerError::PreconditionFailed(
                "must clock in first".to_string(),
            ));
        }
        let elapsed = now.seconds_since(self.last_clock);
        if elapsed <= 0 {
            return Err(LedgerError::PreconditionFailed(
                "time too small to account".to_string(),
            ));
        }
        self.accrue(elapsed)?;
        self.last_clock = Timestamp::UNSET;
        Ok(elapsed)
    }

    pub fn accrue(&mut self, seconds: i64) -> Result<(), LedgerError> {
        if seconds <= 0 {
            return Err(LedgerError::PreconditionFailed(
                "seconds must be positive".to_string(),
            ));
        }
        self.pending = self.pending.checked_add(seconds).ok_or_else(|| {
            LedgerError::PreconditionFailed("pending time overflows".to_string())
        })?;
        Ok(())
    }

    /// Moves `seconds` (default: everything pending) to approved.
    pub fn approve(&mut self, seconds: Option<i64>) -> Result<i64, LedgerError> {
        let seconds = portion(seconds, self.pending, "approve", "pending")?;
        let approved = self.approved.checked_add(seconds).ok_or_else(|| {
            LedgerError::PreconditionFailed("approved time overflows".to_string())
        })?;
        self.pending -= seconds;
        self.approved = approved;
        Ok(seconds)
    }

    /// Writes `seconds` off pending without approving them.
    pub fn decline(&mut self, seconds: i64) -> Result<(), LedgerError> {
        let seconds = portion(Some(seconds), self.pending, "decline", "pending")?;
        self.pending -= seconds;
        Ok(())
    }

    /// Removes `seconds` (default: everything approved) from approved for payout.
    pub fn settle(&mut self, seconds: Option<i64>) -> Result<i64, LedgerError> {
        if seconds.is_none() && self.approved == 0 {
            return Err(LedgerError::PreconditionFailed(
                "no approved time to claim".to_string(),
            ));
        }
        let seconds = portion(seconds, self.approved, "claim", "approved")?;
        self.approved -= seconds;
        Ok(seconds)
    }

    /// The rate this member is paid at: their override, else the project's.
    pub fn effective_rate<'a>(&'a self, project: &'a Project) -> Option<&'a Money> {
        self.hourly_rate.as_ref().or(project.hourly_rate.as_ref())
    }
}

/// Resolves an optional request against what is available: `None` takes all,
/// `Some(n)` requires `0 < n <= available`.
fn portion(
    requested: Option<i64>,
    available: i64,
    action: &str,
    counter: &str,
) -> Result<i64, LedgerError> {
    match requested {
        None => Ok(available),
        Some(n) if n > 0 && n <= available => Ok(n),
        Some(n) => Err(LedgerError::PreconditionFailed(format!(
            "0 < {action} <= {counter} ({n} requested, {available} {counter})"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn usd(s: &str) -> Money {
        format!("{s} USD@token").parse().unwrap()
    }

    fn member() -> MemberEntry {
        MemberEntry::new(0, name("proj"), name("alice"))
    }

    #[test]
    fn test_project_balance_follows_rate() {
        let rated = Project::new(name("proj"), Some(usd("10.0000")));
        assert_eq!(rated.balance, Some(usd("0.0000")));

        let unrated = Project::new(name("proj"), None);
        assert_eq!(unrated.balance, None);
        assert!(matches!(unrated.payroll(), Err(LedgerError::Unclaimable(_))));
    }

    #[test]
    fn test_project_credit_and_debit() {
        let mut project = Project::new(name("proj"), Some(usd("10.0000")));
        project.credit(&usd("25.0000")).unwrap();
        project.debit(&usd("5.0000")).unwrap();
        assert_eq!(project.balance.as_ref().unwrap().amount(), dec!(20));

        let result = project.debit(&usd("20.0001"));
        assert!(matches!(result, Err(LedgerError::InsufficientFunds(_))));
        assert_eq!(project.balance.as_ref().unwrap().amount(), dec!(20));
    }

    #[test]
    fn test_project_credit_without_currency() {
        let mut project = Project::new(name("proj"), None);
        assert!(matches!(
            project.credit(&usd("1.0000")),
            Err(LedgerError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn test_clock_cycle_accrues_elapsed() {
        let mut entry = member();
        entry.clock_in(Timestamp::from_secs(1_000));
        assert!(entry.is_clocked_in());

        let elapsed = entry.clock_out(Timestamp::from_secs(8_200)).unwrap();
        assert_eq!(elapsed, 7_200);
        assert_eq!(entry.pending, 7_200);
        assert_eq!(entry.last_clock, Timestamp::UNSET);
    }

    #[test]
    fn test_clock_out_requires_clock_in() {
        let mut entry = member();
        assert!(matches!(
            entry.clock_out(Timestamp::from_secs(10)),
            Err(LedgerError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn test_clock_out_rejects_zero_interval() {
        let mut entry = member();
        entry.clock_in(Timestamp::from_secs(10));
        assert!(matches!(
            entry.clock_out(Timestamp::from_secs(10)),
            Err(LedgerError::PreconditionFailed(_))
        ));
        // Still clocked in after the rejection.
        assert!(entry.is_clocked_in());
        assert_eq!(entry.pending, 0);
    }

    #[test]
    fn test_approve_partial_then_rest() {
        let mut entry = member();
        entry.accrue(5 * 3600).unwrap();

        assert_eq!(entry.approve(Some(3600)).unwrap(), 3600);
        assert_eq!((entry.pending, entry.approved), (4 * 3600, 3600));

        assert_eq!(entry.approve(None).unwrap(), 4 * 3600);
        assert_eq!((entry.pending, entry.approved), (0, 5 * 3600));
    }

    #[test]
    fn test_approve_bounds() {
        let mut entry = member();
        entry.accrue(60).unwrap();
        assert!(entry.approve(Some(0)).is_err());
        assert!(entry.approve(Some(-5)).is_err());
        assert!(entry.approve(Some(61)).is_err());
        assert_eq!((entry.pending, entry.approved), (60, 0));
    }

    #[test]
    fn test_decline_writes_off_pending() {
        let mut entry = member();
        entry.accrue(100).unwrap();
        entry.decline(40).unwrap();
        assert_eq!((entry.pending, entry.approved), (60, 0));
        assert!(entry.decline(61).is_err());
    }

    #[test]
    fn test_settle_requires_approved_time() {
        let mut entry = member();
        assert!(matches!(
            entry.settle(None),
            Err(LedgerError::PreconditionFailed(_))
        ));
        entry.accrue(100).unwrap();
        entry.approve(None).unwrap();
        assert_eq!(entry.settle(Some(30)).unwrap(), 30);
        assert_eq!(entry.settle(None).unwrap(), 70);
        assert_eq!(entry.approved, 0);
    }

    #[test]
    fn test_effective_rate_prefers_override() {
        let project = Project::new(name("proj"), Some(usd("10.0000")));
        let mut entry = member();
        assert_eq!(entry.effective_rate(&project), Some(&usd("10.0000")));

        entry.hourly_rate = Some(usd("12.5000"));
        assert_eq!(entry.effective_rate(&project), Some(&usd("12.5000")));
    }
}

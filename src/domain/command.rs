use crate::domain::money::Money;
use crate::domain::name::Name;

/// One ledger operation, as invoked by an already-authenticated actor.
///
/// The acting identity is always the role parameter of the variant: the
/// `owner` of `Create`, the `manager` of `AddUser`, the `user` of `ClockIn`,
/// the `from` of `Deposit` and so on.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create {
        project: Name,
        owner: Name,
        hourly_rate: Option<Money>,
    },
    AddUser {
        project: Name,
        manager: Name,
        user: Name,
    },
    RemoveUser {
        project: Name,
        manager: Name,
        user: Name,
    },
    AddManager {
        project: Name,
        owner: Name,
        manager: Name,
    },
    RemoveManager {
        project: Name,
        owner: Name,
        manager: Name,
    },
    ClockIn {
        project: Name,
        user: Name,
    },
    ClockOut {
        project: Name,
        user: Name,
        description: Option<String>,
    },
    AddTime {
        project: Name,
        actor: Name,
        user: Name,
        seconds: i64,
        description: Option<String>,
    },
    Approve {
        project: Name,
        manager: Name,
        user: Name,
        seconds: Option<i64>,
    },
    Decline {
        project: Name,
        manager: Name,
        user: Name,
        seconds: i64,
    },
    Claim {
        project: Name,
        user: Name,
        seconds: Option<i64>,
    },
    SetUserRate {
        project: Name,
        manager: Name,
        user: Name,
        hourly_rate: Money,
    },
    /// Incoming transfer notification from the token service.
    Deposit {
        from: Name,
        project_tag: String,
        amount: Money,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::AddUser { .. } => "add_user",
            Command::RemoveUser { .. } => "remove_user",
            Command::AddManager { .. } => "add_manager",
            Command::RemoveManager { .. } => "remove_manager",
            Command::ClockIn { .. } => "clock_in",
            Command::ClockOut { .. } => "clock_out",
            Command::AddTime { .. } => "add_time",
            Command::Approve { .. } => "approve",
            Command::Decline { .. } => "decline",
            Command::Claim { .. } => "claim",
            Command::SetUserRate { .. } => "set_user_rate",
            Command::Deposit { .. } => "deposit",
        }
    }
}

use crate::domain::command::Command;
use crate::domain::money::Money;
use crate::domain::name::Name;
use crate::domain::time::Timestamp;
use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Create,
    AddUser,
    RemoveUser,
    AddManager,
    RemoveManager,
    ClockIn,
    ClockOut,
    AddTime,
    Approve,
    Decline,
    Claim,
    SetUserRate,
    Deposit,
}

/// One row of a command stream.
///
/// `actor` is whoever performs the operation, `user` whoever it is applied
/// to. For `deposit`, `actor` is the sender and `memo` the project tag.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub op: OpKind,
    #[serde(default)]
    pub at: Option<i64>,
    #[serde(default)]
    pub project: Option<Name>,
    #[serde(default)]
    pub actor: Option<Name>,
    #[serde(default)]
    pub user: Option<Name>,
    #[serde(default)]
    pub seconds: Option<i64>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// A command and the time the replay clock should show when it runs.
#[derive(Debug, PartialEq, Clone)]
pub struct ScheduledCommand {
    pub at: Option<Timestamp>,
    pub command: Command,
}

fn required<T>(value: Option<T>, op: OpKind, column: &str) -> Result<T> {
    value.ok_or_else(|| LedgerError::Parse(format!("{op:?} requires the '{column}' column")))
}

fn money(value: Option<String>, op: OpKind) -> Result<Option<Money>> {
    value.map(|q| q.parse::<Money>()).transpose().map_err(|err| match err {
        LedgerError::Parse(msg) => LedgerError::Parse(format!("{op:?}: {msg}")),
        other => other,
    })
}

impl TryFrom<CommandRecord> for ScheduledCommand {
    type Error = LedgerError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let op = record.op;
        let project = || required(record.project.clone(), op, "project");
        let actor = || required(record.actor.clone(), op, "actor");
        let user = || required(record.user.clone(), op, "user");
        // Self-service operations name the subject in either column.
        let subject = || required(record.user.clone().or_else(|| record.actor.clone()), op, "user");

        let command = match op {
            OpKind::Create => Command::Create {
                project: project()?,
                owner: actor()?,
                hourly_rate: money(record.quantity.clone(), op)?,
            },
            OpKind::AddUser => Command::AddUser {
                project: project()?,
                manager: actor()?,
                user: user()?,
            },
            OpKind::RemoveUser => Command::RemoveUser {
                project: project()?,
                manager: actor()?,
                user: user()?,
            },
            OpKind::AddManager => Command::AddManager {
                project: project()?,
                owner: actor()?,
                manager: user()?,
            },
            OpKind::RemoveManager => Command::RemoveManager {
                project: project()?,
                owner: actor()?,
                manager: user()?,
            },
            OpKind::ClockIn => Command::ClockIn {
                project: project()?,
                user: subject()?,
            },
            OpKind::ClockOut => Command::ClockOut {
                project: project()?,
                user: subject()?,
                description: record.memo.clone(),
            },
            OpKind::AddTime => Command::AddTime {
                project: project()?,
                actor: actor()?,
                user: subject()?,
                seconds: required(record.seconds, op, "seconds")?,
                description: record.memo.clone(),
            },
            OpKind::Approve => Command::Approve {
                project: project()?,
                manager: actor()?,
                user: user()?,
                seconds: record.seconds,
            },
            OpKind::Decline => Command::Decline {
                project: project()?,
                manager: actor()?,
                user: user()?,
                seconds: required(record.seconds, op, "seconds")?,
            },
            OpKind::Claim => Command::Claim {
                project: project()?,
                user: subject()?,
                seconds: record.seconds,
            },
            OpKind::SetUserRate => Command::SetUserRate {
                project: project()?,
                manager: actor()?,
                user: user()?,
                hourly_rate: required(money(record.quantity.clone(), op)?, op, "quantity")?,
            },
            OpKind::Deposit => Command::Deposit {
                from: actor()?,
                project_tag: record
                    .memo
                    .clone()
                    .or_else(|| record.project.as_ref().map(|p| p.to_string()))
                    .unwrap_or_default(),
                amount: required(money(record.quantity.clone(), op)?, op, "quantity")?,
            },
        };

        Ok(Self {
            at: record.at.map(Timestamp::from_secs),
            command,
        })
    }
}

/// Reads ledger commands from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record
/// lengths, so trailing optional columns may be left off.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and converts rows, one result per row.
    pub fn commands(self) -> impl Iterator<Item = Result<ScheduledCommand>> {
        self.reader.into_deserialize::<CommandRecord>().map(|result| {
            result
                .map_err(LedgerError::from)
                .and_then(ScheduledCommand::try_from)
        })
    }
}

use crate::domain::payment::PaymentInstruction;
use crate::domain::project::{MemberEntry, Project};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct ProjectRow<'a> {
    project: &'a str,
    hourly_rate: String,
    balance: String,
}

#[derive(Serialize)]
struct MemberRow<'a> {
    project: &'a str,
    user: &'a str,
    pending: i64,
    approved: i64,
    clocked_in: bool,
}

#[derive(Serialize)]
struct PaymentRow<'a> {
    recipient: &'a str,
    amount: String,
    memo: &'a str,
}

/// Writes ledger state as CSV sections separated by blank lines.
pub struct StateWriter<W: Write> {
    out: W,
}

impl<W: Write> StateWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn section<T: Serialize>(&mut self, rows: impl IntoIterator<Item = T>, header: &[&str]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut self.out);
        writer.write_record(header)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_projects(&mut self, projects: &[Project]) -> Result<()> {
        let rows = projects.iter().map(|p| ProjectRow {
            project: p.name.as_str(),
            hourly_rate: p.hourly_rate.as_ref().map(ToString::to_string).unwrap_or_default(),
            balance: p.balance.as_ref().map(ToString::to_string).unwrap_or_default(),
        });
        self.section(rows, &["project", "hourly_rate", "balance"])
    }

    pub fn write_members(&mut self, members: &[MemberEntry]) -> Result<()> {
        let rows = members.iter().map(|m| MemberRow {
            project: m.project.as_str(),
            user: m.user.as_str(),
            pending: m.pending,
            approved: m.approved,
            clocked_in: m.is_clocked_in(),
        });
        self.section(rows, &["project", "user", "pending", "approved", "clocked_in"])
    }

    pub fn write_payments(&mut self, payments: &[PaymentInstruction]) -> Result<()> {
        let rows = payments.iter().map(|p| PaymentRow {
            recipient: p.recipient.as_str(),
            amount: p.amount.to_string(),
            memo: &p.memo,
        });
        self.section(rows, &["recipient", "amount", "memo"])
    }

    /// Projects, then members, then payments.
    pub fn write_state(
        &mut self,
        projects: &[Project],
        members: &[MemberEntry],
        payments: &[PaymentInstruction],
    ) -> Result<()> {
        self.write_projects(projects)?;
        writeln!(self.out)?;
        self.write_members(members)?;
        writeln!(self.out)?;
        self.write_payments(payments)?;
        self.out.flush()?;
        Ok(())
    }
}

use anyhow::Result;
use chrono::NaiveDate;

use crate::commands::contacts::{print_upcoming, upcoming};
use crate::contact::ContactRecord;
use crate::scheduler::{MessageStatus, ScheduledMessage};
use crate::store::Repository;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub contacts: usize,
    pub pending: usize,
    pub sent: usize,
    pub failed: usize,
}

pub fn collect_stats<C, S>(contacts: &C, schedule: &S) -> Result<Stats>
where
    C: Repository<ContactRecord>,
    S: Repository<ScheduledMessage>,
{
    let mut stats = Stats { contacts: contacts.list()?.len(), ..Default::default() };
    for message in schedule.list()? {
        match message.status {
            MessageStatus::Pending => stats.pending += 1,
            MessageStatus::Sent => stats.sent += 1,
            MessageStatus::Failed => stats.failed += 1,
        }
    }
    Ok(stats)
}

pub fn show<C, S>(contacts: &C, schedule: &S, today: NaiveDate, days: u32) -> Result<()>
where
    C: Repository<ContactRecord>,
    S: Repository<ScheduledMessage>,
{
    let stats = collect_stats(contacts, schedule)?;
    println!("Total Contacts: {}", stats.contacts);
    println!("Messages Sent:  {} ({} pending, {} failed)", stats.sent, stats.pending, stats.failed);
    println!();
    print_upcoming(&upcoming(contacts, today, days)?, days);
    Ok(())
}

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use log::info;
use std::fs::File;
use std::path::Path;

use crate::cli::ContactActions;
use crate::commands::resolve_id;
use crate::contact::{Contact, ContactRecord, sample_contacts};
use crate::csv_import::{self, ImportSummary, Upload};
use crate::scheduler::{UpcomingEvent, upcoming_events};
use crate::store::Repository;

pub fn handle<R: Repository<ContactRecord>>(action: ContactActions, repo: &mut R) -> Result<()> {
    match action {
        ContactActions::List => list_contacts(repo),
        ContactActions::Add { name, email, date, kind, phone } => {
            let contact =
                Contact::new(name.trim(), email.trim(), phone.trim(), kind.into(), date.trim());
            let record = add_contact(repo, contact)?;
            println!("Contact added successfully! ({})", short_id(&record));
            Ok(())
        }
        ContactActions::Remove { id } => {
            let removed = remove_contact(repo, &id)?;
            println!("Contact '{}' has been removed successfully.", removed.contact.name);
            Ok(())
        }
        ContactActions::Import { file } => {
            let summary = import_file(repo, &file)?;
            println!("{}", summary);
            Ok(())
        }
        ContactActions::Demo { output } => {
            let path = csv_import::write_demo_csv(&output)?;
            println!("Demo CSV written to {}", path.display());
            println!("Use this file as a template for your contacts import.");
            Ok(())
        }
        ContactActions::Export { file } => {
            let count = export_file(repo, &file)?;
            println!("Exported {} contact(s) to {}", count, file.display());
            Ok(())
        }
        ContactActions::Seed => {
            let count = seed_contacts(repo)?;
            println!("Added {} sample contact(s)", count);
            Ok(())
        }
        ContactActions::Upcoming { days } => {
            let events = upcoming(repo, Local::now().date_naive(), days)?;
            print_upcoming(&events, days);
            Ok(())
        }
    }
}

fn short_id(record: &ContactRecord) -> String {
    record.id.to_string()[..8].to_string()
}

pub fn list_contacts<R: Repository<ContactRecord>>(repo: &R) -> Result<()> {
    let records = repo.list()?;
    if records.is_empty() {
        println!("No contacts yet. Add one or import a CSV file.");
        return Ok(());
    }

    println!("Contacts:");
    for record in &records {
        let c = &record.contact;
        let phone = if c.phone.is_empty() { "-" } else { c.phone.as_str() };
        println!(
            "  {}  {:<24} {:<28} {:<14} {:<11} {}",
            short_id(record),
            c.name,
            c.email,
            phone,
            c.kind,
            c.date
        );
    }
    Ok(())
}

pub fn add_contact<R: Repository<ContactRecord>>(
    repo: &mut R,
    contact: Contact,
) -> Result<ContactRecord> {
    contact.validate()?;
    let record = ContactRecord::new(contact);
    repo.add(record.clone())?;
    info!("Added contact {} ({})", record.contact.name, record.id);
    Ok(record)
}

pub fn remove_contact<R: Repository<ContactRecord>>(
    repo: &mut R,
    raw_id: &str,
) -> Result<ContactRecord> {
    let id = resolve_id(&repo.list()?, raw_id)?;
    repo.remove(id)?.ok_or_else(|| anyhow!("Contact '{}' not found", raw_id))
}

/// Import a CSV file from disk into the repository
pub fn import_file<R: Repository<ContactRecord>>(
    repo: &mut R,
    path: &Path,
) -> Result<ImportSummary> {
    let upload = Upload::from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let summary = csv_import::import_upload(&upload, |contacts| {
        repo.add_all(contacts.into_iter().map(ContactRecord::new).collect())
    })?;
    Ok(summary)
}

pub fn export_file<R: Repository<ContactRecord>>(repo: &R, path: &Path) -> Result<usize> {
    let contacts: Vec<Contact> = repo.list()?.into_iter().map(|r| r.contact).collect();
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    csv_import::export_contacts(file, &contacts)?;
    Ok(contacts.len())
}

pub fn seed_contacts<R: Repository<ContactRecord>>(repo: &mut R) -> Result<usize> {
    let records: Vec<ContactRecord> =
        sample_contacts().into_iter().map(ContactRecord::new).collect();
    let count = records.len();
    repo.add_all(records)?;
    Ok(count)
}

pub fn upcoming<R: Repository<ContactRecord>>(
    repo: &R,
    today: NaiveDate,
    days: u32,
) -> Result<Vec<UpcomingEvent>> {
    let contacts: Vec<Contact> = repo.list()?.into_iter().map(|r| r.contact).collect();
    Ok(upcoming_events(&contacts, today, days))
}

fn days_left_label(days_left: i64) -> String {
    match days_left {
        0 => "today".to_string(),
        1 => "1 day".to_string(),
        n => format!("{} days", n),
    }
}

pub fn print_upcoming(events: &[UpcomingEvent], days: u32) {
    if events.is_empty() {
        println!("No celebrations in the next {} days.", days);
        return;
    }

    println!("Upcoming Events (next {} days):", days);
    for event in events {
        println!(
            "  {:<24} {:<11} {}  {}",
            event.name,
            event.kind,
            event.date.format("%b %d"),
            days_left_label(event.days_left)
        );
    }
}

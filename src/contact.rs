use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::store::Record;

const CONTACTS_FILE: &str = "contacts.json";

/// Kind of celebration a contact is tracked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[default]
    Birthday,
    Anniversary,
}

impl EventKind {
    /// Classify a raw CSV `type` cell.
    ///
    /// Only the exact literal `anniversary` maps to [`EventKind::Anniversary`].
    /// Anything else, including `Anniversary`, typos and empty cells, is a birthday.
    pub fn from_csv_token(token: &str) -> Self {
        if token == "anniversary" {
            EventKind::Anniversary
        } else {
            EventKind::Birthday
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Birthday => "birthday",
            EventKind::Anniversary => "anniversary",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "type", default)]
    pub kind: EventKind,
    pub date: String,
}

impl Contact {
    pub fn new(name: &str, email: &str, phone: &str, kind: EventKind, date: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            kind,
            date: date.to_string(),
        }
    }

    /// Names of the required fields that are empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_empty() {
            missing.push("name");
        }
        if self.email.is_empty() {
            missing.push("email");
        }
        if self.date.is_empty() {
            missing.push("date");
        }
        missing
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(anyhow!(
                "Please fill in all required fields (missing: {})",
                missing.join(", ")
            ));
        }
        Ok(())
    }

    /// The celebration date as a calendar date, if `date` is `YYYY-MM-DD`
    pub fn event_date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|e| anyhow!("Invalid date '{}' for {}: {}", self.date, self.name, e))
    }
}

/// A contact as kept in the contact book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub contact: Contact,
}

impl ContactRecord {
    pub fn new(contact: Contact) -> Self {
        Self { id: Uuid::new_v4(), contact }
    }
}

impl Record for ContactRecord {
    fn id(&self) -> Uuid {
        self.id
    }

    fn filename() -> &'static str {
        CONTACTS_FILE
    }
}

/// The mock contact list the dashboard starts with
pub fn sample_contacts() -> Vec<Contact> {
    vec![
        Contact::new(
            "Sarah Johnson",
            "sarah@example.com",
            "+1234567890",
            EventKind::Birthday,
            "1990-06-15",
        ),
        Contact::new(
            "Mike & Emma",
            "mike.emma@example.com",
            "+1234567891",
            EventKind::Anniversary,
            "2018-06-18",
        ),
        Contact::new(
            "David Chen",
            "david@example.com",
            "+1234567892",
            EventKind::Birthday,
            "1985-06-22",
        ),
    ]
}

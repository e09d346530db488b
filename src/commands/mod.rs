use anyhow::{Result, anyhow};
use uuid::Uuid;

use crate::store::Record;

pub mod config;
pub mod contacts;
pub mod dashboard;
pub mod integration;
pub mod schedule;
pub mod templates;

/// Resolve a full id or a unique id prefix against `items`
pub fn resolve_id<T: Record>(items: &[T], raw: &str) -> Result<Uuid> {
    let needle = raw.trim().to_lowercase();
    if let Ok(id) = Uuid::parse_str(&needle) {
        return Ok(id);
    }
    if needle.is_empty() {
        return Err(anyhow!("No id provided"));
    }

    let matches: Vec<Uuid> = items
        .iter()
        .map(|item| item.id())
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(anyhow!("No item with id '{}'", raw)),
        _ => Err(anyhow!("Id prefix '{}' is ambiguous ({} matches)", raw, matches.len())),
    }
}

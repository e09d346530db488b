use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contact::EventKind;
use crate::store::Record;

const TEMPLATES_FILE: &str = "templates.json";
pub const NAME_PLACEHOLDER: &str = "{{name}}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl MessageTemplate {
    pub fn new(name: &str, kind: EventKind, message: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
            message: message.to_string(),
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.message.trim().is_empty() {
            return Err(anyhow!("Template name and message are required"));
        }
        if !self.message.contains(NAME_PLACEHOLDER) {
            log::warn!("Template '{}' does not use {}", self.name, NAME_PLACEHOLDER);
        }
        Ok(())
    }

    /// Fill every `{{name}}` placeholder with the recipient's name
    pub fn render(&self, contact_name: &str) -> String {
        self.message.replace(NAME_PLACEHOLDER, contact_name)
    }
}

impl Record for MessageTemplate {
    fn id(&self) -> Uuid {
        self.id
    }

    fn filename() -> &'static str {
        TEMPLATES_FILE
    }
}

pub fn default_templates() -> Vec<MessageTemplate> {
    vec![
        MessageTemplate::new(
            "Birthday Wishes",
            EventKind::Birthday,
            "Happy Birthday {{name}}! 🎉 Wishing you a fantastic year ahead filled with joy and success!",
        ),
        MessageTemplate::new(
            "Anniversary Celebration",
            EventKind::Anniversary,
            "Happy Anniversary {{name}}! 💕 Celebrating your special day and wishing you many more years of happiness together!",
        ),
    ]
}

/// First active template for the given kind
pub fn pick_template(templates: &[MessageTemplate], kind: EventKind) -> Option<&MessageTemplate> {
    templates.iter().find(|t| t.is_active && t.kind == kind)
}

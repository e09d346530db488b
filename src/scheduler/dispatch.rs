//! Delivery of due messages.
//
// The original dashboard only flipped a status flag; delivery here is a seam
// with a logging implementation and one that posts to a spreadsheet webhook.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use super::{ScheduledMessage, SchedulerError};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn deliver(&self, message: &ScheduledMessage) -> Result<(), SchedulerError>;
}

/// Records the send in the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    async fn deliver(&self, message: &ScheduledMessage) -> Result<(), SchedulerError> {
        info!("{} message sent to {}: {}", message.kind, message.contact_name, message.message);
        Ok(())
    }
}

/// Row appended by the Apps Script `doPost` handler
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    name: &'a str,
    email: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    date: &'a str,
    message: &'a str,
}

impl<'a> From<&'a ScheduledMessage> for WebhookPayload<'a> {
    fn from(message: &'a ScheduledMessage) -> Self {
        Self {
            name: &message.contact_name,
            email: &message.email,
            kind: message.kind.as_str(),
            date: &message.date,
            message: &message.message,
        }
    }
}

/// Posts each message as JSON to a Google Apps Script web app
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: Client,
    url: Url,
}

impl WebhookDispatcher {
    pub fn new(url: Url) -> Result<Self, SchedulerError> {
        let client = Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Dispatcher for WebhookDispatcher {
    async fn deliver(&self, message: &ScheduledMessage) -> Result<(), SchedulerError> {
        debug!("Posting message {} to {}", message.id, self.url);
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload::from(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SchedulerError::Rejected { status: status.as_u16(), body });
        }

        info!("{} message for {} delivered to webhook", message.kind, message.contact_name);
        Ok(())
    }
}

use anyhow::{Result, anyhow};
use chrono::Local;
use std::path::Path;

use crate::cli::IntegrationActions;
use crate::config::Config;
use crate::contact::EventKind;
use crate::integration::{print_instructions, validate_webhook_url};
use crate::scheduler::{Dispatcher, ScheduledMessage, WebhookDispatcher};

pub async fn handle(
    action: IntegrationActions,
    config: &mut Config,
    config_path: &Path,
) -> Result<()> {
    match action {
        IntegrationActions::Show => {
            print_instructions(config.integration.webhook_url.as_deref());
            Ok(())
        }
        IntegrationActions::SetWebhook { url } => {
            set_webhook(config, config_path, &url)?;
            println!("Webhook URL saved. Run `celebrate integration test` to check it.");
            Ok(())
        }
        IntegrationActions::Test => {
            test_connection(config).await?;
            println!("Successfully connected to Google Apps Script!");
            Ok(())
        }
    }
}

pub fn set_webhook(config: &mut Config, config_path: &Path, raw: &str) -> Result<()> {
    let url = validate_webhook_url(raw)?;
    config.integration.webhook_url = Some(url.to_string());
    config.save_to(config_path)
}

/// Post a sample row so the sheet shows the connection works
pub async fn test_connection(config: &Config) -> Result<()> {
    let raw = config
        .integration
        .webhook_url
        .as_deref()
        .ok_or_else(|| anyhow!("Please enter your Google Apps Script webhook URL first"))?;
    let dispatcher = WebhookDispatcher::new(validate_webhook_url(raw)?)?;

    let now = Local::now().naive_local();
    let message = ScheduledMessage::new(
        "Connection Test",
        "test@example.com",
        EventKind::Birthday,
        &now.format("%Y-%m-%d").to_string(),
        now,
        "Test message from celebrate",
    );
    dispatcher.deliver(&message).await?;
    Ok(())
}

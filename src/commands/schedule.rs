use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveTime};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;

use crate::config::Config;
use crate::contact::Contact;
use crate::integration::validate_webhook_url;
use crate::scheduler::{
    AutoSender, Dispatcher, LogDispatcher, ScheduledMessage, TickReport, WebhookDispatcher,
    merge_plan, plan_messages,
};
use crate::store::Repository;
use crate::templates::MessageTemplate;

/// Add the next message for every contact to the schedule
pub fn plan<S: Repository<ScheduledMessage>>(
    schedule: &mut S,
    contacts: &[Contact],
    templates: &[MessageTemplate],
    today: NaiveDate,
    send_time: NaiveTime,
) -> Result<usize> {
    let planned = plan_messages(contacts, templates, today, send_time);
    let mut existing = schedule.list()?;
    let added = merge_plan(&mut existing, planned);
    if added > 0 {
        schedule.replace_all(existing)?;
    }
    info!("Scheduled {} new message(s)", added);
    Ok(added)
}

pub fn list_scheduled<S: Repository<ScheduledMessage>>(schedule: &S) -> Result<()> {
    let mut messages = schedule.list()?;
    if messages.is_empty() {
        println!("No messages scheduled. Run `celebrate schedule plan` first.");
        return Ok(());
    }
    messages.sort_by_key(|m| m.scheduled_at);

    println!("Scheduled Messages:");
    for message in &messages {
        println!(
            "  {}  {:<24} {:<11} {:<8} {}",
            message.scheduled_at.format("%b %d, %H:%M"),
            message.contact_name,
            message.kind,
            message.status,
            message.message
        );
    }
    Ok(())
}

/// The webhook dispatcher when a URL is configured, the log otherwise
pub fn build_dispatcher(config: &Config) -> Result<Box<dyn Dispatcher>> {
    match config.integration.webhook_url.as_deref() {
        Some(raw) => {
            let url = validate_webhook_url(raw)?;
            info!("Delivering messages to webhook {}", url);
            Ok(Box::new(WebhookDispatcher::new(url)?))
        }
        None => {
            warn!("No webhook configured; sent messages are only logged");
            Ok(Box::new(LogDispatcher))
        }
    }
}

/// Send everything that is due right now, ignoring the auto-send switch
pub async fn send_due<S: Repository<ScheduledMessage>>(
    schedule: &mut S,
    dispatcher: &dyn Dispatcher,
) -> Result<TickReport> {
    let report = AutoSender::new(true)
        .tick_repository(schedule, Local::now().naive_local(), dispatcher)
        .await?;
    Ok(report)
}

/// Poll the schedule until Ctrl-C, following `auto_send` in the config file
pub async fn run_auto_send<S: Repository<ScheduledMessage>>(
    schedule: &mut S,
    config: &Config,
    config_path: &Path,
) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let sender = AutoSender::new(config.scheduler.auto_send);
    if !sender.is_enabled() {
        println!("Auto-send is disabled. Turn it on with `celebrate schedule auto-send on`.");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });
    tokio::spawn(follow_auto_send_setting(
        sender.clone(),
        config_path.to_path_buf(),
        config.scheduler.poll_interval(),
    ));

    println!("Auto-send running. Press Ctrl-C to stop.");
    sender
        .run(
            schedule,
            dispatcher.as_ref(),
            config.scheduler.poll_interval(),
            || Local::now().naive_local(),
            shutdown_rx,
        )
        .await?;
    Ok(())
}

async fn follow_auto_send_setting(sender: AutoSender, config_path: PathBuf, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        match Config::read_from(&config_path) {
            Ok(Some(config)) => sender.set_enabled(config.scheduler.auto_send),
            Ok(None) => debug!("{} is missing, keeping auto-send as it is", config_path.display()),
            Err(e) => warn!("Could not reload config: {:#}", e),
        }
    }
}

pub fn set_auto_send(config: &mut Config, config_path: &Path, enabled: bool) -> Result<()> {
    config.scheduler.auto_send = enabled;
    config.save_to(config_path).context("Failed to save auto-send setting")?;
    if enabled {
        println!("Auto-send Enabled: emails will now be sent automatically");
    } else {
        println!("Auto-send Disabled: automatic email sending has been turned off");
    }
    Ok(())
}

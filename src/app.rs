use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;

use crate::cli::{Commands, ScheduleActions, Toggle};
use crate::commands;
use crate::config::{Config, get_config_path};
use crate::contact::{Contact, ContactRecord};
use crate::store::{FileRepository, Repository, StateManager};

pub struct Application {
    config: Config,
    config_path: PathBuf,
    repo: FileRepository,
}

impl Application {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => get_config_path()?,
        };
        let config = Config::load_from(&config_path)?;
        let data_dir = config.data_dir()?;
        let state = StateManager::new(&data_dir)
            .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
        log::debug!("Using config {} and data {}", config_path.display(), data_dir.display());

        Ok(Self { config, config_path, repo: FileRepository::new(state) })
    }

    pub async fn run(mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Contacts { action } => commands::contacts::handle(action, &mut self.repo),
            Commands::Templates { action } => commands::templates::handle(action, &mut self.repo),
            Commands::Schedule { action } => self.run_schedule(action).await,
            Commands::Integration { action } => {
                commands::integration::handle(action, &mut self.config, &self.config_path).await
            }
            Commands::Dashboard { days } => {
                commands::dashboard::show(&self.repo, &self.repo, Local::now().date_naive(), days)
            }
            Commands::Config { action } => {
                commands::config::handle(action, &self.config, &self.config_path)
            }
        }
    }

    async fn run_schedule(&mut self, action: ScheduleActions) -> Result<()> {
        match action {
            ScheduleActions::Plan => {
                let contacts: Vec<Contact> = Repository::<ContactRecord>::list(&self.repo)?
                    .into_iter()
                    .map(|r| r.contact)
                    .collect();
                let templates = commands::templates::load_templates(&mut self.repo)?;
                let send_time = self.config.scheduler.send_time()?;
                let added = commands::schedule::plan(
                    &mut self.repo,
                    &contacts,
                    &templates,
                    Local::now().date_naive(),
                    send_time,
                )?;
                println!("Scheduled {} new message(s)", added);
                Ok(())
            }
            ScheduleActions::List => commands::schedule::list_scheduled(&self.repo),
            ScheduleActions::Run { once: true } => {
                let dispatcher = commands::schedule::build_dispatcher(&self.config)?;
                let report =
                    commands::schedule::send_due(&mut self.repo, dispatcher.as_ref()).await?;
                println!("{} message(s) sent, {} failed", report.sent, report.failed);
                Ok(())
            }
            ScheduleActions::Run { once: false } => {
                commands::schedule::run_auto_send(&mut self.repo, &self.config, &self.config_path)
                    .await
            }
            ScheduleActions::AutoSend { state } => commands::schedule::set_auto_send(
                &mut self.config,
                &self.config_path,
                state == Toggle::On,
            ),
        }
    }
}

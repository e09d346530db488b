//! Contact book for birthdays and anniversaries with CSV import and
//! scheduled celebratory messages.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod contact;
pub mod csv_import;
pub mod integration;
pub mod scheduler;
pub mod store;
pub mod templates;

use anyhow::Result;
use log::*;

pub async fn run(cli: cli::Cli) -> Result<()> {
    let app = app::Application::new(cli.config)?;
    debug!("Running command: {:?}", cli.command);
    app.run(cli.command).await
}

pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use chrono::Local;
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}

// Re-export commonly used types
pub use config::Config;
pub use contact::{Contact, ContactRecord, EventKind};
pub use csv_import::{ImportError, ParseReport, demo_csv, parse_contacts};

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::contact::EventKind;

/// celebrate - birthday and anniversary messages from the terminal
#[derive(Debug, Parser)]
#[command(name = "celebrate")]
#[command(about = "Manage birthday and anniversary contacts and schedule celebratory messages", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to an alternative config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage contacts
    #[command(alias = "contact")]
    Contacts {
        #[command(subcommand)]
        action: ContactActions,
    },

    /// Manage message templates
    #[command(alias = "template")]
    Templates {
        #[command(subcommand)]
        action: TemplateActions,
    },

    /// Plan and send scheduled messages
    Schedule {
        #[command(subcommand)]
        action: ScheduleActions,
    },

    /// Google Sheets webhook setup
    Integration {
        #[command(subcommand)]
        action: IntegrationActions,
    },

    /// Contact and message counts with the upcoming celebrations
    Dashboard {
        /// How many days ahead to look
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigActions,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Birthday,
    Anniversary,
}

impl From<KindArg> for EventKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Birthday => EventKind::Birthday,
            KindArg::Anniversary => EventKind::Anniversary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, Subcommand)]
pub enum ContactActions {
    /// List all contacts
    List,

    /// Add a contact
    #[command(alias = "create")]
    Add {
        /// Full name
        #[arg(required = true)]
        name: String,

        /// Email address
        #[arg(required = true)]
        email: String,

        /// Event date (YYYY-MM-DD)
        #[arg(required = true)]
        date: String,

        /// Event type
        #[arg(long = "type", value_enum, default_value_t = KindArg::Birthday)]
        kind: KindArg,

        /// Phone number
        #[arg(long, default_value = "")]
        phone: String,
    },

    /// Remove a contact by id (a unique prefix is enough)
    #[command(alias = "delete")]
    Remove {
        #[arg(required = true)]
        id: String,
    },

    /// Import contacts from a CSV file
    Import {
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Write the demo CSV template
    Demo {
        /// Directory to write contacts_demo.csv into
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },

    /// Export contacts to a CSV file
    Export {
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Add the sample contacts
    Seed,

    /// Celebrations in the next few days
    Upcoming {
        /// How many days ahead to look
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

#[derive(Debug, Subcommand)]
pub enum TemplateActions {
    /// List templates (defaults are created on first use)
    List,

    /// Create a template; use {{name}} for the recipient's name
    #[command(alias = "create")]
    Add {
        #[arg(required = true)]
        name: String,

        #[arg(required = true)]
        message: String,

        #[arg(long = "type", value_enum, default_value_t = KindArg::Birthday)]
        kind: KindArg,
    },

    /// Remove a template by id
    #[command(alias = "delete")]
    Remove {
        #[arg(required = true)]
        id: String,
    },

    /// Render a template for a name
    Preview {
        #[arg(required = true)]
        id: String,

        #[arg(required = true)]
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ScheduleActions {
    /// Schedule the next message for every contact
    Plan,

    /// List scheduled messages
    List,

    /// Send due messages
    Run {
        /// Check once and exit instead of polling
        #[arg(long)]
        once: bool,
    },

    /// Turn automatic sending on or off
    AutoSend {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Debug, Subcommand)]
pub enum IntegrationActions {
    /// Show webhook status and setup instructions
    Show,

    /// Save the Apps Script webhook URL
    SetWebhook {
        #[arg(required = true)]
        url: String,
    },

    /// Post a test message to the configured webhook
    Test,
}

#[derive(Debug, Subcommand)]
pub enum ConfigActions {
    /// Print the active configuration
    Show,

    /// Print the config file location
    Path,
}

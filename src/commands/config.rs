use anyhow::Result;
use std::path::Path;

use crate::cli::ConfigActions;
use crate::config::Config;

pub fn handle(action: ConfigActions, config: &Config, config_path: &Path) -> Result<()> {
    match action {
        ConfigActions::Show => {
            let data_dir = config.data_dir()?;
            println!("\nCurrent Configuration:");
            println!("  Data Directory: {}", data_dir.display());
            println!("\nScheduler Settings:");
            let auto_send = if config.scheduler.auto_send { "Enabled" } else { "Disabled" };
            println!("  Auto-send: {}", auto_send);
            println!("  Poll Interval: {} seconds", config.scheduler.poll_interval().as_secs());
            println!("  Send Time: {}", config.scheduler.send_time);
            println!("\nIntegration Settings:");
            println!(
                "  Webhook URL: {}",
                config.integration.webhook_url.as_deref().unwrap_or("None")
            );
            Ok(())
        }
        ConfigActions::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

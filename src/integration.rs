//! Google Sheets / Apps Script webhook setup.

use anyhow::{Result, anyhow};
use url::Url;

pub const APPS_SCRIPT_CODE: &str = r#"function doPost(e) {
  const data = JSON.parse(e.postData.contents);
  const sheet = SpreadsheetApp.openById('YOUR_SHEET_ID').getActiveSheet();

  // Add data to sheet
  sheet.appendRow([
    new Date(),
    data.name,
    data.email,
    data.type,
    data.date,
    data.message
  ]);

  return ContentService
    .createTextOutput(JSON.stringify({status: 'success'}))
    .setMimeType(ContentService.MimeType.JSON);
}"#;

pub const SETUP_STEPS: [(&str, &str); 4] = [
    ("Create Google Apps Script", "Go to https://script.google.com and create a new project"),
    ("Add the Script Code", "Copy and paste the script below into your Apps Script editor"),
    (
        "Deploy as Web App",
        "Click Deploy -> New Deployment -> Type: Web app -> Execute as: Me -> Access: Anyone",
    ),
    (
        "Copy Webhook URL",
        "Copy the web app URL and save it with `celebrate integration set-webhook <url>`",
    ),
];

/// Sheet columns and what fills them
pub const SHEET_COLUMNS: [(&str, &str); 6] = [
    ("Timestamp", "Auto-filled"),
    ("Name", "Contact name"),
    ("Email", "Email address"),
    ("Type", "Birthday/Anniversary"),
    ("Date", "Event date"),
    ("Message", "Message sent"),
];

/// Check a webhook URL before it is saved
pub fn validate_webhook_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(anyhow!("Please enter your Google Apps Script webhook URL"));
    }
    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid webhook URL '{}': {}", raw, e))?;
    if url.scheme() != "https" {
        return Err(anyhow!("Webhook URL must use https, got '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err(anyhow!("Webhook URL '{}' has no host", raw));
    }
    Ok(url)
}

pub fn print_instructions(webhook_url: Option<&str>) {
    match webhook_url {
        Some(url) => println!("Webhook URL: {}", url),
        None => println!("Webhook URL: not configured"),
    }
    println!();
    println!("Setup Instructions:");
    for (index, (title, detail)) in SETUP_STEPS.iter().enumerate() {
        println!("  {}. {}", index + 1, title);
        println!("     {}", detail);
    }
    println!();
    println!("{}", APPS_SCRIPT_CODE);
    println!();
    println!("Google Sheets Template:");
    for (column, filled_by) in SHEET_COLUMNS {
        println!("  {:<10} {}", column, filled_by);
    }
}

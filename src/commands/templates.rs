use anyhow::{Result, anyhow};
use log::info;

use crate::cli::TemplateActions;
use crate::commands::resolve_id;
use crate::store::Repository;
use crate::templates::{MessageTemplate, default_templates};

pub fn handle<R: Repository<MessageTemplate>>(action: TemplateActions, repo: &mut R) -> Result<()> {
    match action {
        TemplateActions::List => {
            let templates = load_templates(repo)?;
            println!("Message Templates:");
            for template in &templates {
                let status = if template.is_active { "active" } else { "inactive" };
                println!(
                    "  {}  {} ({}, {})",
                    &template.id.to_string()[..8],
                    template.name,
                    template.kind,
                    status
                );
                println!("      {}", template.message);
            }
            Ok(())
        }
        TemplateActions::Add { name, message, kind } => {
            let template = MessageTemplate::new(name.trim(), kind.into(), message.trim());
            add_template(repo, template)?;
            println!("Template created successfully!");
            Ok(())
        }
        TemplateActions::Remove { id } => {
            let removed = remove_template(repo, &id)?;
            println!("Template '{}' has been removed successfully.", removed.name);
            Ok(())
        }
        TemplateActions::Preview { id, name } => {
            let templates = load_templates(repo)?;
            let id = resolve_id(&templates, &id)?;
            let template = templates
                .iter()
                .find(|t| t.id == id)
                .ok_or_else(|| anyhow!("Template '{}' not found", id))?;
            println!("{}", template.render(&name));
            Ok(())
        }
    }
}

/// Stored templates, seeding the defaults when none exist
pub fn load_templates<R: Repository<MessageTemplate>>(
    repo: &mut R,
) -> Result<Vec<MessageTemplate>> {
    let templates = repo.list()?;
    if !templates.is_empty() {
        return Ok(templates);
    }

    let defaults = default_templates();
    repo.replace_all(defaults.clone())?;
    info!("Created {} default template(s)", defaults.len());
    Ok(defaults)
}

pub fn add_template<R: Repository<MessageTemplate>>(
    repo: &mut R,
    template: MessageTemplate,
) -> Result<()> {
    template.validate()?;
    load_templates(repo)?;
    repo.add(template)?;
    Ok(())
}

pub fn remove_template<R: Repository<MessageTemplate>>(
    repo: &mut R,
    raw_id: &str,
) -> Result<MessageTemplate> {
    let id = resolve_id(&load_templates(repo)?, raw_id)?;
    repo.remove(id)?.ok_or_else(|| anyhow!("Template '{}' not found", raw_id))
}

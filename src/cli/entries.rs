use anyhow::{anyhow, Result};
use chrono::NaiveTime;
use clap::Parser;
use tracing::info;

use crate::{
    store::entities::{parse_clock_time, EntryDraft, EntryId},
    utils::{clock::Clock, time::parse_day},
    view::duration_label,
};

use super::Workspace;

#[derive(Debug, Parser)]
pub struct AddCommand {
    #[arg(
        long,
        short,
        required = true,
        help = "Achievement. Repeat to record several achievements for the same entry"
    )]
    task: Vec<String>,
    #[arg(
        long,
        short,
        help = "Day of the work. Examples are \"today\", \"yesterday\", \"15/03/2025\", \"2025-03-15\". Defaults to today"
    )]
    date: Option<String>,
    #[arg(long, short, default_value = "08:30", value_parser = parse_clock_time, help = "Start of the work, HH:mm")]
    start: NaiveTime,
    #[arg(long, short, default_value = "17:00", value_parser = parse_clock_time, help = "End of the work, HH:mm")]
    end: NaiveTime,
}

#[derive(Debug, Parser)]
pub struct EditCommand {
    #[arg(help = "Id of the entry, as shown by `list`")]
    id: String,
    #[arg(long, short, help = "Replaces all achievements of the entry. Can be repeated")]
    task: Vec<String>,
    #[arg(long, short, help = "New day of the work")]
    date: Option<String>,
    #[arg(long, short, value_parser = parse_clock_time, help = "New start of the work, HH:mm")]
    start: Option<NaiveTime>,
    #[arg(long, short, value_parser = parse_clock_time, help = "New end of the work, HH:mm")]
    end: Option<NaiveTime>,
}

fn join_task(lines: Vec<String>) -> String {
    lines.join("\n")
}

pub async fn add(workspace: &Workspace, command: AddCommand) -> Result<()> {
    let date = match command.date {
        Some(date) => parse_day(&date, workspace.clock.time(), workspace.date_style)?,
        None => workspace.clock.today(),
    };
    let draft = EntryDraft {
        date,
        task: join_task(command.task),
        start_time: command.start,
        end_time: command.end,
    };
    draft.validate()?;

    let entry = workspace.store.create(draft).await?;
    info!("Added entry {}", entry.id);
    println!(
        "Added {} on {} ({})",
        entry.id,
        entry.date,
        duration_label(entry.start_time, entry.end_time)
    );
    Ok(())
}

/// Fields that aren't given keep their current values.
pub async fn edit(workspace: &Workspace, command: EditCommand) -> Result<()> {
    let id = EntryId::from(command.id);
    let current = workspace
        .store
        .entries()
        .into_iter()
        .find(|entry| entry.id == id)
        .ok_or_else(|| anyhow!("No entry with id {id}"))?;

    let mut draft = current.to_draft();
    if !command.task.is_empty() {
        draft.task = join_task(command.task);
    }
    if let Some(date) = command.date {
        draft.date = parse_day(&date, workspace.clock.time(), workspace.date_style)?;
    }
    if let Some(start) = command.start {
        draft.start_time = start;
    }
    if let Some(end) = command.end {
        draft.end_time = end;
    }
    draft.validate()?;

    workspace.store.update(&id, draft).await?;
    println!("Updated {id}");
    Ok(())
}

pub async fn remove(workspace: &Workspace, id: String) -> Result<()> {
    let id = EntryId::from(id);
    if !workspace.store.entries().iter().any(|entry| entry.id == id) {
        return Err(anyhow!("No entry with id {id}"));
    }
    workspace.store.remove(&id).await?;
    println!("Removed {id}");
    Ok(())
}

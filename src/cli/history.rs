use ansi_term::{Colour, Style};
use anyhow::Result;
use clap::Parser;

use crate::{
    store::entities::{TimesheetEntry, CLOCK_TIME_FORMAT},
    utils::clock::Clock,
    view::{available_years, duration_label, filter_by_period, task_lines, MonthFilter},
};

use super::Workspace;

#[derive(Debug, Parser)]
pub struct ListCommand {
    #[arg(long, short, help = "Year to show. Defaults to the most recent year with entries")]
    year: Option<i32>,
    #[arg(
        long,
        short,
        default_value_t = MonthFilter::All,
        help = "Month to show, 1 to 12, or \"all\""
    )]
    month: MonthFilter,
}

pub fn list(workspace: &Workspace, command: ListCommand) -> Result<()> {
    let entries = workspace.store.entries();
    let years = available_years(&entries, workspace.clock.current_year());
    let year = command.year.unwrap_or(years[0]);

    let shown = filter_by_period(&entries, year, command.month);
    println!(
        "{}",
        Style::new()
            .bold()
            .paint(format!("Year {year}, month {}: {} entries", command.month, shown.len()))
    );

    if shown.is_empty() {
        println!("No entries yet. Start adding your daily summary!");
        return Ok(());
    }

    for entry in &shown {
        println!();
        print_entry(entry);
    }
    Ok(())
}

pub fn years(workspace: &Workspace) -> Result<()> {
    let entries = workspace.store.entries();
    for year in available_years(&entries, workspace.clock.current_year()) {
        println!("{year}");
    }
    Ok(())
}

fn print_entry(entry: &TimesheetEntry) {
    println!(
        "{}\t{}",
        Colour::Blue.bold().paint(entry.date.format("%A, %d %B %Y").to_string()),
        Style::new().dimmed().paint(entry.id.as_str())
    );

    // A single line is shown as is, several lines become a list of achievements.
    let lines = task_lines(&entry.task);
    if lines.len() > 1 {
        for line in lines {
            println!("  • {line}");
        }
    } else {
        println!("  {}", entry.task);
    }

    println!(
        "  {} - {}\t{}",
        entry.start_time.format(CLOCK_TIME_FORMAT),
        entry.end_time.format(CLOCK_TIME_FORMAT),
        Colour::Cyan.paint(duration_label(entry.start_time, entry.end_time))
    );
}

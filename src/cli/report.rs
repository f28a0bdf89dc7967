use anyhow::{anyhow, Result};
use clap::Parser;

use crate::{
    summary::{
        gemini::{GeminiConfig, GeminiSummarizer, DEFAULT_MODEL, DEFAULT_TEMPERATURE},
        report::{default_report_range, generate_report},
        DEFAULT_INSTRUCTIONS,
    },
    utils::{clock::Clock, time::parse_day},
};

use super::Workspace;

/// Variable checked when neither `--api-key` nor `GEMINI_API_KEY` is set.
const FALLBACK_API_KEY_VARIABLE: &str = "API_KEY";

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(
        long,
        short,
        help = "First day of the report. Defaults to the first recorded day"
    )]
    from: Option<String>,
    #[arg(long, short, help = "Last day of the report. Defaults to today")]
    to: Option<String>,
    #[arg(long, short, help = "Instructions for the model, replacing the default ones")]
    instructions: Option<String>,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, help = "Gemini api key")]
    api_key: Option<String>,
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,
}

impl ReportCommand {
    fn gemini_config(&self) -> Result<GeminiConfig> {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| std::env::var(FALLBACK_API_KEY_VARIABLE).ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("Gemini api key is not set. Use --api-key or GEMINI_API_KEY"))?;
        Ok(GeminiConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            ..GeminiConfig::new(api_key)
        })
    }
}

pub async fn process_report_command(workspace: &Workspace, command: ReportCommand) -> Result<()> {
    let entries = workspace.store.entries();
    let now = workspace.clock.time();
    let (default_start, default_end) = default_report_range(&entries, workspace.clock.today());

    let start = match &command.from {
        Some(from) => parse_day(from, now, workspace.date_style)?,
        None => default_start,
    };
    let end = match &command.to {
        Some(to) => parse_day(to, now, workspace.date_style)?,
        None => default_end,
    };

    let summarizer = GeminiSummarizer::new(command.gemini_config()?);
    let instructions = command.instructions.as_deref().unwrap_or(DEFAULT_INSTRUCTIONS);

    let report = generate_report(&summarizer, &entries, start, end, instructions).await?;
    println!("{report}");
    Ok(())
}

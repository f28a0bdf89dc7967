use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::store::entities::TimesheetEntry;

use super::{format_entries_for_prompt, Summarizer, SummaryError};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    /// Base url of the api, without the `/models` part.
    pub endpoint: String,
}

impl GeminiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

pub struct GeminiSummarizer {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiSummarizer {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: String) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: Some(text) }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

fn build_request(
    entries: &[TimesheetEntry],
    instructions: &str,
    temperature: f32,
) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Content::text(None, instructions.to_string()),
        contents: vec![Content::text(
            Some("user"),
            format_entries_for_prompt(entries),
        )],
        generation_config: GenerationConfig { temperature },
    }
}

/// Joins the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, SummaryError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(SummaryError::EmptyResponse)
    } else {
        Ok(text)
    }
}

fn communication_error(e: reqwest::Error) -> SummaryError {
    error!("Error generating summary {e:?}");
    SummaryError::Communication(e.to_string())
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    #[instrument(skip_all, fields(model = %self.config.model, entries = entries.len()))]
    async fn summarize(
        &self,
        entries: &[TimesheetEntry],
        instructions: &str,
    ) -> Result<String, SummaryError> {
        let request = build_request(entries, instructions, self.config.temperature);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(communication_error)?
            .json::<GenerateContentResponse>()
            .await
            .map_err(communication_error)?;

        debug!("Received {} candidates", response.candidates.len());
        extract_text(response)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::store::entities::test_entry;

    use super::*;

    #[test]
    fn test_request_shape() {
        let entries = [test_entry("a", (2024, 6, 3), "08:30", "17:00")];
        let value = serde_json::to_value(build_request(&entries, "be brief", 0.5)).unwrap();

        assert_eq!(
            value["systemInstruction"],
            json!({ "parts": [{ "text": "be brief" }] })
        );
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(
            value["contents"][0]["parts"][0]["text"],
            format_entries_for_prompt(&entries)
        );
        assert_eq!(value["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": "- one\n" }, { "text": "- two" }] } },
                { "content": { "role": "model", "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "- one\n- two");
    }

    #[test]
    fn test_extract_text_without_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .unwrap();
        assert!(matches!(
            extract_text(response),
            Err(SummaryError::EmptyResponse)
        ));
    }

    #[test]
    fn test_url() {
        let summarizer = GeminiSummarizer::new(GeminiConfig {
            endpoint: "http://localhost:8080/".into(),
            ..GeminiConfig::new("key".into())
        });
        assert_eq!(
            summarizer.url(),
            "http://localhost:8080/models/gemini-2.5-flash:generateContent"
        );
    }
}

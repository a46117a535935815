use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AiConfig;

/// What the model is asked about: the text of a job request.
#[derive(Debug, Clone)]
pub struct DiagnosisInput {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
}

/// Structured reply parsed out of the model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub summary: String,
    #[serde(default)]
    pub likely_causes: Vec<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub recommended_trade: Option<String>,
}

pub struct DiagnosisOutcome {
    pub diagnosis: Diagnosis,
    /// Full provider payload, kept verbatim for later inspection.
    pub raw: serde_json::Value,
}

/// Seam over the LLM provider so handlers and tests never talk HTTP directly.
#[async_trait]
pub trait DiagnosisClient: Send + Sync {
    async fn diagnose(&self, input: &DiagnosisInput) -> anyhow::Result<DiagnosisOutcome>;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

const SYSTEM_PROMPT: &str = "You are a home-repair triage assistant. Given a \
homeowner's description of a problem, reply with a JSON object with keys \
\"summary\" (one paragraph), \"likely_causes\" (array of short strings), \
\"severity\" (one of \"low\", \"medium\", \"high\", \"emergency\") and \
\"recommended_trade\" (e.g. \"plumber\", \"electrician\"). Reply with JSON \
only.";

pub struct OpenAiDiagnosis {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiDiagnosis {
    pub fn new(cfg: &AiConfig, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
        }
    }
}

#[async_trait]
impl DiagnosisClient for OpenAiDiagnosis {
    async fn diagnose(&self, input: &DiagnosisInput) -> anyhow::Result<DiagnosisOutcome> {
        let mut user_prompt = format!("Title: {}\n", input.title);
        if let Some(category) = &input.category {
            user_prompt.push_str(&format!("Category: {}\n", category));
        }
        user_prompt.push_str(&format!("Description: {}", input.description));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: user_prompt,
                },
            ],
            temperature: 0.2,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("diagnosis request failed")?;

        let status = response.status();
        let raw: serde_json::Value = response
            .json()
            .await
            .context("diagnosis response was not JSON")?;
        anyhow::ensure!(status.is_success(), "diagnosis provider returned {status}");

        let parsed: ChatResponse =
            serde_json::from_value(raw.clone()).context("unexpected completion shape")?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .context("completion had no choices")?;

        debug!(model = %self.model, "diagnosis completion received");
        Ok(DiagnosisOutcome {
            diagnosis: parse_diagnosis_content(content),
            raw,
        })
    }
}

/// Models occasionally wrap JSON in markdown fences or fall back to prose;
/// degrade to a summary-only diagnosis rather than failing the request.
fn parse_diagnosis_content(content: &str) -> Diagnosis {
    let trimmed = content.trim();
    let stripped = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    serde_json::from_str(stripped).unwrap_or_else(|_| Diagnosis {
        summary: trimmed.to_string(),
        likely_causes: Vec::new(),
        severity: None,
        recommended_trade: None,
    })
}

/// Canned client for `AppState::fake()`.
pub struct StubDiagnosis;

#[async_trait]
impl DiagnosisClient for StubDiagnosis {
    async fn diagnose(&self, input: &DiagnosisInput) -> anyhow::Result<DiagnosisOutcome> {
        Ok(DiagnosisOutcome {
            diagnosis: Diagnosis {
                summary: format!("Stub diagnosis for: {}", input.title),
                likely_causes: vec!["stub cause".into()],
                severity: Some("low".into()),
                recommended_trade: None,
            },
            raw: serde_json::json!({"stub": true}),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_content() {
        let content = r#"{"summary":"Leaking trap","likely_causes":["worn washer"],"severity":"medium","recommended_trade":"plumber"}"#;
        let d = parse_diagnosis_content(content);
        assert_eq!(d.summary, "Leaking trap");
        assert_eq!(d.likely_causes, vec!["worn washer".to_string()]);
        assert_eq!(d.severity.as_deref(), Some("medium"));
        assert_eq!(d.recommended_trade.as_deref(), Some("plumber"));
    }

    #[test]
    fn strips_markdown_fences() {
        let content = "```json\n{\"summary\":\"Tripped breaker\"}\n```";
        let d = parse_diagnosis_content(content);
        assert_eq!(d.summary, "Tripped breaker");
        assert!(d.likely_causes.is_empty());
    }

    #[test]
    fn falls_back_to_prose_summary() {
        let content = "The pipe under the sink is probably corroded.";
        let d = parse_diagnosis_content(content);
        assert_eq!(d.summary, content);
        assert!(d.severity.is_none());
    }

    #[tokio::test]
    async fn stub_client_echoes_title() {
        let out = StubDiagnosis
            .diagnose(&DiagnosisInput {
                title: "No hot water".into(),
                description: "Heater is silent".into(),
                category: None,
            })
            .await
            .unwrap();
        assert!(out.diagnosis.summary.contains("No hot water"));
    }
}

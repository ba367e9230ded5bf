//! OpenAI-compatible chat completions assessor.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use oralexam_core::model::Section;
use oralexam_core::traits::{AssessmentRequest, QualitativeAssessor};

use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f64 = 0.3;
const SYSTEM_PROMPT: &str =
    "Tu es un examinateur expert du TEF Canada. Évalue objectivement la performance.";

/// Assessor backed by any OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiAssessor {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiAssessor {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Examiner instructions for one section.
pub fn evaluation_prompt(section: Section, user_text: &str) -> String {
    let (task, criteria) = match section {
        Section::A => (
            "Section EO1 (Poser des questions)",
            "1. Pertinence des questions (les questions sont-elles pertinentes au sujet?)\n\
             2. Variété des formes de questions\n\
             3. Politesse et registre formel\n\
             4. Capacité de reformulation\n\
             5. Qualité de l'interaction",
        ),
        Section::B => (
            "Section EO2 (Convaincre un ami)",
            "1. Structure (introduction → arguments → conclusion)\n\
             2. Qualité des arguments\n\
             3. Réaction aux objections\n\
             4. Fluidité\n\
             5. Maîtrise de la langue",
        ),
    };

    format!(
        "Évalue la performance d'un candidat au TEF Canada {task}.\n\n\
         Transcription de l'utilisateur:\n{user_text}\n\n\
         Évalue sur une échelle de 0 à 10:\n{criteria}\n\n\
         Réponds en JSON avec les scores et un commentaire pour chaque critère."
    )
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f64,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl QualitativeAssessor for OpenAiAssessor {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %self.model, section = %request.section))]
    async fn assess(&self, request: &AssessmentRequest) -> anyhow::Result<serde_json::Value> {
        let start = Instant::now();

        let body = ChatRequest {
            model: self.model.clone(),
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: evaluation_prompt(request.section, &request.user_text),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let api_response: ChatResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        let assessment: serde_json::Value = serde_json::from_str(content.trim())
            .map_err(|e| ProviderError::InvalidAssessment(e.to_string()))?;

        tracing::debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            "qualitative assessment received"
        );
        Ok(assessment)
    }
}

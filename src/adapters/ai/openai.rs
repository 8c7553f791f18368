//! OpenAI Provider - chat-completions backend for generation, critique and
//! intent fallback.
//!
//! Post and critique calls run in JSON mode and deserialize the reply into
//! structured payloads; a payload that fails domain validation is a
//! malformed-output error, not a panic. Transient failures (timeouts, 429s,
//! 5xx) are retried with exponential backoff up to the configured limit.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::config::AiConfig;
use crate::domain::content::{CritiqueResult, GeneratedPost};
use crate::domain::intent::MessageIntent;
use crate::domain::session::ChatStage;
use crate::ports::{
    ClassificationError, CritiqueError, GenerationError, GenerationMode, GenerationRequest,
    IntentFallback, PostGenerator,
};

/// Base delay for retry backoff.
const RETRY_BASE_DELAY_MS: u64 = 500;

/// OpenAI API provider implementation.
pub struct OpenAiProvider {
    config: AiConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Creates a new provider with the given configuration.
    pub fn new(config: AiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Sends one chat request and returns the assistant message text.
    async fn send_chat(
        &self,
        system: &str,
        user: &str,
        json_mode: bool,
    ) -> Result<String, ApiError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: 0.7,
            response_format: json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout {
                        timeout_secs: self.config.timeout_secs as u32,
                    }
                } else if e.is_connect() {
                    ApiError::Network(format!("Connection failed: {}", e))
                } else {
                    ApiError::Network(e.to_string())
                }
            })?;

        let response = self.handle_response_status(response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Malformed(format!("Failed to parse response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ApiError::Malformed("empty completion".to_string()));
        }
        Ok(content)
    }

    /// Maps error statuses to API errors.
    async fn handle_response_status(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok());
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 | 403 => Err(ApiError::AuthenticationFailed),
            429 => Err(ApiError::RateLimited {
                retry_after_secs: retry_after.unwrap_or(30),
            }),
            500..=599 => Err(ApiError::Unavailable(format!(
                "Server error {}: {}",
                status, body
            ))),
            _ => Err(ApiError::Network(format!(
                "Unexpected status {}: {}",
                status, body
            ))),
        }
    }

    /// Retries transient failures with exponential backoff.
    async fn chat_with_retry(
        &self,
        system: &str,
        user: &str,
        json_mode: bool,
    ) -> Result<String, ApiError> {
        let mut attempt = 0;
        loop {
            match self.send_chat(system, user, json_mode).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = RETRY_BASE_DELAY_MS * 2u64.pow(attempt);
                    tracing::warn!(attempt, error = %e, "retrying provider call");
                    sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn generation_system_prompt(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::Draft => {
            "You write short-form social posts. Reply with a JSON object with \
             keys: title, hook, body, call_to_action, hashtags (array of 5-8 \
             unique strings), target_audience."
        }
        GenerationMode::Refine => {
            "You revise short-form social posts using a critique and reader \
             feedback. Keep what the critique praised, fix what it faulted. \
             Reply with a JSON object with keys: title, hook, body, \
             call_to_action, hashtags (array of 5-8 unique strings), \
             target_audience."
        }
        GenerationMode::Polish => {
            "You do a final surface pass on a social post: tighten wording, \
             fix grammar, keep meaning and structure intact. Reply with a \
             JSON object with keys: title, hook, body, call_to_action, \
             hashtags (array of 5-8 unique strings), target_audience."
        }
    }
}

fn generation_user_prompt(request: &GenerationRequest) -> String {
    let mut sections = vec![format!("Source material:\n{}", request.source_content)];

    if !request.insights.is_empty() {
        sections.push(format!("Key insights:\n- {}", request.insights.join("\n- ")));
    }
    if let Some(requirements) = &request.requirements {
        sections.push(format!("Requirements:\n{}", requirements));
    }
    if let Some(post) = &request.prior_post {
        sections.push(format!("Current draft:\n{}", post.render()));
    }
    if let Some(critique) = &request.prior_critique {
        sections.push(format!(
            "Critique (overall {}):\nWeaknesses:\n- {}\nImprovements:\n- {}",
            critique.overall,
            critique.weaknesses.join("\n- "),
            critique.improvements.join("\n- "),
        ));
    }
    if let Some(feedback) = &request.feedback {
        sections.push(format!("Reader feedback:\n{}", feedback));
    }

    sections.join("\n\n")
}

fn critique_system_prompt() -> &'static str {
    "You are a demanding social media editor. Assess the post and reply with \
     a JSON object with integer scores 1-10 for keys: overall, clarity, \
     engagement, structure, audience_fit; plus string arrays: strengths, \
     weaknesses, improvements. If overall is below 7, improvements must \
     contain at least one specific directive."
}

fn intent_system_prompt(stage: ChatStage) -> String {
    format!(
        "Classify the user message into exactly one label: feedback, \
         approval, file_content, text_content, help, chat. The conversation \
         stage is '{}'. Reply with the label only.",
        stage.as_str()
    )
}

#[async_trait]
impl PostGenerator for OpenAiProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GeneratedPost, GenerationError> {
        let system = generation_system_prompt(request.mode);
        let user = generation_user_prompt(&request);
        let content = self.chat_with_retry(system, &user, true).await?;

        let payload: PostPayload = serde_json::from_str(&content)
            .map_err(|e| GenerationError::MalformedOutput(format!("bad post payload: {}", e)))?;
        payload.into_post()
    }

    async fn critique(&self, post: &GeneratedPost) -> Result<CritiqueResult, CritiqueError> {
        let user = format!("Assess this post:\n\n{}", post.render());
        let content = self
            .chat_with_retry(critique_system_prompt(), &user, true)
            .await?;

        let payload: CritiquePayload = serde_json::from_str(&content)
            .map_err(|e| CritiqueError::MalformedOutput(format!("bad critique payload: {}", e)))?;
        payload.into_critique()
    }
}

#[async_trait]
impl IntentFallback for OpenAiProvider {
    async fn classify(
        &self,
        text: &str,
        stage: ChatStage,
    ) -> Result<MessageIntent, ClassificationError> {
        let system = intent_system_prompt(stage);
        let content = self.chat_with_retry(&system, text, false).await?;

        content
            .trim()
            .parse::<MessageIntent>()
            .map_err(|_| ClassificationError::UnknownLabel(content.trim().to_string()))
    }
}

/// Internal API error, converted per port at the boundary.
#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed output: {0}")]
    Malformed(String),
}

impl ApiError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited { .. }
                | ApiError::Timeout { .. }
                | ApiError::Unavailable(_)
                | ApiError::Network(_)
        )
    }
}

impl From<ApiError> for GenerationError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::AuthenticationFailed => GenerationError::AuthenticationFailed,
            ApiError::RateLimited { retry_after_secs } => {
                GenerationError::RateLimited { retry_after_secs }
            }
            ApiError::Timeout { timeout_secs } => GenerationError::Timeout { timeout_secs },
            ApiError::Unavailable(msg) => GenerationError::Unavailable(msg),
            ApiError::Network(msg) => GenerationError::Network(msg),
            ApiError::Malformed(msg) => GenerationError::MalformedOutput(msg),
        }
    }
}

impl From<ApiError> for CritiqueError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::AuthenticationFailed => CritiqueError::AuthenticationFailed,
            ApiError::RateLimited { retry_after_secs } => {
                CritiqueError::RateLimited { retry_after_secs }
            }
            ApiError::Timeout { timeout_secs } => CritiqueError::Timeout { timeout_secs },
            ApiError::Unavailable(msg) => CritiqueError::Unavailable(msg),
            ApiError::Network(msg) => CritiqueError::Network(msg),
            ApiError::Malformed(msg) => CritiqueError::MalformedOutput(msg),
        }
    }
}

impl From<ApiError> for ClassificationError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Timeout { timeout_secs } => ClassificationError::Timeout { timeout_secs },
            ApiError::Network(msg) => ClassificationError::Network(msg),
            ApiError::AuthenticationFailed => {
                ClassificationError::Unavailable("authentication failed".to_string())
            }
            ApiError::RateLimited { retry_after_secs } => {
                ClassificationError::Unavailable(format!("rate limited for {}s", retry_after_secs))
            }
            ApiError::Unavailable(msg) | ApiError::Malformed(msg) => {
                ClassificationError::Unavailable(msg)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Structured post as the model returns it.
#[derive(Debug, Deserialize)]
struct PostPayload {
    title: String,
    hook: String,
    body: String,
    call_to_action: String,
    hashtags: Vec<String>,
    target_audience: String,
}

impl PostPayload {
    fn into_post(self) -> Result<GeneratedPost, GenerationError> {
        GeneratedPost::new(
            self.title,
            self.hook,
            self.body,
            self.call_to_action,
            self.hashtags,
            self.target_audience,
        )
        .map_err(|e| GenerationError::MalformedOutput(e.to_string()))
    }
}

/// Structured critique as the model returns it.
#[derive(Debug, Deserialize)]
struct CritiquePayload {
    overall: u8,
    clarity: u8,
    engagement: u8,
    structure: u8,
    audience_fit: u8,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
}

impl CritiquePayload {
    fn into_critique(self) -> Result<CritiqueResult, CritiqueError> {
        CritiqueResult::new(
            self.overall,
            self.clarity,
            self.engagement,
            self.structure,
            self.audience_fit,
            self.strengths,
            self.weaknesses,
            self.improvements,
        )
        .map_err(|e| CritiqueError::MalformedOutput(e.to_string()))
    }
}

use crate::config::{AiConfig, Provider};
use crate::core::http::HttpClient;
use crate::core::records::{VideoRecord, format_count};
use crate::error::ApiError;
use async_openai::{
    self,
    config::OpenAIConfig,
    types::responses::{
        CreateResponseArgs, EasyInputMessageArgs, InputItem, InputParam, OutputItem,
        OutputMessageContent, ReasoningArgs, ReasoningEffort, Role,
    },
};
use async_trait::async_trait;
use derive_more::{Display, From};
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};

/// How many of the sorted rows are shown to the model.
pub const TOP_N: usize = 5;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GENERATE_METHOD: &str = "generateContent";

const SYSTEM_PROMPT: &str = "You are a YouTube content strategist. Be concrete and brief.";

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn provider(&self) -> Provider;

    /// Models able to generate text, in the provider's listing order.
    async fn list_models(&self) -> Result<Vec<String>, ApiError>;

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ApiError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub model: String,
    pub text: String,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "**AI Model: {}**\n\n{}", self.model, self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Display, From)]
pub enum StrategyError {
    #[display("No videos to analyze.")]
    NoVideos,
    #[display("No AI model found.")]
    NoModel,
    #[display("{_0}")]
    #[from]
    Api(ApiError),
}

#[derive(Clone)]
pub struct StrategyService {
    backend: Arc<dyn GenerativeBackend>,
    priority: Vec<String>,
    language: String,
}

impl StrategyService {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        priority: Vec<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            priority,
            language: language.into(),
        }
    }

    pub fn from_config(ai: &AiConfig, api_key: &str, http: HttpClient) -> Self {
        let backend: Arc<dyn GenerativeBackend> = match ai.provider {
            Provider::Gemini => Arc::new(GeminiBackend::new(http, api_key)),
            Provider::OpenAI => Arc::new(OpenAIBackend::new(api_key, ai.openai_models.clone())),
        };
        Self::new(backend, ai.model_priority.clone(), ai.language.clone())
    }

    pub fn provider(&self) -> Provider {
        self.backend.provider()
    }

    pub async fn available_models(&self) -> Result<Vec<String>, ApiError> {
        self.backend.list_models().await
    }

    /// Always answers with displayable text: the strategy on success, an
    /// error line otherwise.
    pub async fn consult(&self, records: &[VideoRecord], topic: &str) -> String {
        match self.try_consult(records, topic).await {
            Ok(strategy) => strategy.to_string(),
            Err(err) => {
                warn!(provider = %self.provider(), "strategy request failed: {err}");
                match err {
                    StrategyError::Api(api) => format!("Error AI: {api}"),
                    other => other.to_string(),
                }
            }
        }
    }

    pub async fn try_consult(
        &self,
        records: &[VideoRecord],
        topic: &str,
    ) -> Result<Strategy, StrategyError> {
        if records.is_empty() {
            return Err(StrategyError::NoVideos);
        }

        let models = self.backend.list_models().await?;
        let model = select_model(&models, &self.priority)
            .ok_or(StrategyError::NoModel)?
            .to_string();
        info!(provider = %self.provider(), %model, "requesting strategy");

        let prompt = build_prompt(records, topic, &self.language);
        let text = self.backend.generate(&model, &prompt).await?;
        Ok(Strategy { model, text })
    }
}

/// First exact priority match, else the first available model.
pub fn select_model<'a>(available: &'a [String], priority: &[String]) -> Option<&'a str> {
    priority
        .iter()
        .find_map(|wanted| available.iter().find(|m| *m == wanted))
        .or_else(|| available.first())
        .map(String::as_str)
}

/// Render the top rows into the consultant prompt. An empty slice still
/// yields a complete prompt.
pub fn build_prompt(records: &[VideoRecord], topic: &str, language: &str) -> String {
    let top = &records[..records.len().min(TOP_N)];
    let mut prompt = String::new();

    if top.is_empty() {
        let _ = writeln!(
            prompt,
            "Analyze the YouTube niche '{topic}'. No competitor videos are available."
        );
    } else {
        let _ = writeln!(prompt, "Analyze the top {} YouTube videos for '{topic}':", top.len());
        for (i, video) in top.iter().enumerate() {
            let _ = write!(
                prompt,
                "{}. {} ({} views)",
                i + 1,
                video.title,
                format_count(video.views)
            );
            if !video.channel.is_empty() {
                let _ = write!(prompt, " - {}", video.channel);
            }
            prompt.push('\n');
        }
    }

    let _ = write!(
        prompt,
        "\nProvide:\n\
         1. Three viral title ideas for a new video on this topic.\n\
         2. A short explanation of why each competitor video performed well.\n\
         3. One thumbnail suggestion.\n\n\
         Answer in {language}."
    );
    prompt
}

pub struct GeminiBackend {
    http: HttpClient,
    api_key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelPage {
    models: Vec<GeminiModel>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeminiModel {
    name: String,
    #[serde(rename = "supportedGenerationMethods")]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl GeminiBackend {
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        let url = format!("{GEMINI_API_BASE}/models");
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", "1000".to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }
            let page: ModelPage = self.http.get_json(&url, &query, &self.api_key).await?;

            models.extend(
                page.models
                    .into_iter()
                    .filter(|m| m.supported_generation_methods.iter().any(|g| g == GENERATE_METHOD))
                    .map(|m| m.name),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ApiError> {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        let url = format!("{GEMINI_API_BASE}/{model}:{GENERATE_METHOD}");
        let body = json!({
            "contents": [ { "role": "user", "parts": [ { "text": prompt } ] } ]
        });

        let response: GenerateResponse = self.http.post_json(&url, &body, &self.api_key).await?;
        gemini_text(response)
    }
}

fn gemini_text(response: GenerateResponse) -> Result<String, ApiError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    match response.prompt_feedback.and_then(|f| f.block_reason) {
        Some(reason) => Err(ApiError::Provider(format!("prompt blocked: {reason}"))),
        None => Err(ApiError::Parse("model returned no text".to_string())),
    }
}

/// OpenAI Responses API. There is no capability filter to list against, so
/// the configured candidates stand in for the model listing.
pub struct OpenAIBackend {
    client: async_openai::Client<OpenAIConfig>,
    models: Vec<String>,
}

impl OpenAIBackend {
    pub fn new(api_key: &str, models: Vec<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: async_openai::Client::with_config(config),
            models,
        }
    }
}

#[async_trait]
impl GenerativeBackend for OpenAIBackend {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.models.clone())
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ApiError> {
        let provider_err = |e: async_openai::error::OpenAIError| ApiError::Provider(e.to_string());

        let request = CreateResponseArgs::default()
            .max_output_tokens(4096_u32)
            .model(model)
            .reasoning(
                ReasoningArgs::default()
                    .effort(ReasoningEffort::Low)
                    .build()
                    .map_err(provider_err)?,
            )
            .input(InputParam::Items(vec![
                InputItem::EasyMessage(
                    EasyInputMessageArgs::default()
                        .role(Role::System)
                        .content(SYSTEM_PROMPT)
                        .build()
                        .map_err(provider_err)?,
                ),
                InputItem::EasyMessage(
                    EasyInputMessageArgs::default()
                        .role(Role::User)
                        .content(prompt)
                        .build()
                        .map_err(provider_err)?,
                ),
            ]))
            .build()
            .map_err(provider_err)?;

        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(provider_err)?;

        let mut content = String::new();
        for output in response.output {
            if let OutputItem::Message(out) = output {
                for c in out.content {
                    if let OutputMessageContent::OutputText(text) = c {
                        content.push_str(&text.text);
                    }
                }
            }
        }

        if content.trim().is_empty() {
            return Err(ApiError::Parse("model returned no text".to_string()));
        }
        Ok(content)
    }
}

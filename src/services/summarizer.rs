use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::AppError;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 512;

/// Configuration for the external summarizer, read from the environment.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub max_output_tokens: u32,
}

impl SummarizerConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_output_tokens: std::env::var("GEMINI_MAX_OUTPUT_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
        }
    }
}

/// Generative-AI endpoint the corpus is forwarded to. Implementations
/// return raw text; response structure is the caller's problem.
#[async_trait]
pub trait SummarizerProvider: Send + Sync {
    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String, AppError>;
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    parts: Option<Vec<GeminiResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: String,
}

/// Gemini REST provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            api_key,
            model,
            client,
        }
    }
}

#[async_trait]
impl SummarizerProvider for GeminiProvider {
    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String, AppError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig { max_output_tokens },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Summarizer request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Summarizer returned {}: {}", status, detail);
            return Err(AppError::External(format!(
                "Summarizer returned status {status}"
            )));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("Summarizer response unreadable: {e}")))?;

        let text = parsed
            .candidates
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .and_then(|c| c.content.parts)
            .and_then(|mut p| if p.is_empty() { None } else { Some(p.remove(0)) })
            .map(|p| p.text)
            .ok_or_else(|| AppError::External("Summarizer returned no candidates".to_string()))?;

        Ok(text)
    }
}

/// Structured analysis shape the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub description: String,
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub neutral: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
}

/// Result of the best-effort parse of the summarizer's reply. The
/// structured shape is a convention from the prompt, not a guarantee, so
/// anything that fails to parse passes through as raw text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Structured(SentimentBreakdown),
    Raw(String),
}

/// Extracts a JSON payload from a reply that may wrap it in a markdown
/// code fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

pub fn parse_analysis(text: &str) -> AnalysisOutcome {
    match serde_json::from_str::<SentimentBreakdown>(strip_code_fence(text)) {
        Ok(breakdown) => AnalysisOutcome::Structured(breakdown),
        Err(_) => AnalysisOutcome::Raw(text.to_string()),
    }
}

fn analysis_prompt(corpus: &str) -> String {
    format!(
        "You will analyze the following text about a stock and its sentiment.\n\
         Provide a short description summarizing the overall sentiment, then list\n\
         reasons found in the text that support positive, neutral, and negative\n\
         sentiment. Return ONLY a JSON object with these fields:\n\
         {{\n\
           \"description\": string,\n\
           \"positive\": string[],\n\
           \"neutral\": string[],\n\
           \"negative\": string[]\n\
         }}\n\n\
         Input text:\n{corpus}"
    )
}

/// Summarizer seam used by the AI routes. Disabled (no provider) when the
/// API key is not configured; every call then fails with a descriptive
/// `External` error instead of hanging or guessing.
pub struct SummarizerService {
    provider: Option<Arc<dyn SummarizerProvider>>,
    max_output_tokens: u32,
}

impl SummarizerService {
    pub fn new(provider: Option<Arc<dyn SummarizerProvider>>, max_output_tokens: u32) -> Self {
        Self {
            provider,
            max_output_tokens,
        }
    }

    pub fn from_env() -> Self {
        let config = SummarizerConfig::from_env();
        let provider: Option<Arc<dyn SummarizerProvider>> = match config.api_key {
            Some(key) => {
                info!("Summarizer enabled with model {}", config.model);
                Some(Arc::new(GeminiProvider::new(key, config.model)))
            }
            None => {
                warn!("GEMINI_API_KEY not set; summarizer disabled");
                None
            }
        };
        Self::new(provider, config.max_output_tokens)
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> Result<&Arc<dyn SummarizerProvider>, AppError> {
        self.provider.as_ref().ok_or_else(|| {
            AppError::External(
                "Summarizer is not configured. Set GEMINI_API_KEY to enable it.".to_string(),
            )
        })
    }

    /// Free-form summary of arbitrary text.
    pub async fn summarize(&self, text: &str) -> Result<String, AppError> {
        self.provider()?
            .generate(text, self.max_output_tokens)
            .await
    }

    /// Sentiment analysis of a corpus, parsed best-effort into the
    /// structured breakdown with raw-text fallback.
    pub async fn analyze(&self, corpus: &str) -> Result<AnalysisOutcome, AppError> {
        let reply = self
            .provider()?
            .generate(&analysis_prompt(corpus), self.max_output_tokens)
            .await?;
        Ok(parse_analysis(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_reply() {
        let reply = r#"{"description":"mostly upbeat","positive":["earnings beat"],"neutral":[],"negative":["supply risk"]}"#;
        match parse_analysis(reply) {
            AnalysisOutcome::Structured(b) => {
                assert_eq!(b.description, "mostly upbeat");
                assert_eq!(b.positive, vec!["earnings beat"]);
                assert_eq!(b.negative, vec!["supply risk"]);
            }
            AnalysisOutcome::Raw(_) => panic!("expected structured outcome"),
        }
    }

    #[test]
    fn parses_reply_wrapped_in_code_fence() {
        let reply = "```json\n{\"description\":\"flat\",\"positive\":[],\"neutral\":[\"no news\"],\"negative\":[]}\n```";
        assert!(matches!(parse_analysis(reply), AnalysisOutcome::Structured(_)));
    }

    #[test]
    fn unparseable_reply_passes_through_unchanged() {
        let reply = "The sentiment is broadly positive this week.";
        match parse_analysis(reply) {
            AnalysisOutcome::Raw(text) => assert_eq!(text, reply),
            AnalysisOutcome::Structured(_) => panic!("expected raw fallback"),
        }
    }

    #[test]
    fn missing_buckets_default_to_empty() {
        let reply = r#"{"description":"thin coverage"}"#;
        match parse_analysis(reply) {
            AnalysisOutcome::Structured(b) => {
                assert!(b.positive.is_empty());
                assert!(b.neutral.is_empty());
                assert!(b.negative.is_empty());
            }
            AnalysisOutcome::Raw(_) => panic!("expected structured outcome"),
        }
    }

    #[tokio::test]
    async fn disabled_service_fails_with_external_error() {
        let svc = SummarizerService::new(None, 256);
        assert!(!svc.is_enabled());
        let err = svc.summarize("anything").await.unwrap_err();
        assert!(matches!(err, AppError::External(_)));
    }

    struct CannedProvider(String);

    #[async_trait]
    impl SummarizerProvider for CannedProvider {
        async fn generate(&self, prompt: &str, _max: u32) -> Result<String, AppError> {
            assert!(prompt.contains("Input text:"));
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn analyze_falls_back_to_raw_text() {
        let svc = SummarizerService::new(
            Some(Arc::new(CannedProvider("not json at all".to_string()))),
            256,
        );
        let outcome = svc.analyze("corpus line").await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Raw("not json at all".to_string()));
    }
}

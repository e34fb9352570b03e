use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use schedc_core::Category;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::classifier::{Classification, ClassificationRequest, ClassifierBackend, ClassifyError};

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Chat-completions backend. One request per transaction, no retries.
pub struct OpenRouterClassifier {
    client: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterClassifier {
    pub fn new(config: OpenRouterConfig) -> Result<Self, ClassifyError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageOut,
}

#[derive(Deserialize)]
struct MessageOut {
    content: Option<String>,
}

/// Loose view of the model's answer before it is checked.
#[derive(Deserialize)]
struct RawClassification {
    category: Option<String>,
    purpose: Option<String>,
    is_business: Option<bool>,
}

pub fn build_prompt(request: &ClassificationRequest) -> String {
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        "Categorize this transaction for Schedule C tax purposes:\n\
         Vendor: {vendor}\n\
         Amount: {amount}\n\
         Date: {date}\n\
         \n\
         Respond with JSON only:\n\
         {{\n  \"category\": \"one of: {categories}\",\n  \
         \"purpose\": \"brief business purpose description\",\n  \
         \"is_business\": boolean (true if clearly business expense)\n}}",
        vendor = request.vendor,
        amount = request.amount,
        date = request.date,
        categories = categories.join(", "),
    )
}

/// Pulls the classification out of a chat-completions body. The model's
/// text may be wrapped in a Markdown code fence.
pub fn parse_response(body: &str) -> Result<Classification, ClassifyError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ClassifyError::Parse(e.to_string()))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ClassifyError::Parse("response has no message content".to_string()))?;

    let json = strip_code_fence(&content);
    let raw: RawClassification =
        serde_json::from_str(json).map_err(|e| ClassifyError::Parse(e.to_string()))?;

    let category = raw.category.as_deref().map(|c| {
        c.parse::<Category>().unwrap_or_else(|_| {
            tracing::debug!(category = c, "Unknown category from service, using other");
            Category::Other
        })
    });

    Ok(Classification {
        category,
        purpose: raw.purpose.filter(|p| !p.trim().is_empty()),
        is_business: raw.is_business,
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

impl ClassifierBackend for OpenRouterClassifier {
    async fn classify(
        &self,
        request: &ClassificationRequest,
        credential: &str,
    ) -> Result<Classification, ClassifyError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(request),
            }],
        };

        let resp = self
            .client
            .post(&self.config.endpoint)
            .header(AUTHORIZATION, format!("Bearer {credential}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text)
    }
}

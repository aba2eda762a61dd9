//! OpenAI implementation of the reasoning backend.
//!
//! A reference implementation using structured outputs for extraction and
//! text-embedding-3-small for embeddings. Enabled with the `openai`
//! feature.
//!
//! # Example
//!
//! ```rust,ignore
//! use initiatives::backends::OpenAiBackend;
//!
//! let backend = OpenAiBackend::from_env()?.with_model("gpt-4o-mini");
//! ```

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, BackendResult};
use crate::security::ApiKey;
use crate::traits::{ExtractionRequest, RawAnswer, RawInitiative, RawInsight, ReasoningBackend};
use crate::types::Outlook;

/// OpenAI-based reasoning backend.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: ApiKey,
    model: String,
    embedding_model: String,
    base_url: String,
}

impl OpenAiBackend {
    /// Create a new backend with the given API key.
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> BackendResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| BackendError::Embedding("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model (default: text-embedding-3-small).
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Structured-output chat call decoded into `T` via its JSON schema.
    async fn structured<T: JsonSchema + DeserializeOwned>(
        &self,
        name: &str,
        system: &str,
        user: &str,
    ) -> BackendResult<T> {
        let schema = serde_json::to_value(schemars::schema_for!(T))
            .map_err(|e| BackendError::InvalidResponse {
                reason: format!("schema serialization: {e}"),
            })?;

        let request = StructuredRequest {
            model: self.model.clone(),
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
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: name.to_string(),
                    strict: false,
                    schema,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.reveal()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), body));
        }

        let chat: ChatResponse = response.json().await.map_err(map_transport)?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| BackendError::InvalidResponse {
                reason: "no choices in response".to_string(),
            })?;

        serde_json::from_str(&content).map_err(|e| BackendError::InvalidResponse {
            reason: format!("schema mismatch: {e}"),
        })
    }
}

fn map_transport(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Http(Box::new(e))
    }
}

fn map_status(status: u16, body: String) -> BackendError {
    match status {
        429 => BackendError::RateLimited,
        408 | 504 => BackendError::Timeout,
        _ => BackendError::Http(format!("status {status}: {body}").into()),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct InitiativeList {
    initiatives: Vec<RawInitiative>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct InsightList {
    insights: Vec<RawInsight>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct OutlookLabel {
    outlook: String,
}

fn extraction_context(request: &ExtractionRequest) -> String {
    let mut context = format!(
        "Company: {}\nDocument: {}\n",
        request.company_name, request.document_title
    );
    if let Some(section) = &request.section {
        context.push_str(&format!("Section: {section}\n"));
    }
    if let Some(speaker) = &request.speaker {
        context.push_str(&format!("Speaker: {speaker}\n"));
    }
    context.push_str("\nExcerpt:\n");
    context.push_str(&request.chunk_text);
    context
}

#[async_trait]
impl ReasoningBackend for OpenAiBackend {
    async fn extract_initiatives(
        &self,
        request: &ExtractionRequest,
    ) -> BackendResult<Vec<RawInitiative>> {
        let system = "You analyze corporate disclosure excerpts and extract strategic \
                      initiatives: named programs, expansions, launches, restructurings or \
                      investments the company describes. For each initiative return its name, \
                      a one-sentence description, a category label, any stated timeline \
                      expression verbatim, mentioned metrics, your confidence in [0, 1], and \
                      one verbatim supporting quote from the excerpt. Return an empty list \
                      when the excerpt contains no initiatives. Never invent quotes.";
        let list: InitiativeList = self
            .structured("initiatives", system, &extraction_context(request))
            .await?;
        Ok(list.initiatives)
    }

    async fn classify_outlook(&self, name: &str, quote: &str) -> BackendResult<Outlook> {
        let system = "Classify whether the quote states a plan or guidance about the future \
                      (forward_looking) or reports something that already happened \
                      (backward_looking). Return {\"outlook\": \"forward_looking\"} or \
                      {\"outlook\": \"backward_looking\"}.";
        let user = format!("Initiative: {name}\nQuote: {quote}");
        let label: OutlookLabel = self.structured("outlook", system, &user).await?;
        match label.outlook.as_str() {
            "forward_looking" => Ok(Outlook::ForwardLooking),
            "backward_looking" => Ok(Outlook::BackwardLooking),
            other => Err(BackendError::InvalidResponse {
                reason: format!("unknown outlook label: {other}"),
            }),
        }
    }

    async fn extract_insights(
        &self,
        request: &ExtractionRequest,
    ) -> BackendResult<Vec<RawInsight>> {
        let system = "Extract notable standalone observations from the excerpt: risks, \
                      commitments, guidance changes, competitive remarks. For each return a \
                      category label, the observation, importance and confidence in [0, 1], \
                      and sentiment in [-1, 1]. Return an empty list when nothing stands out.";
        let list: InsightList = self
            .structured("insights", system, &extraction_context(request))
            .await?;
        Ok(list.insights)
    }

    async fn answer(
        &self,
        question: &str,
        company_name: &str,
        contexts: &[String],
    ) -> BackendResult<RawAnswer> {
        let system = "Answer the question about the company using only the provided \
                      excerpts. Cite supporting passages verbatim in `citations`. If the \
                      excerpts do not answer the question, say so and use low confidence.";
        let passages: String = contexts
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] {}\n", i + 1, c))
            .collect();
        let user = format!("Company: {company_name}\nQuestion: {question}\n\nExcerpts:\n{passages}");
        self.structured("answer", system, &user).await
    }

    async fn embed(&self, text: &str) -> BackendResult<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.reveal()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), body));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(map_transport)?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| BackendError::Embedding("no embedding in response".to_string()))
    }
}

// Request/response wire types

#[derive(Serialize)]
struct StructuredRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let backend = OpenAiBackend::new("sk-test")
            .with_model("gpt-4o-mini")
            .with_embedding_model("text-embedding-3-large")
            .with_base_url("https://custom.api.example");

        assert_eq!(backend.model, "gpt-4o-mini");
        assert_eq!(backend.embedding_model, "text-embedding-3-large");
        assert_eq!(backend.base_url, "https://custom.api.example");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status(429, String::new()),
            BackendError::RateLimited
        ));
        assert!(matches!(map_status(504, String::new()), BackendError::Timeout));
        assert!(matches!(
            map_status(500, "boom".into()),
            BackendError::Http(_)
        ));
    }
}

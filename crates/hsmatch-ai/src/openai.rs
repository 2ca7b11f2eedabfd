//! OpenAI-compatible backend for all three capabilities.
//!
//! Embeddings go through `/embeddings`. Level classification goes through
//! `/chat/completions` with a forced `Categorizer` function call whose
//! `category` argument is an enum of the candidates. Item extraction asks for
//! a comma separated list. Wire types are private to this module.

use std::time::Duration;

use async_trait::async_trait;
use hsmatch_core::LevelChoice;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};

use crate::AiError;
use crate::capability::{CategoryClassifier, Embedder, ItemExtractor};

const CATEGORIZER: &str = "Categorizer";

const CLASSIFY_PROMPT: &str = "You are an expert in categorizing products (or services) \
based on given categories. \
Below is a list of categories and the name of a product (or service). \
Pick the single category most related to that product and give a relevance score \
between 0.000 and 1.000, rounded to three decimal places.";

const EXTRACT_PROMPT: &str = "The following is a description of a company. \
Figure out what it sells (or offers) and list every item. \
Return the result as a comma separated list.";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            chat_model: "gpt-4o-2024-05-13".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Client for any endpoint speaking the OpenAI embeddings and chat APIs.
///
/// Cheap to clone: `reqwest::Client` is reference counted internally.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                AiError::ClassificationUnavailable(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            chat_model: config.chat_model,
            embedding_model: config.embedding_model,
        })
    }

    /// POST `body` to `{base_url}/{path}` and decode the JSON reply.
    /// Every failure is reported as a plain message for the caller to wrap.
    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, String> {
        let url = format!("{}/{path}", self.base_url);
        let mut req = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| {
            error!(url = %url, error = %e, "OpenAI request failed (transport)");
            e.to_string()
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(url = %url, status = status.as_u16(), "OpenAI request rejected");
            return Err(format!("server returned {}: {body}", status.as_u16()));
        }

        resp.json::<R>().await.map_err(|e| {
            error!(url = %url, error = %e, "failed to deserialize OpenAI response");
            format!("failed to parse response body: {e}")
        })
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatMessage, String> {
        let parsed: ChatResponse = self.post("chat/completions", request).await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| "response has no choices".to_string())
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.embedding_model, count = texts.len(), "requesting embeddings");
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let parsed: EmbeddingResponse = self
            .post("embeddings", &request)
            .await
            .map_err(AiError::EmbeddingUnavailable)?;
        ordered_embeddings(parsed, texts.len()).map_err(AiError::EmbeddingUnavailable)
    }
}

#[async_trait]
impl CategoryClassifier for OpenAiClient {
    async fn classify(&self, text: &str, candidates: &[String]) -> Result<LevelChoice, AiError> {
        if candidates.is_empty() {
            return Ok(LevelChoice::empty());
        }
        let listing = serde_json::to_string(candidates)
            .map_err(|e| AiError::ClassificationUnavailable(e.to_string()))?;
        let request = ChatRequest {
            model: self.chat_model.clone(),
            temperature: Some(0.0),
            messages: vec![
                Message::system(format!("{CLASSIFY_PROMPT}\n\nCategories:\n{listing}")),
                Message::user(format!("the product (or service): {text}")),
            ],
            tools: Some(vec![categorizer_tool(candidates)]),
            tool_choice: Some(json!({"type": "function", "function": {"name": CATEGORIZER}})),
        };

        debug!(model = %self.chat_model, candidates = candidates.len(), "requesting category");
        let message = self
            .chat(&request)
            .await
            .map_err(AiError::ClassificationUnavailable)?;
        let arguments = message
            .tool_calls
            .into_iter()
            .flatten()
            .find(|call| call.function.name == CATEGORIZER)
            .map(|call| call.function.arguments)
            .ok_or_else(|| {
                AiError::ClassificationUnavailable("no Categorizer call in response".into())
            })?;

        parse_categorizer(&arguments, candidates).map_err(AiError::ClassificationUnavailable)
    }
}

#[async_trait]
impl ItemExtractor for OpenAiClient {
    async fn extract_items(&self, description: &str) -> Result<Vec<String>, AiError> {
        let request = ChatRequest {
            model: self.chat_model.clone(),
            temperature: Some(0.0),
            messages: vec![Message::system(EXTRACT_PROMPT), Message::user(description)],
            tools: None,
            tool_choice: None,
        };
        let message = self
            .chat(&request)
            .await
            .map_err(AiError::ExtractionUnavailable)?;
        let content = message.content.ok_or_else(|| {
            AiError::ExtractionUnavailable("empty or missing content in response".into())
        })?;
        Ok(split_items(&content))
    }
}

// ── Response parsing ──

/// Put embeddings back in input order and check there is one per input.
fn ordered_embeddings(
    mut parsed: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, String> {
    if parsed.data.len() != expected {
        return Err(format!(
            "expected {expected} embeddings, got {}",
            parsed.data.len()
        ));
    }
    parsed.data.sort_by_key(|d| d.index);
    Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
}

/// Decode the `Categorizer` arguments and check the label is a candidate.
fn parse_categorizer(arguments: &str, candidates: &[String]) -> Result<LevelChoice, String> {
    let args: CategorizerArgs =
        serde_json::from_str(arguments).map_err(|e| format!("bad Categorizer arguments: {e}"))?;
    if !candidates.iter().any(|c| *c == args.category) {
        return Err(format!("label {:?} is not a candidate", args.category));
    }
    Ok(LevelChoice::new(args.category, args.relevance.score()))
}

/// Split a comma separated answer into trimmed, non-empty items.
fn split_items(content: &str) -> Vec<String> {
    content
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn categorizer_tool(candidates: &[String]) -> serde_json::Value {
    json!({
        "type": "function",
        "function": {
            "name": CATEGORIZER,
            "description": "Categorize the product",
            "parameters": {
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "enum": candidates,
                        "description": "The name of category",
                    },
                    "relevance": {
                        "type": "string",
                        "description": "A value between '0' and '1' for the relevance score",
                    },
                },
                "required": ["category", "relevance"],
            },
        },
    })
}

// ── Private wire types ──

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

impl Message {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    /// Some servers send `null` instead of omitting the field.
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    /// JSON-encoded arguments object.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct CategorizerArgs {
    category: String,
    relevance: Relevance,
}

/// Models return the score as a number or as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Relevance {
    Number(f64),
    Text(String),
}

impl Relevance {
    fn score(&self) -> f32 {
        match self {
            Self::Number(n) => *n as f32,
            Self::Text(s) => s.trim().parse::<f32>().unwrap_or_else(|_| {
                warn!(relevance = %s, "unparseable relevance, using 0");
                0.0
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<String> {
        vec!["Computers".to_string(), "Telephones".to_string()]
    }

    #[test]
    fn categorizer_accepts_string_relevance() {
        let args = r#"{"category": "Computers", "relevance": "0.8766"}"#;
        let choice = parse_categorizer(args, &candidates()).unwrap();
        assert_eq!(choice.label, "Computers");
        assert_eq!(choice.confidence, 0.877);
    }

    #[test]
    fn categorizer_accepts_numeric_relevance() {
        let args = r#"{"category": "Telephones", "relevance": 0.5}"#;
        let choice = parse_categorizer(args, &candidates()).unwrap();
        assert_eq!(choice.label, "Telephones");
        assert_eq!(choice.confidence, 0.5);
    }

    #[test]
    fn categorizer_clamps_and_defaults_relevance() {
        let high = r#"{"category": "Computers", "relevance": 3}"#;
        let high = parse_categorizer(high, &candidates()).unwrap();
        assert_eq!(high.confidence, 1.0);
        let junk = r#"{"category": "Computers", "relevance": "high"}"#;
        let junk = parse_categorizer(junk, &candidates()).unwrap();
        assert_eq!(junk.confidence, 0.0);
    }

    #[test]
    fn categorizer_rejects_unknown_label() {
        let args = r#"{"category": "Toasters", "relevance": "0.9"}"#;
        let err = parse_categorizer(args, &candidates()).unwrap_err();
        assert!(err.contains("Toasters"));
    }

    #[test]
    fn categorizer_tool_lists_candidates_as_enum() {
        let tool = categorizer_tool(&candidates());
        let options = &tool["function"]["parameters"]["properties"]["category"]["enum"];
        assert_eq!(options, &json!(["Computers", "Telephones"]));
        assert_eq!(tool["function"]["name"], CATEGORIZER);
    }

    #[test]
    fn items_split_on_commas() {
        assert_eq!(
            split_items("wireless mouse, keyboard ,  \"USB hub\", "),
            vec!["wireless mouse", "keyboard", "USB hub"]
        );
        assert!(split_items("  ").is_empty());
    }

    #[test]
    fn embeddings_reordered_by_index() {
        let parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]}"#,
        )
        .unwrap();
        let vectors = ordered_embeddings(parsed, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn embedding_count_mismatch_is_an_error() {
        let parsed: EmbeddingResponse =
            serde_json::from_str(r#"{"data": [{"index": 0, "embedding": [1.0]}]}"#).unwrap();
        assert!(ordered_embeddings(parsed, 2).is_err());
    }

    #[test]
    fn tool_call_message_decodes() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": null, "tool_calls": [
                {"id": "call_1", "type": "function",
                 "function": {"name": "Categorizer",
                              "arguments": "{\"category\":\"Computers\",\"relevance\":\"0.9\"}"}}
            ]}}]}"#,
        )
        .unwrap();
        let message = &parsed.choices[0].message;
        assert!(message.content.is_none());
        let calls = message.tool_calls.as_deref().unwrap_or_default();
        assert_eq!(calls[0].function.name, "Categorizer");
    }

    #[test]
    fn null_tool_calls_decode_as_none() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"mouse, keyboard","tool_calls":null}}]}"#,
        )
        .unwrap();
        let message = parsed.choices.into_iter().next().unwrap().message;
        assert!(message.tool_calls.is_none());
        let items = split_items(message.content.as_deref().unwrap_or_default());
        assert_eq!(items, vec!["mouse", "keyboard"]);
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = OpenAiClient::new(OpenAiConfig {
            base_url: "http://localhost:11434/v1/".into(),
            ..OpenAiConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434/v1");
    }
}

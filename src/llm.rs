use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::config::LlmConfig;
use crate::receipts::Category;

/// Turns OCR text into a loosely structured receipt mapping.
/// An empty map means the text could not be parsed.
#[async_trait]
pub trait ReceiptParser: Send + Sync {
    async fn parse(&self, ocr_text: &str) -> Map<String, Value>;
}

pub fn build_prompt(ocr_text: &str) -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| format!("\"{}\"", c.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are an expert AI assistant that extracts structured data from OCR text of a receipt. The text may be in English or Japanese.

Your instructions are:
1.  Analyze the text to understand the content, regardless of the language.
2.  Based on the seller's name and items, classify the receipt into one of these exact English categories: {categories}.
3.  If you see multiple tax amounts, add them all together to get the single total_tax amount.

Extract the following fields and return the result in a valid JSON format with English keys.
- seller_name (in its original language)
- category (must be one of the English words from the list above)
- receipt_date (in "YYYY-MM-DDTHH:MM:SS" format)
- items (a list of objects, each with item_name, quantity, rate, and subtotal)
- total_amount
- tax_amount

IMPORTANT: Your entire output must be only the raw JSON object. Do not include any other text or explanations.

Receipt Text:
"""
{ocr_text}
"""
"#
    )
}

/// Slice from the first `{` to the last `}` inclusive.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

pub fn parse_model_output(text: &str) -> Option<Map<String, Value>> {
    let raw = extract_json_object(text.trim())?;
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "model output is not valid json");
            None
        }
    }
}

/// Google Gemini `generateContent` client.
pub struct GeminiParser {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiParser {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        debug!(model = %self.model, "sending receipt text to gemini");

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("gemini returned {}: {}", status, error_body);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("decode gemini response")?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        Ok(text)
    }
}

#[async_trait]
impl ReceiptParser for GeminiParser {
    async fn parse(&self, ocr_text: &str) -> Map<String, Value> {
        let prompt = build_prompt(ocr_text);
        let text = match self.generate(&prompt).await {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "gemini call failed");
                return Map::new();
            }
        };

        match parse_model_output(&text) {
            Some(map) => map,
            None => {
                error!(response = %text, "could not find a json object in the model response");
                Map::new()
            }
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    #[test]
    fn prompt_lists_every_category_and_embeds_text() {
        let prompt = build_prompt("セブンイレブン\nおにぎり 150");
        for c in Category::ALL {
            assert!(prompt.contains(&format!("\"{}\"", c.as_str())));
        }
        assert!(prompt.contains("セブンイレブン\nおにぎり 150"));
        assert!(prompt.contains("YYYY-MM-DDTHH:MM:SS"));
    }

    #[test]
    fn extracts_object_wrapped_in_prose_and_fences() {
        let text = "Sure!\n```json\n{\"seller_name\": \"Lawson\", \"items\": [{\"a\": 1}]}\n```";
        assert_eq!(
            extract_json_object(text),
            Some("{\"seller_name\": \"Lawson\", \"items\": [{\"a\": 1}]}")
        );
        let map = parse_model_output(text).unwrap();
        assert_eq!(map["seller_name"], "Lawson");
    }

    #[test]
    fn missing_or_reversed_delimiters_give_nothing() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("only { open"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
        assert!(parse_model_output("").is_none());
    }

    #[test]
    fn two_objects_in_one_response_do_not_parse() {
        assert!(parse_model_output("{\"a\": 1} and also {\"b\": 2}").is_none());
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(parse_model_output("[{\"a\": 1}]").is_none());
    }

    async fn spawn_fake_gemini(reply: serde_json::Value) -> String {
        let app = Router::new().route(
            "/models/:model",
            post(move || {
                let reply = reply.clone();
                async move { Json(reply) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn parser_for(base_url: String) -> GeminiParser {
        GeminiParser::new(&LlmConfig {
            api_key: "test-key".into(),
            model: "gemini-test".into(),
            base_url,
        })
    }

    #[tokio::test]
    async fn parses_candidate_text_from_gemini() {
        let base = spawn_fake_gemini(serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "```json\n{\"seller_name\": \"FamilyMart\", "},
                        {"text": "\"total_amount\": 540}\n```"}
                    ]
                }
            }]
        }))
        .await;

        let map = parser_for(base).parse("FamilyMart 540").await;
        assert_eq!(map["seller_name"], "FamilyMart");
        assert_eq!(map["total_amount"], 540);
    }

    #[tokio::test]
    async fn empty_candidates_give_empty_map() {
        let base = spawn_fake_gemini(serde_json::json!({ "candidates": [] })).await;
        let map = parser_for(base).parse("whatever").await;
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn unreachable_api_gives_empty_map() {
        let map = parser_for("http://127.0.0.1:9".into()).parse("text").await;
        assert!(map.is_empty());
    }
}

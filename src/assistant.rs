use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::config::Config;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Reply used when no API key was available at startup. Degraded mode,
/// never an error.
pub const NOT_CONFIGURED_REPLY: &str =
    "I'm sorry, I cannot connect to the AI service right now. Please check the API configuration.";

/// Reply substituted when the backend answers with no usable text.
pub const EMPTY_REPLY_FALLBACK: &str = "I couldn't generate a response. Please try again.";

const SYSTEM_INSTRUCTION: &str = "You are PricePulse AI, a helpful and objective shopping assistant. \
Your goal is to help users make informed buying decisions. \
Keep answers concise (under 150 words usually) unless asked for a detailed guide. \
Format output with Markdown (bolding key terms, lists).";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gemini API error {status}: {body}")]
    Api { status: reqwest::StatusCode, body: String },

    #[error("Failed to reach the Gemini API")]
    Transport(#[from] reqwest::Error),
}

/// Anything the conversation layer can ask a question of. Lets tests
/// substitute a fake for the real [`AssistantGateway`].
pub trait AssistantBackend {
    fn ask(
        &self,
        query: &str,
        product: Option<&Product>,
    ) -> impl std::future::Future<Output = Result<String, GatewayError>> + Send;
}

// ── Gemini wire types ────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
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
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Stateless facade over the Gemini `generateContent` endpoint. One request
/// per question, no retries, no history kept between calls.
#[derive(Clone)]
pub struct AssistantGateway {
    client: Client,
    api_key: Option<String>,
    model: String,
    max_output_tokens: u32,
    temperature: f64,
}

impl AssistantGateway {
    pub fn new(api_key: Option<String>, config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_output_tokens: config.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            temperature: config.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one question to Gemini, grounding it with the viewed product
    /// when one is supplied. Returns the reply text, or a fixed placeholder
    /// for the unconfigured and empty-reply cases.
    pub async fn ask(
        &self,
        query: &str,
        product: Option<&Product>,
    ) -> Result<String, GatewayError> {
        let Some(api_key) = &self.api_key else {
            return Ok(NOT_CONFIGURED_REPLY.to_string());
        };

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: query.to_string() }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: compose_system_context(product) }],
            },
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        };

        let url = format!("{}/{}:generateContent", API_BASE, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api { status, body });
        }

        let reply: GenerateContentResponse = response.json().await?;
        Ok(extract_reply_text(reply))
    }
}

/// Pulls the reply text out of a successful response. Responses with no
/// candidates, no content, or only empty/whitespace text get the fixed
/// placeholder instead, so the transcript never shows a blank reply.
fn extract_reply_text(reply: GenerateContentResponse) -> String {
    let text = reply
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

    if text.trim().is_empty() {
        EMPTY_REPLY_FALLBACK.to_string()
    } else {
        text
    }
}

impl AssistantBackend for AssistantGateway {
    async fn ask(&self, query: &str, product: Option<&Product>) -> Result<String, GatewayError> {
        AssistantGateway::ask(self, query, product).await
    }
}

/// Builds the system channel text: fixed persona instruction, plus a block
/// describing the product the user is looking at. The price range is
/// computed here from the offers; specs are listed in their stable map
/// order.
pub fn compose_system_context(product: Option<&Product>) -> String {
    let mut context = SYSTEM_INSTRUCTION.to_string();

    if let Some(product) = product {
        context.push_str("\n\nUser is currently looking at this product:\n");
        context.push_str(&format!("Title: {}\n", product.title));
        if let Some((min, max)) = product.price_range() {
            let currency = product
                .offers
                .first()
                .map(|o| o.currency.as_str())
                .unwrap_or("USD");
            context.push_str(&format!("Price Range: {:.2} - {:.2} {}\n", min, max, currency));
        }
        context.push_str(&format!("Description: {}\n", product.description));
        context.push_str("Specs:\n");
        for (key, value) in &product.specs {
            context.push_str(&format!("  {}: {}\n", key, value));
        }
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Condition, StoreOffer};
    use std::collections::BTreeMap;

    fn sample_product() -> Product {
        let prices = [348.0, 349.99, 329.0, 299.0];
        let mut specs = BTreeMap::new();
        specs.insert("Battery Life".to_string(), "30 Hours".to_string());
        specs.insert("Weight".to_string(), "250g".to_string());

        Product {
            id: "1".to_string(),
            title: "Sony WH-1000XM5".to_string(),
            description: "Noise canceling headphones.".to_string(),
            category: "Electronics".to_string(),
            brand: "Sony".to_string(),
            rating: 4.8,
            review_count: 12450,
            offers: prices
                .iter()
                .map(|&price| StoreOffer {
                    store_name: "Store".to_string(),
                    store_logo: "S".to_string(),
                    price,
                    currency: "USD".to_string(),
                    buy_url: "#".to_string(),
                    condition: Condition::New,
                    shipping: "Free".to_string(),
                })
                .collect(),
            price_history: Vec::new(),
            specs,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_returns_fixed_reply() {
        let gateway = AssistantGateway::new(None, &Config::default());
        assert!(!gateway.is_configured());

        let reply = gateway.ask("Is this a good price?", None).await.unwrap();
        assert_eq!(reply, NOT_CONFIGURED_REPLY);

        // Same fixed text on every call, product context or not.
        let product = sample_product();
        let reply = gateway.ask("What about specs?", Some(&product)).await.unwrap();
        assert_eq!(reply, NOT_CONFIGURED_REPLY);
    }

    #[test]
    fn test_context_without_product_is_just_the_instruction() {
        let context = compose_system_context(None);
        assert_eq!(context, SYSTEM_INSTRUCTION);
    }

    #[test]
    fn test_context_price_range_min_max() {
        let context = compose_system_context(Some(&sample_product()));
        assert!(context.contains("Price Range: 299.00 - 349.99 USD"));
        assert!(context.contains("Title: Sony WH-1000XM5"));
    }

    #[test]
    fn test_context_specs_in_stable_order() {
        let context = compose_system_context(Some(&sample_product()));
        let battery = context.find("Battery Life: 30 Hours").unwrap();
        let weight = context.find("Weight: 250g").unwrap();
        assert!(battery < weight);
    }

    fn parse_response(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_reply_text_joins_parts() {
        let reply = parse_response(
            r#"{"candidates":[{"content":{"parts":[{"text":"The XM5 is "},{"text":"worth it."}]}}]}"#,
        );
        assert_eq!(extract_reply_text(reply), "The XM5 is worth it.");
    }

    #[test]
    fn test_no_candidates_becomes_placeholder() {
        let reply = parse_response(r#"{"candidates":[]}"#);
        assert_eq!(extract_reply_text(reply), EMPTY_REPLY_FALLBACK);

        // Field absent entirely, e.g. a prompt-feedback-only response.
        let reply = parse_response(r#"{}"#);
        assert_eq!(extract_reply_text(reply), EMPTY_REPLY_FALLBACK);
    }

    #[test]
    fn test_candidate_without_content_becomes_placeholder() {
        let reply = parse_response(r#"{"candidates":[{}]}"#);
        assert_eq!(extract_reply_text(reply), EMPTY_REPLY_FALLBACK);
    }

    #[test]
    fn test_textless_parts_become_placeholder() {
        let reply = parse_response(r#"{"candidates":[{"content":{"parts":[{}]}}]}"#);
        assert_eq!(extract_reply_text(reply), EMPTY_REPLY_FALLBACK);
    }

    #[test]
    fn test_whitespace_only_reply_becomes_placeholder() {
        let reply =
            parse_response(r#"{"candidates":[{"content":{"parts":[{"text":"  \n  "}]}}]}"#);
        assert_eq!(extract_reply_text(reply), EMPTY_REPLY_FALLBACK);
    }

    #[test]
    fn test_defaults_from_empty_config() {
        let gateway = AssistantGateway::new(Some("key".to_string()), &Config::default());
        assert!(gateway.is_configured());
        assert_eq!(gateway.model(), DEFAULT_MODEL);
        assert_eq!(gateway.max_output_tokens, DEFAULT_MAX_OUTPUT_TOKENS);
        assert_eq!(gateway.temperature, DEFAULT_TEMPERATURE);
    }
}

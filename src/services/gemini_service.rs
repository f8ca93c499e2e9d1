use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::config::AppConfig;
use crate::models::booking::BookingView;
use crate::models::chat::{ChatMessage, Sender};
use crate::models::tour::Tour;

pub const HISTORY_TURNS: usize = 5;
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_OUTPUT_TOKENS: u32 = 1024;
pub const FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble answering right now. Please try again in a moment or contact our support team.";

const PERSONA: &str = "You are TourGuide AI, the friendly travel concierge of our tour booking platform.
Help customers discover tours, understand their bookings, and plan their trips.
Guidelines:
- Answer in the same language the customer writes in.
- Be concise, warm and practical; use short paragraphs or bullet points.
- Only recommend tours from the list of available tours below, quoting their real prices.
- When asked about a booking, use the booking details below; never invent bookings.
- For cancellations or changes, explain that they can be made from the My Bookings page.
- If you do not know something, say so and suggest contacting support.";

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
pub struct PromptFeedback {
    #[serde(rename = "blockReason")]
    pub block_reason: Option<String>,
}

#[derive(Debug)]
pub enum ChatbotError {
    NotConfigured,
    HttpError(reqwest::Error),
    ResponseError(String),
    Blocked(String),
    EmptyResponse,
    StoreError(String),
}

impl fmt::Display for ChatbotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatbotError::NotConfigured => write!(f, "GEMINI_API_KEY not set"),
            ChatbotError::HttpError(err) => write!(f, "HTTP error: {}", err),
            ChatbotError::ResponseError(msg) => write!(f, "Response error: {}", msg),
            ChatbotError::Blocked(reason) => write!(f, "Response blocked: {}", reason),
            ChatbotError::EmptyResponse => write!(f, "Model returned no text"),
            ChatbotError::StoreError(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for ChatbotError {}

impl From<reqwest::Error> for ChatbotError {
    fn from(err: reqwest::Error) -> Self {
        ChatbotError::HttpError(err)
    }
}

impl From<mongodb::error::Error> for ChatbotError {
    fn from(err: mongodb::error::Error) -> Self {
        ChatbotError::StoreError(err.to_string())
    }
}

pub fn format_bookings(bookings: &[BookingView]) -> String {
    if bookings.is_empty() {
        return "No bookings yet.".to_string();
    }
    bookings
        .iter()
        .map(|b| {
            format!(
                "- {} on {}: {} people, ${:.2} ({})",
                b.tour_title.as_deref().unwrap_or("Unknown tour"),
                b.booking_date,
                b.number_of_people,
                b.total_price,
                b.status.as_str()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_tours(tours: &[Tour]) -> String {
    if tours.is_empty() {
        return "No tours available.".to_string();
    }
    tours
        .iter()
        .map(|t| {
            format!(
                "- {} in {}: ${:.2}, {}, {}",
                t.title,
                t.location,
                t.price,
                t.duration,
                t.tour_type.as_str()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The last `HISTORY_TURNS` messages as `User:`/`Assistant:` lines, oldest first.
pub fn format_history(history: &[ChatMessage]) -> String {
    let start = history.len().saturating_sub(HISTORY_TURNS);
    history[start..]
        .iter()
        .map(|m| match m.sender {
            Sender::User => format!("User: {}", m.text),
            Sender::Assistant => format!("Assistant: {}", m.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(
    message: &str,
    history: &[ChatMessage],
    bookings: &[BookingView],
    tours: &[Tour],
) -> String {
    let history = format_history(history);
    let history = if history.is_empty() {
        "(new conversation)".to_string()
    } else {
        history
    };

    format!(
        "{persona}\n\nCustomer's bookings:\n{bookings}\n\nAvailable tours:\n{tours}\n\nConversation so far:\n{history}\n\nUser: {message}\nAssistant:",
        persona = PERSONA,
        bookings = format_bookings(bookings),
        tours = format_tours(tours),
        history = history,
        message = message.trim(),
    )
}

pub fn build_request(prompt: String) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part { text: Some(prompt) }],
        }],
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

/// First candidate's text; a block reason or a missing/blank text is an error.
pub fn extract_text(response: GenerateResponse) -> Result<String, ChatbotError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ChatbotError::Blocked(reason));
    }

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(ChatbotError::EmptyResponse)
}

#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiService {
    pub fn new(config: &AppConfig) -> Result<Self, ChatbotError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        if config.gemini_api_key.is_none() {
            warn!("GEMINI_API_KEY not set; TourGuide AI will answer with the fallback reply");
        }

        Ok(Self {
            client,
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.clone(),
            model: config.gemini_model.clone(),
        })
    }

    fn endpoint(&self, api_key: &str) -> Result<Url, ChatbotError> {
        let raw = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        Url::parse_with_params(&raw, &[("key", api_key)])
            .map_err(|e| ChatbotError::ResponseError(format!("Invalid endpoint: {}", e)))
    }

    pub async fn generate(&self, prompt: String) -> Result<String, ChatbotError> {
        let api_key = self.api_key.as_deref().ok_or(ChatbotError::NotConfigured)?;
        let url = self.endpoint(api_key)?;

        debug!("Sending prompt of {} chars to {}", prompt.len(), self.model);

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ChatbotError::ResponseError(format!(
                "Generate request failed with status {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ChatbotError::ResponseError(format!("Failed to parse response: {}", e)))?;

        extract_text(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::BookingStatus;
    use crate::models::tour::TourType;
    use chrono::{NaiveDate, Utc};

    fn turns(n: usize) -> Vec<ChatMessage> {
        (1..=n)
            .map(|i| {
                if i % 2 == 1 {
                    ChatMessage::user(format!("question {}", i))
                } else {
                    ChatMessage::assistant(format!("answer {}", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_history_keeps_last_five_in_order() {
        let formatted = format_history(&turns(7));
        let lines: Vec<&str> = formatted.lines().collect();
        assert_eq!(
            lines,
            vec![
                "User: question 3",
                "Assistant: answer 4",
                "User: question 5",
                "Assistant: answer 6",
                "User: question 7",
            ]
        );
    }

    #[test]
    fn test_prompt_contains_context_blocks() {
        let tours = vec![Tour {
            id: None,
            title: "Hoi An Lantern Walk".to_string(),
            description: None,
            price: 35.0,
            duration: "4 hours".to_string(),
            location: "Hoi An".to_string(),
            tour_type: TourType::Regular,
            image_url: None,
            max_capacity: 12,
            available: true,
            rating: 4.8,
            created_at: None,
            updated_at: None,
        }];
        let bookings = vec![BookingView {
            id: "b1".to_string(),
            user_id: "u1".to_string(),
            tour_id: "t1".to_string(),
            tour_title: Some("Hoi An Lantern Walk".to_string()),
            booking_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            number_of_people: 2,
            total_price: 70.0,
            status: BookingStatus::Confirmed,
            special_requests: None,
            contact_phone: None,
            contact_email: None,
            created_at: Utc::now(),
        }];

        let prompt = build_prompt("  What should I pack? ", &turns(7), &bookings, &tours);
        assert!(prompt.starts_with("You are TourGuide AI"));
        assert!(prompt.contains("- Hoi An Lantern Walk on 2026-11-02: 2 people, $70.00 (confirmed)"));
        assert!(prompt.contains("- Hoi An Lantern Walk in Hoi An: $35.00, 4 hours, regular"));
        assert!(!prompt.contains("question 1"));
        assert!(prompt.contains("User: question 7"));
        assert!(prompt.ends_with("User: What should I pack?\nAssistant:"));
    }

    #[test]
    fn test_empty_context_placeholders() {
        let prompt = build_prompt("hi", &[], &[], &[]);
        assert!(prompt.contains("No bookings yet."));
        assert!(prompt.contains("No tours available."));
        assert!(prompt.contains("(new conversation)"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(build_request("hello".to_string())).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_extract_first_candidate_text() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "  Bring sunscreen. "}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Bring sunscreen.");
    }

    #[test]
    fn test_blocked_response_is_an_error() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        match extract_text(response) {
            Err(ChatbotError::Blocked(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected blocked error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_candidates_is_empty_response() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(extract_text(response), Err(ChatbotError::EmptyResponse)));
    }

    #[test]
    fn test_endpoint_includes_model_and_key() {
        let mut config = AppConfig::for_tests();
        config.gemini_api_key = Some("k3y".to_string());
        let service = GeminiService::new(&config).unwrap();
        let url = service.endpoint("k3y").unwrap();
        assert!(url.path().ends_with("/models/gemini-1.5-flash:generateContent"));
        assert_eq!(url.query(), Some("key=k3y"));
    }

    #[test]
    fn test_generate_without_key_is_not_configured() {
        let service = GeminiService::new(&AppConfig::for_tests()).unwrap();
        let result = tokio_test::block_on(service.generate("Hello".to_string()));
        assert!(matches!(result, Err(ChatbotError::NotConfigured)));
    }
}

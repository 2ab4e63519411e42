//! Post-match commentary via the Gemini REST API
//!
//! Commentary is pure flavor: every failure path degrades to a canned
//! line so a duel result is never blocked on an external call.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::config::Config;
use crate::ws::protocol::MatchStats;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Canned line used when no API key is configured
const OFFLINE_LINE: &str = "What a duel! Both warriors fought with honor under the falling petals.";
/// Canned line used when the API call fails
const BOOTH_LOST_LINE: &str = "The connection to the commentator booth was lost!";

/// Client for generating color commentary about a finished duel
#[derive(Clone)]
pub struct CommentaryService {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl CommentaryService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
        }
    }

    /// Produce a one-liner for the end screen. Infallible: API problems
    /// are logged and replaced with a canned line.
    pub async fn generate(&self, stats: &MatchStats) -> String {
        let Some(api_key) = &self.api_key else {
            return OFFLINE_LINE.to_string();
        };

        match self.request(api_key, stats).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "Commentary generation failed");
                BOOTH_LOST_LINE.to_string()
            }
        }
    }

    async fn request(&self, api_key: &str, stats: &MatchStats) -> Result<String, CommentaryError> {
        let winner = stats.winner_name.as_deref().unwrap_or("an unknown warrior");
        let loser = stats.loser_name.as_deref().unwrap_or("their rival");
        let prompt = format!(
            "You are an excitable martial-arts tournament commentator. \
             In a samurai duel under falling sakura petals, {winner} just \
             defeated {loser} after {} seconds, finishing with {:.0} health \
             remaining. Give a short, dramatic one-sentence summary of the \
             fight. Do not use markdown.",
            stats.duration_secs, stats.winner_health,
        );

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, api_key
        );

        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(CommentaryError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CommentaryError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(CommentaryError::Parse)?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(CommentaryError::EmptyResponse)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

/// Commentary API errors
#[derive(Debug, thiserror::Error)]
pub enum CommentaryError {
    #[error("Request failed: {0}")]
    Request(reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("Response contained no text")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> MatchStats {
        MatchStats {
            duration_secs: 42,
            winner_name: Some("Blue Ronin".to_string()),
            loser_name: Some("Red Samurai".to_string()),
            winner_health: 35.0,
            fighter_stats: Vec::new(),
        }
    }

    #[tokio::test]
    async fn missing_key_yields_the_offline_line() {
        let service = CommentaryService::new(&Config::for_tests());
        let text = service.generate(&stats()).await;
        assert_eq!(text, OFFLINE_LINE);
    }

    #[test]
    fn response_parsing_takes_the_first_candidate() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "  A flawless victory!  " }] }
            }]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .unwrap();
        assert_eq!(text, "A flawless victory!");
    }
}

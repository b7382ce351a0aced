//! Optional LLM metadata fallback.
//!
//! Last resort in the matching cascade, disabled unless both the
//! config flag and an API key are present. Talks to an
//! OpenAI-compatible chat-completions endpoint and asks for a strict
//! JSON object; anything unparseable degrades to "no guess".

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::tmdb::ProviderError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Metadata guessed by the model, with its self-reported confidence.
#[derive(Debug, Clone, Deserialize)]
pub struct AiGuess {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub is_series: bool,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

pub struct AiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl AiClient {
    pub fn new(api_key: String, model: String, endpoint: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key,
            model,
            endpoint,
        }
    }

    /// Ask the model what release a filename refers to. Returns None
    /// when the reply holds no usable JSON object.
    pub async fn guess(&self, filename: &str) -> Result<Option<AiGuess>, ProviderError> {
        let prompt = format!(
            "Identify the movie or TV episode this release filename refers to:\n\
             {filename}\n\n\
             Reply with ONLY a JSON object, no prose:\n\
             {{\"title\": str, \"year\": int or null, \"is_series\": bool, \
             \"season\": int or null, \"episode\": int or null, \
             \"confidence\": float between 0 and 1}}"
        );

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You identify media releases from scene filenames. You answer in strict JSON."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.1,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Transient(format!(
                "AI endpoint returned HTTP {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content = match parsed.choices.first() {
            Some(choice) => choice.message.content.as_str(),
            None => return Ok(None),
        };

        Ok(extract_guess(content))
    }
}

/// Pull the first JSON object out of the reply; models wrap answers in
/// code fences or prose often enough that strict parsing alone fails.
fn extract_guess(content: &str) -> Option<AiGuess> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    let guess: AiGuess = serde_json::from_str(&content[start..=end]).ok()?;
    if guess.title.trim().is_empty() {
        return None;
    }
    Some(guess)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_from_fenced_reply() {
        let content = "```json\n{\"title\": \"Squid Game\", \"year\": 2021, \"is_series\": true, \"season\": 2, \"episode\": 1, \"confidence\": 0.92}\n```";
        let guess = extract_guess(content).unwrap();
        assert_eq!(guess.title, "Squid Game");
        assert_eq!(guess.season, Some(2));
        assert!((guess.confidence - 0.92).abs() < 1e-6);
    }

    #[test]
    fn missing_fields_default() {
        let guess = extract_guess("{\"title\": \"Maa\"}").unwrap();
        assert_eq!(guess.year, None);
        assert!(!guess.is_series);
        assert_eq!(guess.confidence, 0.0);
    }

    #[test]
    fn rejects_empty_title_and_non_json() {
        assert!(extract_guess("{\"title\": \"  \"}").is_none());
        assert!(extract_guess("no structured answer").is_none());
        assert!(extract_guess("}{").is_none());
    }
}

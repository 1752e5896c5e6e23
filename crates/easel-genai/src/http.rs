use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use easel_core::clients::{ContentGenerator, GeneratedSlide, SlideRequest};
use easel_core::errors::GenerationError;

/// Connection settings for the content-generation service.
#[derive(Clone, Debug)]
pub struct GenAiConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl GenAiConfig {
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            timeout: Duration::from_secs(120),
        }
    }
}

/// HTTP-backed implementation of the content-generation seam.
pub struct HttpContentGenerator {
    config: GenAiConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    topic: &'a str,
    age: &'a str,
    prompt: &'a str,
    slide_number: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    title: String,
    markup: String,
}

impl HttpContentGenerator {
    pub fn new(config: GenAiConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;
        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/slides/generate", self.config.base_url.trim_end_matches('/'))
    }

    fn classify(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout(self.config.timeout)
        } else {
            GenerationError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    fn name(&self) -> &str {
        "genai-http"
    }

    async fn generate_slide(&self, request: &SlideRequest) -> Result<GeneratedSlide, GenerationError> {
        let body = GenerateBody {
            topic: &request.topic,
            age: &request.age_band,
            prompt: &request.prompt,
            slide_number: request.slide_number,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(status.as_u16(), body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        if parsed.markup.trim().is_empty() {
            return Err(GenerationError::InvalidResponse("empty markup payload".into()));
        }

        tracing::debug!(slide = request.slide_number, title = %parsed.title, "Slide generated");
        Ok(GeneratedSlide {
            title: parsed.title,
            markup: parsed.markup,
        })
    }
}

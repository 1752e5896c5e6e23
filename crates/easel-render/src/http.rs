use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use easel_core::clients::{RenderOptions, RenderedImage, ThumbnailRenderer};
use easel_core::errors::RenderError;
use easel_core::slides::{ImageFormat, RenderMetadata};

/// Connection settings for the rendering service.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl RenderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP-backed implementation of the rendering seam. Sends markup plus the
/// fixed render options; receives raw image bytes.
pub struct HttpRenderer {
    config: RenderConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderBody<'a> {
    html: &'a str,
    width: u32,
    height: u32,
    background: &'a str,
    format: ImageFormat,
    quality: u8,
    /// Untrusted content isolation: executable scripting is removed
    /// before drawing.
    strip_scripts: bool,
    /// Dampen CSS animation/transition durations so a static capture is
    /// deterministic without waiting for motion to settle.
    freeze_animations: bool,
}

impl HttpRenderer {
    pub fn new(config: RenderConfig) -> Result<Self, RenderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RenderError::Network(e.to_string()))?;
        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        format!("{}/render", self.config.base_url.trim_end_matches('/'))
    }

    fn classify(&self, e: reqwest::Error) -> RenderError {
        if e.is_timeout() {
            RenderError::Timeout(self.config.timeout)
        } else {
            RenderError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl ThumbnailRenderer for HttpRenderer {
    fn name(&self) -> &str {
        "render-http"
    }

    async fn render(&self, markup: &str, options: &RenderOptions) -> Result<RenderedImage, RenderError> {
        let body = RenderBody {
            html: markup,
            width: options.width,
            height: options.height,
            background: &options.background,
            format: options.format,
            quality: options.quality,
            strip_scripts: true,
            freeze_animations: true,
        };

        let response = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RenderError::from_status(status.as_u16(), body));
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        if bytes.is_empty() {
            return Err(RenderError::InvalidResponse("empty image body".into()));
        }

        let metadata = RenderMetadata {
            width: options.width,
            height: options.height,
            format: options.format,
            size_bytes: bytes.len(),
        };
        Ok(RenderedImage {
            bytes: bytes.to_vec(),
            metadata,
        })
    }
}

use async_trait::async_trait;

use crate::errors::{GenerationError, RenderError};
use crate::slides::{ImageFormat, RenderMetadata};

/// Prompt context for one slide generation call.
#[derive(Clone, Debug)]
pub struct SlideRequest {
    pub topic: String,
    pub age_band: String,
    /// Plan excerpt or concatenated title + description for this slide.
    pub prompt: String,
    pub slide_number: u32,
}

/// What the generation collaborator returns for one slide: a title and a
/// self-contained markup payload.
#[derive(Clone, Debug)]
pub struct GeneratedSlide {
    pub title: String,
    pub markup: String,
}

/// Seam to the content-generation collaborator. Consumed as a black box;
/// prompt engineering and model invocation live behind it.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_slide(&self, request: &SlideRequest) -> Result<GeneratedSlide, GenerationError>;
}

/// Fixed rendering options applied to every thumbnail in a batch.
/// The rendering service strips scripting from the markup, normalizes
/// transparent backgrounds to `background`, and dampens CSS animation so a
/// static capture settles immediately; these flags are forwarded with each
/// request.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub format: ImageFormat,
    pub quality: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            background: "#ffffff".into(),
            format: ImageFormat::Png,
            quality: 80,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub metadata: RenderMetadata,
}

/// Seam to the rendering collaborator.
#[async_trait]
pub trait ThumbnailRenderer: Send + Sync {
    fn name(&self) -> &str;

    async fn render(&self, markup: &str, options: &RenderOptions) -> Result<RenderedImage, RenderError>;
}

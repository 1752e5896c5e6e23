use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clients::RenderedImage;

/// Lifecycle of a single slide artifact. Terminal states are never revisited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideStatus {
    Pending,
    Completed,
    Error,
}

/// One generated slide. `slide_number` is assigned from input position
/// (1-based) and never reassigned, regardless of completion order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideTask {
    pub slide_number: u32,
    pub title: String,
    pub status: SlideStatus,
    pub progress_percent: u8,
    pub markup: Option<String>,
}

impl SlideTask {
    pub fn pending(slide_number: u32, title: impl Into<String>) -> Self {
        Self {
            slide_number,
            title: title.into(),
            status: SlideStatus::Pending,
            progress_percent: 0,
            markup: None,
        }
    }

    pub fn completed(slide_number: u32, title: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            slide_number,
            title: title.into(),
            status: SlideStatus::Completed,
            progress_percent: 100,
            markup: Some(markup.into()),
        }
    }

    pub fn failed(slide_number: u32, title: impl Into<String>) -> Self {
        Self {
            slide_number,
            title: title.into(),
            status: SlideStatus::Error,
            progress_percent: 0,
            markup: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SlideStatus::Completed | SlideStatus::Error)
    }
}

/// Raster output format requested from the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetadata {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub size_bytes: usize,
}

/// Preview image for one completed slide. A failed render leaves the parent
/// slide untouched; only this record carries the failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailTask {
    #[serde(with = "crate::encoding::base64_opt")]
    pub image_bytes: Option<Vec<u8>>,
    pub render_metadata: Option<RenderMetadata>,
    pub failed: bool,
}

impl ThumbnailTask {
    pub fn rendered(image: RenderedImage) -> Self {
        Self {
            image_bytes: Some(image.bytes),
            render_metadata: Some(image.metadata),
            failed: false,
        }
    }

    pub fn failed() -> Self {
        Self {
            image_bytes: None,
            render_metadata: None,
            failed: true,
        }
    }
}

/// Which input shape drove the batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationApproach {
    #[serde(rename = "plan-driven")]
    PlanDriven,
    #[serde(rename = "description-driven")]
    DescriptionDriven,
}

impl GenerationApproach {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanDriven => "plan-driven",
            Self::DescriptionDriven => "description-driven",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    pub total_requested: usize,
    pub total_completed: usize,
    pub approach: GenerationApproach,
}

/// Assembled output of one generation run. Owned by the invocation that
/// produced it; events carry clones, never live references.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub slides: Vec<SlideTask>,
    pub thumbnails: BTreeMap<u32, ThumbnailTask>,
    pub stats: GenerationStats,
}

pub mod clients;
pub mod encoding;
pub mod errors;
pub mod events;
pub mod ids;
pub mod slides;

pub use clients::{ContentGenerator, GeneratedSlide, RenderOptions, RenderedImage, SlideRequest, ThumbnailRenderer};
pub use errors::{GenerationError, RenderError};
pub use events::{ProgressEvent, ProgressPayload};
pub use ids::SessionId;
pub use slides::{GenerationApproach, GenerationStats, ImageFormat, PipelineResult, RenderMetadata, SlideStatus, SlideTask, ThumbnailTask};

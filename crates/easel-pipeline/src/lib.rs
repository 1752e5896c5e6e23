pub mod coordinator;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod registry;
pub mod thumbnails;

pub use coordinator::{Coordinator, GenerationRequest, SlideDescription};
pub use error::PipelineError;
pub use pipeline::{PipelineInput, SlidePipeline, SlideSpec};
pub use registry::{RegistryConfig, SessionRegistry, SubscriberHandle};

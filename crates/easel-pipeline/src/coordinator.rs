use std::sync::Arc;

use serde::Deserialize;

use easel_core::clients::{ContentGenerator, RenderOptions, ThumbnailRenderer};
use easel_core::ids::SessionId;
use easel_core::slides::{GenerationStats, PipelineResult, SlideStatus, SlideTask};

use crate::error::PipelineError;
use crate::pipeline::{fallback_title, snapshot, PipelineInput, SlidePipeline};
use crate::registry::SessionRegistry;
use crate::thumbnails::render_thumbnails;

/// One pre-itemized slide description.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideDescription {
    pub title: String,
    pub description: String,
}

/// A generation submission. The session id is the only link to a progress
/// observer; the two calls are independent in time.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(default)]
    pub slide_descriptions: Option<Vec<SlideDescription>>,
    #[serde(default)]
    pub plan_text: Option<String>,
    pub topic: String,
    pub age: String,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub lesson: serde_json::Value,
}

/// Synchronous entry point bridging the generation pipeline, the rendering
/// stage, and the progress channel. Owns nothing shared except the injected
/// registry; each invocation's result is exclusively the caller's.
pub struct Coordinator {
    pipeline: SlidePipeline,
    renderer: Arc<dyn ThumbnailRenderer>,
    registry: Arc<SessionRegistry>,
    render_options: RenderOptions,
}

impl Coordinator {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        renderer: Arc<dyn ThumbnailRenderer>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            pipeline: SlidePipeline::new(generator),
            renderer,
            registry,
            render_options: RenderOptions::default(),
        }
    }

    pub fn with_render_options(mut self, render_options: RenderOptions) -> Self {
        self.render_options = render_options;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Run the full batch to completion and return the assembled result.
    /// Progress delivery is advisory; validation failures return before any
    /// session interaction, and internal faults surface as a structured
    /// error after a best-effort error-marked progress event.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<PipelineResult, PipelineError> {
        let input = PipelineInput::from_request(request)?;
        let session = request.session_id.clone();

        tracing::info!(
            approach = input.approach.as_str(),
            items = input.items.len(),
            topic = %input.topic,
            "Starting slide generation"
        );

        match self.run_stages(&input, session.as_ref()).await {
            Ok(result) => {
                if let Some(id) = &session {
                    if !self.registry.publish_completion(id, result.clone()) {
                        tracing::trace!(session_id = %id, "No subscriber for completion event");
                    }
                }
                tracing::info!(
                    completed = result.stats.total_completed,
                    requested = result.stats.total_requested,
                    "Slide generation finished"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %e, "Slide generation failed");
                if let Some(id) = &session {
                    self.publish_failure(id, &input, &e);
                }
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        input: &PipelineInput,
        session: Option<&SessionId>,
    ) -> Result<PipelineResult, PipelineError> {
        let total = input.items.len();

        let slides = self.pipeline.run(input, session, &self.registry).await;
        if slides.len() != total {
            return Err(PipelineError::Internal(format!(
                "pipeline produced {} slides for {} inputs",
                slides.len(),
                total
            )));
        }

        let thumbnails = render_thumbnails(Arc::clone(&self.renderer), &slides, &self.render_options).await;

        let stats = GenerationStats {
            total_requested: total,
            total_completed: slides.iter().filter(|s| s.status == SlideStatus::Completed).count(),
            approach: input.approach,
        };

        Ok(PipelineResult {
            slides,
            thumbnails,
            stats,
        })
    }

    /// Best-effort error snapshot: every slide whose outcome is unknown at
    /// this boundary is reported as errored so observers don't wait forever.
    fn publish_failure(&self, session_id: &SessionId, input: &PipelineInput, error: &PipelineError) {
        let slides: Vec<SlideTask> = input
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let slide_number = (idx + 1) as u32;
                SlideTask::failed(slide_number, fallback_title(item, slide_number))
            })
            .collect();

        let mut payload = snapshot(&slides, input.items.len());
        payload.error = Some(error.to_string());

        if !self.registry.publish_progress(session_id, payload) {
            tracing::trace!(session_id = %session_id, "No subscriber for failure event");
        }
    }
}

use std::sync::Arc;

use easel_core::clients::{ContentGenerator, SlideRequest};
use easel_core::events::ProgressPayload;
use easel_core::ids::SessionId;
use easel_core::slides::{GenerationApproach, SlideTask};

use crate::coordinator::GenerationRequest;
use crate::error::PipelineError;
use crate::plan::parse_plan;
use crate::registry::SessionRegistry;

/// One item of work: what to prompt the generator with for one slide.
#[derive(Clone, Debug)]
pub struct SlideSpec {
    /// Title used for the errored slide when generation fails before
    /// producing one.
    pub title_hint: String,
    pub prompt: String,
}

/// Validated, approach-resolved input for a generation run.
#[derive(Clone, Debug)]
pub struct PipelineInput {
    pub topic: String,
    pub age_band: String,
    pub items: Vec<SlideSpec>,
    pub approach: GenerationApproach,
}

impl PipelineInput {
    /// Selection policy: exactly one of plan text / slide descriptions must
    /// be non-empty. Fails before any collaborator call.
    pub fn from_request(request: &GenerationRequest) -> Result<Self, PipelineError> {
        let plan = request
            .plan_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let descriptions = request
            .slide_descriptions
            .as_deref()
            .filter(|d| !d.is_empty());

        let (items, approach) = match (plan, descriptions) {
            (Some(_), Some(_)) => {
                return Err(PipelineError::Validation(
                    "provide either planText or slideDescriptions, not both".into(),
                ))
            }
            (Some(plan), None) => {
                let items = parse_plan(plan)
                    .into_iter()
                    .map(|section| SlideSpec {
                        title_hint: section.title,
                        prompt: section.body,
                    })
                    .collect();
                (items, GenerationApproach::PlanDriven)
            }
            (None, Some(descriptions)) => {
                let items = descriptions
                    .iter()
                    .map(|d| SlideSpec {
                        title_hint: d.title.clone(),
                        prompt: format!("{}\n\n{}", d.title, d.description),
                    })
                    .collect();
                (items, GenerationApproach::DescriptionDriven)
            }
            (None, None) => {
                return Err(PipelineError::Validation(
                    "either planText or slideDescriptions must be provided".into(),
                ))
            }
        };

        Ok(Self {
            topic: request.topic.clone(),
            age_band: request.age.clone(),
            items,
            approach,
        })
    }
}

/// Cumulative snapshot of the batch so far. Pure; publishing is the
/// caller's side effect.
pub fn snapshot(slides: &[SlideTask], total: usize) -> ProgressPayload {
    ProgressPayload {
        progress: slides.to_vec(),
        completed: slides.iter().filter(|s| s.is_terminal()).count(),
        total,
        error: None,
    }
}

pub(crate) fn fallback_title(item: &SlideSpec, slide_number: u32) -> String {
    let hint = item.title_hint.trim();
    if hint.is_empty() {
        format!("Slide {slide_number}")
    } else {
        hint.to_string()
    }
}

/// Drives ordered production of slide tasks: one generation call per item,
/// sequentially and in input order, a cumulative progress snapshot after
/// every item. A failed item is recorded with `status: error` and the batch
/// continues.
pub struct SlidePipeline {
    generator: Arc<dyn ContentGenerator>,
}

impl SlidePipeline {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }

    pub async fn run(
        &self,
        input: &PipelineInput,
        session: Option<&SessionId>,
        registry: &SessionRegistry,
    ) -> Vec<SlideTask> {
        let total = input.items.len();
        let mut slides: Vec<SlideTask> = Vec::with_capacity(total);

        for (idx, item) in input.items.iter().enumerate() {
            let slide_number = (idx + 1) as u32;
            let request = SlideRequest {
                topic: input.topic.clone(),
                age_band: input.age_band.clone(),
                prompt: item.prompt.clone(),
                slide_number,
            };

            let task = match self.generator.generate_slide(&request).await {
                Ok(slide) => SlideTask::completed(slide_number, slide.title, slide.markup),
                Err(e) => {
                    tracing::warn!(
                        slide = slide_number,
                        kind = e.error_kind(),
                        error = %e,
                        "Slide generation failed"
                    );
                    SlideTask::failed(slide_number, fallback_title(item, slide_number))
                }
            };
            slides.push(task);

            // slide_number is positional; re-sort so snapshots stay ordered
            // even if item processing ever becomes concurrent.
            slides.sort_by_key(|t| t.slide_number);

            if let Some(id) = session {
                if !registry.publish_progress(id, snapshot(&slides, total)) {
                    tracing::trace!(session_id = %id, slide = slide_number, "Progress snapshot not delivered");
                }
            }
        }

        slides
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::SlideDescription;
    use crate::registry::RegistryConfig;
    use easel_core::errors::GenerationError;
    use easel_core::events::ProgressEvent;
    use easel_core::slides::SlideStatus;
    use easel_genai::{MockGenerator, MockReply};

    fn request_with_descriptions(count: usize) -> GenerationRequest {
        GenerationRequest {
            slide_descriptions: Some(
                (1..=count)
                    .map(|n| SlideDescription {
                        title: format!("Part {n}"),
                        description: format!("Covers part {n}"),
                    })
                    .collect(),
            ),
            plan_text: None,
            topic: "Dinosaurs".into(),
            age: "6-8".into(),
            session_id: None,
            lesson: serde_json::json!({}),
        }
    }

    fn request_with_plan(plan: &str) -> GenerationRequest {
        GenerationRequest {
            slide_descriptions: None,
            plan_text: Some(plan.into()),
            topic: "Dinosaurs".into(),
            age: "6-8".into(),
            session_id: None,
            lesson: serde_json::json!({}),
        }
    }

    fn registry() -> Arc<SessionRegistry> {
        SessionRegistry::new(RegistryConfig::default())
    }

    #[test]
    fn input_selection_rejects_empty_request() {
        let mut request = request_with_descriptions(0);
        request.slide_descriptions = Some(vec![]);
        let err = PipelineInput::from_request(&request).unwrap_err();
        assert!(err.is_validation());

        request.slide_descriptions = None;
        let err = PipelineInput::from_request(&request).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn input_selection_rejects_both_inputs() {
        let mut request = request_with_descriptions(2);
        request.plan_text = Some("### Slide 1: Intro\nx".into());
        let err = PipelineInput::from_request(&request).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn blank_plan_counts_as_absent() {
        let mut request = request_with_descriptions(2);
        request.plan_text = Some("   \n".into());
        let input = PipelineInput::from_request(&request).unwrap();
        assert_eq!(input.approach, GenerationApproach::DescriptionDriven);
        assert_eq!(input.items.len(), 2);
    }

    #[test]
    fn plan_input_is_split_into_items() {
        let request = request_with_plan("### Slide 1: Intro\na\n### Slide 2: Details\nb\n");
        let input = PipelineInput::from_request(&request).unwrap();
        assert_eq!(input.approach, GenerationApproach::PlanDriven);
        assert_eq!(input.items.len(), 2);
        assert_eq!(input.items[0].title_hint, "Intro");
        assert!(input.items[1].prompt.contains("Details"));
    }

    #[test]
    fn description_prompt_concatenates_title_and_body() {
        let request = request_with_descriptions(1);
        let input = PipelineInput::from_request(&request).unwrap();
        assert_eq!(input.items[0].prompt, "Part 1\n\nCovers part 1");
    }

    #[test]
    fn snapshot_counts_terminal_items() {
        let slides = vec![
            SlideTask::completed(1, "A", "<x/>"),
            SlideTask::failed(2, "B"),
            SlideTask::pending(3, "C"),
        ];
        let payload = snapshot(&slides, 3);
        assert_eq!(payload.completed, 2);
        assert_eq!(payload.total, 3);
        assert_eq!(payload.progress.len(), 3);
    }

    #[tokio::test]
    async fn slide_numbers_are_positional_and_complete() {
        let pipeline = SlidePipeline::new(Arc::new(MockGenerator::auto()));
        let input = PipelineInput::from_request(&request_with_descriptions(4)).unwrap();

        let slides = pipeline.run(&input, None, &registry()).await;

        assert_eq!(slides.len(), 4);
        let numbers: Vec<u32> = slides.iter().map(|s| s.slide_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert!(slides.iter().all(|s| s.status == SlideStatus::Completed));
    }

    #[tokio::test]
    async fn one_failed_item_does_not_abort_batch() {
        let generator = MockGenerator::scripted(vec![
            MockReply::slide("First", "<section>1</section>"),
            MockReply::error(GenerationError::Overloaded),
            MockReply::slide("Third", "<section>3</section>"),
        ]);
        let pipeline = SlidePipeline::new(Arc::new(generator));
        let input = PipelineInput::from_request(&request_with_descriptions(3)).unwrap();

        let slides = pipeline.run(&input, None, &registry()).await;

        assert_eq!(slides.len(), 3);
        assert_eq!(slides[0].status, SlideStatus::Completed);
        assert_eq!(slides[1].status, SlideStatus::Error);
        assert_eq!(slides[1].title, "Part 2");
        assert!(slides[1].markup.is_none());
        assert_eq!(slides[2].status, SlideStatus::Completed);
    }

    #[tokio::test]
    async fn progress_snapshots_are_cumulative_and_monotonic() {
        let registry = registry();
        let sid = SessionId::from_raw("abc");
        let mut handle = registry.register(&sid);

        let pipeline = SlidePipeline::new(Arc::new(MockGenerator::auto()));
        let input = PipelineInput::from_request(&request_with_descriptions(3)).unwrap();
        let _ = pipeline.run(&input, Some(&sid), &registry).await;

        let first = handle.rx.recv().await.unwrap();
        assert_eq!(first.event_type(), "connected");

        let mut last_completed = 0;
        for _ in 0..3 {
            match handle.rx.recv().await.unwrap() {
                ProgressEvent::Progress { data, .. } => {
                    assert!(data.completed >= last_completed);
                    assert_eq!(data.total, 3);
                    assert_eq!(data.progress.len(), data.completed);
                    last_completed = data.completed;
                }
                other => panic!("expected progress event, got {}", other.event_type()),
            }
        }
        assert_eq!(last_completed, 3);
    }

    #[tokio::test]
    async fn missing_session_never_fails_the_run() {
        let pipeline = SlidePipeline::new(Arc::new(MockGenerator::auto()));
        let input = PipelineInput::from_request(&request_with_descriptions(2)).unwrap();

        // no one ever registered this session id
        let slides = pipeline
            .run(&input, Some(&SessionId::from_raw("nobody")), &registry())
            .await;
        assert_eq!(slides.len(), 2);
    }

    #[test]
    fn fallback_title_prefers_hint() {
        let item = SlideSpec {
            title_hint: "Habitats".into(),
            prompt: "x".into(),
        };
        assert_eq!(fallback_title(&item, 4), "Habitats");

        let blank = SlideSpec {
            title_hint: "  ".into(),
            prompt: "x".into(),
        };
        assert_eq!(fallback_title(&blank, 4), "Slide 4");
    }
}

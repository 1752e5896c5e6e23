use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use easel_core::clients::{ContentGenerator, GeneratedSlide, SlideRequest};
use easel_core::errors::GenerationError;

/// Pre-programmed replies for deterministic testing without API calls.
pub enum MockReply {
    Slide { title: String, markup: String },
    Error(GenerationError),
    /// Wait a duration, then yield the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn slide(title: impl Into<String>, markup: impl Into<String>) -> Self {
        Self::Slide {
            title: title.into(),
            markup: markup.into(),
        }
    }

    pub fn error(error: GenerationError) -> Self {
        Self::Error(error)
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock generator. Scripted replies are consumed in call order; in auto
/// mode a deterministic slide is fabricated from each request instead.
pub struct MockGenerator {
    replies: Mutex<VecDeque<MockReply>>,
    auto: bool,
    call_count: AtomicUsize,
}

impl MockGenerator {
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            auto: false,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Fabricate a slide for every request. Title and markup are derived
    /// from the request so assertions can key off slide numbers.
    pub fn auto() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            auto: true,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

fn fabricate(request: &SlideRequest) -> GeneratedSlide {
    let title = request
        .prompt
        .lines()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| format!("Slide {}", request.slide_number));
    GeneratedSlide {
        markup: format!(
            "<section data-slide=\"{}\"><h1>{}</h1><p>{}</p></section>",
            request.slide_number, title, request.topic
        ),
        title,
    }
}

async fn resolve(reply: MockReply) -> Result<GeneratedSlide, GenerationError> {
    let mut current = reply;
    loop {
        match current {
            MockReply::Slide { title, markup } => {
                return Ok(GeneratedSlide { title, markup });
            }
            MockReply::Error(e) => return Err(e),
            MockReply::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
        }
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_slide(&self, request: &SlideRequest) -> Result<GeneratedSlide, GenerationError> {
        let call = self.call_count.fetch_add(1, Ordering::Relaxed);

        let scripted = self.replies.lock().pop_front();
        match scripted {
            Some(reply) => resolve(reply).await,
            None if self.auto => Ok(fabricate(request)),
            None => Err(GenerationError::InvalidRequest(format!(
                "MockGenerator: no reply scripted for call {call}"
            ))),
        }
    }
}

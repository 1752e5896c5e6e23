use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use easel_core::clients::{RenderOptions, RenderedImage, ThumbnailRenderer};
use easel_core::errors::RenderError;
use easel_core::slides::RenderMetadata;

/// Mock renderer. Succeeds with placeholder bytes unless configured to
/// fail everything or fail markup matching a marker string.
pub struct MockRenderer {
    fail_all: bool,
    fail_matching: Option<String>,
    delay: Option<Duration>,
    call_count: AtomicUsize,
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            fail_all: false,
            fail_matching: None,
            delay: None,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    /// Fail only renders whose markup contains `marker`; deterministic
    /// per-slide failure injection regardless of scheduling order.
    pub fn fail_when_contains(marker: impl Into<String>) -> Self {
        Self {
            fail_matching: Some(marker.into()),
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

fn placeholder_image(options: &RenderOptions) -> RenderedImage {
    // PNG signature followed by filler; enough for size/shape assertions.
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    bytes.resize(64, 0);
    RenderedImage {
        metadata: RenderMetadata {
            width: options.width,
            height: options.height,
            format: options.format,
            size_bytes: bytes.len(),
        },
        bytes,
    }
}

#[async_trait]
impl ThumbnailRenderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn render(&self, markup: &str, options: &RenderOptions) -> Result<RenderedImage, RenderError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let should_fail = self.fail_all
            || self
                .fail_matching
                .as_deref()
                .is_some_and(|marker| markup.contains(marker));
        if should_fail {
            return Err(RenderError::Http {
                status: 500,
                body: "mock render failure".into(),
            });
        }

        Ok(placeholder_image(options))
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use easel_core::clients::{RenderOptions, ThumbnailRenderer};
use easel_core::slides::{SlideStatus, SlideTask, ThumbnailTask};

/// Render a preview for every slide that reached `completed`. Calls run
/// concurrently; each failure is isolated to its own ThumbnailTask and the
/// parent slide is left untouched. The returned map holds exactly one entry
/// per completed slide.
pub async fn render_thumbnails(
    renderer: Arc<dyn ThumbnailRenderer>,
    slides: &[SlideTask],
    options: &RenderOptions,
) -> BTreeMap<u32, ThumbnailTask> {
    let mut set = JoinSet::new();

    for slide in slides.iter().filter(|s| s.status == SlideStatus::Completed) {
        let Some(markup) = slide.markup.clone() else {
            continue;
        };
        let renderer = Arc::clone(&renderer);
        let options = options.clone();
        let slide_number = slide.slide_number;

        set.spawn(async move {
            match renderer.render(&markup, &options).await {
                Ok(image) => {
                    tracing::debug!(slide = slide_number, bytes = image.bytes.len(), "Thumbnail rendered");
                    (slide_number, ThumbnailTask::rendered(image))
                }
                Err(e) => {
                    tracing::warn!(
                        slide = slide_number,
                        kind = e.error_kind(),
                        error = %e,
                        "Thumbnail render failed"
                    );
                    (slide_number, ThumbnailTask::failed())
                }
            }
        });
    }

    let mut thumbnails = BTreeMap::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((slide_number, task)) => {
                let _ = thumbnails.insert(slide_number, task);
            }
            Err(e) => {
                tracing::error!(error = %e, "Thumbnail render task aborted");
            }
        }
    }

    // A panicked task leaves a hole; every completed slide must have an entry.
    for slide in slides.iter().filter(|s| s.status == SlideStatus::Completed) {
        thumbnails
            .entry(slide.slide_number)
            .or_insert_with(ThumbnailTask::failed);
    }

    thumbnails
}

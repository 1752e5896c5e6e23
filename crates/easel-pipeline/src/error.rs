/// Request-level failures. Per-item generation and rendering failures are
/// data (`status: error`, `failed: true`), never an `Err` from the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

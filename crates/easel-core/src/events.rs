use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::slides::{PipelineResult, SlideTask};

/// Cumulative progress snapshot. Observers always see the full current
/// slides array, not a diff.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
    pub progress: Vec<SlideTask>,
    pub completed: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressPayload {
    pub fn empty() -> Self {
        Self {
            progress: Vec::new(),
            completed: 0,
            total: 0,
            error: None,
        }
    }
}

/// Events framed onto a session's progress channel, in send order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ProgressEvent {
    Connected {
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    },

    Progress {
        session_id: SessionId,
        data: ProgressPayload,
        timestamp: DateTime<Utc>,
    },

    Completed {
        session_id: SessionId,
        data: PipelineResult,
        timestamp: DateTime<Utc>,
    },
}

impl ProgressEvent {
    pub fn connected(session_id: SessionId) -> Self {
        Self::Connected {
            session_id,
            timestamp: Utc::now(),
        }
    }

    pub fn progress(session_id: SessionId, data: ProgressPayload) -> Self {
        Self::Progress {
            session_id,
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn completed(session_id: SessionId, data: PipelineResult) -> Self {
        Self::Completed {
            session_id,
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::Connected { session_id, .. }
            | Self::Progress { session_id, .. }
            | Self::Completed { session_id, .. } => session_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Progress { .. } => "progress",
            Self::Completed { .. } => "completed",
        }
    }
}

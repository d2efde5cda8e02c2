//! Evaluation metrics API.
//!
//! Admin and observability endpoints; not part of normal client flows.

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::endpoint::path_segment;
use crate::error::Result;
use crate::transport::Transport;
use crate::validate::require_text;
use crate::value::StructuredValue;

/// Grouping for internal APIs.
pub struct InternalApi {
    transport: Arc<Transport>,
}

impl InternalApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub fn eval(&self) -> EvalApi {
        EvalApi {
            transport: Arc::clone(&self.transport),
        }
    }
}

/// Evaluation metrics generation.
pub struct EvalApi {
    transport: Arc<Transport>,
}

impl EvalApi {
    /// Generate metrics for one completed conversation.
    pub async fn generate_metrics_for_session(&self, conversation_id: Uuid) -> Result<StructuredValue> {
        self.transport.require_authenticated()?;
        self.transport
            .submit_raw(
                &format!("/api/eval/sessions/{conversation_id}/generate-metrics"),
                Some(&empty()),
            )
            .await
    }

    /// Generate metrics for every completed conversation of the project.
    pub async fn generate_metrics_for_all_sessions(&self) -> Result<StructuredValue> {
        self.transport.require_authenticated()?;
        self.transport
            .submit_raw("/api/eval/sessions/generate-metrics", Some(&empty()))
            .await
    }

    /// Start a batch job over all conversations of all projects. The response
    /// carries the job id for [`batch_progress`](Self::batch_progress).
    pub async fn generate_metrics_for_all_conversations(&self) -> Result<StructuredValue> {
        self.transport
            .submit_raw_unauthenticated("/api/eval/sessions/generate-metrics-all", Some(&empty()))
            .await
    }

    pub async fn batch_progress(&self, job_id: &str) -> Result<StructuredValue> {
        let job_id = path_segment(require_text(job_id, "job_id")?.trim())?;
        self.transport
            .fetch_raw_unauthenticated(&format!(
                "/api/eval/sessions/generate-metrics-all/{job_id}/progress"
            ))
            .await
    }
}

fn empty() -> Value {
    json!({})
}

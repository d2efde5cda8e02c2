//! Feedback and analytics API.

use std::sync::Arc;

use crate::error::Result;
use crate::transport::Transport;
use crate::types::{
    DashboardMetrics, FeedbackSubmissionRequest, FeedbackSubmissionResponse, ProjectAnalytics,
    TopAgent, TopUser, UserAnalytics,
};
use crate::value::StructuredValue;

/// Default row count for the top-agents, top-users and all-analytics views.
pub const DEFAULT_TOP_LIMIT: u32 = 5;

/// Default row count for the project-data view.
pub const DEFAULT_PROJECT_TOP_LIMIT: u32 = 10;

/// Analytics API client.
pub struct AnalyticsApi {
    transport: Arc<Transport>,
}

impl AnalyticsApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Record feedback on a bot message.
    pub async fn submit_feedback(
        &self,
        request: FeedbackSubmissionRequest,
    ) -> Result<FeedbackSubmissionResponse> {
        self.transport.require_authenticated()?;
        self.transport.submit_one("/api/analytics/data", &request).await
    }

    pub async fn dashboard(&self) -> Result<DashboardMetrics> {
        self.transport.fetch_one("/api/analytics/dashboard").await
    }

    /// Agents ranked by query count.
    pub async fn top_agents(&self, limit: u32) -> Result<Vec<TopAgent>> {
        self.transport
            .fetch_list(&format!("/api/analytics/top-agents?limit={limit}"))
            .await
    }

    /// Users ranked by activity.
    pub async fn top_users(&self, limit: u32) -> Result<Vec<TopUser>> {
        self.transport
            .fetch_list(&format!("/api/analytics/top-users?limit={limit}"))
            .await
    }

    /// Per-user activity table.
    pub async fn user_analytics(&self) -> Result<Vec<UserAnalytics>> {
        self.transport.fetch_list("/api/analytics/user-analytics").await
    }

    pub async fn project_data(&self, top_limit: u32) -> Result<ProjectAnalytics> {
        self.transport
            .fetch_one(&format!("/api/analytics/project-data?topLimit={top_limit}"))
            .await
    }

    /// Analytics across all projects. Admin endpoint, no API key needed.
    pub async fn all(&self, top_limit: u32) -> Result<StructuredValue> {
        self.transport
            .fetch_raw_unauthenticated(&format!("/api/analytics/all?topLimit={top_limit}"))
            .await
    }

    /// Bootstrap the analytics tables. Admin endpoint, no API key needed.
    pub async fn initialize(&self) -> Result<StructuredValue> {
        self.transport
            .submit_raw_unauthenticated::<()>("/api/analytics/initialize", None)
            .await
    }
}

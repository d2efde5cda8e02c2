//! Agents API.

use std::sync::Arc;

use crate::error::Result;
use crate::transport::Transport;
use crate::types::{Agent, CreateAgentRequest};
use crate::validate::require_text;

/// Agents API client.
pub struct AgentsApi {
    transport: Arc<Transport>,
}

impl AgentsApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Create an agent. `name` and `platform` must be non-blank.
    pub async fn create(&self, request: CreateAgentRequest) -> Result<Agent> {
        self.transport.require_authenticated()?;
        require_text(&request.name, "name")?;
        require_text(&request.platform, "platform")?;
        self.transport.submit_one("/api/agents", &request).await
    }
}

//! Platform registration API.

use std::sync::Arc;

use crate::error::Result;
use crate::transport::Transport;
use crate::types::{PlatformRegistrationRequest, PlatformRegistrationResponse};
use crate::validate::require_text;

/// Registers projects. Works without an API key.
pub struct PlatformApi {
    transport: Arc<Transport>,
}

impl PlatformApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Register a new project and obtain its API key.
    pub async fn register(
        &self,
        request: PlatformRegistrationRequest,
    ) -> Result<PlatformRegistrationResponse> {
        require_text(&request.project_name, "project_name")?;
        self.transport
            .submit_one_unauthenticated("/api/platform/register", &request)
            .await
    }
}

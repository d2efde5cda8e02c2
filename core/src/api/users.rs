//! Users API.

use std::sync::Arc;

use crate::error::Result;
use crate::transport::Transport;
use crate::types::{CreateUserRequest, User};
use crate::validate::require_text;

/// Users API client.
pub struct UsersApi {
    transport: Arc<Transport>,
}

impl UsersApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Create a user. `username` and `email` must be non-blank.
    pub async fn create(&self, request: CreateUserRequest) -> Result<User> {
        self.transport.require_authenticated()?;
        require_text(&request.username, "username")?;
        require_text(&request.email, "email")?;
        self.transport.submit_one("/api/users", &request).await
    }
}

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::debug;

use crate::server::{error::SupportError, models::identity::Identity};

use super::store::SupportStore;

/// Session-token authentication. Token issuance happens elsewhere (the auth
/// platform is an external collaborator); this service only resolves a
/// bearer to an identity.
pub struct AuthService {
    store: Arc<dyn SupportStore>,
}

/// Extracts the bearer value from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, SupportError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(SupportError::Unauthorized)
}

impl AuthService {
    pub fn new(store: Arc<dyn SupportStore>) -> Self {
        Self { store }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, SupportError> {
        let token = bearer_token(headers)?;
        match self.store.find_session(token).await? {
            Some(identity) => Ok(identity),
            None => {
                debug!("bearer token did not resolve to a session");
                Err(SupportError::Unauthorized)
            }
        }
    }

    pub async fn require_staff(&self, headers: &HeaderMap) -> Result<Identity, SupportError> {
        let identity = self.authenticate(headers).await?;
        if identity.is_staff() {
            Ok(identity)
        } else {
            Err(SupportError::Unauthorized)
        }
    }
}

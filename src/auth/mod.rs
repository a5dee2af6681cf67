//! Identity gateway and request authentication.
//!
//! Tokens are resolved to a [`UserIdentity`] by an [`IdentityGateway`]. Static tokens
//! are compared in constant time to mitigate timing attacks.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::TokenEntry;
use crate::errors::{codes, ErrorDetails, ErrorResponse};

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authenticated user as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserIdentity {
    /// Single-user identity used when authentication is disabled.
    pub fn local() -> Self {
        Self {
            uid: "local".to_string(),
            display_name: Some("Local user".to_string()),
            email: None,
        }
    }

    /// Display name, falling back to email, then uid.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// The resolved identity plus the token it was resolved from.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub identity: UserIdentity,
    pub token: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity provider returned {0}")]
    Status(u16),
}

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// `Ok(None)` when the token is unknown or expired.
    async fn resolve(&self, token: &str) -> Result<Option<UserIdentity>, IdentityError>;

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError>;
}

/// Tokens configured up front in the environment.
pub struct StaticTokenGateway {
    entries: Vec<(String, UserIdentity)>,
}

impl StaticTokenGateway {
    pub fn new(tokens: &[TokenEntry]) -> Self {
        let entries = tokens
            .iter()
            .map(|t| {
                let (display_name, email) = match &t.label {
                    Some(label) if label.contains('@') => (None, Some(label.clone())),
                    Some(label) => (Some(label.clone()), None),
                    None => (None, None),
                };
                (
                    t.token.clone(),
                    UserIdentity {
                        uid: t.uid.clone(),
                        display_name,
                        email,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

#[async_trait]
impl IdentityGateway for StaticTokenGateway {
    async fn resolve(&self, token: &str) -> Result<Option<UserIdentity>, IdentityError> {
        // Compare against every entry so timing does not reveal the match position
        let mut found = None;
        for (expected, identity) in &self.entries {
            if constant_time_compare(token, expected) && found.is_none() {
                found = Some(identity.clone());
            }
        }
        Ok(found)
    }

    async fn sign_out(&self, _token: &str) -> Result<(), IdentityError> {
        Ok(())
    }
}

/// Remote identity provider exposing `/userinfo` and `/signout`.
pub struct HttpIdentityGateway {
    base_url: String,
    http: Client,
}

impl HttpIdentityGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }
}

#[async_trait]
impl IdentityGateway for HttpIdentityGateway {
    async fn resolve(&self, token: &str) -> Result<Option<UserIdentity>, IdentityError> {
        let response = self
            .http
            .get(format!("{}/userinfo", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(Some(response.json::<UserIdentity>().await?)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            s => Err(IdentityError::Status(s.as_u16())),
        }
    }

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        let response = self
            .http
            .post(format!("{}/signout", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Authentication layer. Without a gateway every request acts as [`UserIdentity::local`].
pub async fn identity_layer(
    gateway: Option<Arc<dyn IdentityGateway>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(gateway) = gateway else {
        request.extensions_mut().insert(AuthenticatedUser {
            identity: UserIdentity::local(),
            token: None,
        });
        return next.run(request).await;
    };

    let Some(token) = extract_token(&request) else {
        return unauthorized_response("Missing or invalid API key");
    };

    match gateway.resolve(&token).await {
        Ok(Some(identity)) => {
            request.extensions_mut().insert(AuthenticatedUser {
                identity,
                token: Some(token),
            });
            next.run(request).await
        }
        Ok(None) => unauthorized_response("Invalid API key"),
        Err(e) => {
            tracing::warn!("Identity resolution failed: {}", e);
            unauthorized_response("Unable to verify identity")
        }
    }
}

/// Token from `x-api-key`, falling back to `Authorization: Bearer`.
fn extract_token(request: &Request) -> Option<String> {
    let headers = request.headers();
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::UNAUTHORIZED.to_string(),
            message: message.to_string(),
            details: None,
        },
        revision_id: 0,
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

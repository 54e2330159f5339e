//! Authentication stage.
//!
//! Two exclusive policies: HTTP basic auth against bcrypt hashes, or a
//! shared key carried in a named request header. Every failure is a 401;
//! nothing beyond the stage runs for a rejected request.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::warn;

use crate::config::AuthMode;

/// Realm advertised in basic-auth challenges.
pub const REALM: &str = "gatehouse";

/// Why a request was rejected. Never surfaced beyond the 401.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("malformed credentials")]
    Malformed,

    #[error("unknown user `{0}`")]
    UnknownUser(String),

    #[error("password mismatch for `{0}`")]
    BadPassword(String),

    #[error("shared key mismatch")]
    KeyMismatch,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthConfigError {
    #[error("invalid auth header name `{0}`")]
    HeaderName(String),
}

#[derive(Debug, Clone)]
pub enum AuthPolicy {
    /// Username → bcrypt hash.
    Basic { users: HashMap<String, String> },
    SharedKey { header: HeaderName, key: String },
}

impl AuthPolicy {
    pub fn from_mode(mode: &AuthMode) -> Result<Self, AuthConfigError> {
        match mode {
            AuthMode::Basic(users) => Ok(AuthPolicy::Basic {
                users: users.iter().map(|(u, h)| (u.clone(), h.clone())).collect(),
            }),
            AuthMode::SharedKey { header, key } => {
                let header = HeaderName::from_bytes(header.as_bytes())
                    .map_err(|_| AuthConfigError::HeaderName(header.clone()))?;
                Ok(AuthPolicy::SharedKey {
                    header,
                    key: key.clone(),
                })
            }
        }
    }

    pub async fn authorize(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        match self {
            AuthPolicy::Basic { users } => {
                let (user, password) = basic_credentials(headers)?;
                let hash = match users.get(&user) {
                    Some(hash) if !hash.is_empty() => hash.clone(),
                    _ => return Err(AuthError::UnknownUser(user)),
                };
                if password.is_empty() {
                    return Err(AuthError::BadPassword(user));
                }

                // Verification is CPU-bound.
                let verified =
                    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await;
                match verified {
                    Ok(Ok(true)) => Ok(()),
                    _ => Err(AuthError::BadPassword(user)),
                }
            }
            AuthPolicy::SharedKey { header, key } => {
                let presented = headers
                    .get(header)
                    .ok_or(AuthError::MissingCredentials)?;
                if presented.as_bytes() == key.as_bytes() {
                    Ok(())
                } else {
                    Err(AuthError::KeyMismatch)
                }
            }
        }
    }

    fn reject(&self) -> Response {
        let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        if let AuthPolicy::Basic { .. } = self {
            let challenge = format!("Basic realm=\"{}\"", REALM);
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

/// Decode `Authorization: Basic <base64(user:password)>`.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::Malformed)?;

    let (scheme, encoded) = value.split_once(' ').ok_or(AuthError::Malformed)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::Malformed);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;
    let (user, password) = decoded.split_once(':').ok_or(AuthError::Malformed)?;

    Ok((user.to_string(), password.to_string()))
}

pub async fn auth_middleware(
    State(policy): State<Arc<AuthPolicy>>,
    request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    match policy.authorize(request.headers()).await {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                reason = %e,
                "Authentication failed"
            );
            policy.reject()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn basic_header(user: &str, password: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let encoded = STANDARD.encode(format!("{}:{}", user, password));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", encoded)).unwrap(),
        );
        headers
    }

    fn basic_policy() -> AuthPolicy {
        let hash = bcrypt::hash("wonderland", 4).unwrap();
        AuthPolicy::from_mode(&AuthMode::Basic(BTreeMap::from([("alice".to_string(), hash)])))
            .unwrap()
    }

    #[tokio::test]
    async fn basic_accepts_matching_password() {
        assert!(basic_policy().authorize(&basic_header("alice", "wonderland")).await.is_ok());
    }

    #[tokio::test]
    async fn basic_rejects_wrong_password_and_unknown_user() {
        let policy = basic_policy();
        assert!(matches!(
            policy.authorize(&basic_header("alice", "wrong")).await,
            Err(AuthError::BadPassword(_))
        ));
        assert!(matches!(
            policy.authorize(&basic_header("bob", "wonderland")).await,
            Err(AuthError::UnknownUser(_))
        ));
        assert!(matches!(
            policy.authorize(&basic_header("alice", "")).await,
            Err(AuthError::BadPassword(_))
        ));
        assert!(matches!(
            policy.authorize(&HeaderMap::new()).await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn shared_key_compares_exactly() {
        let policy = AuthPolicy::from_mode(&AuthMode::SharedKey {
            header: "X-Api-Key".into(),
            key: "k1".into(),
        })
        .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("k1"));
        assert!(policy.authorize(&headers).await.is_ok());

        headers.insert("x-api-key", HeaderValue::from_static("K1"));
        assert!(matches!(policy.authorize(&headers).await, Err(AuthError::KeyMismatch)));

        assert!(matches!(
            policy.authorize(&HeaderMap::new()).await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn basic_rejection_carries_challenge() {
        let response = basic_policy().reject();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Basic realm=\"gatehouse\""
        );
    }
}

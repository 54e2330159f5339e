//! Response header rule stage.
//!
//! Sets the default `Server` header, then applies configured additions and
//! removals, exactly once per response, before the head goes to the client.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::HeaderSpec;

/// Default `Server` header value.
pub const SERVER_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum HeaderRuleError {
    #[error("invalid header name `{0}`")]
    Name(String),

    #[error("invalid value for header `{0}`")]
    Value(String),
}

/// Parsed header additions and removals.
#[derive(Debug, Clone, Default)]
pub struct HeaderRule {
    add: Vec<(HeaderName, HeaderValue)>,
    remove: Vec<HeaderName>,
}

impl HeaderRule {
    pub fn new(spec: &HeaderSpec) -> Result<Self, HeaderRuleError> {
        let parse_name = |name: &str| {
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| HeaderRuleError::Name(name.to_string()))
        };

        let add = spec
            .add
            .iter()
            .map(|(name, value)| {
                let value = HeaderValue::from_str(value)
                    .map_err(|_| HeaderRuleError::Value(name.clone()))?;
                Ok((parse_name(name)?, value))
            })
            .collect::<Result<Vec<_>, HeaderRuleError>>()?;

        let remove = spec
            .remove
            .iter()
            .map(|name| parse_name(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { add, remove })
    }

    fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
        for (name, value) in &self.add {
            headers.insert(name.clone(), value.clone());
        }
        for name in &self.remove {
            headers.remove(name);
        }
    }
}

/// A response decorated with a header rule and a committed flag.
///
/// The rule runs on the first `commit`; later calls are no-ops.
#[derive(Debug)]
pub struct HeaderCommit {
    response: Response,
    rule: Arc<HeaderRule>,
    committed: bool,
}

impl HeaderCommit {
    pub fn new(response: Response, rule: Arc<HeaderRule>) -> Self {
        Self {
            response,
            rule,
            committed: false,
        }
    }

    pub fn commit(&mut self) {
        if self.committed {
            return;
        }
        self.rule.apply(self.response.headers_mut());
        self.committed = true;
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.response.headers_mut()
    }
}

impl IntoResponse for HeaderCommit {
    fn into_response(mut self) -> Response {
        self.commit();
        self.response
    }
}

pub async fn header_rule_middleware(
    State(rule): State<Arc<HeaderRule>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    HeaderCommit::new(next.run(request).await, rule).into_response()
}

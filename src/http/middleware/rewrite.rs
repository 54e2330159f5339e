//! URL rewrite stage.
//!
//! Exact-path lookup: a request whose path equals a configured source path
//! continues with the mapped destination path; the query string is kept.
//! Keys are unique, so there is never more than one candidate.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{uri::PathAndQuery, Request, Uri},
    middleware::Next,
    response::Response,
};

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("rewrite `{from}` -> `{to}`: both paths must start with '/' and carry no query")]
    NotAPath { from: String, to: String },
}

/// Exact request path → replacement path.
#[derive(Debug, Clone, Default)]
pub struct RewriteTable {
    rules: BTreeMap<String, String>,
}

impl RewriteTable {
    pub fn new(rules: &BTreeMap<String, String>) -> Result<Self, RewriteError> {
        for (from, to) in rules {
            let is_path = |p: &str| {
                p.starts_with('/') && !p.contains('?') && PathAndQuery::try_from(p).is_ok()
            };
            if !is_path(from) || !is_path(to) {
                return Err(RewriteError::NotAPath {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }
        Ok(Self {
            rules: rules.clone(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn lookup(&self, path: &str) -> Option<&str> {
        self.rules.get(path).map(String::as_str)
    }

    /// The rewritten URI, or `None` when the path is not mapped.
    pub fn rewrite(&self, uri: &Uri) -> Option<Uri> {
        let to = self.lookup(uri.path())?;
        let path_and_query = match uri.query() {
            Some(query) => format!("{}?{}", to, query),
            None => to.to_string(),
        };

        let mut parts = uri.clone().into_parts();
        parts.path_and_query = Some(path_and_query.parse().ok()?);
        Uri::from_parts(parts).ok()
    }
}

pub async fn rewrite_middleware(
    State(table): State<Arc<RewriteTable>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(uri) = table.rewrite(request.uri()) {
        tracing::debug!(from = %request.uri(), to = %uri, "Rewrote request path");
        *request.uri_mut() = uri;
    }
    next.run(request).await
}

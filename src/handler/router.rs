//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: matches the request path against
//! the configured prefix, answers mismatches with 404 and forwards everything
//! else to the file service with the rewritten path.

use crate::http;
use crate::logger;
use crate::routing::{PathMatcher, RewriteResult};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::uri::{PathAndQuery, Uri};
use hyper::{Request, Response};
use std::future::Future;
use std::sync::Arc;

/// Component that answers requests once their path has been rewritten
///
/// Implementations own their failure handling; whatever response they build
/// is returned to the client as is.
pub trait FileService: Send + Sync {
    fn serve<B: Send>(
        &self,
        req: Request<B>,
    ) -> impl Future<Output = Response<Full<Bytes>>> + Send;
}

impl<T: FileService> FileService for Arc<T> {
    fn serve<B: Send>(
        &self,
        req: Request<B>,
    ) -> impl Future<Output = Response<Full<Bytes>>> + Send {
        (**self).serve(req)
    }
}

/// Prefix-aware front of the file service
pub struct RequestRouter<S> {
    matcher: Box<dyn PathMatcher>,
    service: S,
}

impl<S: FileService> RequestRouter<S> {
    pub fn new(matcher: Box<dyn PathMatcher>, service: S) -> Self {
        Self { matcher, service }
    }

    /// Route a single request
    ///
    /// Only the path component of the URI is replaced; method, headers,
    /// query string and body reach the service untouched.
    pub async fn handle_request<B: Send>(&self, mut req: Request<B>) -> Response<Full<Bytes>> {
        let path = match self.matcher.rewrite(req.uri().path()) {
            RewriteResult::Rewritten(path) => path,
            RewriteResult::Rejected => {
                logger::log_prefix_mismatch(req.uri().path());
                return http::build_404_response();
            }
        };

        if needs_rewrite(req.uri(), &path) {
            match rewrite_uri(req.uri(), &path) {
                Ok(uri) => *req.uri_mut() = uri,
                Err(e) => {
                    logger::log_warning(&format!(
                        "Cannot rewrite '{}' to '{path}': {e}",
                        req.uri()
                    ));
                    return http::build_400_response();
                }
            }
        }

        self.service.serve(req).await
    }
}

/// Whether the URI has to be rebuilt to carry `new_path`
///
/// URIs without a path (authority form) and unchanged paths are forwarded as is.
fn needs_rewrite(uri: &Uri, new_path: &str) -> bool {
    uri.path_and_query().is_some() && uri.path() != new_path
}

/// Replace the path of a URI while preserving scheme, authority and query
fn rewrite_uri(original: &Uri, new_path: &str) -> Result<Uri, hyper::http::Error> {
    let path_and_query = match original.query() {
        Some(query) => format!("{new_path}?{query}"),
        None => new_path.to_string(),
    };

    let mut parts = original.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}

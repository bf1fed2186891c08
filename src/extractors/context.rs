//! Request metadata handed to the request hook.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, Method},
};

/// Method, path and headers of the current request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

impl RequestContext {
    /// Header value as trimmed text; None when absent, empty or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Token from `Authorization: Bearer <token>`.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            headers: parts.headers.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn captures_method_path_and_token() {
        let req = Request::builder()
            .method("DELETE")
            .uri("/orders/7?x=1")
            .header("Authorization", "Bearer  s3cret ")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.method, Method::DELETE);
        assert_eq!(ctx.path, "/orders/7");
        assert_eq!(ctx.bearer_token(), Some("s3cret"));
        assert_eq!(ctx.header("x-missing"), None);
    }
}

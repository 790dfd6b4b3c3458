//! Synchronous HTTP connectors.
//!
//! # Responsibilities
//! - Entrypoint: represent plain request/response HTTP ingress
//! - Endpoint: forward the buffered request to the backend and write the
//!   backend response into the context
//!
//! # Design Decisions
//! - One shared hyper client per connector; connections are pooled by the
//!   client, not per request
//! - Upstream failures become controlled 502 failures, never raw errors

use bytes::Bytes;
use http::uri::{Authority, PathAndQuery, Scheme};
use http::{Request, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::context::{ExecutionContext, ExecutionFailure, Interruption, PhaseResult};

const UPSTREAM_CONNECTION_ERROR_KEY: &str = "UPSTREAM_CONNECTION_ERROR";

/// Client-facing request/response HTTP entrypoint.
#[derive(Debug, Default)]
pub struct HttpEntrypoint;

impl HttpEntrypoint {
    pub fn new() -> Self {
        Self
    }

    pub fn id(&self) -> &str {
        "http-proxy"
    }
}

/// Backend-facing HTTP proxy connector.
pub struct HttpProxyConnector {
    target: Url,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl std::fmt::Debug for HttpProxyConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProxyConnector").field("target", &self.target.as_str()).finish()
    }
}

impl HttpProxyConnector {
    pub fn new(target: Url) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { target, client }
    }

    /// Build from a definition configuration block: `{ "target": "http://..." }`.
    pub fn from_configuration(configuration: Option<&serde_json::Value>) -> Option<Self> {
        let target = configuration?.get("target")?.as_str()?;
        Url::parse(target).ok().map(Self::new)
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    fn upstream_uri(&self, ctx: &ExecutionContext) -> Result<Uri, http::Error> {
        let mut base_path = self.target.path().trim_end_matches('/').to_string();
        base_path.push_str(&ctx.request.path);
        let path_and_query = base_path.parse::<PathAndQuery>()?;

        let authority = self.target.authority().parse::<Authority>()?;
        let scheme = if self.target.scheme() == "https" { Scheme::HTTPS } else { Scheme::HTTP };

        Uri::builder()
            .scheme(scheme)
            .authority(authority)
            .path_and_query(path_and_query)
            .build()
    }

    pub async fn connect(&self, ctx: &mut ExecutionContext) -> PhaseResult {
        let uri = self
            .upstream_uri(ctx)
            .map_err(|error| Interruption::Technical(format!("invalid upstream uri: {error}")))?;

        let mut builder = Request::builder().method(ctx.request.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in ctx.request.headers.iter() {
                if name != http::header::HOST {
                    headers.insert(name.clone(), value.clone());
                }
            }
            if let Ok(value) = ctx.request.transaction_id.parse() {
                headers.insert("x-transaction-id", value);
            }
        }

        let request = builder
            .body(Full::new(ctx.request.body.clone()))
            .map_err(|error| Interruption::Technical(format!("invalid upstream request: {error}")))?;

        tracing::debug!(
            request_id = %ctx.request.id,
            target = %self.target,
            "Forwarding request upstream"
        );

        let response = self.client.request(request).await.map_err(|error| {
            tracing::error!(request_id = %ctx.request.id, error = %error, "Upstream request failed");
            Interruption::Failure(ExecutionFailure::new(
                502,
                UPSTREAM_CONNECTION_ERROR_KEY,
                "Upstream request failed",
            ))
        })?;

        let (parts, body) = response.into_parts();
        ctx.response.status = parts.status;
        ctx.response.headers = parts.headers;
        ctx.response.body = body
            .collect()
            .await
            .map_err(|error| {
                Interruption::Failure(ExecutionFailure::new(
                    502,
                    UPSTREAM_CONNECTION_ERROR_KEY,
                    format!("Upstream response failed: {error}"),
                ))
            })?
            .to_bytes();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GatewayRequest;
    use http::Method;

    #[test]
    fn configuration_requires_a_parseable_target() {
        assert!(HttpProxyConnector::from_configuration(Some(&serde_json::json!({ "target": "http://upstream:8080" }))).is_some());
        assert!(HttpProxyConnector::from_configuration(Some(&serde_json::json!({ "target": "not a url" }))).is_none());
        assert!(HttpProxyConnector::from_configuration(None).is_none());
    }

    #[test]
    fn upstream_uri_joins_target_and_request_path() {
        let connector = HttpProxyConnector::new(Url::parse("http://upstream:8080/base/").unwrap());
        let ctx = ExecutionContext::new(GatewayRequest::new(Method::GET, "/orders"));
        let uri = connector.upstream_uri(&ctx).unwrap();
        assert_eq!(uri.to_string(), "http://upstream:8080/base/orders");
    }
}

// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Validating reverse proxy: forwards every request to a fixed upstream and
//! runs the contract middleware over each exchange as a side effect. The
//! proxied traffic is never blocked or altered by validation findings.

use crate::capture::ResponseSink;
use crate::middleware::{Handling, Middleware};
use crate::request::InboundRequest;
use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Incoming;
use hyper::{service::service_fn, HeaderMap, Request, Response, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder as AutoConnBuilder;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{error, info, trace, warn};
use uuid::Uuid;

type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>, Infallible>> + Send>>;

// RFC 7230 Section 6.1: Hop-by-hop headers must not be forwarded by proxies.
static HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

struct Shared {
    client: LegacyClient<HttpConnector, Full<Bytes>>,
    upstream: Uri,
    middleware: Middleware,
}

/// Inbound request as seen by the validation pipeline: method, target and a
/// fully-collected body.
struct ProxiedRequest {
    method: String,
    path: String,
    uri: String,
    headers: HeaderMap,
    body: String,
}

impl InboundRequest for ProxiedRequest {
    fn method(&self) -> &str {
        &self.method
    }
    fn path(&self) -> &str {
        &self.path
    }
    fn uri(&self) -> &str {
        &self.uri
    }
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
    fn body(&self) -> &str {
        &self.body
    }
}

/// What the proxy will send back to the client. Plugged under the capture
/// wrapper so validation observes exactly the served response.
#[derive(Default)]
struct UpstreamSink {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseSink for UpstreamSink {
    fn status(&self) -> u16 {
        self.status
    }
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
    fn write_chunk(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }
    fn finish(&mut self) {}
}

pub async fn run_proxy(listen: SocketAddr, upstream: Uri, middleware: Middleware) -> anyhow::Result<()> {
    // Default behavior: no accept limit (runs forever)
    run_proxy_with_limit(listen, upstream, middleware, None).await
}

/// Testable variant of `run_proxy` that accepts an optional `accept_limit`.
/// When `accept_limit` is `Some(n)`, the accept loop accepts `n` connections
/// and then returns. Connection handlers are spawned asynchronously and may
/// still be running when this function returns.
pub async fn run_proxy_with_limit(
    listen: SocketAddr,
    upstream: Uri,
    middleware: Middleware,
    accept_limit: Option<usize>,
) -> anyhow::Result<()> {
    let client: LegacyClient<_, Full<Bytes>> =
        LegacyClient::builder(TokioExecutor::new()).build(HttpConnector::new());

    let shared = Arc::new(Shared {
        client,
        upstream,
        middleware,
    });

    // Manual TcpListener accept loop; hyper v1 has no make_service helper.
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(%listen, "listening");

    let executor = TokioExecutor::new();
    let server_builder = AutoConnBuilder::new(executor);

    let mut remaining = accept_limit;
    loop {
        if let Some(0) = remaining {
            break;
        }

        let (stream, remote_addr) = listener.accept().await?;
        trace!(%remote_addr, "accepted connection");

        if let Some(ref mut n) = remaining {
            *n -= 1;
        }

        let shared = shared.clone();
        let builder_clone = server_builder.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let shared = shared.clone();
                let fut: ServiceFuture = Box::pin(async move { handle_exchange(req, shared).await });
                fut
            });

            let io = TokioIo::new(stream);
            if let Err(e) = builder_clone.serve_connection(io, service).await {
                error!(%e, "connection error");
            }
        });
    }

    Ok(())
}

async fn handle_exchange<B>(
    req: Request<B>,
    shared: Arc<Shared>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, Infallible>
where
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let exchange = Uuid::new_v4();

    let method = req.method().as_str().to_string();
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();
    let path = req.uri().path().to_string();
    let req_headers = req.headers().clone();

    let body_bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let boxed: Box<dyn std::error::Error + Send + Sync> = e.into();
            error!(%exchange, "failed to collect request body: {}", boxed);
            return Ok(plain_response(500, "request body collect error"));
        }
    };

    let proxied = ProxiedRequest {
        method: method.clone(),
        path,
        uri: target.clone(),
        headers: req_headers.clone(),
        body: String::from_utf8_lossy(&body_bytes).into_owned(),
    };

    // Snapshot and capture arming happen here, before the upstream call, so
    // request validation can run while the upstream round trip is in flight.
    let Handling { response, outcome } =
        shared.middleware.handle(&proxied, UpstreamSink::default());

    tokio::spawn(async move {
        match outcome.await {
            Ok(outcome) => trace!(%exchange, ?outcome, "exchange validated"),
            Err(e) if e.is_no_match() => warn!(%exchange, %e, "passing through unmatched request"),
            Err(e) => error!(%exchange, %e, "validation failed"),
        }
    });

    let scheme = shared.upstream.scheme_str().unwrap_or("http");
    let authority = shared
        .upstream
        .authority()
        .map(|a| a.as_str())
        .unwrap_or("localhost");
    let upstream_uri: Uri = match format!("{scheme}://{authority}{target}").parse() {
        Ok(uri) => uri,
        Err(e) => {
            error!(%exchange, %e, "failed to build upstream uri");
            return Ok(serve(response, 500, HeaderMap::new(), Bytes::from("internal error")));
        }
    };

    let mut builder = Request::builder().method(method.as_str()).uri(upstream_uri);
    for (name, value) in req_headers.iter() {
        // The upstream host comes from the URI, not the client's Host.
        if name != hyper::header::HOST {
            builder = builder.header(name, value);
        }
    }
    let upstream_req = match builder.body(Full::new(body_bytes)) {
        Ok(r) => r,
        Err(e) => {
            error!(%exchange, %e, "failed to build upstream request");
            return Ok(serve(response, 500, HeaderMap::new(), Bytes::from("internal error")));
        }
    };

    let upstream_resp = match shared.client.request(upstream_req).await {
        Ok(r) => r,
        Err(e) => {
            error!(%exchange, %e, "upstream error");
            return Ok(serve(
                response,
                502,
                HeaderMap::new(),
                Bytes::from(format!("upstream error: {e}")),
            ));
        }
    };

    let status = upstream_resp.status().as_u16();
    let headers = upstream_resp.headers().clone();
    let resp_body_bytes = match upstream_resp.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(%exchange, %e, "upstream body collect error");
            return Ok(serve(
                response,
                500,
                HeaderMap::new(),
                Bytes::from("upstream body collect error"),
            ));
        }
    };

    let connection_hop_headers = parse_connection_tokens(headers.get(hyper::header::CONNECTION));
    let mut forwarded = HeaderMap::new();
    for (name, value) in headers.iter() {
        let name_str = name.as_str().to_ascii_lowercase();
        if is_hop_by_hop_header(&name_str, &connection_hop_headers) {
            continue;
        }
        forwarded.append(name, value.clone());
    }

    Ok(serve(response, status, forwarded, resp_body_bytes))
}

/// Write the served response through the capture wrapper, then build the
/// hyper response for the client from the same bytes.
fn serve(
    mut response: crate::capture::ObservedResponse<UpstreamSink>,
    status: u16,
    headers: HeaderMap,
    body: Bytes,
) -> Response<BoxBody<Bytes, Infallible>> {
    {
        let sink = response.get_mut();
        sink.status = status;
        sink.headers = headers;
    }
    response.write_chunk(&body);
    response.finish();

    let sink = response.into_inner();
    let mut builder = Response::builder().status(sink.status);
    for (name, value) in sink.headers.iter() {
        builder = builder.header(name, value);
    }
    builder
        .body(Full::new(body.clone()).boxed())
        .unwrap_or_else(|_| Response::new(Full::new(body).boxed()))
}

fn plain_response(status: u16, message: &str) -> Response<BoxBody<Bytes, Infallible>> {
    let body = Full::new(Bytes::from(message.to_string())).boxed();
    Response::builder()
        .status(status)
        .body(body)
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from(message.to_string())).boxed()))
}

// Parse a Connection header value into a lowercased set of tokens
fn parse_connection_tokens(
    val: Option<&hyper::header::HeaderValue>,
) -> std::collections::HashSet<String> {
    let mut set = std::collections::HashSet::new();
    if let Some(conn_val) = val {
        if let Ok(conn_str) = conn_val.to_str() {
            for token in conn_str.split(',') {
                let trimmed = token.trim().to_ascii_lowercase();
                if !trimmed.is_empty() {
                    set.insert(trimmed);
                }
            }
        }
    }
    set
}

fn is_hop_by_hop_header(
    name: &str,
    connection_hop_headers: &std::collections::HashSet<String>,
) -> bool {
    connection_hop_headers.contains(name) || HOP_BY_HOP_HEADERS.contains(&name)
}

//! Middleware types returned from [`ConfigExt`](super::ConfigExt) methods.
use std::sync::Arc;
use std::task::{Context, Poll};

use http::{header::HeaderName, uri, HeaderValue, Request, Uri};
use tower::{Layer, Service};

/// Layer that sets the base URI of requests to the configured cluster.
#[derive(Clone)]
pub struct BaseUriLayer {
    base_uri: Uri,
}

impl BaseUriLayer {
    pub(crate) fn new(base_uri: Uri) -> Self {
        Self { base_uri }
    }
}

impl<S> Layer<S> for BaseUriLayer {
    type Service = BaseUri<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BaseUri {
            base_uri: self.base_uri.clone(),
            inner,
        }
    }
}

/// Service that sets the base URI on each request.
#[derive(Clone)]
pub struct BaseUri<S> {
    base_uri: Uri,
    inner: S,
}

impl<S, ReqBody> Service<Request<ReqBody>> for BaseUri<S>
where
    S: Service<Request<ReqBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let (mut parts, body) = req.into_parts();
        parts.uri = set_base_uri(&self.base_uri, &parts.uri);
        self.inner.call(Request::from_parts(parts, body))
    }
}

// Request paths join under the base path; query strings pass through.
fn set_base_uri(base_uri: &Uri, request_uri: &Uri) -> Uri {
    let base_path = base_uri.path().trim_end_matches('/');
    let mut path_and_query = match request_uri.path_and_query() {
        Some(pq) => format!("{base_path}{pq}"),
        None => base_path.to_owned(),
    };
    if path_and_query.is_empty() {
        path_and_query.push('/');
    }

    let mut builder = uri::Builder::new();
    if let Some(scheme) = base_uri.scheme() {
        builder = builder.scheme(scheme.clone());
    }
    if let Some(authority) = base_uri.authority() {
        builder = builder.authority(authority.clone());
    }
    builder
        .path_and_query(path_and_query)
        .build()
        .expect("valid uri from valid base and request parts")
}

/// Layer that adds a static set of extra headers to each request
#[derive(Clone)]
pub struct ExtraHeadersLayer {
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl ExtraHeadersLayer {
    pub(crate) fn new(headers: Vec<(HeaderName, HeaderValue)>) -> Self {
        Self {
            headers: Arc::new(headers),
        }
    }
}

impl<S> Layer<S> for ExtraHeadersLayer {
    type Service = ExtraHeaders<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExtraHeaders {
            inner,
            headers: self.headers.clone(),
        }
    }
}

/// Service that adds a static set of extra headers to each request
#[derive(Clone)]
pub struct ExtraHeaders<S> {
    inner: S,
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl<S, ReqBody> Service<Request<ReqBody>> for ExtraHeaders<S>
where
    S: Service<Request<ReqBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        req.headers_mut().extend(self.headers.iter().cloned());
        self.inner.call(req)
    }
}

//! A thin client for the Kubernetes REST API
//!
//! The [`Client`] issues plain HTTP requests against API paths and hands
//! back JSON values, and can open watch/log streams with
//! [`Client::watch`] and wait on them with [`Client::wait_for`].
use bytes::Bytes;
use futures::{future::BoxFuture, Stream};
use http::{header::CONTENT_TYPE, Method, Request, Response, StatusCode, Uri};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::{buffer::Buffer, util::BoxService, BoxError, Layer, Service, ServiceExt};
use tower_http::map_response_body::MapResponseBodyLayer;

use crate::{error::ErrorResponse, Config, Error, Result};

mod body;
mod builder;
mod config_ext;
pub mod middleware;
mod stream;
mod tls;
mod wait;

pub use body::Body;
pub use builder::{ClientBuilder, GenericService};
pub use config_ext::ConfigExt;
pub use stream::{EventType, StreamEvent, Watcher};
pub use wait::Condition;

/// Client for connecting with a Kubernetes cluster.
///
/// The easiest way to instantiate the client is either by
/// inferring the configuration from the environment using
/// [`Client::try_default`] or with an existing [`Config`]
/// using [`Client::try_from`].
#[derive(Clone)]
pub struct Client {
    // - `Buffer` for cheap clone
    // - boxed future for a nameable dynamic type
    inner: Buffer<Request<Body>, BoxFuture<'static, Result<Response<Body>, BoxError>>>,
}

impl Client {
    /// Create a [`Client`] using a custom `Service` stack.
    ///
    /// [`ConfigExt`](crate::client::ConfigExt) provides extensions for
    /// building a custom stack.
    ///
    /// To create with the default stack with a [`Config`], use
    /// [`Client::try_from`]. To create with an inferred [`Config`], use
    /// [`Client::try_default`].
    ///
    /// # Example
    ///
    /// ```rust
    /// # async fn doc() -> Result<(), Box<dyn std::error::Error>> {
    /// use kubelink::{client::{Body, ConfigExt}, Client, Config};
    /// use hyper_util::rt::TokioExecutor;
    /// use tower::ServiceBuilder;
    ///
    /// let config = Config::infer().await?;
    /// let https = config.rustls_https_connector()?;
    /// let hyper_client: hyper_util::client::legacy::Client<_, Body> =
    ///     hyper_util::client::legacy::Client::builder(TokioExecutor::new()).build(https);
    /// let service = ServiceBuilder::new()
    ///     .layer(config.base_uri_layer())
    ///     .option_layer(config.auth_layer()?)
    ///     .map_err(tower::BoxError::from)
    ///     .service(hyper_client);
    /// let client = Client::new(service);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new<S, B>(service: S) -> Self
    where
        S: Service<Request<Body>, Response = Response<B>> + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        // Transform response body to the crate `Body` and use a type-erased
        // error to avoid type parameters.
        let service = MapResponseBodyLayer::new(Body::wrap_body)
            .layer(service)
            .map_err(|e| e.into());
        Self {
            inner: Buffer::new(BoxService::new(service), 1024),
        }
    }

    /// Create and initialize a [`Client`] using the inferred configuration.
    ///
    /// Uses the in-cluster environment when available and the local
    /// kubeconfig otherwise; fails when neither yields a configuration.
    pub async fn try_default() -> Result<Self> {
        let config = Config::infer()
            .await
            .map_err(|e| Error::NoConfig(Box::new(e)))?;
        Self::try_from(config)
    }

    /// Perform a raw HTTP request against the API and return the raw
    /// response back.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        let mut svc = self.inner.clone();
        let res = svc
            .ready()
            .await
            .map_err(Error::Service)?
            .call(request)
            .await
            .map_err(|err| {
                // Error decorating request
                err.downcast::<Error>()
                    .map(|e| *e)
                    // Error requesting
                    .or_else(|err| err.downcast::<hyper::Error>().map(|err| Error::HyperError(*err)))
                    // Error from another middleware
                    .unwrap_or_else(Error::Service)
            })?;
        Ok(res)
    }

    /// Perform a raw HTTP request against the API and deserialize the
    /// response as JSON to some known type.
    pub async fn request<T>(&self, request: Request<Vec<u8>>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let text = self.request_text(request).await?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!("{}, {:?}", text, e);
            Error::SerdeError(e)
        })
    }

    /// Perform a raw HTTP request against the API and get back the response
    /// as a string.
    pub async fn request_text(&self, request: Request<Vec<u8>>) -> Result<String> {
        let res = self.send(request.map(Body::from)).await?;
        let status = res.status();
        let body_bytes = res.into_body().collect().await?.to_bytes();
        let text = String::from_utf8(body_bytes.to_vec()).map_err(Error::FromUtf8)?;
        handle_api_errors(&text, status)?;

        Ok(text)
    }

    /// Perform a raw HTTP request against the API and get back the response
    /// as a stream of bytes.
    pub async fn request_text_stream(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<impl Stream<Item = Result<Bytes>>> {
        let res = self.send(request.map(Body::from)).await?;
        Ok(res.into_body().into_data_stream())
    }

    /// Open a watch (or log-follow) stream on `url` and return its
    /// [`Watcher`].
    ///
    /// URLs whose path ends in `/log` stream raw [`StreamEvent::Line`]s;
    /// anything else is treated as a watch endpoint producing tagged
    /// events. The matching `follow=1` or `watch=1` pair is merged into
    /// the query string, keeping caller-supplied parameters.
    pub async fn watch(&self, url: &str) -> Result<Watcher> {
        let (uri, mode) = stream::watch_uri(url)?;
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .map_err(Error::HttpError)?;

        let res = self.send(request).await?;
        let status = res.status();
        tracing::trace!("watch headers: {:?}", res.headers());
        if status.is_client_error() || status.is_server_error() {
            let body_bytes = res.into_body().collect().await?.to_bytes();
            let text = String::from_utf8(body_bytes.to_vec()).map_err(Error::FromUtf8)?;
            return Err(api_error(&text, status));
        }

        Ok(Watcher::new(res.into_body(), mode))
    }
}

/// Convenience verbs mirroring plain REST calls against API paths.
///
/// List responses unwrap to their `items`; single resources pass through.
impl Client {
    /// GET `url` and return the decoded response.
    pub async fn get(&self, url: &str) -> Result<Value> {
        self.request_value(Method::GET, url, None).await
    }

    /// GET `url` as plain text (pod logs and similar text endpoints).
    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.request_text(self.http_request(Method::GET, url, None)?)
            .await
    }

    /// POST `resource` to `url`.
    pub async fn post(&self, url: &str, resource: &Value) -> Result<Value> {
        self.request_value(Method::POST, url, Some(resource)).await
    }

    /// PUT `resource` to `url`.
    pub async fn put(&self, url: &str, resource: &Value) -> Result<Value> {
        self.request_value(Method::PUT, url, Some(resource)).await
    }

    /// Merge-patch the resource at `url`.
    pub async fn patch(&self, url: &str, patch: &Value) -> Result<Value> {
        self.request_value(Method::PATCH, url, Some(patch)).await
    }

    /// DELETE the resource at `url`.
    pub async fn delete(&self, url: &str) -> Result<Value> {
        self.request_value(Method::DELETE, url, None).await
    }

    /// HEAD `url`, discarding the response.
    pub async fn head(&self, url: &str) -> Result<()> {
        self.request_text(self.http_request(Method::HEAD, url, None)?)
            .await
            .map(|_| ())
    }

    /// POST `resource` to `url`, falling back to a merge-patch of the named
    /// resource when it already exists.
    pub async fn upsert(&self, url: &str, resource: &Value) -> Result<Value> {
        match self.post(url, resource).await {
            Err(Error::Api(err)) if err.code == StatusCode::CONFLICT.as_u16() => {
                let name = resource["metadata"]["name"]
                    .as_str()
                    .ok_or(Error::Api(err))?;
                self.patch(&format!("{url}/{name}"), resource).await
            }
            other => other,
        }
    }

    async fn request_value(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let request = self.http_request(method, url, body)?;
        let value: Value = self.request(request).await?;
        Ok(extract_items(value))
    }

    fn http_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Request<Vec<u8>>> {
        let uri = url.parse::<Uri>().map_err(Error::InvalidUri)?;
        let mut builder = Request::builder().method(method.clone()).uri(uri);
        if body.is_some() {
            let content_type = if method == Method::PATCH {
                "application/merge-patch+json"
            } else {
                "application/json"
            };
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        let bytes = match body {
            Some(value) => serde_json::to_vec(value).map_err(Error::SerdeError)?,
            None => Vec::new(),
        };
        builder.body(bytes).map_err(Error::HttpError)
    }
}

// List responses unwrap to their `items`; everything else passes through.
fn extract_items(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("items") {
            Some(items) => items,
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Kubernetes returned error handling
///
/// Either an explicit `Status` error payload, or something we could not
/// parse as one, reconstructed from the HTTP status.
fn api_error(text: &str, s: StatusCode) -> Error {
    if let Ok(errdata) = serde_json::from_str::<ErrorResponse>(text) {
        tracing::debug!("Unsuccessful: {errdata:?}");
        Error::Api(errdata)
    } else {
        tracing::warn!("Unsuccessful data error parse: {text}");
        Error::Api(ErrorResponse {
            status: s.to_string(),
            code: s.as_u16(),
            message: format!("{text:?}"),
            reason: "Failed to parse error data".into(),
        })
    }
}

fn handle_api_errors(text: &str, s: StatusCode) -> Result<()> {
    if s.is_client_error() || s.is_server_error() {
        Err(api_error(text, s))
    } else {
        Ok(())
    }
}

impl TryFrom<Config> for Client {
    type Error = Error;

    /// Builds a default [`Client`] from a [`Config`], see [`ClientBuilder`]
    /// if more customization is required
    fn try_from(config: Config) -> Result<Self> {
        Ok(ClientBuilder::try_from(config)?.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::pin_mut;
    use serde_json::json;
    use tower_test::mock;

    type MockPair = (
        mock::Mock<Request<Body>, Response<Body>>,
        mock::Handle<Request<Body>, Response<Body>>,
    );

    fn json_response(value: &Value) -> Response<Body> {
        Response::builder()
            .body(Body::from(serde_json::to_vec(value).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn get_returns_single_resource() {
        let (mock_service, handle): MockPair = mock::pair();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::GET);
            assert_eq!(
                request.uri().to_string(),
                "/api/v1/namespaces/default/configmaps/config-2"
            );
            send.send_response(json_response(&json!({
                "kind": "ConfigMap",
                "metadata": { "name": "config-2" },
                "data": { "b": "z" }
            })));
        });

        let client = Client::new(mock_service);
        let config_map = client
            .get("/api/v1/namespaces/default/configmaps/config-2")
            .await
            .unwrap();
        assert_eq!(config_map["metadata"]["name"], "config-2");
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn get_unwraps_list_items() {
        let (mock_service, handle): MockPair = mock::pair();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (_, send) = handle.next_request().await.expect("service not called");
            send.send_response(json_response(&json!({
                "kind": "ConfigMapList",
                "items": [
                    { "metadata": { "name": "config-1" } },
                    { "metadata": { "name": "config-2" } }
                ]
            })));
        });

        let client = Client::new(mock_service);
        let config_maps = client
            .get("/api/v1/namespaces/default/configmaps")
            .await
            .unwrap();
        let names: Vec<_> = config_maps
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["metadata"]["name"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, ["config-1", "config-2"]);
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn patch_sends_merge_patch_content_type() {
        let (mock_service, handle): MockPair = mock::pair();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::PATCH);
            assert_eq!(
                request.headers().get(CONTENT_TYPE).unwrap(),
                "application/merge-patch+json"
            );
            send.send_response(json_response(&json!({"data": {"b": "z"}})));
        });

        let client = Client::new(mock_service);
        client
            .patch(
                "/api/v1/namespaces/default/configmaps/config-2",
                &json!({"data": {"b": "z"}}),
            )
            .await
            .unwrap();
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn api_errors_surface_status_payloads() {
        let (mock_service, handle): MockPair = mock::pair();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (_, send) = handle.next_request().await.expect("service not called");
            send.send_response(
                Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(Body::from(
                        serde_json::to_vec(&json!({
                            "kind": "Status",
                            "status": "Failure",
                            "message": "configmaps \"nope\" not found",
                            "reason": "NotFound",
                            "code": 404
                        }))
                        .unwrap(),
                    ))
                    .unwrap(),
            );
        });

        let client = Client::new(mock_service);
        let err = client
            .get("/api/v1/namespaces/default/configmaps/nope")
            .await
            .unwrap_err();
        match err {
            Error::Api(err) => {
                assert_eq!(err.code, 404);
                assert_eq!(err.reason, "NotFound");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn upsert_patches_on_conflict() {
        let (mock_service, handle): MockPair = mock::pair();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);

            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::POST);
            assert_eq!(request.uri().to_string(), "/api/v1/namespaces/default/configmaps");
            send.send_response(
                Response::builder()
                    .status(StatusCode::CONFLICT)
                    .body(Body::from(
                        serde_json::to_vec(&json!({
                            "kind": "Status",
                            "status": "Failure",
                            "message": "configmaps \"config-1\" already exists",
                            "reason": "AlreadyExists",
                            "code": 409
                        }))
                        .unwrap(),
                    ))
                    .unwrap(),
            );

            let (request, send) = handle.next_request().await.expect("service not called again");
            assert_eq!(request.method(), http::Method::PATCH);
            assert_eq!(
                request.uri().to_string(),
                "/api/v1/namespaces/default/configmaps/config-1"
            );
            send.send_response(json_response(&json!({
                "metadata": { "name": "config-1" },
                "data": { "foo": "baz" }
            })));
        });

        let client = Client::new(mock_service);
        let updated = client
            .upsert(
                "/api/v1/namespaces/default/configmaps",
                &json!({
                    "metadata": { "name": "config-1", "labels": { "role": "test" } },
                    "data": { "foo": "baz" }
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated["data"]["foo"], "baz");
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn watch_requests_augmented_query() {
        let (mock_service, handle): MockPair = mock::pair();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(
                request.uri().to_string(),
                "/api/v1/watch/namespaces/default/configmaps?labelSelector=role%3Dtest&watch=1"
            );
            send.send_response(
                Response::builder()
                    .body(Body::from(
                        b"{\"type\":\"ADDED\",\"object\":{\"metadata\":{\"name\":\"config-1\"}}}\n"
                            .to_vec(),
                    ))
                    .unwrap(),
            );
        });

        let client = Client::new(mock_service);
        let mut watcher = client
            .watch("/api/v1/watch/namespaces/default/configmaps?labelSelector=role%3Dtest")
            .await
            .unwrap();
        match watcher.recv().await.unwrap().unwrap() {
            StreamEvent::Added(object) => {
                assert_eq!(object["metadata"]["name"], "config-1");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn watch_open_failure_propagates() {
        let (mock_service, handle): MockPair = mock::pair();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (_, send) = handle.next_request().await.expect("service not called");
            send.send_response(
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Body::from(b"boom".to_vec()))
                    .unwrap(),
            );
        });

        let client = Client::new(mock_service);
        let err = client
            .watch("/api/v1/watch/namespaces/default/configmaps")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api(e) if e.code == 500));
        spawned.await.unwrap();
    }
}

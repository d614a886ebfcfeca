use http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::{client::legacy::connect::HttpConnector, rt::TokioExecutor};
use tower::{util::BoxService, BoxError, Layer, Service, ServiceBuilder};

use super::{body::Body, config_ext::ConfigExt};
use crate::{Client, Config, Error, Result};

/// Builder for [`Client`] instances with customized [tower](`Service`) middleware.
pub struct ClientBuilder<Svc> {
    service: Svc,
}

impl<Svc> ClientBuilder<Svc> {
    /// Construct a [`ClientBuilder`] from scratch with a fully custom [`Service`] stack.
    ///
    /// This method is only intended for advanced use cases, most users will
    /// want to use [`ClientBuilder::try_from`] instead, which provides a
    /// default stack as a starting point.
    pub fn new(service: Svc) -> Self
    where
        Svc: Service<Request<Body>>,
    {
        Self { service }
    }

    /// Add a [`Layer`] to the current [`Service`] stack.
    pub fn with_layer<L: Layer<Svc>>(self, layer: &L) -> ClientBuilder<L::Service> {
        ClientBuilder {
            service: layer.layer(self.service),
        }
    }

    /// Build a [`Client`] instance with the current [`Service`] stack.
    pub fn build<B>(self) -> Client
    where
        Svc: Service<Request<Body>, Response = Response<B>> + Send + 'static,
        Svc::Future: Send + 'static,
        Svc::Error: Into<BoxError>,
        B: http_body::Body<Data = bytes::Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Client::new(self.service)
    }
}

/// Default dynamic service stack produced from a [`Config`].
pub type GenericService = BoxService<Request<Body>, Response<Incoming>, BoxError>;

impl TryFrom<Config> for ClientBuilder<GenericService> {
    type Error = Error;

    /// Builds a default stack from a given configuration
    fn try_from(config: Config) -> Result<Self> {
        let mut connector = HttpConnector::new();
        connector.enforce_http(false);
        let https = config.rustls_https_connector_with_connector(connector)?;
        let inner =
            hyper_util::client::legacy::Client::builder(TokioExecutor::new()).build::<_, Body>(https);

        let service = ServiceBuilder::new()
            .layer(config.base_uri_layer())
            .option_layer(config.auth_layer()?)
            .map_err(BoxError::from)
            .service(inner);

        Ok(ClientBuilder::new(BoxService::new(service)))
    }
}

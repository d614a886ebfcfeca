use http::{header::AUTHORIZATION, HeaderValue};
use hyper_util::client::legacy::connect::HttpConnector;
use secrecy::ExposeSecret;

use super::{
    middleware::{BaseUriLayer, ExtraHeadersLayer},
    tls,
};
use crate::{Config, Error, Result};

/// Extensions to [`Config`](crate::Config) for building a custom
/// [`Client`](crate::Client).
///
/// See [`Client::new`](crate::Client::new) for usage.
///
/// This trait is sealed and cannot be implemented.
pub trait ConfigExt: private::Sealed {
    /// Layer to set the base URI of requests to the configured server.
    fn base_uri_layer(&self) -> BaseUriLayer;

    /// Optional layer to set the `authorization` header depending on the config.
    fn auth_layer(&self) -> Result<Option<ExtraHeadersLayer>>;

    /// Create a [`rustls::ClientConfig`] based on the config.
    fn rustls_client_config(&self) -> Result<rustls::ClientConfig>;

    /// Create a [`hyper_rustls::HttpsConnector`] based on the config.
    fn rustls_https_connector(&self) -> Result<hyper_rustls::HttpsConnector<HttpConnector>>;

    /// Create a [`hyper_rustls::HttpsConnector`] based on the config and `connector`.
    fn rustls_https_connector_with_connector<H>(
        &self,
        connector: H,
    ) -> Result<hyper_rustls::HttpsConnector<H>>;
}

mod private {
    pub trait Sealed {}
    impl Sealed for crate::Config {}
}

impl ConfigExt for Config {
    fn base_uri_layer(&self) -> BaseUriLayer {
        BaseUriLayer::new(self.cluster_url.clone())
    }

    fn auth_layer(&self) -> Result<Option<ExtraHeadersLayer>> {
        self.authorization
            .as_ref()
            .map(|header| {
                let mut value = HeaderValue::from_str(header.expose_secret())
                    .map_err(http::Error::from)
                    .map_err(Error::HttpError)?;
                value.set_sensitive(true);
                Ok(ExtraHeadersLayer::new(vec![(AUTHORIZATION, value)]))
            })
            .transpose()
    }

    fn rustls_client_config(&self) -> Result<rustls::ClientConfig> {
        let identity = self.identity_pem();
        tls::rustls_tls::rustls_client_config(
            identity.as_deref(),
            self.ca_data.as_ref().map(|ca| ca.as_bytes()),
            self.accept_invalid_certs,
        )
    }

    fn rustls_https_connector(&self) -> Result<hyper_rustls::HttpsConnector<HttpConnector>> {
        let mut connector = HttpConnector::new();
        connector.enforce_http(false);
        self.rustls_https_connector_with_connector(connector)
    }

    fn rustls_https_connector_with_connector<H>(
        &self,
        connector: H,
    ) -> Result<hyper_rustls::HttpsConnector<H>> {
        let rustls_config = self.rustls_client_config()?;
        Ok(hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(rustls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector))
    }
}

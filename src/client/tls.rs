pub mod rustls_tls {
    use std::sync::Arc;

    use rustls::{
        client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider},
        pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime},
        ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
    };

    use crate::{Error, Result};

    /// Create a `rustls::ClientConfig` from certificate material.
    ///
    /// With `accept_invalid` set, server certificates are not verified at
    /// all; client identity is still presented when one is given.
    pub fn rustls_client_config(
        identity_pem: Option<&[u8]>,
        root_cert_pem: Option<&[u8]>,
        accept_invalid: bool,
    ) -> Result<ClientConfig> {
        if accept_invalid {
            let builder = ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoCertificateVerification::new()));
            let config = match identity_pem {
                Some(pem) => {
                    let (certs, key) = client_identity(pem)?;
                    builder
                        .with_client_auth_cert(certs, key)
                        .map_err(|e| Error::SslError(format!("{e}")))?
                }
                None => builder.with_no_client_auth(),
            };
            return Ok(config);
        }

        let mut roots = RootCertStore::empty();
        if let Some(pem_data) = root_cert_pem {
            for der in certs_from_pem(pem_data)? {
                roots
                    .add(der)
                    .map_err(|e| Error::SslError(format!("{e}")))?;
            }
        }
        let builder = ClientConfig::builder().with_root_certificates(roots);
        let config = match identity_pem {
            Some(pem) => {
                let (certs, key) = client_identity(pem)?;
                builder
                    .with_client_auth_cert(certs, key)
                    .map_err(|e| Error::SslError(format!("{e}")))?
            }
            None => builder.with_no_client_auth(),
        };
        Ok(config)
    }

    fn certs_from_pem(data: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
        Ok(pem::parse_many(data)
            .map_err(|e| Error::SslError(format!("{e}")))?
            .into_iter()
            .filter(|p| p.tag() == "CERTIFICATE")
            .map(|p| CertificateDer::from(p.into_contents()))
            .collect())
    }

    fn client_identity(
        pem: &[u8],
    ) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
        use std::io::Cursor;

        let mut reader = Cursor::new(pem);
        let certs = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::SslError("no valid certificate was found".into()))?;
        if certs.is_empty() {
            return Err(Error::SslError("no valid certificate was found".into()));
        }

        reader.set_position(0);
        let key = rustls_pemfile::private_key(&mut reader)
            .map_err(|_| Error::SslError("no valid private key was found".into()))?
            .ok_or_else(|| Error::SslError("no valid private key was found".into()))?;

        Ok((certs, key))
    }

    #[derive(Debug)]
    struct NoCertificateVerification(CryptoProvider);

    impl NoCertificateVerification {
        fn new() -> Self {
            Self(rustls::crypto::ring::default_provider())
        }
    }

    impl ServerCertVerifier for NoCertificateVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> std::result::Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }
}

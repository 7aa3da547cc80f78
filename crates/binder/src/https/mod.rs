//! HTTPS certificate resolution for endpoints that request TLS.
//!
//! # Resolution order
//!
//! 1. The endpoint's `Certificate` section, if it has any keys, yields a
//!    file-based certificate from `Path` / `KeyPath` / `Password`.
//! 2. Otherwise the first valid HTTPS certificate in the current user's
//!    development store.
//! 3. Otherwise [`BindError::CertificateNotConfigured`].
//!
//! An HTTPS endpoint never falls back to plaintext.

pub mod certificate;
pub mod store;

pub use certificate::CertificateConfig;
pub use store::{
    CertificateQuery, CertificateStore, DirectoryCertificateStore, EmptyCertificateStore,
};

use common::{BindError, ListenDescriptor, ServerCertificate};
use tracing::{debug, error};

use crate::config::ConfigSection;

/// Resolves the server certificate for one HTTPS endpoint.
pub trait HttpsProvider {
    /// # Errors
    ///
    /// Returns [`BindError::CertificateNotConfigured`] (or another
    /// [`BindError`]) if no certificate can be found for `endpoint`.
    fn resolve_certificate(
        &self,
        endpoint: &ListenDescriptor,
        certificate: Option<&ConfigSection>,
    ) -> Result<ServerCertificate, BindError>;
}

/// Stand-in used when a pass is started without a provider. Fails every
/// request so that an HTTPS address cannot bind as plaintext.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredHttpsProvider;

impl HttpsProvider for UnconfiguredHttpsProvider {
    fn resolve_certificate(
        &self,
        endpoint: &ListenDescriptor,
        _certificate: Option<&ConfigSection>,
    ) -> Result<ServerCertificate, BindError> {
        Err(BindError::MissingHttpsProviderConfiguration {
            endpoint: endpoint.display_url(),
        })
    }
}

/// Configuration first, development certificate second.
#[derive(Debug, Clone)]
pub struct DefaultHttpsProvider<S> {
    store: S,
}

impl<S: CertificateStore> DefaultHttpsProvider<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn development_certificate(
        &self,
        endpoint: &ListenDescriptor,
    ) -> Result<ServerCertificate, BindError> {
        let found = self
            .store
            .list_certificates(&CertificateQuery::development_https())
            .into_iter()
            .next();

        match found {
            Some(certificate) => {
                debug!(
                    endpoint = %endpoint,
                    name = %certificate.name,
                    subject = %certificate.subject,
                    thumbprint = %certificate.thumbprint,
                    "using development certificate"
                );
                Ok(ServerCertificate::Development(certificate))
            }
            None => {
                error!(
                    endpoint = %endpoint,
                    "unable to locate an appropriate development https certificate"
                );
                Err(BindError::CertificateNotConfigured {
                    endpoint: endpoint.display_url(),
                })
            }
        }
    }
}

impl<S: CertificateStore> HttpsProvider for DefaultHttpsProvider<S> {
    fn resolve_certificate(
        &self,
        endpoint: &ListenDescriptor,
        certificate: Option<&ConfigSection>,
    ) -> Result<ServerCertificate, BindError> {
        let config = CertificateConfig::new(certificate);
        if config.exists() {
            debug!(
                endpoint = %endpoint,
                section = certificate.map_or("", ConfigSection::path),
                "using configured certificate"
            );
            return Ok(config.to_server_certificate());
        }
        self.development_certificate(endpoint)
    }
}

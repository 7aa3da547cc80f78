//! Error types shared across crates.

use std::io;

use thiserror::Error;

/// Failure of a bind pass.
///
/// Every variant is fatal to startup. Parse and configuration errors abort
/// before anything is bound; transport errors abort the remainder of the pass
/// and leave earlier listeners open.
#[derive(Debug, Error)]
pub enum BindError {
    /// The address string has no `scheme://` prefix or an empty host.
    #[error("invalid url: '{0}'")]
    InvalidUrl(String),

    /// The scheme is neither `http` nor `https`.
    #[error(
        "unrecognized scheme in server address '{0}'; \
         only 'http://' and 'https://' are supported"
    )]
    UnsupportedScheme(String),

    /// The address string carries a path segment.
    #[error(
        "a path base can only be configured on the application, \
         not through the server address '{0}'"
    )]
    PathBaseNotSupported(String),

    /// The transport reported the address or port as taken.
    #[error("failed to bind to address {endpoint}: address already in use")]
    EndpointAlreadyInUse {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// HTTPS was requested, no certificate is configured, and no development
    /// certificate was found.
    #[error(
        "unable to configure HTTPS endpoint {endpoint}: no server certificate was specified \
         and the default development certificate could not be found"
    )]
    CertificateNotConfigured { endpoint: String },

    /// HTTPS was requested but the pass was started without an HTTPS provider.
    #[error("unable to configure HTTPS endpoint {endpoint}: no HTTPS provider was supplied")]
    MissingHttpsProviderConfiguration { endpoint: String },

    /// Any other transport failure.
    #[error("failed to bind to address {endpoint}")]
    Transport {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

impl BindError {
    /// Wrap a transport failure for `endpoint`.
    pub fn from_transport(endpoint: impl Into<String>, err: TransportError) -> Self {
        let endpoint = endpoint.into();
        match err {
            TransportError::AddressInUse(source) => {
                BindError::EndpointAlreadyInUse { endpoint, source }
            }
            TransportError::Io(source) => BindError::Transport { endpoint, source },
        }
    }
}

/// What an injected transport reports back when opening a listener fails.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("address already in use")]
    AddressInUse(#[source] io::Error),

    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::AddrInUse {
            TransportError::AddressInUse(err)
        } else {
            TransportError::Io(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_addr_in_use_maps_to_address_in_use() {
        let err = TransportError::from(io::Error::from(io::ErrorKind::AddrInUse));
        assert!(matches!(err, TransportError::AddressInUse(_)));

        let err = TransportError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[test]
    fn address_in_use_becomes_endpoint_already_in_use() {
        let err = BindError::from_transport(
            "http://127.0.0.1:5000",
            TransportError::AddressInUse(io::Error::from(io::ErrorKind::AddrInUse)),
        );
        assert!(matches!(err, BindError::EndpointAlreadyInUse { .. }));
        assert!(err.to_string().contains("http://127.0.0.1:5000"));
    }

    #[test]
    fn endpoint_already_in_use_keeps_source() {
        use std::error::Error as _;
        let err = BindError::from_transport(
            "http://localhost:80",
            TransportError::AddressInUse(io::Error::from(io::ErrorKind::AddrInUse)),
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn display_includes_address() {
        let e = BindError::UnsupportedScheme("ftp://host:1".into());
        assert!(e.to_string().contains("ftp://host:1"));
    }
}

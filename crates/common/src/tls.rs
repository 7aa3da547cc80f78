//! TLS material attached to HTTPS listen descriptors.

use std::fmt;
use std::path::PathBuf;

/// Private-key password read from configuration.
///
/// Compares by value but never prints its contents.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// A development certificate found in a certificate store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCertificate {
    /// Store-local name (file stem for directory stores).
    pub name: String,
    /// Subject distinguished name, e.g. `CN=localhost`.
    pub subject: String,
    /// Upper-case hex SHA-256 of the leaf certificate's DER bytes.
    pub thumbprint: String,
    pub certificate_path: PathBuf,
    pub key_path: PathBuf,
}

/// Where the server certificate for an HTTPS endpoint comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCertificate {
    /// Certificate declared in configuration (`Certificate.Path` and
    /// `Certificate.Password`). `key_path` is `None` when the key is bundled
    /// in the certificate file.
    File {
        path: PathBuf,
        key_path: Option<PathBuf>,
        password: Password,
    },
    /// Fallback development certificate from the current user's store.
    Development(StoredCertificate),
}

impl ServerCertificate {
    /// File holding the certificate chain.
    pub fn certificate_path(&self) -> &PathBuf {
        match self {
            ServerCertificate::File { path, .. } => path,
            ServerCertificate::Development(cert) => &cert.certificate_path,
        }
    }

    /// File holding the private key; falls back to the certificate file.
    pub fn key_path(&self) -> &PathBuf {
        match self {
            ServerCertificate::File { path, key_path, .. } => key_path.as_ref().unwrap_or(path),
            ServerCertificate::Development(cert) => &cert.key_path,
        }
    }
}

/// HTTPS settings for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpsOptions {
    pub certificate: ServerCertificate,
    /// ALPN protocol identifiers offered during the handshake, in preference order.
    pub alpn_protocols: Vec<Vec<u8>>,
}

impl HttpsOptions {
    /// Options for `certificate`, offering HTTP/1.1 over ALPN.
    pub fn new(certificate: ServerCertificate) -> Self {
        Self {
            certificate,
            alpn_protocols: vec![b"http/1.1".to_vec()],
        }
    }
}

//! Development certificate discovery.
//!
//! The resolver never touches a platform certificate store directly; it asks a
//! [`CertificateStore`] for valid HTTPS certificates and takes the first one.

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use common::StoredCertificate;
use sha2::{Digest, Sha256};
use tracing::debug;
use x509_parser::prelude::{FromDer, X509Certificate};

/// What a certificate may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificatePurpose {
    All,
    Https,
}

/// Logical store name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreName {
    /// Personal certificates with private keys.
    My,
    Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLocation {
    CurrentUser,
    LocalMachine,
}

/// Filter passed to [`CertificateStore::list_certificates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateQuery {
    pub purpose: CertificatePurpose,
    pub store_name: StoreName,
    pub location: StoreLocation,
    /// Only return certificates whose material is complete and loadable.
    pub valid_only: bool,
}

impl CertificateQuery {
    /// Valid HTTPS certificates in the current user's personal store.
    pub fn development_https() -> Self {
        Self {
            purpose: CertificatePurpose::Https,
            store_name: StoreName::My,
            location: StoreLocation::CurrentUser,
            valid_only: true,
        }
    }
}

/// Source of development certificates.
#[cfg_attr(test, mockall::automock)]
pub trait CertificateStore {
    /// Certificates matching `query`, in a stable order.
    fn list_certificates(&self, query: &CertificateQuery) -> Vec<StoredCertificate>;
}

/// A store with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCertificateStore;

impl CertificateStore for EmptyCertificateStore {
    fn list_certificates(&self, _query: &CertificateQuery) -> Vec<StoredCertificate> {
        Vec::new()
    }
}

/// Directory of PEM pairs acting as one store: `<name>.crt` holds the
/// certificate chain and `<name>.key` the private key.
///
/// Every certificate in the directory is treated as an HTTPS certificate.
#[derive(Debug, Clone)]
pub struct DirectoryCertificateStore {
    root: PathBuf,
    store_name: StoreName,
    location: StoreLocation,
}

impl DirectoryCertificateStore {
    /// The current user's personal store, backed by `root`.
    pub fn current_user(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            store_name: StoreName::My,
            location: StoreLocation::CurrentUser,
        }
    }

    fn serves(&self, query: &CertificateQuery) -> bool {
        query.store_name == self.store_name
            && query.location == self.location
            && matches!(query.purpose, CertificatePurpose::Https | CertificatePurpose::All)
    }

    fn load(&self, certificate_path: &Path, query: &CertificateQuery) -> Option<StoredCertificate> {
        let name = certificate_path.file_stem()?.to_string_lossy().into_owned();
        let key_path = certificate_path.with_extension("key");
        let leaf = read_leaf(certificate_path);

        if query.valid_only {
            if let Err(reason) = validate_leaf(leaf.as_deref(), query.purpose) {
                debug!(path = %certificate_path.display(), %reason, "skipping certificate");
                return None;
            }
            if !has_private_key(&key_path) {
                debug!(path = %key_path.display(), "skipping certificate without a private key");
                return None;
            }
        }

        let (thumbprint, subject) = match &leaf {
            Some(der) => (sha256_hex(der), subject_of(der)),
            None => (String::new(), String::new()),
        };

        Some(StoredCertificate {
            name,
            subject,
            thumbprint,
            certificate_path: certificate_path.to_path_buf(),
            key_path,
        })
    }
}

impl CertificateStore for DirectoryCertificateStore {
    fn list_certificates(&self, query: &CertificateQuery) -> Vec<StoredCertificate> {
        if !self.serves(query) {
            return Vec::new();
        }

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    root = %self.root.display(),
                    error = %e,
                    "certificate directory not readable"
                );
                return Vec::new();
            }
        };

        let mut certificates: Vec<StoredCertificate> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "crt"))
            .filter_map(|path| self.load(&path, query))
            .collect();

        certificates.sort_by(|a, b| a.name.cmp(&b.name));
        certificates
    }
}

/// DER bytes of the first certificate in a PEM file.
fn read_leaf(path: &Path) -> Option<Vec<u8>> {
    let file = fs::File::open(path).ok()?;
    let leaf = rustls_pemfile::certs(&mut BufReader::new(file)).next()?.ok()?;
    Some(leaf.to_vec())
}

/// A certificate is usable when it parses as X.509, is inside its validity
/// period, and (for HTTPS) its extended key usage allows server
/// authentication. A certificate without the extension is unrestricted.
fn validate_leaf(leaf: Option<&[u8]>, purpose: CertificatePurpose) -> Result<(), String> {
    let der = leaf.ok_or("no PEM certificate in file")?;
    let (_, cert) =
        X509Certificate::from_der(der).map_err(|e| format!("not an X.509 certificate: {e}"))?;

    let validity = cert.validity();
    if !validity.is_valid() {
        return Err(format!(
            "outside its validity period ({} to {})",
            validity.not_before, validity.not_after
        ));
    }

    if purpose == CertificatePurpose::Https {
        let server_auth = match cert.extended_key_usage() {
            Ok(Some(eku)) => eku.value.any || eku.value.server_auth,
            Ok(None) => true,
            Err(_) => false,
        };
        if !server_auth {
            return Err("not usable for TLS server authentication".to_owned());
        }
    }

    Ok(())
}

fn subject_of(der: &[u8]) -> String {
    X509Certificate::from_der(der)
        .map(|(_, cert)| cert.subject().to_string())
        .unwrap_or_default()
}

/// Upper-case hex SHA-256.
fn sha256_hex(der: &[u8]) -> String {
    Sha256::digest(der).iter().map(|b| format!("{b:02X}")).collect()
}

fn has_private_key(path: &Path) -> bool {
    fs::File::open(path)
        .ok()
        .and_then(|file| rustls_pemfile::private_key(&mut BufReader::new(file)).ok())
        .flatten()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! fixture {
        ($name:literal) => {
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../testdata/certs/", $name))
        };
    }

    const DEV_CERT: &str = fixture!("dev.crt");
    const DEV_KEY: &str = fixture!("dev.key");
    const EXPIRED_CERT: &str = fixture!("expired.crt");
    const CLIENT_ONLY_CERT: &str = fixture!("client-only.crt");
    const NOT_X509_PEM: &str = "-----BEGIN CERTIFICATE-----\nAQID\n-----END CERTIFICATE-----\n";

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn write_pair(dir: &Path, name: &str, cert: &str) {
        write(dir, &format!("{name}.crt"), cert);
        write(dir, &format!("{name}.key"), DEV_KEY);
    }

    fn names(found: &[StoredCertificate]) -> Vec<&str> {
        found.iter().map(|c| c.name.as_str()).collect()
    }

    fn any_validity() -> CertificateQuery {
        CertificateQuery {
            valid_only: false,
            ..CertificateQuery::development_https()
        }
    }

    #[test]
    fn lists_complete_pairs_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "zeta", DEV_CERT);
        write_pair(dir.path(), "alpha", DEV_CERT);
        write(dir.path(), "notes.txt", "ignored");

        let store = DirectoryCertificateStore::current_user(dir.path());
        let found = store.list_certificates(&CertificateQuery::development_https());
        assert_eq!(names(&found), vec!["alpha", "zeta"]);
        assert_eq!(found[0].key_path, dir.path().join("alpha.key"));
    }

    #[test]
    fn records_thumbprint_and_subject() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "dev", DEV_CERT);

        let store = DirectoryCertificateStore::current_user(dir.path());
        let found = store.list_certificates(&CertificateQuery::development_https());
        assert_eq!(
            found[0].thumbprint,
            "FC899A2EBA31A2C7B854E97A76D6516A51C6EB561770B279A23C81A1C9C8DA4A"
        );
        assert_eq!(found[0].subject, "CN=localhost");
    }

    #[test]
    fn expired_certificate_is_not_valid() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "expired", EXPIRED_CERT);

        let store = DirectoryCertificateStore::current_user(dir.path());
        assert!(store.list_certificates(&CertificateQuery::development_https()).is_empty());
        assert_eq!(names(&store.list_certificates(&any_validity())), vec!["expired"]);
    }

    #[test]
    fn pem_that_is_not_x509_is_not_valid() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "dev", NOT_X509_PEM);

        let store = DirectoryCertificateStore::current_user(dir.path());
        assert!(store.list_certificates(&CertificateQuery::development_https()).is_empty());
    }

    #[test]
    fn client_auth_only_certificate_is_not_an_https_certificate() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "client", CLIENT_ONLY_CERT);

        let store = DirectoryCertificateStore::current_user(dir.path());
        assert!(store.list_certificates(&CertificateQuery::development_https()).is_empty());

        let any_purpose = CertificateQuery {
            purpose: CertificatePurpose::All,
            ..CertificateQuery::development_https()
        };
        assert_eq!(names(&store.list_certificates(&any_purpose)), vec!["client"]);
    }

    #[test]
    fn valid_only_skips_incomplete_pairs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "nokey.crt", DEV_CERT);
        write(dir.path(), "garbage.crt", "not a certificate");
        write(dir.path(), "garbage.key", DEV_KEY);

        let store = DirectoryCertificateStore::current_user(dir.path());
        assert!(store.list_certificates(&CertificateQuery::development_https()).is_empty());

        let all = store.list_certificates(&any_validity());
        assert_eq!(names(&all), vec!["garbage", "nokey"]);
        assert_eq!(all[0].thumbprint, "");
    }

    #[test]
    fn other_stores_are_not_served() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "dev", DEV_CERT);

        let store = DirectoryCertificateStore::current_user(dir.path());
        let machine = CertificateQuery {
            location: StoreLocation::LocalMachine,
            ..CertificateQuery::development_https()
        };
        assert!(store.list_certificates(&machine).is_empty());
    }

    #[test]
    fn missing_directory_is_empty() {
        let store = DirectoryCertificateStore::current_user("/nonexistent/dev-certs");
        assert!(store.list_certificates(&CertificateQuery::development_https()).is_empty());
    }
}

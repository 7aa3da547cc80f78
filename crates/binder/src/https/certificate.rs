//! View over an endpoint's `Certificate` configuration section.

use std::path::PathBuf;

use common::{Password, ServerCertificate};

use crate::config::ConfigSection;

/// Certificate settings of one endpoint. Values are read on access; a missing
/// key reads as empty.
#[derive(Debug, Clone, Copy)]
pub struct CertificateConfig<'a> {
    section: Option<&'a ConfigSection>,
}

impl<'a> CertificateConfig<'a> {
    pub fn new(section: Option<&'a ConfigSection>) -> Self {
        Self { section }
    }

    /// `true` if the section has at least one child key.
    pub fn exists(&self) -> bool {
        self.section.is_some_and(|s| !s.children().is_empty())
    }

    /// Key of the section, if there is one.
    pub fn id(&self) -> Option<&'a str> {
        self.section.map(ConfigSection::key)
    }

    pub fn path(&self) -> String {
        self.read("Path")
    }

    pub fn password(&self) -> String {
        self.read("Password")
    }

    /// Separate private key file; empty when the key lives with the certificate.
    pub fn key_path(&self) -> String {
        self.read("KeyPath")
    }

    /// File-based certificate built from `Path`, `KeyPath`, and `Password`.
    pub fn to_server_certificate(&self) -> ServerCertificate {
        let key_path = self.key_path();
        ServerCertificate::File {
            path: PathBuf::from(self.path()),
            key_path: (!key_path.is_empty()).then(|| PathBuf::from(key_path)),
            password: Password::new(self.password()),
        }
    }

    fn read(&self, key: &str) -> String {
        self.section.and_then(|s| s.get(key)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::section_from_json;

    #[test]
    fn absent_section_does_not_exist() {
        let cert = CertificateConfig::new(None);
        assert!(!cert.exists());
        assert_eq!(cert.path(), "");
        assert_eq!(cert.id(), None);
    }

    #[test]
    fn empty_section_does_not_exist() {
        let root = section_from_json(r#"{"Certificate": {}}"#);
        let section = root.section("Certificate");
        assert!(!CertificateConfig::new(Some(&section)).exists());
    }

    #[test]
    fn missing_password_reads_empty() {
        let root = section_from_json(r#"{"Certificate": {"Path": "server.pem"}}"#);
        let section = root.section("Certificate");
        let cert = CertificateConfig::new(Some(&section));
        assert!(cert.exists());
        assert_eq!(cert.path(), "server.pem");
        assert_eq!(cert.password(), "");
        assert_eq!(cert.id(), Some("Certificate"));
    }

    #[test]
    fn builds_file_certificate() {
        let root = section_from_json(
            r#"{"Certificate": {"Path": "server.crt", "KeyPath": "server.key", "Password": "pw"}}"#,
        );
        let section = root.section("Certificate");
        let built = CertificateConfig::new(Some(&section)).to_server_certificate();
        assert_eq!(
            built,
            ServerCertificate::File {
                path: "server.crt".into(),
                key_path: Some("server.key".into()),
                password: Password::new("pw"),
            }
        );
    }
}

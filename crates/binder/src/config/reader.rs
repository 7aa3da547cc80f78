//! Endpoint declarations from the `Endpoints` configuration section.
//!
//! ```text
//! "Endpoints": {
//!   "Demo": {
//!     "Url": "https://*:5463",
//!     "Certificate": { "Path": "server.pem", "Password": "..." }
//!   }
//! }
//! ```

use tracing::debug;

use super::ConfigSection;

/// Name of the section holding endpoint declarations.
pub const ENDPOINTS_SECTION: &str = "Endpoints";

/// One declared endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Key of the entry under `Endpoints`.
    pub name: String,
    /// Address string, parsed later by [`crate::address::parse_address`].
    pub url: String,
    /// The entry's `Certificate` sub-section; may be empty.
    pub certificate: ConfigSection,
}

/// Parsed view of the `Endpoints` section, built once per bind pass.
#[derive(Debug, Clone, Default)]
pub struct ConfigReader {
    endpoints: Vec<EndpointConfig>,
}

impl ConfigReader {
    /// Read all endpoint declarations under `configuration`.
    ///
    /// Entries with a missing or empty `Url` are skipped. With no
    /// configuration at all the reader is empty.
    pub fn load(configuration: Option<&ConfigSection>) -> Self {
        let Some(configuration) = configuration else {
            return Self::default();
        };

        let endpoints = configuration
            .section(ENDPOINTS_SECTION)
            .children()
            .into_iter()
            .filter_map(|entry| {
                let url = entry.get("Url").unwrap_or_default();
                if url.is_empty() {
                    debug!(endpoint = %entry.key(), "skipping endpoint without a Url");
                    return None;
                }
                Some(EndpointConfig {
                    name: entry.key().to_owned(),
                    url,
                    certificate: entry.section("Certificate"),
                })
            })
            .collect();

        Self { endpoints }
    }

    pub fn endpoints(&self) -> &[EndpointConfig] {
        &self.endpoints
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

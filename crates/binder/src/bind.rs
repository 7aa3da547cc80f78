//! Bind pass orchestration.
//!
//! A pass:
//! 1. Reads config endpoints.
//! 2. Selects one [`Strategy`] from the four inputs.
//! 3. Clears the caller-visible address and listener lists.
//! 4. Runs the strategy: for each endpoint, attach HTTPS material if TLS was
//!    requested, hand it to the [`EndpointBinder`], and record it on success.
//!
//! Endpoints bind strictly in order. The first failure ends the pass;
//! listeners bound earlier in the same pass stay open.

use std::future::Future;

use common::{BindError, HttpsOptions, ListenDescriptor, TransportError};
use tracing::{debug, info};

use crate::config::{ConfigReader, ConfigSection};
use crate::https::{HttpsProvider, UnconfiguredHttpsProvider};
use crate::options::{EndpointConfiguration, HttpsConfiguration, ServerOptions};
use crate::strategy::{select_strategy, Strategy, StrategyInputs};

/// Opens the actual listener for one endpoint. This is the only coupling to
/// sockets and TLS handshakes.
pub trait EndpointBinder {
    /// Bind `endpoint`. Implementations may update the target, e.g. to record
    /// the port the OS assigned for port 0.
    ///
    /// # Errors
    ///
    /// [`TransportError::AddressInUse`] if the address is taken; any other
    /// failure as [`TransportError::Io`].
    fn create_binding(
        &mut self,
        endpoint: &mut ListenDescriptor,
    ) -> impl Future<Output = Result<(), TransportError>>;
}

/// Addresses supplied by the hosting layer.
#[derive(Debug, Clone, Default)]
pub struct ServerAddresses {
    /// Address strings to bind; after a pass, the display URLs of what was bound.
    pub addresses: Vec<String>,
    /// Let hosting addresses override endpoints configured in code.
    pub prefer_hosting_urls: bool,
}

impl ServerAddresses {
    pub fn new(addresses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
            prefer_hosting_urls: false,
        }
    }

    pub fn prefer_hosting_urls(mut self, prefer: bool) -> Self {
        self.prefer_hosting_urls = prefer;
        self
    }
}

/// State of one bind pass.
pub struct BindContext<'a, B> {
    /// Caller-visible display URLs of bound endpoints.
    pub addresses: &'a mut Vec<String>,
    /// Caller-visible bound endpoints.
    pub listen_options: &'a mut Vec<ListenDescriptor>,
    pub endpoints: &'a EndpointConfiguration,
    pub https: &'a HttpsConfiguration,
    pub https_provider: &'a dyn HttpsProvider,
    pub config_reader: &'a ConfigReader,
    pub binder: &'a mut B,
}

impl<B: EndpointBinder> BindContext<'_, B> {
    /// Run the endpoint hooks from the server options on a descriptor the
    /// pass parsed from an address string or from configuration.
    pub fn configure_endpoint(&self, endpoint: &mut ListenDescriptor) {
        let name = endpoint.name.clone();
        self.endpoints.apply(name.as_deref(), endpoint);
    }

    /// Resolve a certificate for `endpoint` and attach it, running the HTTPS
    /// hooks from the server options.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error; the endpoint is left untouched.
    pub fn configure_https(
        &self,
        endpoint: &mut ListenDescriptor,
        certificate: Option<&ConfigSection>,
    ) -> Result<(), BindError> {
        let resolved = self.https_provider.resolve_certificate(endpoint, certificate)?;
        let mut options = HttpsOptions::new(resolved);
        self.https.apply(endpoint.name.as_deref(), &mut options);
        endpoint.https = Some(options);
        Ok(())
    }

    /// Bind one endpoint and record it.
    ///
    /// # Errors
    ///
    /// [`BindError::EndpointAlreadyInUse`] if the transport reports the
    /// address as taken, [`BindError::Transport`] for other transport
    /// failures, or a certificate error for HTTPS endpoints.
    pub async fn bind_endpoint(&mut self, mut endpoint: ListenDescriptor) -> Result<(), BindError> {
        if endpoint.needs_certificate() {
            self.configure_https(&mut endpoint, None)?;
        }

        let description = endpoint.display_url();
        self.binder
            .create_binding(&mut endpoint)
            .await
            .map_err(|e| BindError::from_transport(description, e))?;

        let bound = endpoint.display_url();
        debug!(endpoint = %bound, "endpoint bound");
        self.addresses.push(bound);
        self.listen_options.push(endpoint);
        Ok(())
    }
}

/// Run one bind pass.
///
/// On success `server_addresses.addresses` and `options.listen_options` hold
/// exactly the endpoints this pass bound. Passes must not run concurrently
/// over the same options.
///
/// # Errors
///
/// Any [`BindError`]; see the module docs for what stays bound.
pub async fn bind_server<B: EndpointBinder>(
    server_addresses: &mut ServerAddresses,
    options: &mut ServerOptions,
    https_provider: Option<&dyn HttpsProvider>,
    binder: &mut B,
) -> Result<(), BindError> {
    let config_reader = ConfigReader::load(options.configuration.as_ref());

    // Clearing here keeps results of an earlier pass from leaking into this one.
    let listen_options = std::mem::take(&mut options.listen_options);
    let addresses = std::mem::take(&mut server_addresses.addresses);

    let kind = select_strategy(StrategyInputs {
        has_listen_options: !listen_options.is_empty(),
        has_config_endpoints: !config_reader.is_empty(),
        has_addresses: !addresses.is_empty(),
        prefer_hosting_urls: server_addresses.prefer_hosting_urls,
    });
    let strategy = Strategy::new(kind, listen_options, addresses);
    debug!(strategy = ?strategy.kind(), "selected address binding strategy");

    let https_provider: &dyn HttpsProvider = match https_provider {
        Some(provider) => provider,
        None => &UnconfiguredHttpsProvider,
    };

    let mut ctx = BindContext {
        addresses: &mut server_addresses.addresses,
        listen_options: &mut options.listen_options,
        endpoints: &options.endpoints,
        https: &options.https,
        https_provider,
        config_reader: &config_reader,
        binder,
    };

    strategy.bind(&mut ctx).await?;

    info!(addresses = %ctx.addresses.join(", "), "bind pass complete");
    Ok(())
}

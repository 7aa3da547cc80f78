//! Binding strategies and the precedence rules that pick one.
//!
//! | prefer hosting urls | addresses | listen options | config endpoints | strategy              |
//! |---------------------|-----------|----------------|------------------|-----------------------|
//! | yes                 | yes       | yes            | any              | OverrideWithAddresses |
//! | yes                 | yes       | no             | any              | Addresses             |
//! | any                 | any       | any            | yes              | Config                |
//! | any                 | yes       | yes            | no               | OverrideWithEndpoints |
//! | any                 | no        | yes            | no               | Endpoints             |
//! | any                 | yes       | no             | no               | Addresses             |
//! | any                 | no        | no             | no               | Default               |
//!
//! Rows are evaluated top to bottom; the first match wins.

use common::{BindError, ListenDescriptor};
use tracing::{debug, info, warn};

use crate::address::{parse_address, DEFAULT_SERVER_ADDRESS};
use crate::bind::{BindContext, EndpointBinder};

/// The four facts the precedence rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrategyInputs {
    pub has_listen_options: bool,
    pub has_config_endpoints: bool,
    pub has_addresses: bool,
    pub prefer_hosting_urls: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Default,
    Addresses,
    OverrideWithAddresses,
    Endpoints,
    OverrideWithEndpoints,
    Config,
}

/// Pick the strategy for one pass. Pure; see the module table.
pub fn select_strategy(inputs: StrategyInputs) -> StrategyKind {
    let StrategyInputs {
        has_listen_options,
        has_config_endpoints,
        has_addresses,
        prefer_hosting_urls,
    } = inputs;

    if prefer_hosting_urls && has_addresses {
        if has_listen_options {
            StrategyKind::OverrideWithAddresses
        } else {
            StrategyKind::Addresses
        }
    } else if has_config_endpoints {
        StrategyKind::Config
    } else if has_listen_options {
        if has_addresses {
            StrategyKind::OverrideWithEndpoints
        } else {
            StrategyKind::Endpoints
        }
    } else if has_addresses {
        StrategyKind::Addresses
    } else {
        StrategyKind::Default
    }
}

/// A selected strategy together with the inputs it binds.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Bind [`DEFAULT_SERVER_ADDRESS`].
    Default,
    /// Bind the hosting addresses.
    Addresses(Vec<String>),
    /// Bind the hosting addresses, discarding code-configured endpoints.
    OverrideWithAddresses(Vec<String>),
    /// Bind the code-configured endpoints.
    Endpoints(Vec<ListenDescriptor>),
    /// Bind the code-configured endpoints, discarding hosting addresses.
    OverrideWithEndpoints {
        endpoints: Vec<ListenDescriptor>,
        ignored_addresses: Vec<String>,
    },
    /// Bind the endpoints declared in configuration.
    Config,
}

impl Strategy {
    /// Attach the inputs `kind` needs; the rest are dropped.
    pub fn new(
        kind: StrategyKind,
        listen_options: Vec<ListenDescriptor>,
        addresses: Vec<String>,
    ) -> Self {
        match kind {
            StrategyKind::Default => Strategy::Default,
            StrategyKind::Addresses => Strategy::Addresses(addresses),
            StrategyKind::OverrideWithAddresses => Strategy::OverrideWithAddresses(addresses),
            StrategyKind::Endpoints => Strategy::Endpoints(listen_options),
            StrategyKind::OverrideWithEndpoints => Strategy::OverrideWithEndpoints {
                endpoints: listen_options,
                ignored_addresses: addresses,
            },
            StrategyKind::Config => Strategy::Config,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Default => StrategyKind::Default,
            Strategy::Addresses(_) => StrategyKind::Addresses,
            Strategy::OverrideWithAddresses(_) => StrategyKind::OverrideWithAddresses,
            Strategy::Endpoints(_) => StrategyKind::Endpoints,
            Strategy::OverrideWithEndpoints { .. } => StrategyKind::OverrideWithEndpoints,
            Strategy::Config => StrategyKind::Config,
        }
    }

    /// Bind every endpoint of this strategy in order, stopping at the first
    /// failure.
    pub async fn bind<B: EndpointBinder>(
        self,
        ctx: &mut BindContext<'_, B>,
    ) -> Result<(), BindError> {
        match self {
            Strategy::Default => {
                debug!(
                    address = DEFAULT_SERVER_ADDRESS,
                    "no listening endpoints were configured; binding to the default address"
                );
                bind_addresses(&[DEFAULT_SERVER_ADDRESS.to_owned()], ctx).await
            }
            Strategy::Addresses(addresses) => bind_addresses(&addresses, ctx).await,
            Strategy::OverrideWithAddresses(addresses) => {
                info!(
                    addresses = %addresses.join(", "),
                    "overriding endpoints configured in code because prefer_hosting_urls is set; \
                     binding to the hosting addresses instead"
                );
                bind_addresses(&addresses, ctx).await
            }
            Strategy::Endpoints(endpoints) => bind_endpoints(endpoints, ctx).await,
            Strategy::OverrideWithEndpoints {
                endpoints,
                ignored_addresses,
            } => {
                warn!(
                    addresses = %ignored_addresses.join(", "),
                    "overriding hosting addresses; \
                     binding to the endpoints configured in code instead"
                );
                bind_endpoints(endpoints, ctx).await
            }
            Strategy::Config => {
                let reader = ctx.config_reader;
                for endpoint in reader.endpoints() {
                    let mut options =
                        parse_address(&endpoint.url)?.with_name(endpoint.name.clone());
                    ctx.configure_endpoint(&mut options);
                    if options.needs_certificate() {
                        ctx.configure_https(&mut options, Some(&endpoint.certificate))?;
                    }
                    ctx.bind_endpoint(options).await?;
                }
                Ok(())
            }
        }
    }
}

async fn bind_addresses<B: EndpointBinder>(
    addresses: &[String],
    ctx: &mut BindContext<'_, B>,
) -> Result<(), BindError> {
    for address in addresses {
        let mut options = parse_address(address)?;
        ctx.configure_endpoint(&mut options);
        ctx.bind_endpoint(options).await?;
    }
    Ok(())
}

async fn bind_endpoints<B: EndpointBinder>(
    endpoints: Vec<ListenDescriptor>,
    ctx: &mut BindContext<'_, B>,
) -> Result<(), BindError> {
    for endpoint in endpoints {
        ctx.bind_endpoint(endpoint).await?;
    }
    Ok(())
}

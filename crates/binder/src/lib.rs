//! Endpoint resolution and TLS bootstrap for a network server.
//!
//! Given code-configured listen options, hosting-provided address strings, and
//! an `Endpoints` configuration section, a bind pass picks exactly one
//! [`strategy::Strategy`], parses the addresses it needs, attaches HTTPS
//! certificates where TLS was requested, and drives an injected
//! [`bind::EndpointBinder`] to open the listeners.
//!
//! # Module invariants
//!
//! - **No sockets.** Nothing in this crate opens a listener; the binder does.
//! - **No silent plaintext.** An `https` endpoint either gets a certificate or
//!   the pass fails.

pub mod address;
pub mod bind;
pub mod config;
pub mod https;
pub mod options;
pub mod strategy;

pub use address::{parse_address, DEFAULT_SERVER_ADDRESS};
pub use bind::{bind_server, BindContext, EndpointBinder, ServerAddresses};
pub use config::{ConfigReader, ConfigSection, EndpointConfig};
pub use https::{DefaultHttpsProvider, HttpsProvider};
pub use options::{EndpointConfiguration, HttpsConfiguration, ServerOptions};
pub use strategy::{select_strategy, Strategy, StrategyInputs, StrategyKind};

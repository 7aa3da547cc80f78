//! Tokio listeners behind the bind pass.
//!
//! [`TokioBinder`] opens the socket for each endpoint the pass hands it and
//! keeps the listeners alive for the lifetime of the host.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use address_binder::EndpointBinder;
use common::{ListenDescriptor, ListenTarget, TransportError};
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::tls;

/// An opened listener.
#[derive(Debug)]
pub enum Listener {
    /// One socket per address family for `localhost`, otherwise one.
    Tcp(Vec<TcpListener>),
    #[cfg(unix)]
    Unix(tokio::net::UnixListener),
}

impl Listener {
    /// Human-readable local addresses.
    pub fn local_addrs(&self) -> Vec<String> {
        match self {
            Listener::Tcp(listeners) => listeners
                .iter()
                .filter_map(|l| l.local_addr().ok())
                .map(|a| a.to_string())
                .collect(),
            #[cfg(unix)]
            Listener::Unix(listener) => listener
                .local_addr()
                .ok()
                .and_then(|a| a.as_pathname().map(|p| p.display().to_string()))
                .into_iter()
                .collect(),
        }
    }
}

/// A bound endpoint, with its TLS configuration when it is HTTPS.
#[derive(Debug)]
pub struct BoundListener {
    pub endpoint: String,
    pub listener: Listener,
    pub tls: Option<Arc<ServerConfig>>,
}

/// [`EndpointBinder`] over tokio sockets.
#[derive(Debug, Default)]
pub struct TokioBinder {
    listeners: Vec<BoundListener>,
}

impl TokioBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listeners(&self) -> &[BoundListener] {
        &self.listeners
    }
}

impl EndpointBinder for TokioBinder {
    async fn create_binding(
        &mut self,
        endpoint: &mut ListenDescriptor,
    ) -> Result<(), TransportError> {
        let tls = match &endpoint.https {
            Some(https) => Some(
                tls::load_server_config(https).map_err(|e| io::Error::other(format!("{e:#}")))?,
            ),
            None => None,
        };

        let listener = match endpoint.target.clone() {
            ListenTarget::Localhost { port } => Listener::Tcp(bind_localhost(port).await?),
            ListenTarget::AnyIp { port } => {
                let listener = bind_any(port).await?;
                let bound = listener.local_addr()?.port();
                endpoint.target = ListenTarget::AnyIp { port: bound };
                Listener::Tcp(vec![listener])
            }
            ListenTarget::Ip(addr) => {
                let listener = TcpListener::bind(addr).await?;
                endpoint.target = ListenTarget::Ip(listener.local_addr()?);
                Listener::Tcp(vec![listener])
            }
            #[cfg(unix)]
            ListenTarget::UnixPipe(path) => Listener::Unix(tokio::net::UnixListener::bind(&path)?),
            #[cfg(not(unix))]
            ListenTarget::UnixPipe(path) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unix sockets are not supported on this platform: {}", path.display()),
                )
                .into())
            }
        };

        let endpoint = endpoint.display_url();
        debug!(%endpoint, tls = tls.is_some(), "listener opened");
        self.listeners.push(BoundListener {
            endpoint,
            listener,
            tls,
        });
        Ok(())
    }
}

/// Bind both loopback addresses. The port is shared, so an in-use error on
/// either family is fatal.
async fn bind_localhost(port: u16) -> Result<Vec<TcpListener>, TransportError> {
    if port == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "dynamic port binding is not supported for localhost; use 127.0.0.1:0 or [::1]:0",
        )
        .into());
    }

    let mut listeners = Vec::with_capacity(2);
    let mut last_error = None;
    for ip in [IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V6(Ipv6Addr::LOCALHOST)] {
        match TcpListener::bind(SocketAddr::new(ip, port)).await {
            Ok(listener) => listeners.push(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => return Err(e.into()),
            Err(e) => {
                warn!(%ip, port, error = %e, "unable to bind localhost on one address family");
                last_error = Some(e);
            }
        }
    }

    match (listeners.is_empty(), last_error) {
        (true, Some(e)) => Err(e.into()),
        _ => Ok(listeners),
    }
}

/// Bind the IPv6 wildcard, falling back to IPv4 when the host has no IPv6.
async fn bind_any(port: u16) -> Result<TcpListener, TransportError> {
    match TcpListener::bind(SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port)).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => Err(e.into()),
        Err(e) => {
            debug!(port, error = %e, "IPv6 wildcard unavailable; falling back to 0.0.0.0");
            Ok(TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)).await?)
        }
    }
}

//! Listener descriptors: what a single bound endpoint looks like before and
//! after the transport has opened it.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::tls::HttpsOptions;

/// URL scheme of an endpoint. Only `http` and `https` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    /// Parse a scheme case-insensitively.
    pub fn parse(scheme: &str) -> Option<Self> {
        if scheme.eq_ignore_ascii_case("http") {
            Some(Scheme::Http)
        } else if scheme.eq_ignore_ascii_case("https") {
            Some(Scheme::Https)
        } else {
            None
        }
    }

    /// Port used when an address string omits one.
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a listener accepts connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListenTarget {
    /// Unix domain socket at the given filesystem path.
    UnixPipe(PathBuf),
    /// Both IPv4 and IPv6 loopback on one port. No single [`SocketAddr`] can
    /// represent this, hence its own variant.
    Localhost { port: u16 },
    /// One explicit IP endpoint.
    Ip(SocketAddr),
    /// All interfaces on the given port (`*`, `+`, or any host name).
    AnyIp { port: u16 },
}

impl ListenTarget {
    /// TCP port of the target, `None` for unix sockets.
    pub fn port(&self) -> Option<u16> {
        match self {
            ListenTarget::UnixPipe(_) => None,
            ListenTarget::Localhost { port } | ListenTarget::AnyIp { port } => Some(*port),
            ListenTarget::Ip(addr) => Some(addr.port()),
        }
    }
}

impl fmt::Display for ListenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenTarget::UnixPipe(path) => write!(f, "unix:{}", path.display()),
            ListenTarget::Localhost { port } => write!(f, "localhost:{port}"),
            ListenTarget::Ip(addr) => write!(f, "{addr}"),
            ListenTarget::AnyIp { port } => write!(f, "[::]:{port}"),
        }
    }
}

/// A single endpoint to bind, as produced by the address parser or registered
/// in code through [`ListenDescriptor::new`].
///
/// HTTPS material is attached at most once, before the transport sees the
/// descriptor. A descriptor with [`Scheme::Https`] must never reach the
/// transport without [`HttpsOptions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenDescriptor {
    pub target: ListenTarget,
    pub scheme: Scheme,
    /// Name of the configuration entry this endpoint came from, if any.
    pub name: Option<String>,
    pub https: Option<HttpsOptions>,
}

impl ListenDescriptor {
    /// A plain-HTTP descriptor for `target`.
    pub fn new(target: ListenTarget) -> Self {
        Self {
            target,
            scheme: Scheme::Http,
            name: None,
            https: None,
        }
    }

    /// Shorthand for an explicit IP endpoint.
    pub fn ip(ip: IpAddr, port: u16) -> Self {
        Self::new(ListenTarget::Ip(SocketAddr::new(ip, port)))
    }

    /// Set the scheme. An HTTPS descriptor without certificate material gets
    /// one resolved before binding.
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Mark the descriptor as HTTPS with the given material already attached.
    pub fn use_https(mut self, https: HttpsOptions) -> Self {
        self.scheme = Scheme::Https;
        self.https = Some(https);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// `true` when the scheme asks for TLS.
    pub fn is_https(&self) -> bool {
        self.scheme == Scheme::Https
    }

    /// `true` when TLS was requested but no certificate is attached yet.
    pub fn needs_certificate(&self) -> bool {
        self.is_https() && self.https.is_none()
    }

    /// URL shown to callers once the endpoint is bound, e.g.
    /// `https://localhost:5001` or `http://unix:/tmp/app.sock`.
    pub fn display_url(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ListenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn scheme_parse_is_case_insensitive() {
        assert_eq!(Scheme::parse("HTTP"), Some(Scheme::Http));
        assert_eq!(Scheme::parse("Https"), Some(Scheme::Https));
        assert_eq!(Scheme::parse("ftp"), None);
    }

    #[test]
    fn display_urls() {
        let ip = ListenDescriptor::ip(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000);
        assert_eq!(ip.display_url(), "http://127.0.0.1:5000");

        let local = ListenDescriptor::new(ListenTarget::Localhost { port: 5001 })
            .with_scheme(Scheme::Https);
        assert_eq!(local.display_url(), "https://localhost:5001");

        let any = ListenDescriptor::new(ListenTarget::AnyIp { port: 80 });
        assert_eq!(any.display_url(), "http://[::]:80");

        let pipe = ListenDescriptor::new(ListenTarget::UnixPipe("/tmp/app.sock".into()));
        assert_eq!(pipe.display_url(), "http://unix:/tmp/app.sock");
    }

    #[test]
    fn https_scheme_without_material_needs_certificate() {
        let d = ListenDescriptor::new(ListenTarget::AnyIp { port: 443 }).with_scheme(Scheme::Https);
        assert!(d.needs_certificate());
        assert!(!ListenDescriptor::new(ListenTarget::AnyIp { port: 80 }).needs_certificate());
    }

    #[test]
    fn target_port() {
        assert_eq!(ListenTarget::Localhost { port: 7 }.port(), Some(7));
        assert_eq!(ListenTarget::UnixPipe("/x".into()).port(), None);
    }
}

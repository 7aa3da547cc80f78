//! Address string parsing.
//!
//! Accepted shapes:
//!
//! ```text
//! http://localhost:5000        dual-stack loopback
//! https://127.0.0.1:5001       explicit IP endpoint
//! http://[::1]:5000            explicit IPv6 endpoint
//! http://*:80, http://+:80     all interfaces
//! http://example.com:8080      all interfaces (host names are not resolved)
//! http://unix:/tmp/app.sock    unix domain socket
//! ```
//!
//! A path after the authority is rejected: path bases belong to the
//! application, not to the listener.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use common::{BindError, ListenDescriptor, ListenTarget, Scheme};

/// Address bound when nothing else is configured.
pub const DEFAULT_SERVER_ADDRESS: &str = "http://localhost:5000";

const SCHEME_DELIMITER: &str = "://";
const UNIX_PIPE_HOST_PREFIX: &str = "unix:/";

/// Raw pieces of an address string before validation.
#[derive(Debug, PartialEq, Eq)]
struct ServerAddress<'a> {
    scheme: &'a str,
    host: &'a str,
    port: u16,
    path_base: &'a str,
    unix_pipe: Option<&'a str>,
}

impl<'a> ServerAddress<'a> {
    fn from_url(url: &'a str) -> Result<Self, BindError> {
        let invalid = || BindError::InvalidUrl(url.to_owned());

        let scheme_end = url.find(SCHEME_DELIMITER).ok_or_else(invalid)?;
        let scheme = &url[..scheme_end];
        let rest = &url[scheme_end + SCHEME_DELIMITER.len()..];

        let is_unix_pipe = rest
            .get(..UNIX_PIPE_HOST_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(UNIX_PIPE_HOST_PREFIX));

        // For unix pipes the authority runs up to the next ':', which then
        // introduces the path. Otherwise the path starts at the first '/'.
        let (authority, path) = if is_unix_pipe {
            let after_prefix = &rest[UNIX_PIPE_HOST_PREFIX.len()..];
            match after_prefix.find(':') {
                Some(i) => {
                    let at = UNIX_PIPE_HOST_PREFIX.len() + i;
                    (&rest[..at], &rest[at + 1..])
                }
                None => (rest, ""),
            }
        } else {
            match rest.find('/') {
                Some(i) => (&rest[..i], &rest[i..]),
                None => (rest, ""),
            }
        };

        let default_port = Scheme::parse(scheme).map_or(0, Scheme::default_port);
        let (host, port) = if is_unix_pipe {
            (authority, 0)
        } else {
            split_host_port(authority, default_port).ok_or_else(invalid)?
        };

        if host.is_empty() {
            return Err(invalid());
        }

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        let path_base = path.strip_suffix('/').unwrap_or(path);

        Ok(Self {
            scheme,
            host,
            port,
            path_base,
            unix_pipe: is_unix_pipe.then(|| &authority["unix:".len()..]),
        })
    }
}

/// Split `host:port`. A suffix that is not a number belongs to the host (as
/// in a bare IPv6 literal); an all-digit suffix that overflows is `None`.
fn split_host_port(authority: &str, default_port: u16) -> Option<(&str, u16)> {
    if let Some(colon) = authority.rfind(':') {
        let port = &authority[colon + 1..];
        if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
            return port.parse().ok().map(|p| (&authority[..colon], p));
        }
    }
    Some((authority, default_port))
}

/// Parse an address string into a listen descriptor.
///
/// The returned descriptor's [`Scheme`] records whether TLS was requested;
/// no certificate is attached here.
///
/// # Errors
///
/// - [`BindError::InvalidUrl`] if the string has no `scheme://`, an empty
///   host, or an out-of-range port.
/// - [`BindError::UnsupportedScheme`] for anything other than http/https.
/// - [`BindError::PathBaseNotSupported`] if a path follows the authority.
pub fn parse_address(address: &str) -> Result<ListenDescriptor, BindError> {
    let parsed = ServerAddress::from_url(address)?;

    let scheme = Scheme::parse(parsed.scheme)
        .ok_or_else(|| BindError::UnsupportedScheme(address.to_owned()))?;

    if !parsed.path_base.is_empty() {
        return Err(BindError::PathBaseNotSupported(address.to_owned()));
    }

    let target = if let Some(path) = parsed.unix_pipe {
        ListenTarget::UnixPipe(PathBuf::from(path))
    } else if parsed.host.eq_ignore_ascii_case("localhost") {
        ListenTarget::Localhost { port: parsed.port }
    } else if let Ok(ip) = parsed.host.parse::<IpAddr>() {
        ListenTarget::Ip(SocketAddr::new(ip, parsed.port))
    } else {
        ListenTarget::AnyIp { port: parsed.port }
    };

    Ok(ListenDescriptor::new(target).with_scheme(scheme))
}

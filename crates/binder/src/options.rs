//! Server-wide options consumed by a bind pass.

use std::fmt;
use std::sync::Arc;

use common::{HttpsOptions, ListenDescriptor};

use crate::config::ConfigSection;

/// Callback that adjusts a value the bind pass is about to use.
pub type Configure<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

/// A defaults hook plus hooks for endpoints by name.
pub struct Hooks<T> {
    defaults: Option<Configure<T>>,
    named: Vec<(String, Configure<T>)>,
}

/// Hooks run on each endpoint parsed from an address string or from
/// configuration, before its certificate is resolved.
pub type EndpointConfiguration = Hooks<ListenDescriptor>;

/// Hooks run on [`HttpsOptions`] after a certificate has been resolved.
pub type HttpsConfiguration = Hooks<HttpsOptions>;

impl<T> Hooks<T> {
    /// Run the defaults hook, then the hook registered for `endpoint_name`.
    /// Names match case-insensitively.
    pub fn apply(&self, endpoint_name: Option<&str>, target: &mut T) {
        if let Some(defaults) = &self.defaults {
            defaults(target);
        }
        let named = endpoint_name.and_then(|name| {
            self.named
                .iter()
                .find(|(registered, _)| registered.eq_ignore_ascii_case(name))
        });
        if let Some((_, configure)) = named {
            configure(target);
        }
    }

    fn set_defaults(&mut self, configure: Configure<T>) {
        self.defaults = Some(configure);
    }

    fn set_named(&mut self, name: String, configure: Configure<T>) {
        assert!(!name.is_empty(), "endpoint name must not be empty");
        self.named
            .retain(|(registered, _)| !registered.eq_ignore_ascii_case(&name));
        self.named.push((name, configure));
    }
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            defaults: None,
            named: Vec::new(),
        }
    }
}

impl<T> Clone for Hooks<T> {
    fn clone(&self) -> Self {
        Self {
            defaults: self.defaults.clone(),
            named: self.named.clone(),
        }
    }
}

impl<T> fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.named.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("Hooks")
            .field("defaults", &self.defaults.is_some())
            .field("named", &names)
            .finish()
    }
}

/// Options shared by every endpoint of one server.
///
/// `listen_options` is both input and output of a bind pass: endpoints
/// registered in code are consumed, and on return the list holds exactly the
/// endpoints that pass bound.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    pub listen_options: Vec<ListenDescriptor>,
    /// Section containing `Endpoints`; `None` disables config-driven binding.
    pub configuration: Option<ConfigSection>,
    pub endpoints: EndpointConfiguration,
    pub https: HttpsConfiguration,
}

impl ServerOptions {
    /// Register an endpoint in code.
    pub fn listen(&mut self, endpoint: ListenDescriptor) {
        self.listen_options.push(endpoint);
    }

    /// Hook applied to every endpoint the pass parses from an address string
    /// or from configuration. Endpoints registered in code are left as they
    /// are.
    pub fn configure_endpoint_defaults(
        &mut self,
        configure: impl Fn(&mut ListenDescriptor) + Send + Sync + 'static,
    ) {
        self.endpoints.set_defaults(Arc::new(configure));
    }

    /// Hook applied to the config endpoint named `name`, after the defaults.
    /// Registering the same name twice replaces the earlier hook.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn configure_endpoint(
        &mut self,
        name: impl Into<String>,
        configure: impl Fn(&mut ListenDescriptor) + Send + Sync + 'static,
    ) {
        self.endpoints.set_named(name.into(), Arc::new(configure));
    }

    /// Register both a listen hook and an HTTPS hook for the config endpoint
    /// named `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn configure_endpoint_with_https(
        &mut self,
        name: impl Into<String>,
        configure: impl Fn(&mut ListenDescriptor) + Send + Sync + 'static,
        configure_https: impl Fn(&mut HttpsOptions) + Send + Sync + 'static,
    ) {
        let name = name.into();
        self.configure_endpoint(name.clone(), configure);
        self.configure_endpoint_https(name, configure_https);
    }

    /// Hook applied to every HTTPS endpoint whose certificate the pass resolves.
    pub fn configure_https_defaults(
        &mut self,
        configure: impl Fn(&mut HttpsOptions) + Send + Sync + 'static,
    ) {
        self.https.set_defaults(Arc::new(configure));
    }

    /// HTTPS hook applied to the config endpoint named `name`, after the
    /// defaults. Registering the same name twice replaces the earlier hook.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn configure_endpoint_https(
        &mut self,
        name: impl Into<String>,
        configure: impl Fn(&mut HttpsOptions) + Send + Sync + 'static,
    ) {
        self.https.set_named(name.into(), Arc::new(configure));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Password, ServerCertificate};
    use std::net::{IpAddr, Ipv4Addr};

    fn https_options() -> HttpsOptions {
        HttpsOptions::new(ServerCertificate::File {
            path: "a.pem".into(),
            key_path: None,
            password: Password::default(),
        })
    }

    #[test]
    fn defaults_run_before_named_hook() {
        let mut options = ServerOptions::default();
        options.configure_https_defaults(|o| o.alpn_protocols = vec![b"h2".to_vec()]);
        options.configure_endpoint_https("Demo", |o| o.alpn_protocols.push(b"http/1.1".to_vec()));

        let mut https = https_options();
        options.https.apply(Some("demo"), &mut https);
        assert_eq!(https.alpn_protocols, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);
    }

    #[test]
    fn named_hook_only_matches_its_endpoint() {
        let mut options = ServerOptions::default();
        options.configure_endpoint_https("Demo", |o| o.alpn_protocols.clear());

        let mut https = https_options();
        options.https.apply(Some("Other"), &mut https);
        assert!(!https.alpn_protocols.is_empty());

        options.https.apply(None, &mut https);
        assert!(!https.alpn_protocols.is_empty());
    }

    #[test]
    fn re_registering_replaces_hook() {
        let mut options = ServerOptions::default();
        options.configure_endpoint_https("Demo", |o| o.alpn_protocols.clear());
        options.configure_endpoint_https("DEMO", |o| o.alpn_protocols.push(b"h2".to_vec()));

        let mut https = https_options();
        options.https.apply(Some("Demo"), &mut https);
        assert_eq!(https.alpn_protocols.len(), 2);
    }

    #[test]
    fn combined_registration_sets_both_hooks() {
        let mut options = ServerOptions::default();
        options.configure_endpoint_with_https(
            "Api",
            |d| d.name = Some("renamed".into()),
            |o| o.alpn_protocols.clear(),
        );

        let mut endpoint = ListenDescriptor::ip(IpAddr::V4(Ipv4Addr::LOCALHOST), 1);
        options.endpoints.apply(Some("api"), &mut endpoint);
        assert_eq!(endpoint.name.as_deref(), Some("renamed"));

        let mut https = https_options();
        options.https.apply(Some("API"), &mut https);
        assert!(https.alpn_protocols.is_empty());
    }

    #[test]
    fn endpoint_defaults_apply_without_a_name() {
        let mut options = ServerOptions::default();
        options.configure_endpoint_defaults(|d| d.name = Some("default".into()));

        let mut endpoint = ListenDescriptor::ip(IpAddr::V4(Ipv4Addr::LOCALHOST), 1);
        options.endpoints.apply(None, &mut endpoint);
        assert_eq!(endpoint.name.as_deref(), Some("default"));
    }

    #[test]
    #[should_panic(expected = "endpoint name must not be empty")]
    fn empty_https_hook_name_is_rejected() {
        ServerOptions::default().configure_endpoint_https("", |_| {});
    }

    #[test]
    #[should_panic(expected = "endpoint name must not be empty")]
    fn empty_endpoint_hook_name_is_rejected() {
        ServerOptions::default().configure_endpoint("", |_| {});
    }
}

//! Credential selection for authenticated services.
//!
//! This layer does not implement any security protocol. It only records
//! which security methods each service URL accepts and picks which of the
//! caller's pre-built credential sessions to apply to a request.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use parking_lot::RwLock;
use thiserror::Error;

use crate::vosi::Capability;

/// Security method URI for anonymous access.
pub const ANONYMOUS: &str = "";
/// Security method URI for HTTP basic authentication.
pub const BASIC: &str = "ivo://ivoa.net/sso#BasicAA";
/// Security method URI for cookie-based sessions.
pub const COOKIE: &str = "ivo://ivoa.net/sso#Cookie";
/// Security method URI for client-certificate TLS.
pub const CERTIFICATE: &str = "ivo://ivoa.net/sso#tls-with-certificate";

/// Errors raised during credential negotiation.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Client and service share no security method.
    #[error("no common security method: service allows [{allowed}], client has [{configured}]")]
    NoCommonMethod {
        /// Methods the service accepts, comma-joined for display.
        allowed: String,
        /// Methods the client has credentials for, comma-joined for display.
        configured: String,
    },
    /// A negotiated method had no credential registered for it.
    #[error("no credential registered for security method \"{0}\"")]
    MissingCredential(String),
}

/// A pre-built client-side credential for one security method.
#[derive(Clone)]
pub enum Credential {
    /// No authentication applied.
    Anonymous,
    /// HTTP basic authentication.
    Basic {
        /// Username sent with each request.
        username: String,
        /// Password sent with each request.
        password: String,
    },
    /// A raw `Cookie` header value applied to each request.
    CookieHeader(String),
    /// A fully configured client, e.g. one carrying a TLS client identity.
    Client(reqwest::blocking::Client),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Credential::Anonymous"),
            Self::Basic { username, .. } => write!(f, "Credential::Basic({username})"),
            Self::CookieHeader(_) => write!(f, "Credential::CookieHeader(..)"),
            Self::Client(_) => write!(f, "Credential::Client(..)"),
        }
    }
}

fn display_methods(methods: &HashSet<String>) -> String {
    let mut sorted: Vec<&str> = methods.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted
        .iter()
        .map(|m| if m.is_empty() { "anonymous" } else { m })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Picks a security method common to the service and the client.
///
/// Any non-anonymous common method is preferred over anonymous; ties between
/// non-anonymous methods break lexicographically for determinism.
pub fn negotiate_method(
    allowed: &HashSet<String>,
    configured: &HashSet<String>,
) -> Result<String, AuthError> {
    let mut common: Vec<&String> = allowed.intersection(configured).collect();
    if common.is_empty() {
        return Err(AuthError::NoCommonMethod {
            allowed: display_methods(allowed),
            configured: display_methods(configured),
        });
    }
    common.sort_unstable();
    common
        .iter()
        .find(|method| !method.is_empty())
        .or_else(|| common.first())
        .map(|method| (*method).clone())
        .ok_or_else(|| AuthError::NoCommonMethod {
            allowed: display_methods(allowed),
            configured: display_methods(configured),
        })
}

/// Maps request URLs to the security methods their service accepts.
///
/// Exact URL matches win; otherwise the longest registered prefix wins;
/// otherwise the URL is assumed anonymous-only.
#[derive(Debug, Clone, Default)]
pub struct AuthUrls {
    full: HashMap<String, HashSet<String>>,
    base: HashMap<String, HashSet<String>>,
}

impl AuthUrls {
    /// Registers a security method for an exact request URL.
    pub fn add_full_url(&mut self, url: impl Into<String>, method: impl Into<String>) {
        self.full.entry(url.into()).or_default().insert(method.into());
    }

    /// Registers a security method for every URL under a prefix.
    pub fn add_base_url(&mut self, url: impl Into<String>, method: impl Into<String>) {
        self.base.entry(url.into()).or_default().insert(method.into());
    }

    /// Returns the security methods allowed for a request URL.
    pub fn methods_for(&self, url: &str) -> HashSet<String> {
        if let Some(methods) = self.full.get(url) {
            return methods.clone();
        }
        let mut best: Option<(&String, &HashSet<String>)> = None;
        for (prefix, methods) in &self.base {
            if url.starts_with(prefix.as_str())
                && best.map_or(true, |(current, _)| prefix.len() > current.len())
            {
                best = Some((prefix, methods));
            }
        }
        best.map_or_else(
            || HashSet::from([ANONYMOUS.to_string()]),
            |(_, methods)| methods.clone(),
        )
    }
}

/// The caller's configured credentials, keyed by security method URI.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    sessions: HashMap<String, Credential>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        let mut sessions = HashMap::new();
        sessions.insert(ANONYMOUS.to_string(), Credential::Anonymous);
        Self { sessions }
    }
}

impl CredentialStore {
    /// Registers a credential for a security method, replacing any previous one.
    pub fn set(&mut self, method: impl Into<String>, credential: Credential) {
        self.sessions.insert(method.into(), credential);
    }

    /// Returns the credential registered for a method.
    pub fn get(&self, method: &str) -> Option<&Credential> {
        self.sessions.get(method)
    }

    /// Security methods the store holds credentials for.
    pub fn methods(&self) -> HashSet<String> {
        self.sessions.keys().cloned().collect()
    }

    /// Negotiates against the service's allowed methods and returns the
    /// matching credential.
    pub fn negotiate(&self, allowed: &HashSet<String>) -> Result<Credential, AuthError> {
        let method = negotiate_method(allowed, &self.methods())?;
        self.get(&method)
            .cloned()
            .ok_or(AuthError::MissingCredential(method))
    }
}

/// Shared authentication state consulted on every request.
#[derive(Debug, Default)]
pub struct AuthSession {
    urls: RwLock<AuthUrls>,
    credentials: RwLock<CredentialStore>,
    capability_cache: DashMap<String, Vec<Capability>>,
}

impl AuthSession {
    /// Creates an empty session holding only the anonymous credential.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a credential for a security method.
    pub fn set_credential(&self, method: impl Into<String>, credential: Credential) {
        self.credentials.write().set(method, credential);
    }

    /// Registers a security method for a URL (exact match or prefix).
    pub fn add_security_method_for_url(
        &self,
        url: impl Into<String>,
        method: impl Into<String>,
        exact: bool,
    ) {
        let mut urls = self.urls.write();
        if exact {
            urls.add_full_url(url, method);
        } else {
            urls.add_base_url(url, method);
        }
    }

    /// Selects the credential to apply to a request URL.
    pub fn credential_for(&self, url: &str) -> Result<Credential, AuthError> {
        let allowed = self.urls.read().methods_for(url);
        self.credentials.read().negotiate(&allowed)
    }

    /// Records a service's capability document and indexes its interfaces.
    ///
    /// Interfaces that declare no security method are registered as
    /// anonymous.
    pub fn update_from_capabilities(&self, service_url: &str, capabilities: Vec<Capability>) {
        {
            let mut urls = self.urls.write();
            for capability in &capabilities {
                for interface in capability.interfaces() {
                    for access_url in interface.access_urls() {
                        if interface.security_methods().is_empty() {
                            urls.add_base_url(access_url.clone(), ANONYMOUS);
                        } else {
                            for method in interface.security_methods() {
                                urls.add_base_url(access_url.clone(), method.clone());
                            }
                        }
                    }
                }
            }
        }
        self.capability_cache
            .insert(service_url.to_string(), capabilities);
    }

    /// Returns the cached capability document for a service, if any.
    pub fn cached_capabilities(&self, service_url: &str) -> Option<Vec<Capability>> {
        self.capability_cache
            .get(service_url)
            .map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(methods: &[&str]) -> HashSet<String> {
        methods.iter().map(|m| (*m).to_string()).collect()
    }

    #[test]
    fn negotiation_prefers_non_anonymous() {
        let allowed = set_of(&[ANONYMOUS, COOKIE]);
        let configured = set_of(&[ANONYMOUS, COOKIE, CERTIFICATE]);
        assert_eq!(negotiate_method(&allowed, &configured).unwrap(), COOKIE);
    }

    #[test]
    fn negotiation_falls_back_to_anonymous() {
        let allowed = set_of(&[ANONYMOUS]);
        let configured = set_of(&[ANONYMOUS, COOKIE]);
        assert_eq!(negotiate_method(&allowed, &configured).unwrap(), ANONYMOUS);
    }

    #[test]
    fn negotiation_fails_on_disjoint_sets() {
        let allowed = set_of(&[CERTIFICATE]);
        let configured = set_of(&[ANONYMOUS, COOKIE]);
        assert!(matches!(
            negotiate_method(&allowed, &configured),
            Err(AuthError::NoCommonMethod { .. })
        ));
    }

    #[test]
    fn exact_url_beats_prefix() {
        let mut urls = AuthUrls::default();
        urls.add_base_url("http://example.org/tap", COOKIE);
        urls.add_full_url("http://example.org/tap/sync", BASIC);
        assert_eq!(
            urls.methods_for("http://example.org/tap/sync"),
            HashSet::from([BASIC.to_string()])
        );
    }

    #[test]
    fn longest_prefix_wins() {
        let mut urls = AuthUrls::default();
        urls.add_base_url("http://example.org/", COOKIE);
        urls.add_base_url("http://example.org/tap", CERTIFICATE);
        assert_eq!(
            urls.methods_for("http://example.org/tap/async/123"),
            HashSet::from([CERTIFICATE.to_string()])
        );
    }

    #[test]
    fn unknown_urls_default_to_anonymous() {
        let urls = AuthUrls::default();
        assert_eq!(
            urls.methods_for("http://elsewhere.org/scs"),
            HashSet::from([ANONYMOUS.to_string()])
        );
    }

    #[test]
    fn capabilities_populate_url_map() {
        use crate::vosi::parse_capabilities;

        let session = AuthSession::new();
        let caps = parse_capabilities(
            r#"<capabilities>
                <capability standardID="ivo://ivoa.net/std/TAP">
                    <interface>
                        <accessURL>http://example.org/tap</accessURL>
                        <securityMethod standardID="ivo://ivoa.net/sso#Cookie"/>
                    </interface>
                </capability>
            </capabilities>"#,
        )
        .unwrap();
        session.update_from_capabilities("http://example.org/tap", caps);
        session.set_credential(COOKIE, Credential::CookieHeader("k=v".to_string()));
        let credential = session
            .credential_for("http://example.org/tap/sync")
            .unwrap();
        assert!(matches!(credential, Credential::CookieHeader(_)));
        assert!(session
            .cached_capabilities("http://example.org/tap")
            .is_some());
    }
}

//! Blocking HTTP session shared by every service client.
//!
//! Each request consults the authentication layer to pick a credential for
//! the target URL, applies it, and normalizes transport failures and non-2xx
//! statuses into [`ServiceError`].

use std::{sync::Arc, time::Duration};

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::Method;

use crate::auth::{AuthSession, Credential};
use crate::errors::ServiceError;

/// A cheaply cloneable blocking HTTP session.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    auth: Arc<AuthSession>,
    timeout: Option<Duration>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an anonymous session with default client settings.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            auth: Arc::new(AuthSession::new()),
            timeout: None,
        }
    }

    /// Creates a session whose client persists cookies across requests.
    pub fn with_cookie_store() -> Result<Self, ServiceError> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|err| ServiceError::from_reqwest(&err, None))?;
        Ok(Self {
            client,
            auth: Arc::new(AuthSession::new()),
            timeout: None,
        })
    }

    /// Sets a per-request timeout, passed through to the HTTP client.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The authentication state consulted on every request.
    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    fn prepare(&self, method: Method, url: &str) -> Result<RequestBuilder, ServiceError> {
        let credential = self
            .auth
            .credential_for(url)
            .map_err(|err| ServiceError::from_cause(&err).with_url(url))?;
        let client = match &credential {
            Credential::Client(client) => client.clone(),
            _ => self.client.clone(),
        };
        let mut request = client.request(method, url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        match credential {
            Credential::Basic { username, password } => {
                request = request.basic_auth(username, Some(password));
            }
            Credential::CookieHeader(cookie) => {
                request = request.header(reqwest::header::COOKIE, cookie);
            }
            Credential::Anonymous | Credential::Client(_) => {}
        }
        Ok(request)
    }

    fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, ServiceError> {
        let response = request
            .send()
            .map_err(|err| ServiceError::from_reqwest(&err, Some(url)))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(ServiceError::from_response(status.as_u16(), &body, url))
    }

    /// Issues a GET request.
    pub fn get(&self, url: &str) -> Result<Response, ServiceError> {
        let request = self.prepare(Method::GET, url)?;
        self.send(request, url)
    }

    /// Issues a GET request with extra query parameters.
    pub fn get_with_params(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<Response, ServiceError> {
        let request = self.prepare(Method::GET, url)?.query(params);
        self.send(request, url)
    }

    /// Issues a GET request and reads the body as text.
    pub fn get_text(&self, url: &str) -> Result<String, ServiceError> {
        self.get(url)?
            .text()
            .map_err(|err| ServiceError::from_reqwest(&err, Some(url)))
    }

    /// Issues a form-encoded POST request.
    pub fn post_form(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<Response, ServiceError> {
        let request = self.prepare(Method::POST, url)?.form(&params);
        self.send(request, url)
    }

    /// Issues a multipart POST carrying form fields plus inline table uploads.
    pub fn post_multipart(
        &self,
        url: &str,
        params: &[(String, String)],
        uploads: Vec<(String, Vec<u8>)>,
    ) -> Result<Response, ServiceError> {
        let mut form = multipart::Form::new();
        for (name, value) in params {
            form = form.text(name.clone(), value.clone());
        }
        for (name, bytes) in uploads {
            let part = multipart::Part::bytes(bytes)
                .file_name(format!("{name}.xml"))
                .mime_str("application/x-votable+xml")
                .map_err(|err| ServiceError::from_reqwest(&err, Some(url)))?;
            form = form.part(name, part);
        }
        let request = self.prepare(Method::POST, url)?.multipart(form);
        self.send(request, url)
    }

    /// Issues a DELETE request.
    pub fn delete(&self, url: &str) -> Result<Response, ServiceError> {
        let request = self.prepare(Method::DELETE, url)?;
        self.send(request, url)
    }
}

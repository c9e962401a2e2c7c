//! Session state shared by every remote call: authentication and security tokens,
//! the working project, and the login credentials reused by the transfer channel.
//!
//! A [`SessionContext`] is an explicit value. Components borrow it for each call, and
//! only [`SessionContext::login`], [`SessionContext::refresh_token`] and
//! [`SessionContext::set_project`] mutate it.

use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info};

use crate::contract::{Accept, Credentials, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::error::{Result, SliError};

pub const COOKIE_AUTH: &str = "GDCAuthSST";
pub const COOKIE_TOKEN: &str = "GDCAuthTT";

pub const API_LOGIN: &str = "/gdc/account/login";
pub const API_TOKEN: &str = "/gdc/account/token";
pub const API_MD: &str = "/gdc/md";
pub const API_ETL: &str = "/gdc/md/<project>/etl/pull";
pub const API_DATASETS: &str = "/gdc/md/<project>/data/sets";
pub const API_SLI: &str = "/gdc/md/<project>/ldm/singleloadinterface";
pub const API_ID_TO_URI: &str = "/gdc/md/<project>/identifiers";

const PROJECT_PLACEHOLDER: &str = "<project>";

pub struct SessionContext<H> {
    transport: H,
    auth_token: String,
    security_token: String,
    project: Option<String>,
    credentials: Option<Credentials>,
}

impl<H: HttpTransport> SessionContext<H> {
    /// An empty, unauthenticated session.
    pub fn new(transport: H) -> Self {
        Self {
            transport,
            auth_token: String::new(),
            security_token: String::new(),
            project: None,
            credentials: None,
        }
    }

    pub fn transport(&self) -> &H {
        &self.transport
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn security_token(&self) -> &str {
        &self.security_token
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn set_project(&mut self, project: impl Into<String>) -> &str {
        let project = project.into();
        info!(project = %project, "Working project set");
        self.project.insert(project).as_str()
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn require_project(&self) -> Result<&str> {
        self.project()
            .ok_or_else(|| SliError::precondition("no working project set; call set_project first"))
    }

    /// Substitute the `<project>` placeholder with the working project.
    pub fn bind_path(&self, template: &str) -> Result<String> {
        if !template.contains(PROJECT_PLACEHOLDER) {
            return Ok(template.to_string());
        }
        let project = self.require_project()?;
        Ok(project_path(template, project))
    }

    /// Session cookies for the next request, one `Cookie` header value each.
    pub fn cookies(&self) -> Vec<String> {
        let mut cookies = Vec::with_capacity(2);
        if !self.auth_token.is_empty() {
            cookies.push(format!("{COOKIE_AUTH}={}", self.auth_token));
        }
        if !self.security_token.is_empty() {
            cookies.push(format!("{COOKIE_TOKEN}={}", self.security_token));
        }
        cookies
    }

    /// Log in and obtain a security token. Returns the authentication token.
    ///
    /// Any previous login is discarded first. Credentials are only stored once both
    /// tokens exist; on failure the session is left without tokens and without
    /// stored credentials.
    pub async fn login(&mut self, username: &str, secret: &str) -> Result<String> {
        info!(username, "Logging in");
        self.clear_login();
        let body = json!({
            "postUserLogin": {
                "login": username,
                "password": secret,
                "remember": 1
            }
        });
        let response = self.send(HttpMethod::Post, API_LOGIN, Some(body)).await?;

        let auth = match extract_cookie(&response.set_cookies, COOKIE_AUTH) {
            Some(auth) => auth,
            None => {
                error!(status = response.status, "Login response carried no authentication cookie");
                self.clear_login();
                return Err(SliError::Authentication {
                    message: format!(
                        "response to {API_LOGIN} (status {}) carried no {COOKIE_AUTH} cookie",
                        response.status
                    ),
                });
            }
        };
        self.auth_token = auth;

        if let Err(e) = self.refresh_token(None).await {
            error!(error = %e, "Login aborted: no security token");
            self.clear_login();
            return Err(e);
        }

        self.credentials = Some(Credentials {
            username: username.to_string(),
            secret: secret.to_string(),
        });
        info!(username, "Login complete");
        Ok(self.auth_token.clone())
    }

    /// Fetch a fresh security token. `seed` is adopted as the authentication token
    /// when none is set yet.
    pub async fn refresh_token(&mut self, seed: Option<&str>) -> Result<String> {
        if self.auth_token.is_empty() {
            if let Some(seed) = seed.filter(|s| !s.is_empty()) {
                debug!("Adopting seed authentication token");
                self.auth_token = seed.to_string();
            }
        }
        self.security_token.clear();

        if self.auth_token.is_empty() {
            error!("Token refresh requested without authentication token");
            return Err(SliError::Token {
                message: "no authentication token; log in first".to_string(),
            });
        }

        let response = self.send(HttpMethod::Get, API_TOKEN, None).await?;
        match extract_cookie(&response.set_cookies, COOKIE_TOKEN) {
            Some(token) => {
                debug!("Security token refreshed");
                self.security_token = token.clone();
                Ok(token)
            }
            None => {
                error!(status = response.status, "Token response carried no security token cookie");
                Err(SliError::Token {
                    message: format!(
                        "response to {API_TOKEN} (status {}) carried no {COOKIE_TOKEN} cookie",
                        response.status
                    ),
                })
            }
        }
    }

    /// GET a path and return the raw response, failing on non-success statuses.
    pub async fn get(&self, path: &str) -> Result<HttpResponse> {
        let response = self.send(HttpMethod::Get, path, None).await?;
        ensure_success(path, response)
    }

    /// POST a JSON body and return the raw response, failing on non-success statuses.
    pub async fn post(&self, path: &str, body: serde_json::Value) -> Result<HttpResponse> {
        let response = self.send(HttpMethod::Post, path, Some(body)).await?;
        ensure_success(path, response)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.get(path).await?;
        decode_json(path, &response)
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self.post(path, body).await?;
        decode_json(path, &response)
    }

    fn clear_login(&mut self) {
        self.auth_token.clear();
        self.security_token.clear();
        self.credentials = None;
    }

    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse> {
        let path = self.bind_path(path)?;
        let accept = match method {
            HttpMethod::Get => Accept::JsonOrZip,
            HttpMethod::Post => Accept::Json,
        };
        debug!(method = ?method, path = %path, "Sending platform request");
        let request = HttpRequest {
            method,
            path,
            accept,
            cookies: self.cookies(),
            body,
        };
        self.transport.send(request).await
    }
}

/// Bind `template` to an explicit project instead of the working one.
pub fn project_path(template: &str, project: &str) -> String {
    template.replace(PROJECT_PLACEHOLDER, project)
}

/// Value of the cookie `name`, taken from the first `;`-delimited segment of a
/// `Set-Cookie` header. Empty values count as absent.
pub fn extract_cookie(set_cookies: &[String], name: &str) -> Option<String> {
    set_cookies.iter().find_map(|header| {
        let first = header.split(';').next()?;
        let (key, value) = first.split_once('=')?;
        (key.trim() == name && !value.trim().is_empty()).then(|| value.trim().to_string())
    })
}

fn ensure_success(path: &str, response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let body = String::from_utf8_lossy(&response.body);
    error!(path, status = response.status, body = %body, "Platform returned error status");
    Err(SliError::transport(format!(
        "{path} returned status {}",
        response.status
    )))
}

fn decode_json<T: DeserializeOwned>(path: &str, response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|e| {
        error!(path, error = %e, "Unexpected response body");
        SliError::transport_with_source(format!("unexpected response body from {path}"), e)
    })
}

//! `reqwest`-backed [`HttpTransport`] for the platform REST API.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE, SET_COOKIE};
use sli_load_core::contract::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use sli_load_core::{Result, SliError};
use tracing::{debug, error};

pub struct GdcHttpClient {
    client: reqwest::Client,
    server: String,
}

impl GdcHttpClient {
    /// `server` is the REST root, e.g. `https://secure.gooddata.com`.
    pub fn new(server: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sli-load/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }
}

#[async_trait]
impl HttpTransport for GdcHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        }
        .header(ACCEPT, request.accept.header_value());
        // One header per cookie; the platform does not accept them joined.
        for cookie in &request.cookies {
            builder = builder.header(COOKIE, cookie.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            error!(url = %url, error = %e, "HTTP request failed");
            SliError::transport_with_source(format!("request to {url} failed"), e)
        })?;
        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_owned)
            .collect();
        let body = response.bytes().await.map_err(|e| {
            error!(url = %url, error = %e, "Failed to read response body");
            SliError::transport_with_source(format!("cannot read response from {url}"), e)
        })?;

        debug!(url = %url, status, bytes = body.len(), "HTTP response received");
        Ok(HttpResponse {
            status,
            set_cookies,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_server_and_path() {
        let client = GdcHttpClient::new("https://secure.example.com/").unwrap();
        assert_eq!(client.url("/gdc/md"), "https://secure.example.com/gdc/md");
    }
}

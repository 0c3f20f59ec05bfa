// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport: the single boundary between the protocol layer and the network.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, Method, redirect};

use crate::config::{AuthMethod, CalDavConfig};
use crate::error::CalDavError;

/// Content type of XML request bodies.
pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Content type of calendar object bodies.
pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=\"utf-8\"";

/// A request to be issued by a [`Transport`].
#[derive(Debug, Clone)]
pub struct DavRequest {
    /// HTTP verb, including the WebDAV extension verbs.
    pub method: Method,
    /// Absolute target URL.
    pub url: String,
    /// Request body.
    pub body: Option<String>,
    /// Value of the `Depth` header.
    pub depth: Option<u8>,
    /// Additional headers.
    pub headers: Vec<(String, String)>,
}

impl DavRequest {
    /// Creates a request without body or headers.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            depth: None,
            headers: Vec::new(),
        }
    }

    /// Sets an XML body.
    #[must_use]
    pub fn xml_body(self, body: String) -> Self {
        self.body(body).header("Content-Type", XML_CONTENT_TYPE)
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the `Depth` header.
    #[must_use]
    pub const fn depth(mut self, depth: u8) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A reply as seen by the protocol layer.
#[derive(Debug, Clone, Default)]
pub struct DavResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase.
    pub reason: String,
    /// Response headers, names lowercased.
    pub headers: Vec<(String, String)>,
    /// Response body as text.
    pub body: String,
}

impl DavResponse {
    /// Looks a header up by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Issues DAV verbs against a server.
///
/// The transport owns connection handling, authentication, timeouts and
/// cancellation. It reports every HTTP status as a [`DavResponse`]; only
/// failures to complete a round trip are errors.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync {
    /// Sends a request and returns the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if no reply could be obtained.
    async fn issue(&self, request: DavRequest) -> Result<DavResponse, CalDavError>;
}

/// `reqwest`-backed transport.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    auth: AuthMethod,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// Redirects are not followed: a `302` after `PUT` names the location
    /// the server stored the resource at, and the caller needs to see it.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: &CalDavConfig) -> Result<Self, CalDavError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            auth: config.auth.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn issue(&self, request: DavRequest) -> Result<DavResponse, CalDavError> {
        let mut req = self.client.request(request.method, &request.url);

        match &self.auth {
            AuthMethod::Basic { username, password } => {
                req = req.basic_auth(username, Some(password));
            }
            AuthMethod::Bearer { token } => {
                req = req.bearer_auth(token);
            }
            AuthMethod::None => {}
        }

        if let Some(depth) = request.depth {
            req = req.header("Depth", depth.to_string());
        }
        for (name, value) in request.headers {
            req = req.header(name, value);
        }
        if let Some(body) = request.body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = resp.text().await?;

        Ok(DavResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

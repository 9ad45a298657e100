// File: request.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::{TokenGenError, TokenGenResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::Method;
use url::Url;

/// The request replayed by every worker to mint a fresh token.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<String>,
}

impl RequestTemplate {
    pub fn new(method: &str, url: &str) -> TokenGenResult<Self> {
        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|e| TokenGenError::InvalidRequest(format!("Invalid method: {}", e)))?;
        let url = Url::parse(url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(TokenGenError::InvalidRequest(format!(
                "Unsupported scheme: {}",
                url.scheme()
            )));
        }
        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        })
    }

    pub fn get(url: &str) -> TokenGenResult<Self> {
        Self::new("GET", url)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> TokenGenResult<Self> {
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| TokenGenError::InvalidRequest(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| TokenGenError::InvalidRequest(format!("Invalid header value: {}", e)))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Parses a raw `Name: value` line as given on the command line.
    pub fn with_raw_header(self, line: &str) -> TokenGenResult<Self> {
        let (name, value) = line.split_once(':').ok_or_else(|| {
            TokenGenError::InvalidRequest(format!("Header must be 'Name: value': {}", line))
        })?;
        self.with_header(name, value)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Copy of the template without any `Cookie` header, forcing the target
    /// to establish a new session.
    pub fn without_cookies(&self) -> Self {
        let mut stripped = self.clone();
        stripped.headers.remove(COOKIE);
        stripped
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    pub fn has_cookies(&self) -> bool {
        self.headers.contains_key(COOKIE)
    }
}

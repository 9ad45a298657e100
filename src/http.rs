// File: http.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::TokenGenResult;
use crate::httpinner::HttpInner;
use crate::request::RequestTemplate;
use async_trait::async_trait;
use log::trace;
use std::time::Duration;

/// Issues one token-minting request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn issue(&self, template: &RequestTemplate, strip_cookie: bool)
        -> TokenGenResult<HttpInner>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout_secs: u64) -> TokenGenResult<Self> {
        // No cookie store: every request carries only the template's cookies.
        let client = reqwest::Client::builder().build()?;
        Ok(ReqwestTransport {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn issue(
        &self,
        template: &RequestTemplate,
        strip_cookie: bool,
    ) -> TokenGenResult<HttpInner> {
        let template = if strip_cookie && template.has_cookies() {
            template.without_cookies()
        } else {
            template.clone()
        };

        let mut request = self
            .client
            .request(template.method().clone(), template.url().clone())
            .headers(template.headers().clone())
            .timeout(self.timeout);
        if let Some(body) = template.body() {
            request = request.body(body.to_string());
        }

        let resp = request.send().await?;
        let url = resp.url().to_string();
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body_text = resp.text().await?;
        trace!("{} {} -> {}", template.method(), url, status);

        Ok(HttpInner::new_with_all(headers, body_text, status, url))
    }
}

// File: httpinner.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use reqwest::header::{HeaderMap, SET_COOKIE};

/// One response returned by the transport for a token-issuing request.
#[derive(Debug, Clone)]
pub struct HttpInner {
    body: String,
    headers: HeaderMap,
    status: u16,
    url: String,
}

impl Default for HttpInner {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpInner {
    pub fn new() -> Self {
        HttpInner {
            body: String::new(),
            headers: HeaderMap::new(),
            status: 0,
            url: String::new(),
        }
    }

    pub fn new_with_all(headers: HeaderMap, body: String, status: u16, url: String) -> Self {
        HttpInner {
            body,
            headers,
            status,
            url,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `(name, value)` pairs of every `Set-Cookie` header, in response order.
    pub fn set_cookies(&self) -> Vec<(String, String)> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies()
            .into_iter()
            .find(|(cookie_name, _)| cookie_name == name)
            .map(|(_, value)| value)
    }
}

fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = value.trim().trim_matches('"');
    Some((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn response_with_cookies(cookies: &[&'static str]) -> HttpInner {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(SET_COOKIE, HeaderValue::from_static(cookie));
        }
        HttpInner::new_with_all(headers, String::new(), 200, "https://example.com".to_string())
    }

    #[test]
    fn test_set_cookie_parsing() {
        let response = response_with_cookies(&[
            "JSESSIONID=ABC123; Path=/; HttpOnly",
            "theme=\"dark\"",
            "=orphan",
            "broken",
        ]);

        let cookies = response.set_cookies();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0], ("JSESSIONID".to_string(), "ABC123".to_string()));
        assert_eq!(cookies[1], ("theme".to_string(), "dark".to_string()));
    }

    #[test]
    fn test_cookie_lookup_is_case_sensitive() {
        let response = response_with_cookies(&["sid=one", "SID=two"]);
        assert_eq!(response.cookie("SID"), Some("two".to_string()));
        assert_eq!(response.cookie("sid"), Some("one".to_string()));
        assert_eq!(response.cookie("missing"), None);
    }

    #[test]
    fn test_empty_response() {
        let response = HttpInner::new();
        assert_eq!(response.status(), 0);
        assert!(response.body().is_empty());
        assert!(response.set_cookies().is_empty());
    }
}

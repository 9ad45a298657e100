// File: extractor.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::httpinner::HttpInner;
use log::trace;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

static FORM_INPUT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("form input").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Cookie,
    Form,
    Url,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Cookie => write!(f, "cookie"),
            TokenKind::Form => write!(f, "form"),
            TokenKind::Url => write!(f, "url"),
        }
    }
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cookie" => Ok(TokenKind::Cookie),
            "form" => Ok(TokenKind::Form),
            "url" => Ok(TokenKind::Url),
            other => Err(format!("Unknown token type: {}", other)),
        }
    }
}

/// Where in a response the token lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLocation {
    pub kind: TokenKind,
    pub name: String,
}

impl TokenLocation {
    pub fn new(kind: TokenKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn cookie(name: impl Into<String>) -> Self {
        Self::new(TokenKind::Cookie, name)
    }

    pub fn form(name: impl Into<String>) -> Self {
        Self::new(TokenKind::Form, name)
    }
}

pub trait Extractor: Send + Sync {
    fn extract(&self, response: &HttpInner, location: &TokenLocation) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl Extractor for DefaultExtractor {
    fn extract(&self, response: &HttpInner, location: &TokenLocation) -> Option<String> {
        let token = match location.kind {
            TokenKind::Cookie => response.cookie(&location.name),
            TokenKind::Form => form_token_value(response.body(), &location.name),
            // Not supported yet: URL tokens are never found.
            TokenKind::Url => None,
        };
        trace!("Extracted {} token {}: {:?}", location.kind, location.name, token);
        token
    }
}

/// Attributes of every `<input>` nested in a `<form>`, in document order.
/// Names are lowercase and values are entity-decoded by the parser.
fn form_inputs(body: &str) -> Vec<HashMap<String, String>> {
    let document = Html::parse_document(body);
    document
        .select(&FORM_INPUT_SELECTOR)
        .map(|input| {
            input
                .value()
                .attrs()
                .map(|(name, value)| (name.to_lowercase(), value.to_string()))
                .collect()
        })
        .collect()
}

/// Value of the first form input whose `id` or `name` matches
/// `token_name`, ignoring case.
pub fn form_token_value(body: &str, token_name: &str) -> Option<String> {
    for attributes in form_inputs(body) {
        let matches = |key: &str| {
            attributes
                .get(key)
                .is_some_and(|v| v.eq_ignore_ascii_case(token_name))
        };
        if matches("id") || matches("name") {
            return attributes.get("value").cloned();
        }
    }
    None
}

/// Lists the `id` (or `name` when the id is missing) of every form input.
pub fn form_input_fields(body: &str) -> Vec<String> {
    form_inputs(body)
        .into_iter()
        .filter_map(|attributes| {
            attributes
                .get("id")
                .filter(|id| !id.is_empty())
                .or_else(|| attributes.get("name").filter(|name| !name.is_empty()))
                .cloned()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};

    const LOGIN_PAGE: &str = r#"
        <html><body>
        <input name="outside" value="ignored">
        <form action="/login" method="post">
            <input type="hidden" ID="CsrfToken" value="f3a9c1">
            <input type=text name=user>
            <input type='hidden' name='nonce' value='77aa'>
        </form>
        <form><input name="second" value="2"></FORM>
        </body></html>
    "#;

    fn response(body: &str, cookies: &[&'static str]) -> HttpInner {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(SET_COOKIE, HeaderValue::from_static(cookie));
        }
        HttpInner::new_with_all(headers, body.to_string(), 200, "https://example.com/".to_string())
    }

    #[test]
    fn test_cookie_extraction() {
        let resp = response("", &["lang=en", "JSESSIONID=9F2B; Path=/"]);
        let token = DefaultExtractor.extract(&resp, &TokenLocation::cookie("JSESSIONID"));
        assert_eq!(token, Some("9F2B".to_string()));

        let missing = DefaultExtractor.extract(&resp, &TokenLocation::cookie("jsessionid"));
        assert_eq!(missing, None);
    }

    #[test]
    fn test_form_extraction_by_id_and_name() {
        let resp = response(LOGIN_PAGE, &[]);
        assert_eq!(
            DefaultExtractor.extract(&resp, &TokenLocation::form("csrftoken")),
            Some("f3a9c1".to_string())
        );
        assert_eq!(
            DefaultExtractor.extract(&resp, &TokenLocation::form("NONCE")),
            Some("77aa".to_string())
        );
        assert_eq!(
            DefaultExtractor.extract(&resp, &TokenLocation::form("second")),
            Some("2".to_string())
        );
    }

    #[test]
    fn test_form_extraction_misses() {
        let resp = response(LOGIN_PAGE, &[]);
        // Outside any form.
        assert_eq!(DefaultExtractor.extract(&resp, &TokenLocation::form("outside")), None);
        // Matching input without a value attribute.
        assert_eq!(DefaultExtractor.extract(&resp, &TokenLocation::form("user")), None);
    }

    #[test]
    fn test_form_values_are_entity_decoded() {
        let body = r#"<form><input name="csrf" value="a&amp;b&#x2F;c"></form>"#;
        assert_eq!(form_token_value(body, "csrf"), Some("a&b/c".to_string()));
    }

    #[test]
    fn test_form_attribute_containing_angle_bracket() {
        let body = r#"<form><input title="x>y" name="csrf" value="abc"></form>"#;
        assert_eq!(form_token_value(body, "csrf"), Some("abc".to_string()));
        assert_eq!(form_input_fields(body), vec!["csrf"]);
    }

    #[test]
    fn test_url_extraction_always_absent() {
        let resp = response("https://example.com/?token=abc", &["token=abc"]);
        let location = TokenLocation::new(TokenKind::Url, "token");
        assert_eq!(DefaultExtractor.extract(&resp, &location), None);
    }

    #[test]
    fn test_form_input_fields() {
        let fields = form_input_fields(LOGIN_PAGE);
        assert_eq!(fields, vec!["CsrfToken", "user", "nonce", "second"]);
    }

    #[test]
    fn test_token_kind_parsing() {
        assert_eq!("COOKIE".parse::<TokenKind>().unwrap(), TokenKind::Cookie);
        assert_eq!("form".parse::<TokenKind>().unwrap(), TokenKind::Form);
        assert!("header".parse::<TokenKind>().is_err());
    }
}

// File: common/mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

fn splitmix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// A fresh 32 hex digit value per call.
pub fn random_token(n: u64) -> String {
    format!("{:016x}{:016x}", splitmix(n), splitmix(n ^ 0xDEAD_BEEF_CAFE_F00D))
}

/// Sets a new session cookie on every response.
pub struct CookieMinter {
    name: String,
    counter: AtomicU64,
}

impl CookieMinter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Respond for CookieMinter {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200)
            .set_body_string("<html><body>Welcome</body></html>")
            .append_header("content-type", "text/html")
            .append_header("set-cookie", "theme=dark; Path=/")
            .append_header(
                "set-cookie",
                format!("{}={}; Path=/; HttpOnly", self.name, random_token(n)).as_str(),
            )
    }
}

/// Serves a login form with a fresh hidden anti-CSRF field.
pub struct FormMinter {
    field: String,
    counter: AtomicU64,
}

impl FormMinter {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Respond for FormMinter {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200)
            .set_body_string(login_form_page(&self.field, &random_token(n)))
            .append_header("content-type", "text/html")
    }
}

pub fn login_form_page(field: &str, token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sign in</title></head>
<body>
    <input type="text" name="search">
    <form action="/login" method="post">
        <input type="text" id="username" name="user">
        <input type="password" name="password">
        <input type="hidden" name="{}" value="{}">
        <input type="submit" value="Sign in">
    </form>
</body>
</html>"#,
        field, token
    )
}

pub async fn mount_cookie_endpoint(server: &MockServer, route: &str, cookie: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(CookieMinter::new(cookie))
        .mount(server)
        .await;
}

pub async fn mount_form_endpoint(server: &MockServer, route: &str, field: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(FormMinter::new(field))
        .mount(server)
        .await;
}

pub async fn mount_plain_endpoint(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string("no token here"))
        .mount(server)
        .await;
}

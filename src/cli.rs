// File: cli.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use clap::Parser;
use std::path::PathBuf;

use crate::extractor::TokenKind;
use crate::policy::Mode;
use crate::report::ReportFormat;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[arg(short = 'u', long = "url", help = "Endpoint that issues the token")]
    pub url: String,

    #[arg(short = 'X', long = "method", default_value = "GET")]
    pub method: String,

    #[arg(
        short = 'H',
        long = "header",
        help = "Extra request header as 'Name: value' (repeatable)"
    )]
    pub headers: Vec<String>,

    #[arg(short = 'd', long = "data", help = "Request body")]
    pub data: Option<String>,

    #[arg(
        short = 'T',
        long = "token-name",
        required_unless_present = "list_fields",
        help = "Cookie or form field carrying the token"
    )]
    pub token_name: Option<String>,

    #[arg(long = "token-type", default_value = "cookie", value_parser = parse_token_kind)]
    pub token_type: TokenKind,

    #[arg(short = 'c', long = "count", default_value_t = 1000)]
    pub count: usize,

    #[arg(short = 'w', long = "workers", default_value_t = crate::config::DEFAULT_WORKERS)]
    pub workers: usize,

    #[arg(long = "delay-ms", default_value_t = 0, help = "Pause after each request per worker")]
    pub delay_ms: u64,

    #[arg(
        short = 't',
        long = "timeout",
        default_value_t = 10,
        help = "HTTP request timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(short = 'm', long = "mode", default_value = "standard", value_parser = parse_mode)]
    pub mode: Mode,

    #[arg(long = "scope", help = "Host considered in scope in protected mode (repeatable)")]
    pub scope: Vec<String>,

    #[arg(long = "keep-cookies", help = "Send the Cookie header with every request")]
    pub keep_cookies: bool,

    #[arg(long = "list-fields", help = "List form input fields of the response and exit")]
    pub list_fields: bool,

    #[arg(short = 'f', long = "format", default_value = "text", value_parser = parse_format)]
    pub format: ReportFormat,

    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short = 'q', long = "quiet", help = "Reduce output verbosity")]
    pub quiet: bool,

    #[arg(long = "no-color", help = "Disable colored output")]
    pub no_color: bool,
}

impl Cli {
    /// Effective log level; `-q` wins over `-v`.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        if self.quiet {
            log::LevelFilter::Error
        } else if self.verbose {
            log::LevelFilter::Debug
        } else {
            self.log_level.parse().unwrap_or(log::LevelFilter::Warn)
        }
    }
}

fn parse_token_kind(s: &str) -> Result<TokenKind, String> {
    s.parse::<TokenKind>()
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse::<Mode>()
}

fn parse_format(s: &str) -> Result<ReportFormat, String> {
    s.parse::<ReportFormat>()
}

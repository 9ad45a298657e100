// File: config.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::policy::Mode;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 0;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParam {
    workers: usize,
    request_delay_ms: u64,
    timeout: u64,
    mode: Mode,
}

impl Default for TokenParam {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenParam {
    pub fn new() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            timeout: DEFAULT_TIMEOUT_SECS,
            mode: Mode::Standard,
        }
    }

    pub fn set_workers(&mut self, workers: usize) {
        self.workers = workers;
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn set_request_delay_ms(&mut self, request_delay_ms: u64) {
        self.request_delay_ms = request_delay_ms;
    }

    pub fn request_delay_ms(&self) -> u64 {
        self.request_delay_ms
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn set_timeout(&mut self, timeout: u64) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

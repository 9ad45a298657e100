// File: getstate.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Request counters for one run, shared by all of its workers.
#[derive(Debug, Default)]
pub struct GetState {
    issued_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    extraction_misses: AtomicU64,
    start_time: Mutex<Option<DateTime<Utc>>>,
    end_time: Mutex<Option<DateTime<Utc>>>,
}

impl GetState {
    pub fn new() -> GetState {
        GetState::default()
    }

    pub fn add_issued(&self) {
        self.issued_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_success(&self) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_miss(&self) {
        self.extraction_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn issued_requests(&self) -> u64 {
        self.issued_requests.load(Ordering::Relaxed)
    }

    pub fn successful_requests(&self) -> u64 {
        self.successful_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn extraction_misses(&self) -> u64 {
        self.extraction_misses.load(Ordering::Relaxed)
    }

    pub fn mark_started(&self) {
        *self.start_time.lock() = Some(Utc::now());
    }

    pub fn mark_finished(&self) {
        *self.end_time.lock() = Some(Utc::now());
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        *self.start_time.lock()
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        *self.end_time.lock()
    }

    pub fn elapsed_ms(&self) -> Option<i64> {
        let start = self.start_time()?;
        let end = self.end_time().unwrap_or_else(Utc::now);
        Some((end - start).num_milliseconds())
    }
}

// File: history.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::{TokenGenError, TokenGenResult};
use crate::request::RequestTemplate;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Resolves a previously recorded message into the request to replay.
pub trait MessageHistory: Send + Sync {
    fn resolve(&self, message_id: u64) -> TokenGenResult<RequestTemplate>;
}

#[derive(Debug)]
pub struct InMemoryHistory {
    messages: DashMap<u64, RequestTemplate>,
    next_id: AtomicU64,
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self {
            messages: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn record(&self, template: RequestTemplate) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.messages.insert(id, template);
        id
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl MessageHistory for InMemoryHistory {
    fn resolve(&self, message_id: u64) -> TokenGenResult<RequestTemplate> {
        self.messages
            .get(&message_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                TokenGenError::NotFound(format!("The history id '{}' does not exist.", message_id))
            })
    }
}

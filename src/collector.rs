// File: collector.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::control::RunControl;
use crate::extractor::{Extractor, TokenLocation};
use crate::getstate::GetState;
use crate::http::Transport;
use crate::request::RequestTemplate;
use crate::sample_set::SampleSet;
use log::{debug, trace, warn};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Exhausted,
    Stopped,
    TransportFailed(String),
    /// The worker task died before it could report on its own.
    Panicked(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorOutcome {
    pub worker_id: usize,
    pub iterations: usize,
    pub collected: usize,
    pub reason: StopReason,
}

/// Receives exactly one notification per worker when its loop ends.
pub trait CompletionSignal: Send + Sync {
    fn worker_stopped(&self, outcome: &CollectorOutcome);
}

/// Shared handles a worker needs from its run.
#[derive(Clone)]
pub struct CollectorContext {
    pub transport: Arc<dyn Transport>,
    pub extractor: Arc<dyn Extractor>,
    pub samples: Arc<SampleSet>,
    pub state: Arc<GetState>,
    pub control: RunControl,
    pub completion: Arc<dyn CompletionSignal>,
}

pub struct SampleCollector {
    id: usize,
    template: Arc<RequestTemplate>,
    location: Arc<TokenLocation>,
    assigned: usize,
    delay: Duration,
    strip_cookie: bool,
    ctx: CollectorContext,
}

impl SampleCollector {
    pub fn new(
        id: usize,
        template: Arc<RequestTemplate>,
        location: Arc<TokenLocation>,
        assigned: usize,
        delay: Duration,
        strip_cookie: bool,
        ctx: CollectorContext,
    ) -> Self {
        Self {
            id,
            template,
            location,
            assigned,
            delay,
            strip_cookie,
            ctx,
        }
    }

    pub fn assigned(&self) -> usize {
        self.assigned
    }

    pub async fn run(self) -> CollectorOutcome {
        debug!("Worker {} started, {} requests assigned", self.id, self.assigned);
        let template = if self.strip_cookie {
            self.template.without_cookies()
        } else {
            self.template.as_ref().clone()
        };
        let ctx = &self.ctx;

        let mut iterations = 0;
        let mut collected = 0;
        let reason = loop {
            if iterations >= self.assigned {
                break StopReason::Exhausted;
            }
            if ctx.control.is_stopped() || !ctx.control.wait_while_paused().await {
                break StopReason::Stopped;
            }

            ctx.state.add_issued();
            match ctx.transport.issue(&template, self.strip_cookie).await {
                Ok(response) => {
                    ctx.state.add_success();
                    match ctx.extractor.extract(&response, &self.location) {
                        Some(value) => {
                            let index = ctx.samples.append(value);
                            trace!("Worker {} recorded token #{}", self.id, index);
                            collected += 1;
                        }
                        None => {
                            ctx.state.add_miss();
                            trace!(
                                "Worker {} found no {} token '{}' in response from {}",
                                self.id,
                                self.location.kind,
                                self.location.name,
                                response.url()
                            );
                        }
                    }
                }
                Err(e) => {
                    ctx.state.add_failure();
                    warn!("Worker {} stopping after transport failure: {}", self.id, e);
                    break StopReason::TransportFailed(e.to_string());
                }
            }

            iterations += 1;
            ctx.control.pace(self.delay).await;
        };

        let outcome = CollectorOutcome {
            worker_id: self.id,
            iterations,
            collected,
            reason,
        };
        debug!(
            "Worker {} stopped after {} iterations ({:?})",
            self.id, iterations, outcome.reason
        );
        ctx.completion.worker_stopped(&outcome);
        outcome
    }
}

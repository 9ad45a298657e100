// File: registry.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::analysis::TestResult;
use crate::config::TokenParam;
use crate::coordinator::{CollectionCoordinator, GenerationJob, RunState};
use crate::error::{TokenGenError, TokenGenResult};
use crate::extractor::{DefaultExtractor, Extractor, TokenKind, TokenLocation};
use crate::history::MessageHistory;
use crate::http::Transport;
use crate::policy::{Mode, PolicyCheck};
use crate::request::RequestTemplate;
use dashmap::DashMap;
use log::info;
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use uuid::Uuid;

/// Number of finished tests after which `details` carries the full list.
pub const DETAILS_THRESHOLD: usize = 9;

pub const PROCESSING: &str = "processing...";

#[derive(Debug, Clone)]
pub enum RunTarget {
    /// A message previously recorded in the history.
    History(u64),
    Template(RequestTemplate),
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub target: RunTarget,
    pub location: TokenLocation,
    pub target_count: usize,
    pub strip_cookie: bool,
}

impl RunRequest {
    pub fn from_history(
        message_id: u64,
        token_name: impl Into<String>,
        token_type: TokenKind,
        target_count: usize,
    ) -> Self {
        Self {
            target: RunTarget::History(message_id),
            location: TokenLocation::new(token_type, token_name),
            target_count,
            strip_cookie: true,
        }
    }

    pub fn from_template(
        template: RequestTemplate,
        location: TokenLocation,
        target_count: usize,
    ) -> Self {
        Self {
            target: RunTarget::Template(template),
            location,
            target_count,
            strip_cookie: true,
        }
    }

    /// Replays the template's `Cookie` header instead of dropping it.
    pub fn keep_cookies(mut self) -> Self {
        self.strip_cookie = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatusKind {
    Running,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunDetails {
    Empty,
    Processing,
    Results(Vec<TestResult>),
}

impl RunDetails {
    pub fn from_results(state: RunState, results: Vec<TestResult>) -> Self {
        if state == RunState::Completed || results.len() >= DETAILS_THRESHOLD {
            RunDetails::Results(results)
        } else if results.is_empty() {
            RunDetails::Empty
        } else {
            RunDetails::Processing
        }
    }
}

impl Serialize for RunDetails {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RunDetails::Empty => serializer.serialize_none(),
            RunDetails::Processing => serializer.serialize_str(PROCESSING),
            RunDetails::Results(results) => results.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatus {
    pub status: RunStatusKind,
    pub percentage: u8,
    pub details: RunDetails,
}

/// `collected / target * 100`, rounded half up. An empty target counts as done.
pub fn completion_percentage(collected: usize, target: usize) -> u8 {
    if target == 0 {
        return 100;
    }
    let collected = collected as u128;
    let target = target as u128;
    let rounded = (collected * 200 + target) / (2 * target);
    rounded.min(100) as u8
}

/// Process-wide table of runs. Completed runs stay queryable for the life
/// of the registry.
pub struct RunRegistry {
    runs: DashMap<Uuid, Arc<CollectionCoordinator>>,
    param: RwLock<TokenParam>,
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn Extractor>,
    history: Arc<dyn MessageHistory>,
    policy: Arc<dyn PolicyCheck>,
}

impl RunRegistry {
    pub fn new(
        param: TokenParam,
        transport: Arc<dyn Transport>,
        history: Arc<dyn MessageHistory>,
        policy: Arc<dyn PolicyCheck>,
    ) -> Self {
        Self {
            runs: DashMap::new(),
            param: RwLock::new(param),
            transport,
            extractor: Arc::new(DefaultExtractor),
            history,
            policy,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Resolves the target, validates it against the current mode and
    /// starts generating. No run is registered when this fails.
    pub fn start_run(&self, request: RunRequest) -> TokenGenResult<Uuid> {
        let template = match request.target {
            RunTarget::History(message_id) => self.history.resolve(message_id)?,
            RunTarget::Template(template) => template,
        };
        let param = *self.param.read();
        let job = GenerationJob {
            template,
            location: request.location,
            target_count: request.target_count,
            worker_count: param.workers(),
            request_delay: param.request_delay(),
            strip_cookie: request.strip_cookie,
        };

        let coordinator = Arc::new(CollectionCoordinator::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.extractor),
        ));
        coordinator.start(job, param.mode(), self.policy.as_ref())?;

        let id = Uuid::new_v4();
        self.runs.insert(id, coordinator);
        info!("Registered run {}", id);
        Ok(id)
    }

    pub fn get_run_status(&self, id: &Uuid) -> TokenGenResult<RunStatus> {
        let run = self.run(id)?;
        let state = run.state();
        // Done as soon as generation has quiesced, even while analysing.
        let status = if run.running_workers() > 0 {
            RunStatusKind::Running
        } else {
            RunStatusKind::Done
        };
        Ok(RunStatus {
            status,
            percentage: completion_percentage(run.collected(), run.target_count()),
            details: RunDetails::from_results(state, run.results()),
        })
    }

    pub fn stop_run(&self, id: &Uuid) -> TokenGenResult<()> {
        self.run(id)?.stop();
        Ok(())
    }

    pub fn pause_run(&self, id: &Uuid) -> TokenGenResult<()> {
        self.run(id)?.pause();
        Ok(())
    }

    pub fn resume_run(&self, id: &Uuid) -> TokenGenResult<()> {
        self.run(id)?.resume();
        Ok(())
    }

    pub fn run(&self, id: &Uuid) -> TokenGenResult<Arc<CollectionCoordinator>> {
        self.runs
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| TokenGenError::NotFound(format!("The run id '{}' does not exist.", id)))
    }

    pub fn run_ids(&self) -> Vec<Uuid> {
        self.runs.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn stop_all(&self) {
        for entry in self.runs.iter() {
            entry.value().stop();
        }
    }

    pub fn has_active_runs(&self) -> bool {
        self.runs
            .iter()
            .any(|entry| entry.value().running_workers() > 0)
    }

    pub fn mode(&self) -> Mode {
        self.param.read().mode()
    }

    /// Switching the operating mode halts every run.
    pub fn set_mode(&self, mode: Mode) {
        self.param.write().set_mode(mode);
        info!("Operating mode set to {}, stopping all runs", mode);
        self.stop_all();
    }

    pub fn param(&self) -> TokenParam {
        *self.param.read()
    }

    pub fn set_param(&self, param: TokenParam) {
        *self.param.write() = param;
    }
}

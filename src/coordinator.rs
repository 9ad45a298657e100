// File: coordinator.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::analysis::{AnalysisEngine, AnalysisListener, TestResult};
use crate::collector::{
    CollectorContext, CollectorOutcome, CompletionSignal, SampleCollector, StopReason,
};
use crate::control::RunControl;
use crate::error::{TokenGenError, TokenGenResult};
use crate::extractor::{Extractor, TokenLocation};
use crate::getstate::GetState;
use crate::http::Transport;
use crate::policy::{Mode, PolicyCheck};
use crate::request::RequestTemplate;
use crate::sample_set::SampleSet;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Generating,
    Stopping,
    Analyzing,
    Completed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Generating => "generating",
            RunState::Stopping => "stopping",
            RunState::Analyzing => "analyzing",
            RunState::Completed => "completed",
        };
        write!(f, "{}", name)
    }
}

/// Everything a run needs to start generating. Immutable once started.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub template: RequestTemplate,
    pub location: TokenLocation,
    pub target_count: usize,
    pub worker_count: usize,
    pub request_delay: Duration,
    pub strip_cookie: bool,
}

impl GenerationJob {
    /// Share of each worker. The remainder of the division is not
    /// handed to anyone, so fewer than `target_count` tokens may be
    /// requested overall.
    pub fn per_worker(&self) -> usize {
        if self.worker_count == 0 {
            0
        } else {
            self.target_count / self.worker_count
        }
    }
}

/// Run-wide state shared with the workers.
struct RunShared {
    state: Arc<watch::Sender<RunState>>,
    running_workers: AtomicUsize,
    manually_stopped: AtomicBool,
    samples: Arc<SampleSet>,
    results: Arc<RwLock<Vec<TestResult>>>,
    listeners: RwLock<Vec<Arc<dyn AnalysisListener>>>,
    analysis_cancel: CancellationToken,
    stats: Arc<GetState>,
    outcomes: Mutex<Vec<CollectorOutcome>>,
}

impl RunShared {
    fn state(&self) -> RunState {
        *self.state.borrow()
    }

    fn set_state(&self, next: RunState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!("Run state {} -> {}", previous, next);
        }
    }

    fn generation_finished(&self) {
        self.stats.mark_finished();
        if self.manually_stopped.load(Ordering::SeqCst) {
            info!("All workers stopped after manual stop, skipping analysis");
            self.set_state(RunState::Completed);
            return;
        }

        self.set_state(RunState::Analyzing);
        let snapshot = self.samples.snapshot_with_frequencies();
        let mut engine = AnalysisEngine::with_cancellation(self.analysis_cancel.clone());
        let results = Arc::clone(&self.results);
        engine.add_listener(Arc::new(move |result: &TestResult| {
            results.write().push(result.clone());
        }));
        for listener in self.listeners.read().iter() {
            engine.add_listener(Arc::clone(listener));
        }

        let handle = engine.spawn(snapshot);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            match handle.await {
                Ok(results) => info!("Analysis produced {} results", results.len()),
                Err(e) => warn!("Analysis task failed: {}", e),
            }
            let previous = state.send_replace(RunState::Completed);
            info!("Run state {} -> {}", previous, RunState::Completed);
        });
    }
}

impl CompletionSignal for RunShared {
    fn worker_stopped(&self, outcome: &CollectorOutcome) {
        self.outcomes.lock().push(outcome.clone());
        let previous = self.running_workers.fetch_sub(1, Ordering::SeqCst);
        debug!("Worker {} stopped, {} still running", outcome.worker_id, previous - 1);
        if previous == 1 {
            self.generation_finished();
        }
    }
}

/// Owns one token generation run from start to completion.
pub struct CollectionCoordinator {
    shared: Arc<RunShared>,
    control: RunControl,
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn Extractor>,
    target_count: AtomicUsize,
    assignments: Mutex<Vec<usize>>,
}

impl CollectionCoordinator {
    pub fn new(transport: Arc<dyn Transport>, extractor: Arc<dyn Extractor>) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            shared: Arc::new(RunShared {
                state: Arc::new(state),
                running_workers: AtomicUsize::new(0),
                manually_stopped: AtomicBool::new(false),
                samples: Arc::new(SampleSet::new()),
                results: Arc::new(RwLock::new(Vec::new())),
                listeners: RwLock::new(Vec::new()),
                analysis_cancel: CancellationToken::new(),
                stats: Arc::new(GetState::new()),
                outcomes: Mutex::new(Vec::new()),
            }),
            control: RunControl::new(),
            transport,
            extractor,
            target_count: AtomicUsize::new(0),
            assignments: Mutex::new(Vec::new()),
        }
    }

    /// Validates the job against the operating mode and spawns the
    /// workers. Must be called from within a tokio runtime.
    pub fn start(
        &self,
        job: GenerationJob,
        mode: Mode,
        policy: &dyn PolicyCheck,
    ) -> TokenGenResult<()> {
        if self.state() != RunState::Idle {
            return Err(TokenGenError::InvalidRequest(
                "Run has already been started".to_string(),
            ));
        }
        if !policy.allowed(mode, &job.template) {
            let reason = match mode {
                Mode::Safe => "Token generation is not allowed in Safe mode".to_string(),
                _ => format!(
                    "Token generation is not allowed with a message not in scope when in {} mode: {}",
                    mode,
                    job.template.url()
                ),
            };
            return Err(TokenGenError::PolicyViolation(reason));
        }
        if job.worker_count == 0 {
            return Err(TokenGenError::InvalidRequest(
                "At least one worker is required".to_string(),
            ));
        }

        let per_worker = job.per_worker();
        info!(
            "Starting token generation for {} ({} tokens, {} workers x {})",
            job.template.url(),
            job.target_count,
            job.worker_count,
            per_worker
        );
        self.target_count.store(job.target_count, Ordering::SeqCst);
        *self.assignments.lock() = vec![per_worker; job.worker_count];
        // Counted up front so an early finisher cannot see zero.
        self.shared
            .running_workers
            .store(job.worker_count, Ordering::SeqCst);
        self.shared.stats.mark_started();
        self.shared.set_state(RunState::Generating);

        let template = Arc::new(job.template);
        let location = Arc::new(job.location);
        let ctx = CollectorContext {
            transport: Arc::clone(&self.transport),
            extractor: Arc::clone(&self.extractor),
            samples: Arc::clone(&self.shared.samples),
            state: Arc::clone(&self.shared.stats),
            control: self.control.clone(),
            completion: self.shared.clone(),
        };
        for id in 0..job.worker_count {
            let collector = SampleCollector::new(
                id,
                Arc::clone(&template),
                Arc::clone(&location),
                per_worker,
                job.request_delay,
                job.strip_cookie,
                ctx.clone(),
            );
            let handle = tokio::spawn(collector.run());
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                // A normal return has already signalled through `run`.
                if let Err(e) = handle.await {
                    warn!("Worker {} died: {}", id, e);
                    shared.worker_stopped(&CollectorOutcome {
                        worker_id: id,
                        iterations: 0,
                        collected: 0,
                        reason: StopReason::Panicked(e.to_string()),
                    });
                }
            });
        }
        Ok(())
    }

    /// Halts every worker at its next request boundary and suppresses the
    /// analysis phase. During analysis it cancels the remaining tests.
    pub fn stop(&self) {
        match self.state() {
            RunState::Completed => return,
            RunState::Idle => {
                self.shared.manually_stopped.store(true, Ordering::SeqCst);
                self.shared.set_state(RunState::Completed);
                return;
            }
            _ => {}
        }
        info!("Stopping token generation");
        self.shared.manually_stopped.store(true, Ordering::SeqCst);
        self.shared.analysis_cancel.cancel();
        self.control.stop();
        if self.state() == RunState::Generating && self.running_workers() > 0 {
            self.shared.state.send_if_modified(|state| {
                if *state == RunState::Generating {
                    *state = RunState::Stopping;
                    true
                } else {
                    false
                }
            });
        }
    }

    pub fn pause(&self) {
        if self.state() != RunState::Completed {
            debug!("Pausing token generation");
            self.control.pause();
        }
    }

    pub fn resume(&self) {
        if self.state() != RunState::Completed {
            debug!("Resuming token generation");
            self.control.resume();
        }
    }

    /// Registers a listener for analysis results produced from now on.
    pub fn add_listener(&self, listener: Arc<dyn AnalysisListener>) {
        self.shared.listeners.write().push(listener);
    }

    pub async fn wait_until_completed(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx.wait_for(|state| *state == RunState::Completed).await;
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.shared.state.subscribe()
    }

    pub fn state(&self) -> RunState {
        self.shared.state()
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    pub fn is_manually_stopped(&self) -> bool {
        self.shared.manually_stopped.load(Ordering::SeqCst)
    }

    pub fn running_workers(&self) -> usize {
        self.shared.running_workers.load(Ordering::SeqCst)
    }

    pub fn target_count(&self) -> usize {
        self.target_count.load(Ordering::SeqCst)
    }

    pub fn collected(&self) -> usize {
        self.shared.samples.len()
    }

    pub fn samples(&self) -> Arc<SampleSet> {
        Arc::clone(&self.shared.samples)
    }

    pub fn results(&self) -> Vec<TestResult> {
        self.shared.results.read().clone()
    }

    pub fn result_count(&self) -> usize {
        self.shared.results.read().len()
    }

    pub fn stats(&self) -> Arc<GetState> {
        Arc::clone(&self.shared.stats)
    }

    /// Per-worker request budget fixed at start.
    pub fn assignments(&self) -> Vec<usize> {
        self.assignments.lock().clone()
    }

    pub fn outcomes(&self) -> Vec<CollectorOutcome> {
        self.shared.outcomes.lock().clone()
    }
}

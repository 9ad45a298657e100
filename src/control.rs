// File: control.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Pause and stop signals broadcast to every worker of a run. Workers
/// only observe them between requests.
#[derive(Debug, Clone)]
pub struct RunControl {
    paused: Arc<watch::Sender<bool>>,
    stop: CancellationToken,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            paused: Arc::new(paused),
            stop: CancellationToken::new(),
        }
    }

    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Suspends while paused. Returns `false` if a stop arrived instead.
    pub async fn wait_while_paused(&self) -> bool {
        let mut rx = self.paused.subscribe();
        tokio::select! {
            resumed = async { rx.wait_for(|paused| !*paused).await.is_ok() } => {
                resumed && !self.is_stopped()
            }
            _ = self.stop.cancelled() => false,
        }
    }

    /// Sleeps for `delay`, returning early if stopped.
    pub async fn pace(&self, delay: std::time::Duration) {
        if delay.is_zero() {
            tokio::task::yield_now().await;
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.stop.cancelled() => {}
        }
    }
}

//! Burst start and results polling

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use apres_core::paths;
use apres_core::{result_keys, BurstKind, BurstResult};

use crate::error::{ApresError, Result};
use crate::radar_config::RadarConfigResource;
use crate::results::{parse_results, BurstStatus};
use crate::transport::Transport;

/// Starts bursts and collects their results
#[derive(Debug, Clone)]
pub struct BurstController {
    transport: Arc<Transport>,
    config: RadarConfigResource,
    last_kind: Arc<Mutex<Option<BurstKind>>>,
}

impl BurstController {
    pub(crate) fn new(transport: Arc<Transport>, config: RadarConfigResource) -> Self {
        Self {
            transport,
            config,
            last_kind: Arc::new(Mutex::new(None)),
        }
    }

    /// Configuration resource used to size result deadlines
    pub fn config(&self) -> &RadarConfigResource {
        &self.config
    }

    /// Kind of the last burst this client started
    pub fn last_kind(&self) -> Option<BurstKind> {
        *self.last_kind.lock()
    }

    // =========================================================================
    // Burst Start
    // =========================================================================

    /// Start a trial or full burst
    ///
    /// The configuration is refreshed first so the results deadline matches
    /// what the device will run.
    #[instrument(skip(self))]
    pub async fn start_burst(&self, kind: BurstKind) -> Result<()> {
        self.start(kind, None).await
    }

    /// Start a full burst whose data file is stored as `Survey/<filename>`
    #[instrument(skip(self))]
    pub async fn start_full_burst_named(&self, filename: &str) -> Result<()> {
        self.start(BurstKind::Full, Some(filename)).await
    }

    async fn start(&self, kind: BurstKind, filename: Option<&str>) -> Result<()> {
        self.config.get().await?;

        let mut fields = Vec::new();
        if let Some(name) = filename {
            fields.push((result_keys::FILENAME.to_string(), name.to_string()));
        }

        let response = self.transport.post_form(kind.endpoint(), fields).await?;
        match response.status {
            StatusCode::SEE_OTHER => {
                *self.last_kind.lock() = Some(kind);
                info!(
                    location = response.location.as_deref().unwrap_or(""),
                    "Started {}", kind
                );
                Ok(())
            }
            StatusCode::FORBIDDEN => Err(ApresError::DeviceBusy(response.message())),
            _ => Err(ApresError::BurstNotStarted(response.message())),
        }
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Fetch the results document once
    #[instrument(skip(self))]
    pub async fn poll_results(&self) -> Result<BurstStatus> {
        let response = self.transport.get(paths::RADAR_RESULTS, &[]).await?;
        if response.status != StatusCode::OK {
            return Err(response.unexpected());
        }
        parse_results(&response.json()?, self.last_kind())
    }

    /// Time allowed for the current burst to finish
    ///
    /// sub-bursts x attenuators x per-chirp budget, plus one request
    /// timeout, for every burst kind. Without a cached configuration one
    /// chirp is assumed.
    pub fn results_budget(&self) -> Duration {
        let timeouts = &self.transport.settings().timeouts;
        let chirps = self
            .config
            .cached()
            .map(|c| (c.sub_bursts as usize).saturating_mul(c.attenuators))
            .unwrap_or(1);
        let chirps = u32::try_from(chirps).unwrap_or(u32::MAX);
        timeouts
            .per_chirp()
            .saturating_mul(chirps)
            .saturating_add(timeouts.request())
    }

    /// Poll until the burst finishes, then hand the result to `on_complete`
    ///
    /// `on_progress` receives each `chirping` payload. An `idle` status
    /// means no burst is running and fails with [`ApresError::NoChirpStarted`].
    #[instrument(skip(self, on_complete, on_progress))]
    pub async fn await_results<C, P>(
        &self,
        on_complete: C,
        mut on_progress: Option<P>,
    ) -> Result<BurstResult>
    where
        C: FnOnce(&BurstResult),
        P: FnMut(&Value),
    {
        let poll_interval = self.transport.settings().timeouts.poll_interval();
        let budget = self.results_budget();
        let started = Instant::now();
        let deadline = started + budget;
        debug!(budget = ?budget, "Waiting for burst results");

        loop {
            match self.poll_results().await? {
                BurstStatus::Finished(result) => {
                    info!(kind = %result.kind(), "Burst finished");
                    on_complete(&result);
                    return Ok(result);
                }
                BurstStatus::Chirping(payload) => {
                    if let Some(ref mut callback) = on_progress {
                        callback(&payload);
                    }
                }
                BurstStatus::Idle => return Err(ApresError::NoChirpStarted),
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(elapsed = ?started.elapsed(), "Burst results deadline passed");
                return Err(ApresError::ResultsTimeout(started.elapsed()));
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }

    /// Wait for results without callbacks
    pub async fn await_results_simple(&self) -> Result<BurstResult> {
        self.await_results(|_| {}, None::<fn(&Value)>).await
    }

    /// Poll for results on a background task
    ///
    /// Errors are reported through [`ResultsHandle::join`]; `on_complete`
    /// only sees successful results.
    pub fn spawn_await_results<C, P>(&self, on_complete: C, on_progress: Option<P>) -> ResultsHandle
    where
        C: FnOnce(&BurstResult) + Send + 'static,
        P: FnMut(&Value) + Send + 'static,
    {
        let controller = self.clone();
        let (tx, rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let outcome = controller.await_results(on_complete, on_progress).await;
            if let Err(e) = &outcome {
                warn!(error = %e, "Background results polling failed");
            }
            // Receiver may have been dropped; nothing left to report to
            let _ = tx.send(outcome);
        });

        ResultsHandle { outcome: rx, task }
    }

    // =========================================================================
    // Convenience
    // =========================================================================

    /// Start a trial burst and wait for its result
    pub async fn trial_burst<P>(&self, on_progress: Option<P>) -> Result<BurstResult>
    where
        P: FnMut(&Value),
    {
        self.start_burst(BurstKind::Trial).await?;
        self.await_results(|_| {}, on_progress).await
    }

    /// Start a full burst, optionally named, and wait for its result
    pub async fn full_burst<P>(
        &self,
        filename: Option<&str>,
        on_progress: Option<P>,
    ) -> Result<BurstResult>
    where
        P: FnMut(&Value),
    {
        self.start(BurstKind::Full, filename).await?;
        self.await_results(|_| {}, on_progress).await
    }
}

/// Handle to background results polling
///
/// Dropping the handle detaches the task; it still runs to completion.
#[derive(Debug)]
pub struct ResultsHandle {
    outcome: oneshot::Receiver<Result<BurstResult>>,
    task: JoinHandle<()>,
}

impl ResultsHandle {
    /// Stop polling; [`join`](Self::join) then yields [`ApresError::Cancelled`]
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the polling outcome
    pub async fn join(self) -> Result<BurstResult> {
        self.outcome.await.unwrap_or(Err(ApresError::Cancelled))
    }
}

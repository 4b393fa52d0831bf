/*!
 * Lifecycle of a single remote translation job.
 *
 * A `JobOrchestrator` drives one job through
 * `Created -> Submitting -> Polling -> Terminal(status)`. Polling is strictly
 * sequential: one wait, then one status request, per attempt. A shared
 * `CancellationToken` is raced against every wait and every in-flight
 * request, so cancellation is observed within one polling interval and the
 * pending request is dropped rather than awaited.
 *
 * Once a terminal phase is reached the orchestrator never leaves it.
 */

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::JobError;
use crate::providers::{AccessToken, Credentials, JobArtifact, JobProvider, JobRequest};

use super::alignment::is_echo;
use super::usage::UsagePolicy;

/// Remote job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Accepted but not yet polled
    Pending,
    /// Still being processed remotely
    Running,
    /// Result is ready to download
    Finished,
    /// The service reported a failure
    Failed,
    /// Stopped by the cancellation token
    Cancelled,
    /// Attempt budget exhausted before the job finished
    TimedOut,
}

impl JobStatus {
    /// Check whether the status is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Cancelled | Self::TimedOut)
    }

    /// Classify a raw status string from the service
    ///
    /// Matching is case-insensitive and by substring, so `"Finished"`,
    /// `"job finished"` and `"FINISHED_OK"` are all finished.
    pub fn from_remote(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        if lowered.contains("finished") {
            Self::Finished
        } else if lowered.contains("failed") {
            Self::Failed
        } else {
            Self::Running
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
        };
        write!(f, "{}", name)
    }
}

/// Phase of the orchestrator's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Created,
    Submitting,
    Polling,
    Terminal(JobStatus),
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Submitting => write!(f, "submitting"),
            Self::Polling => write!(f, "polling"),
            Self::Terminal(status) => write!(f, "terminal({})", status),
        }
    }
}

/// A submitted job
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationJob {
    /// Identifier assigned by the service
    pub job_id: String,
    /// Last known status
    pub status: JobStatus,
    /// What was submitted
    pub source_payload: JobRequest,
    /// Reference of the downloaded result
    pub result_artifact_ref: Option<String>,
    /// Raw failure text, when the job failed
    pub failure: Option<String>,
    /// Status requests made so far
    pub attempts: u32,
}

/// Polling cadence and attempt ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait before each status request
    pub interval: Duration,
    /// Status requests allowed before giving up
    pub max_attempts: u32,
}

impl PollSettings {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, max_attempts }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 1200,
        }
    }
}

/// How an awaited job ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The job finished and its result was downloaded
    Completed(JobArtifact),
    /// The run was cancelled; nothing was downloaded
    Cancelled,
    /// The job did not finish within the attempt budget
    TimedOut,
    /// The service reported a failure, with its raw status
    Failed(String),
}

impl JobOutcome {
    /// Terminal status this outcome corresponds to
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Completed(_) => JobStatus::Finished,
            Self::Cancelled => JobStatus::Cancelled,
            Self::TimedOut => JobStatus::TimedOut,
            Self::Failed(_) => JobStatus::Failed,
        }
    }

    /// The one user-facing message for this outcome
    pub fn notification(&self) -> String {
        match self {
            Self::Completed(_) => "Translation finished".to_string(),
            Self::Cancelled => "Translation cancelled; no result was downloaded".to_string(),
            Self::TimedOut => "Translation did not finish in time; please try again later".to_string(),
            Self::Failed(status) => format!("Translation failed on the server: {}", status),
        }
    }
}

/// State machine for one remote translation job
pub struct JobOrchestrator {
    provider: Arc<dyn JobProvider>,
    usage: Arc<UsagePolicy>,
    settings: PollSettings,
    authenticated: bool,
    phase: JobPhase,
    job: Option<TranslationJob>,
    token: Option<AccessToken>,
}

impl JobOrchestrator {
    /// Create an orchestrator for a new job
    pub fn new(provider: Arc<dyn JobProvider>, usage: Arc<UsagePolicy>, settings: PollSettings) -> Self {
        Self {
            provider,
            usage,
            settings,
            authenticated: false,
            phase: JobPhase::Created,
            job: None,
            token: None,
        }
    }

    /// Mark the caller as signed in, which bypasses the daily quota
    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    /// Current phase
    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// The submitted job, if any
    pub fn job(&self) -> Option<&TranslationJob> {
        self.job.as_ref()
    }

    /// Move to a terminal phase, unless already in one
    fn finish(&mut self, status: JobStatus) {
        debug_assert!(status.is_terminal(), "{} is not a final status", status);
        if let JobPhase::Terminal(current) = self.phase {
            debug!("Job already terminal ({}), ignoring transition to {}", current, status);
            return;
        }
        self.phase = JobPhase::Terminal(status);
        if let Some(job) = self.job.as_mut() {
            job.status = status;
        }
        if status != JobStatus::Finished {
            self.token = None;
        }
    }

    fn fail(&mut self, reason: String) {
        if let Some(job) = self.job.as_mut() {
            job.failure = Some(reason);
        }
        self.finish(JobStatus::Failed);
    }

    /// Authenticate and submit the payload
    pub async fn submit(&mut self, payload: JobRequest, credentials: &Credentials) -> Result<String, JobError> {
        if self.phase != JobPhase::Created {
            return Err(JobError::InvalidState {
                expected: JobPhase::Created.to_string(),
                actual: self.phase.to_string(),
            });
        }

        if !self.usage.check_and_consume(self.authenticated) {
            self.finish(JobStatus::Failed);
            return Err(JobError::QuotaExceeded {
                limit: self.usage.daily_limit(),
            });
        }

        self.phase = JobPhase::Submitting;

        let token = match self.provider.authenticate(credentials).await {
            Ok(token) => token,
            Err(e) => {
                error!("Authentication failed: {}", e);
                self.finish(JobStatus::Failed);
                return Err(JobError::Auth(e));
            }
        };

        let job_id = match self.provider.submit(&token, &payload).await {
            Ok(job_id) => job_id,
            Err(e) => {
                error!("Job submission failed: {}", e);
                self.finish(JobStatus::Failed);
                return Err(JobError::Submit(e));
            }
        };

        info!("Submitted translation job {}", job_id);
        self.job = Some(TranslationJob {
            job_id: job_id.clone(),
            status: JobStatus::Pending,
            source_payload: payload,
            result_artifact_ref: None,
            failure: None,
            attempts: 0,
        });
        self.token = Some(token);
        self.phase = JobPhase::Polling;

        Ok(job_id)
    }

    /// Poll until the job reaches a terminal status
    ///
    /// Returns the terminal status. Calling this again once terminal returns
    /// the same status without contacting the service.
    pub async fn poll(&mut self, cancel: &CancellationToken) -> Result<JobStatus, JobError> {
        match self.phase {
            JobPhase::Polling => {}
            JobPhase::Terminal(status) => return Ok(status),
            other => {
                return Err(JobError::InvalidState {
                    expected: JobPhase::Polling.to_string(),
                    actual: other.to_string(),
                });
            }
        }

        let (job_id, token) = match (self.job.as_ref(), self.token.clone()) {
            (Some(job), Some(token)) => (job.job_id.clone(), token),
            _ => {
                return Err(JobError::InvalidState {
                    expected: "submitted job".to_string(),
                    actual: self.phase.to_string(),
                });
            }
        };
        let provider = Arc::clone(&self.provider);

        for attempt in 1..=self.settings.max_attempts {
            if cancel.is_cancelled() {
                return Ok(self.cancelled(&job_id));
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(self.cancelled(&job_id)),
                _ = tokio::time::sleep(self.settings.interval) => {}
            }

            let response = tokio::select! {
                _ = cancel.cancelled() => return Ok(self.cancelled(&job_id)),
                response = provider.status(&token, &job_id) => response,
            };

            if let Some(job) = self.job.as_mut() {
                job.attempts = attempt;
            }

            let raw = match response {
                Ok(raw) => raw,
                Err(e) => {
                    error!("Polling job {} failed: {}", job_id, e);
                    self.fail(e.to_string());
                    return Err(JobError::PollTransport { job_id, source: e });
                }
            };

            match JobStatus::from_remote(&raw) {
                JobStatus::Finished => {
                    info!("Job {} finished after {} polls", job_id, attempt);
                    self.finish(JobStatus::Finished);
                    return Ok(JobStatus::Finished);
                }
                JobStatus::Failed => {
                    warn!("Job {} failed remotely: {}", job_id, raw);
                    self.fail(raw);
                    return Ok(JobStatus::Failed);
                }
                _ => {
                    debug!("Job {} poll {}/{}: {}", job_id, attempt, self.settings.max_attempts, raw);
                    if let Some(job) = self.job.as_mut() {
                        job.status = JobStatus::Running;
                    }
                }
            }
        }

        warn!(
            "Job {} did not finish within {} polls, giving up",
            job_id, self.settings.max_attempts
        );
        self.finish(JobStatus::TimedOut);
        Ok(JobStatus::TimedOut)
    }

    fn cancelled(&mut self, job_id: &str) -> JobStatus {
        info!("Job {} cancelled", job_id);
        self.finish(JobStatus::Cancelled);
        JobStatus::Cancelled
    }

    /// Download the result of a finished job
    ///
    /// A failed download is reported once and not retried.
    pub async fn fetch_result(&mut self) -> Result<JobArtifact, JobError> {
        if self.phase != JobPhase::Terminal(JobStatus::Finished) {
            return Err(JobError::InvalidState {
                expected: JobPhase::Terminal(JobStatus::Finished).to_string(),
                actual: self.phase.to_string(),
            });
        }

        let (job_id, token) = match (self.job.as_ref(), self.token.take()) {
            (Some(job), Some(token)) => (job.job_id.clone(), token),
            _ => {
                return Err(JobError::InvalidState {
                    expected: "undownloaded result".to_string(),
                    actual: "result already fetched".to_string(),
                });
            }
        };

        let artifact = self
            .provider
            .artifact(&token, &job_id)
            .await
            .map_err(|source| {
                error!("Fetching result of job {} failed: {}", job_id, source);
                JobError::Artifact {
                    job_id: job_id.clone(),
                    source,
                }
            })?;

        if let Some(job) = self.job.as_mut() {
            job.result_artifact_ref = Some(artifact.reference.clone());
        }
        debug!("Fetched {} bytes for job {}", artifact.body.len(), job_id);

        Ok(artifact)
    }

    /// Submit, poll to completion and fetch the result
    ///
    /// Cancellation, timeout and remote failure come back as outcomes. A
    /// result that is empty or merely repeats the source is an error.
    pub async fn submit_and_await(
        &mut self,
        payload: JobRequest,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, JobError> {
        if cancel.is_cancelled() {
            info!("Cancelled before submission");
            self.finish(JobStatus::Cancelled);
            return Ok(JobOutcome::Cancelled);
        }

        let source = payload.document.clone();

        let submitted = tokio::select! {
            _ = cancel.cancelled() => None,
            result = self.submit(payload, credentials) => Some(result),
        };
        match submitted {
            Some(result) => result?,
            None => {
                info!("Cancelled during submission");
                self.finish(JobStatus::Cancelled);
                return Ok(JobOutcome::Cancelled);
            }
        };

        match self.poll(cancel).await? {
            JobStatus::Finished => {}
            JobStatus::Cancelled => return Ok(JobOutcome::Cancelled),
            JobStatus::TimedOut => return Ok(JobOutcome::TimedOut),
            _ => {
                let reason = self
                    .job
                    .as_ref()
                    .and_then(|job| job.failure.clone())
                    .unwrap_or_else(|| "unknown failure".to_string());
                return Ok(JobOutcome::Failed(reason));
            }
        }

        let artifact = self.fetch_result().await?;
        if artifact.body.trim().is_empty() || is_echo(&source, &artifact.body) {
            let job_id = self.job.as_ref().map(|job| job.job_id.clone()).unwrap_or_default();
            warn!("Job {} returned an empty or untranslated result", job_id);
            return Err(JobError::EmptyResult { job_id });
        }

        Ok(JobOutcome::Completed(artifact))
    }
}

impl fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("phase", &self.phase)
            .field("settings", &self.settings)
            .field("job", &self.job)
            .finish()
    }
}

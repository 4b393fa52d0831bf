/*!
 * Mock job provider for testing.
 *
 * Simulates the remote job service without network access. Each behaviour
 * scripts one way a job can go; call counters let tests assert which
 * endpoints were contacted.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{AccessToken, Credentials, JobArtifact, JobProvider, JobRequest};
use crate::errors::ProviderError;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Finishes on the first poll with a translated artifact
    Working,
    /// Reports running until the given poll, then finishes
    FinishAfter { polls: usize },
    /// Reports running forever
    NeverFinishes,
    /// Reports a remote failure status
    RemoteFailure,
    /// Rejects the credentials
    AuthFailure,
    /// Rejects every submission
    SubmitRejected,
    /// Status requests fail at the transport level
    PollTransportError,
    /// Artifact download fails
    ArtifactError,
    /// Returns the source text unchanged
    Echo,
    /// Returns an empty artifact
    Empty,
    /// Status requests take this long before answering finished
    SlowStatus { delay_ms: u64 },
}

/// Shared mutable state of the mock, so clones see the same jobs
#[derive(Debug, Default)]
struct MockState {
    jobs: HashMap<String, JobRequest>,
    polls: HashMap<String, usize>,
}

/// Mock provider for testing job orchestration
#[derive(Debug, Clone)]
pub struct MockJobProvider {
    behavior: MockBehavior,
    state: Arc<Mutex<MockState>>,
    rejected_submissions: Arc<HashSet<usize>>,
    auth_calls: Arc<AtomicUsize>,
    submit_calls: Arc<AtomicUsize>,
    status_calls: Arc<AtomicUsize>,
    artifact_calls: Arc<AtomicUsize>,
    custom_response: Option<fn(&JobRequest) -> String>,
}

impl MockJobProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            state: Arc::new(Mutex::new(MockState::default())),
            rejected_submissions: Arc::new(HashSet::new()),
            auth_calls: Arc::new(AtomicUsize::new(0)),
            submit_calls: Arc::new(AtomicUsize::new(0)),
            status_calls: Arc::new(AtomicUsize::new(0)),
            artifact_calls: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    /// Create a mock that finishes immediately
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that finishes on the given poll
    pub fn finish_after(polls: usize) -> Self {
        Self::new(MockBehavior::FinishAfter { polls })
    }

    /// Create a mock whose jobs never finish
    pub fn never_finishes() -> Self {
        Self::new(MockBehavior::NeverFinishes)
    }

    /// Create a mock whose jobs fail remotely
    pub fn remote_failure() -> Self {
        Self::new(MockBehavior::RemoteFailure)
    }

    /// Create a mock with slow status responses
    pub fn slow_status(delay_ms: u64) -> Self {
        Self::new(MockBehavior::SlowStatus { delay_ms })
    }

    /// Reject the given submissions (1-based call numbers), regardless of behaviour
    pub fn rejecting_submissions(mut self, calls: &[usize]) -> Self {
        self.rejected_submissions = Arc::new(calls.iter().copied().collect());
        self
    }

    /// Set a custom artifact generator
    pub fn with_custom_response(mut self, generator: fn(&JobRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Default translation: each line tagged with the target language
    pub fn translate_lines(request: &JobRequest) -> String {
        request
            .document
            .lines()
            .map(|line| format!("[{}] {}", request.target_language, line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of authentication calls made
    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    /// Number of submissions made
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Number of status requests made
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Number of artifact downloads made
    pub fn artifact_calls(&self) -> usize {
        self.artifact_calls.load(Ordering::SeqCst)
    }

    /// Payloads of all accepted jobs, in submission order
    pub fn submitted_documents(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut jobs: Vec<(&String, &JobRequest)> = state.jobs.iter().collect();
        jobs.sort_by_key(|(id, _)| id.trim_start_matches("job-").parse::<usize>().unwrap_or(0));
        jobs.into_iter().map(|(_, request)| request.document.clone()).collect()
    }
}

#[async_trait]
impl JobProvider for MockJobProvider {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, ProviderError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);

        if self.behavior == MockBehavior::AuthFailure {
            return Err(ProviderError::AuthenticationError("Invalid username or password".to_string()));
        }

        Ok(AccessToken(format!("token-for-{}", credentials.username)))
    }

    async fn submit(&self, _token: &AccessToken, request: &JobRequest) -> Result<String, ProviderError> {
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.behavior == MockBehavior::SubmitRejected || self.rejected_submissions.contains(&call) {
            return Err(ProviderError::ApiError {
                status_code: 422,
                message: format!("Simulated rejection of submission #{}", call),
            });
        }

        let job_id = format!("job-{}", call);
        self.state.lock().jobs.insert(job_id.clone(), request.clone());
        Ok(job_id)
    }

    async fn status(&self, _token: &AccessToken, job_id: &str) -> Result<String, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let polls = {
            let mut state = self.state.lock();
            let polls = state.polls.entry(job_id.to_string()).or_insert(0);
            *polls += 1;
            *polls
        };

        match self.behavior {
            MockBehavior::FinishAfter { polls: needed } if polls < needed => Ok("Running".to_string()),
            MockBehavior::NeverFinishes => Ok("Running".to_string()),
            MockBehavior::RemoteFailure => Ok("Failed: model crashed".to_string()),
            MockBehavior::PollTransportError => {
                Err(ProviderError::ConnectionError("Simulated connection reset".to_string()))
            }
            MockBehavior::SlowStatus { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok("Finished".to_string())
            }
            _ => Ok("Finished".to_string()),
        }
    }

    async fn artifact(&self, _token: &AccessToken, job_id: &str) -> Result<JobArtifact, ProviderError> {
        self.artifact_calls.fetch_add(1, Ordering::SeqCst);

        if self.behavior == MockBehavior::ArtifactError {
            return Err(ProviderError::ConnectionError("Simulated download failure".to_string()));
        }

        let request = self
            .state
            .lock()
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 404,
                message: format!("Unknown job {}", job_id),
            })?;

        let body = match self.behavior {
            MockBehavior::Echo => request.document.clone(),
            MockBehavior::Empty => String::new(),
            _ => match self.custom_response {
                Some(generator) => generator(&request),
                None => Self::translate_lines(&request),
            },
        };

        Ok(JobArtifact {
            reference: format!("mock://{}/artifact", job_id),
            body,
        })
    }
}

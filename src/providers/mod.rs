/*!
 * Remote translation job service boundary.
 *
 * This module defines the interface to the asynchronous translation service:
 * - `remote`: HTTP client for the job service
 * - `mock`: Scripted provider for tests and offline runs
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Username and password exchanged for an access token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Check whether both fields are filled in
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Short-lived bearer token, held for a single job
#[derive(Clone, PartialEq)]
pub struct AccessToken(pub String);

impl AccessToken {
    /// The raw token value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Payload of a translation job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Text to translate, one span per line
    pub document: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Translation model identifier
    pub model: String,
}

impl JobRequest {
    /// Create a job request
    pub fn new(
        document: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            document: document.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            model: model.into(),
        }
    }
}

/// Downloaded result of a finished job
#[derive(Debug, Clone, PartialEq)]
pub struct JobArtifact {
    /// Reference the service uses for the result
    pub reference: String,
    /// Raw result body
    pub body: String,
}

/// Client for a remote asynchronous translation service
///
/// Every call is a single request; retries and polling cadence belong to the
/// job orchestrator.
#[async_trait]
pub trait JobProvider: Send + Sync + Debug {
    /// Exchange credentials for an access token
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, ProviderError>;

    /// Submit a job and return its identifier
    async fn submit(&self, token: &AccessToken, request: &JobRequest) -> Result<String, ProviderError>;

    /// Fetch the raw status string of a job
    async fn status(&self, token: &AccessToken, job_id: &str) -> Result<String, ProviderError>;

    /// Download the result of a finished job
    async fn artifact(&self, token: &AccessToken, job_id: &str) -> Result<JobArtifact, ProviderError>;
}

pub mod mock;
pub mod remote;

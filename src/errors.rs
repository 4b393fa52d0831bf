/*!
 * Error types for the versedraft application.
 *
 * This module contains custom error types for the remote job service,
 * the job orchestrator and the application as a whole, using the
 * thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to the remote translation service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that end a translation job
///
/// `TimedOut` and `Cancelled` are not listed here: they are outcomes
/// reported through `JobOutcome`, not failures.
#[derive(Error, Debug)]
pub enum JobError {
    /// Credential exchange failed before the job could be submitted
    #[error("Authentication failed: {0}")]
    Auth(#[source] ProviderError),

    /// The remote service rejected the job
    #[error("Job submission rejected: {0}")]
    Submit(#[source] ProviderError),

    /// Network failure while polling for job status
    #[error("Lost contact with the translation service while polling job {job_id}: {source}")]
    PollTransport {
        /// Job being polled
        job_id: String,
        /// Underlying transport error
        #[source]
        source: ProviderError,
    },

    /// The remote service reported the job as failed
    #[error("Translation job {job_id} failed remotely: {status}")]
    RemoteJobFailed {
        /// Job that failed
        job_id: String,
        /// Status string exactly as reported by the service
        status: String,
    },

    /// Downloading the finished artifact failed
    #[error("Failed to fetch result for job {job_id}: {source}")]
    Artifact {
        /// Finished job
        job_id: String,
        /// Underlying transport error
        #[source]
        source: ProviderError,
    },

    /// The artifact was empty or a copy of the source text
    #[error("Translation result for job {job_id} is empty or identical to the source")]
    EmptyResult {
        /// Job whose result was rejected
        job_id: String,
    },

    /// The anonymous daily quota is used up
    #[error("Daily translation limit of {limit} reached; sign in or try again tomorrow")]
    QuotaExceeded {
        /// Configured daily limit
        limit: u32,
    },

    /// Operation called in the wrong lifecycle phase
    #[error("Invalid job state: expected {expected}, found {actual}")]
    InvalidState {
        /// Phase the operation requires
        expected: String,
        /// Phase the orchestrator was in
        actual: String,
    },
}

/// A single batch that could not be translated
///
/// Recorded by the batch runner and never raised as an error on its own.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Batch {batch_id} failed: {reason}")]
pub struct BatchFailure {
    /// One-based batch identifier
    pub batch_id: usize,
    /// Human readable failure reason
    pub reason: String,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the remote service
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from a translation job
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Every batch of a batched run failed
    #[error("All {0} batches failed")]
    AllBatchesFailed(usize),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

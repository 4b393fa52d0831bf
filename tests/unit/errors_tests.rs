/*!
 * Tests for error types and conversions
 */

use std::error::Error;
use versedraft::errors::{AppError, BatchFailure, JobError, ProviderError};

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 422,
        message: "Unsupported language pair".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("422"));
    assert!(display.contains("Unsupported language pair"));
}

#[test]
fn test_jobError_remoteJobFailed_shouldKeepStatusVerbatim() {
    let error = JobError::RemoteJobFailed {
        job_id: "job-7".to_string(),
        status: "Failed: model crashed".to_string(),
    };
    let display = error.to_string();
    assert!(display.contains("job-7"));
    assert!(display.contains("Failed: model crashed"));
}

#[test]
fn test_jobError_pollTransport_shouldExposeSource() {
    let error = JobError::PollTransport {
        job_id: "job-1".to_string(),
        source: ProviderError::ConnectionError("reset".to_string()),
    };
    let source = error.source().expect("poll errors carry their transport error");
    assert!(source.to_string().contains("reset"));
}

#[test]
fn test_jobError_quotaExceeded_shouldNameLimit() {
    let display = JobError::QuotaExceeded { limit: 5 }.to_string();
    assert!(display.contains('5'));
    assert!(display.contains("sign in"));
}

#[test]
fn test_batchFailure_shouldDisplayBatchId() {
    let failure = BatchFailure {
        batch_id: 3,
        reason: "expected 2 translations, got 1".to_string(),
    };
    assert_eq!(failure.to_string(), "Batch 3 failed: expected 2 translations, got 1");
}

#[test]
fn test_appError_fromJobError_shouldWrap() {
    let error: AppError = JobError::EmptyResult {
        job_id: "job-2".to_string(),
    }
    .into();
    assert!(matches!(error, AppError::Job(JobError::EmptyResult { .. })));
    assert!(error.to_string().contains("job-2"));
}

#[test]
fn test_appError_fromIoError_shouldBeFileError() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "GEN.usfm missing");
    let error: AppError = io_error.into();
    assert!(matches!(error, AppError::File(_)));
}

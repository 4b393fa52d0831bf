/*!
 * HTTP client for the remote translation job service.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{AccessToken, Credentials, JobArtifact, JobProvider, JobRequest};
use crate::errors::ProviderError;

/// Token response from `POST /auth/token`
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Body of `POST /jobs`
#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    document: &'a str,
    source_language: &'a str,
    target_language: &'a str,
    model: &'a str,
}

/// Response of `POST /jobs`
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(alias = "id")]
    job_id: String,
}

/// Response of `GET /jobs/{id}`
#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

/// Remote job service client
#[derive(Debug, Clone)]
pub struct RemoteJobService {
    /// Base URL of the service
    base_url: Url,
    /// HTTP client for making requests
    client: Client,
}

impl RemoteJobService {
    /// Create a client for the given endpoint
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let mut base_url = Url::parse(endpoint)
            .map_err(|e| ProviderError::ConnectionError(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid request path '{}': {}", path, e)))
    }

    /// Map non-success responses to provider errors
    async fn check(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        error!("Translation service error ({}): {}", status, message);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(ProviderError::AuthenticationError(message))
        } else {
            Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl JobProvider for RemoteJobService {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, ProviderError> {
        let url = self.url("auth/token")?;
        debug!("Requesting access token from {}", url);

        let response = self
            .client
            .post(url)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = Self::check(response).await?.json().await?;
        Ok(AccessToken(token.access_token))
    }

    async fn submit(&self, token: &AccessToken, request: &JobRequest) -> Result<String, ProviderError> {
        let url = self.url("jobs")?;
        let body = SubmitBody {
            document: &request.document,
            source_language: &request.source_language,
            target_language: &request.target_language,
            model: &request.model,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await?;

        let submitted: SubmitResponse = Self::check(response).await?.json().await?;
        debug!("Submitted job {}", submitted.job_id);
        Ok(submitted.job_id)
    }

    async fn status(&self, token: &AccessToken, job_id: &str) -> Result<String, ProviderError> {
        let url = self.url(&format!("jobs/{}", job_id))?;
        let response = self.client.get(url).bearer_auth(token.as_str()).send().await?;

        let status: StatusResponse = Self::check(response).await?.json().await?;
        Ok(status.status)
    }

    async fn artifact(&self, token: &AccessToken, job_id: &str) -> Result<JobArtifact, ProviderError> {
        let url = self.url(&format!("jobs/{}/artifact", job_id))?;
        let reference = url.to_string();
        let response = self.client.get(url).bearer_auth(token.as_str()).send().await?;

        let body = Self::check(response).await?.text().await?;
        Ok(JobArtifact { reference, body })
    }
}

//! HTTP-backed stage analyzer.
//!
//! POSTs `{stage, candidate, jobProfile}` to a provider endpoint and expects a
//! tagged `StageResult` back. This is the only place where transport errors
//! and status codes are turned into `StageError`s; retries and timeouts are
//! owned by the orchestrator, not by this client.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{Candidate, JobProfile, ProcessingStage, StageResult};
use crate::pipeline::analyzer::StageAnalyzer;
use crate::pipeline::error::{stage_error_from_status, StageError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    stage: ProcessingStage,
    candidate: &'a Candidate,
    job_profile: &'a JobProfile,
}

pub struct HttpStageAnalyzer {
    stage: ProcessingStage,
    endpoint: String,
    api_key: Option<String>,
    request_timeout: Duration,
    client: RwLock<Client>,
}

impl HttpStageAnalyzer {
    pub fn new(
        stage: ProcessingStage,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, StageError> {
        Ok(Self {
            stage,
            endpoint: endpoint.into(),
            api_key,
            request_timeout,
            client: RwLock::new(build_client(request_timeout)?),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StageAnalyzer for HttpStageAnalyzer {
    fn stage(&self) -> ProcessingStage {
        self.stage
    }

    async fn analyze(
        &self,
        candidate: &Candidate,
        job_profile: &JobProfile,
    ) -> Result<StageResult, StageError> {
        let body = AnalyzeRequest {
            stage: self.stage,
            candidate,
            job_profile,
        };

        // reqwest::Client is a cheap handle; never hold the lock across an await.
        let client = self.client.read().clone();
        let mut request = client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "{} analyzer returned {} for candidate {}",
                self.stage, status, candidate.id
            );
            return Err(stage_error_from_status(status.as_u16(), body));
        }

        let result: StageResult = response
            .json()
            .await
            .map_err(|e| StageError::InvalidResponse(e.to_string()))?;

        if result.stage() != self.stage {
            return Err(StageError::InvalidResponse(format!(
                "expected a {} result, got {}",
                self.stage,
                result.stage()
            )));
        }

        debug!(
            "{} analyzer scored candidate {} at {}",
            self.stage,
            candidate.id,
            result.raw_score()
        );
        Ok(result)
    }

    async fn reconnect(&self) -> Result<(), StageError> {
        let fresh = build_client(self.request_timeout)?;
        *self.client.write() = fresh;
        info!("Rebuilt HTTP client for {} analyzer", self.stage);
        Ok(())
    }
}

fn build_client(timeout: Duration) -> Result<Client, StageError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| StageError::network(format!("failed to build HTTP client: {e}")))
}

fn transport_error(err: reqwest::Error) -> StageError {
    if err.is_timeout() {
        StageError::timeout(err.to_string())
    } else if err.is_decode() {
        StageError::InvalidResponse(err.to_string())
    } else {
        StageError::network(err.to_string())
    }
}

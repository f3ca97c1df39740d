use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{
    AnalysisOutcome, AnalysisRequest, IterateResponse, ProcessResponse, RefinementOutcome,
    RefinementRequest,
};
use super::RefinementService;
use crate::config::{BackendConfig, RequestConfig};
use crate::error::{RefinementError, RefinementResult};

use async_trait::async_trait;

/// Default acknowledgement when the backend omits a chat response.
const DEFAULT_ACK: &str = "Analysis updated based on your request.";

/// HTTP client for the analysis backend
#[derive(Clone)]
pub struct HttpRefinementClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    request_config: RequestConfig,
}

impl HttpRefinementClient {
    /// Create a new backend client
    pub fn new(config: &BackendConfig, request_config: RequestConfig) -> RefinementResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(RefinementError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run the initial analysis that seeds Version #1
    pub async fn run_analysis(&self, request: &AnalysisRequest) -> RefinementResult<AnalysisOutcome> {
        let url = format!("{}/api/process-dynamic", self.base_url);

        info!(method = %request.method, "Running initial analysis");

        let response: ProcessResponse = self.post_json(&url, request).await?;

        if !response.success {
            return Err(RefinementError::Rejected {
                message: response
                    .detail
                    .or(response.message)
                    .unwrap_or_else(|| "Analysis failed".to_string()),
            });
        }

        let result = response
            .result
            .ok_or_else(|| RefinementError::InvalidResponse {
                message: "Analysis response is missing the result field".to_string(),
            })?;

        info!(output_len = result.len(), "Initial analysis completed");

        Ok(AnalysisOutcome { result })
    }

    /// Execute a single refinement request (internal)
    async fn execute_refinement(
        &self,
        url: &str,
        request: &RefinementRequest,
    ) -> RefinementResult<RefinementOutcome> {
        debug!(
            method = %request.method,
            context_len = request.current_context.len(),
            history = request.chat_history.len(),
            "Calling refinement endpoint"
        );

        let response: IterateResponse = self.post_json(url, request).await?;

        if !response.success {
            return Err(RefinementError::Rejected {
                message: response
                    .detail
                    .or(response.message)
                    .unwrap_or_else(|| "Chat iteration failed".to_string()),
            });
        }

        let updated_output =
            response
                .updated_output
                .ok_or_else(|| RefinementError::InvalidResponse {
                    message: "Refinement response is missing the updated output".to_string(),
                })?;

        Ok(RefinementOutcome {
            ai_response: response.ai_response.unwrap_or_else(|| DEFAULT_ACK.to_string()),
            updated_output,
        })
    }

    /// POST a JSON body and decode a JSON response (internal)
    async fn post_json<B, T>(&self, url: &str, body: &B) -> RefinementResult<T>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let mut builder = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");

        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                RefinementError::Timeout {
                    timeout_ms: self.request_config.timeout_ms,
                }
            } else {
                RefinementError::Http(e)
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RefinementError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RefinementError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })
    }
}

#[async_trait]
impl RefinementService for HttpRefinementClient {
    async fn request_refinement(
        &self,
        request: RefinementRequest,
    ) -> RefinementResult<RefinementOutcome> {
        let url = format!("{}/api/chat/iterate", self.base_url);

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying refinement request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_refinement(&url, &request).await {
                Ok(outcome) => {
                    let latency = start.elapsed();
                    info!(
                        latency_ms = latency.as_millis(),
                        output_len = outcome.updated_output.len(),
                        "Refinement call succeeded"
                    );
                    return Ok(outcome);
                }
                // An explicit rejection is a final answer, not a transient
                // fault; retrying would resubmit the same doomed turn.
                Err(e @ RefinementError::Rejected { .. }) => {
                    error!(error = %e, "Backend rejected the refinement turn");
                    return Err(e);
                }
                Err(e) => {
                    let latency = start.elapsed();
                    error!(
                        error = %e,
                        latency_ms = latency.as_millis(),
                        retry = retries,
                        "Refinement call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(RefinementError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }
}

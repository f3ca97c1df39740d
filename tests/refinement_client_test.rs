//! Integration tests for the analysis backend client
//!
//! Tests HTTP client behavior using wiremock for request/response mocking.

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use analysis_refinery::config::{BackendConfig, RequestConfig};
use analysis_refinery::error::RefinementError;
use analysis_refinery::refinement::{
    AnalysisRequest, HttpRefinementClient, Method, RefinementRequest, RefinementService,
};

/// Create a test client pointing to mock server
fn create_test_client(base_url: &str) -> HttpRefinementClient {
    create_test_client_with_retries(base_url, 0)
}

fn create_test_client_with_retries(base_url: &str, max_retries: u32) -> HttpRefinementClient {
    let config = BackendConfig {
        base_url: base_url.to_string(),
        api_key: Some("test-api-key".to_string()),
    };

    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries,
        retry_delay_ms: 50,
    };

    HttpRefinementClient::new(&config, request_config).expect("Failed to create client")
}

/// Create a simple refinement request for testing
fn create_test_request(instruction: &str) -> RefinementRequest {
    RefinementRequest::new(instruction)
        .with_method(Method::Extraction)
        .with_context("previous output")
        .with_chat_history(vec!["seed".to_string()])
}

mod refinement_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_refinement() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat/iterate"))
            .and(header("Authorization", "Bearer test-api-key"))
            .and(header("Content-Type", "application/json"))
            .and(body_partial_json(json!({
                "user_message": "Add USA data",
                "method": "extraction",
                "current_context": "previous output"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "ai_response": "Analysis updated based on your request.",
                "updated_output": "Refined analysis text",
                "method_used": "extraction",
                "context_length": 15,
                "message": "Chat iteration processed successfully"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = client
            .request_refinement(create_test_request("Add USA data"))
            .await;

        assert!(result.is_ok(), "Refinement should succeed: {:?}", result.err());
        let outcome = result.unwrap();
        assert_eq!(outcome.updated_output, "Refined analysis text");
        assert_eq!(outcome.ai_response, "Analysis updated based on your request.");
    }

    #[tokio::test]
    async fn test_server_error_is_wrapped_after_retries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat/iterate"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "detail": "Error processing chat iteration: engine failed"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = client
            .request_refinement(create_test_request("Test"))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RefinementError::Unavailable { .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat/iterate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = client
            .request_refinement(create_test_request("Test"))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RefinementError::Unavailable { .. }));
        assert!(err.to_string().contains("Failed to parse response"));
    }

    #[tokio::test]
    async fn test_missing_updated_output_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat/iterate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "ai_response": "ok"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let err = client
            .request_refinement(create_test_request("Test"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("missing the updated output"));
    }

    #[tokio::test]
    async fn test_explicit_failure_flag_is_rejected_without_retry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat/iterate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "detail": "Target document not found"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        // Even with retries enabled, a rejection is final.
        let client = create_test_client_with_retries(&mock_server.uri(), 3);
        let err = client
            .request_refinement(create_test_request("Test"))
            .await
            .unwrap_err();

        assert!(matches!(err, RefinementError::Rejected { .. }));
        assert!(err.to_string().contains("Target document not found"));
    }

    #[tokio::test]
    async fn test_transient_failure_then_success_with_retries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat/iterate"))
            .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/chat/iterate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "ai_response": "ok",
                "updated_output": "recovered output"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client_with_retries(&mock_server.uri(), 2);
        let outcome = client
            .request_refinement(create_test_request("Test"))
            .await
            .expect("retry should recover");

        assert_eq!(outcome.updated_output, "recovered output");
    }
}

mod analysis_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_initial_analysis() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/process-dynamic"))
            .and(body_partial_json(json!({
                "user_prompt": "Summarize doc",
                "method": "reasoning"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": "Initial analysis text",
                "method_used": "reasoning",
                "message": "Configuration processed successfully, ready for editor"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let request = AnalysisRequest::new("Summarize doc").with_method(Method::Reasoning);
        let outcome = client.run_analysis(&request).await.unwrap();

        assert_eq!(outcome.result, "Initial analysis text");
    }

    #[tokio::test]
    async fn test_initial_analysis_rejection() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/process-dynamic"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "detail": "No valid document file found for analysis"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let err = client
            .run_analysis(&AnalysisRequest::new("Summarize doc"))
            .await
            .unwrap_err();

        assert!(matches!(err, RefinementError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_initial_analysis_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/process-dynamic"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let err = client
            .run_analysis(&AnalysisRequest::new("Summarize doc"))
            .await
            .unwrap_err();

        assert!(matches!(err, RefinementError::Api { status: 404, .. }));
    }
}

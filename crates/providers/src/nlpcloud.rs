//! NLP Cloud chatbot engine.
//!
//! Talks to the `chatbot` endpoint of the NLP Cloud REST API:
//!
//! ```text
//! POST {base_url}/[gpu/][{lang}/]{model}/chatbot
//! Authorization: Token {api_key}
//! {"input": "...", "context": "...", "history": [{"input": "...", "response": "..."}]}
//! ```
//!
//! Errors are reported as a JSON body with a `detail` field.

use async_trait::async_trait;
use banter_core::engine::{ChatEngine, EngineRequest, EngineResponse};
use banter_core::error::EngineError;
use serde::Deserialize;
use tracing::{debug, warn};

/// An NLP Cloud chatbot client.
pub struct NlpCloudProvider {
    base_url: String,
    api_key: String,
    model: String,
    use_gpu: bool,
    lang: String,
    client: reqwest::Client,
}

impl NlpCloudProvider {
    /// Create a new client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            use_gpu: true,
            lang: String::new(),
            client,
        })
    }

    /// Build from the `[nlp]` config section. Fails when the API key or
    /// model is missing.
    pub fn from_config(config: &banter_config::NlpConfig) -> Result<Self, EngineError> {
        let (api_key, model) = config
            .require_credentials()
            .map_err(|e| EngineError::NotConfigured(e.to_string()))?;

        Ok(Self::new(
            &config.api_url,
            api_key,
            model,
            std::time::Duration::from_secs(config.timeout_secs),
        )?
        .with_gpu(config.use_gpu)
        .with_lang(&config.lang))
    }

    /// Route requests to GPU-backed models.
    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    /// Language prefix for the multilingual add-on. Empty disables it.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into().trim_matches('/').to_string();
        self
    }

    /// Full URL of the chatbot endpoint.
    fn endpoint(&self) -> String {
        let mut url = self.base_url.clone();
        if self.use_gpu {
            url.push_str("/gpu");
        }
        if !self.lang.is_empty() {
            url.push('/');
            url.push_str(&self.lang);
        }
        format!("{url}/{}/chatbot", self.model)
    }

    /// Pull the human-readable `detail` out of an error body.
    fn error_detail(body: &str) -> String {
        serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.detail)
            .map(|d| match d {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_else(|| body.to_string())
    }
}

#[async_trait]
impl ChatEngine for NlpCloudProvider {
    fn name(&self) -> &str {
        "nlpcloud"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: EngineRequest) -> Result<EngineResponse, EngineError> {
        let url = self.endpoint();

        debug!(
            model = %self.model,
            history_len = request.history.len(),
            "Sending chatbot request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout(e.to_string())
                } else {
                    EngineError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(EngineError::RateLimited);
        }

        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, detail = %Self::error_detail(&body), "Engine rejected credentials");
            return Err(EngineError::AuthenticationFailed(
                "Invalid API token or insufficient permissions".into(),
            ));
        }

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = Self::error_detail(&body);
            warn!(status, detail = %detail, "Engine returned error");
            return Err(EngineError::ApiError {
                status_code: status,
                message: detail,
            });
        }

        response
            .json::<EngineResponse>()
            .await
            .map_err(|e| EngineError::InvalidResponse(format!("Failed to parse response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};
    use banter_core::session::ChatTurn;
    use std::time::Duration;

    fn provider(base_url: &str) -> NlpCloudProvider {
        NlpCloudProvider::new(base_url, "test-token", "finetuned-llama-3-70b", Duration::from_secs(5))
            .unwrap()
    }

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[test]
    fn endpoint_with_gpu() {
        let p = provider("https://api.nlpcloud.io/v1/");
        assert_eq!(
            p.endpoint(),
            "https://api.nlpcloud.io/v1/gpu/finetuned-llama-3-70b/chatbot"
        );
    }

    #[test]
    fn endpoint_without_gpu_with_lang() {
        let p = provider("https://api.nlpcloud.io/v1")
            .with_gpu(false)
            .with_lang("fra_Latn");
        assert_eq!(
            p.endpoint(),
            "https://api.nlpcloud.io/v1/fra_Latn/finetuned-llama-3-70b/chatbot"
        );
    }

    #[test]
    fn from_config_requires_credentials() {
        let config = banter_config::NlpConfig::default();
        assert!(matches!(
            NlpCloudProvider::from_config(&config),
            Err(EngineError::NotConfigured(_))
        ));

        let config = banter_config::NlpConfig {
            api_key: Some("k".into()),
            model: Some("chatdolphin".into()),
            use_gpu: false,
            ..Default::default()
        };
        let p = NlpCloudProvider::from_config(&config).unwrap();
        assert_eq!(p.model(), "chatdolphin");
        assert!(!p.endpoint().contains("/gpu/"));
    }

    #[test]
    fn error_detail_extraction() {
        assert_eq!(
            NlpCloudProvider::error_detail(r#"{"detail":"Model not found"}"#),
            "Model not found"
        );
        assert_eq!(NlpCloudProvider::error_detail("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn chat_round_trip_against_local_server() {
        let router = Router::new().route(
            "/v1/gpu/finetuned-llama-3-70b/chatbot",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["authorization"], "Token test-token");
                let reply = format!("echo: {}", body["input"].as_str().unwrap_or_default());
                Json(serde_json::json!({
                    "response": reply,
                    "history": body["history"],
                }))
            }),
        );
        let base = spawn(router).await;

        let result = provider(&base)
            .chat(EngineRequest {
                input: "Hello".into(),
                context: "Be nice".into(),
                history: vec![ChatTurn::new("earlier", "reply")],
            })
            .await
            .unwrap();

        assert_eq!(result.response, "echo: Hello");
        assert_eq!(result.extra["history"][0]["input"], "earlier");
    }

    #[tokio::test]
    async fn api_error_carries_status_and_detail() {
        let router = Router::new().route(
            "/v1/gpu/finetuned-llama-3-70b/chatbot",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"detail": "history is too long"})),
                )
            }),
        );
        let base = spawn(router).await;

        let err = provider(&base)
            .chat(EngineRequest::default())
            .await
            .unwrap_err();
        match err {
            EngineError::ApiError {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 400);
                assert_eq!(message, "history is too long");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_failure() {
        let router = Router::new().route(
            "/v1/gpu/finetuned-llama-3-70b/chatbot",
            post(|| async { StatusCode::UNAUTHORIZED }),
        );
        let base = spawn(router).await;

        let err = provider(&base)
            .chat(EngineRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn unparseable_body_is_invalid_response() {
        let router = Router::new().route(
            "/v1/gpu/finetuned-llama-3-70b/chatbot",
            post(|| async { "not json" }),
        );
        let base = spawn(router).await;

        let err = provider(&base)
            .chat(EngineRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let err = provider("http://127.0.0.1:1/v1")
            .chat(EngineRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Network(_)));
    }
}

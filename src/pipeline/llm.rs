//! Model invocation: one prompt in, one raw text answer out.
//!
//! Every backend sits behind [`ModelBackend`]: a system instruction, a user
//! prompt, and [`GenerationParams`] go in, the response text comes out. The
//! rest of the pipeline never knows whether it is talking to a hosted API, a
//! model served on localhost, or any provider edgequake-llm supports.
//!
//! ## Backends
//!
//! * [`OpenAiCompatibleBackend`] — `POST {base_url}/chat/completions` over
//!   reqwest. Used for the hosted API (bearer key required) and for local
//!   servers such as LM Studio (base URL only).
//! * [`ProviderBackend`] — wraps an `edgequake_llm::LLMProvider`, created by
//!   name through `ProviderFactory` (anthropic, gemini, ollama, …).
//!
//! There is no retry: a failed call fails the image, and the batch moves on.

use crate::config::{
    BackendKind, ExtractionConfig, DEFAULT_HOSTED_BASE_URL, DEFAULT_HOSTED_MODEL,
    DEFAULT_LOCAL_BASE_URL, DEFAULT_LOCAL_MODEL,
};
use crate::error::{BackendError, FileError, Script2JsonError};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Sampling parameters for one model call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: usize,
    pub temperature: f32,
}

impl GenerationParams {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// A text-generation service.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Short label used in logs and error messages.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt` under the `system` instruction.
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError>;
}

// ── OpenAI-compatible HTTP backend ───────────────────────────────────────

/// Chat-completions client for the hosted API and local OpenAI-compatible
/// servers.
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    label: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiCompatibleBackend {
    /// Build a client.
    ///
    /// The client carries no timeout of its own. Calls are bounded by
    /// [`invoke_model`], so an expired call is always reported as
    /// [`FileError::ModelTimeout`].
    pub fn new(
        label: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            label: label.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let url = self.endpoint();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: system,
                },
                WireMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        debug!(backend = %self.label, model = %self.model, "POST {}", url);

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| BackendError::Transport {
            url: url.clone(),
            detail: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(BackendError::NoContent)
    }
}

// ── edgequake-llm provider backend ───────────────────────────────────────

/// Adapter from an edgequake-llm provider to [`ModelBackend`].
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl ModelBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(prompt)];
        let options = CompletionOptions {
            temperature: Some(params.temperature),
            max_tokens: Some(params.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendError::Provider {
                provider: self.label.clone(),
                detail: e.to_string(),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

/// Pick the backend for a run, from most-specific to least-specific.
///
/// 1. **Injected backend** (`config.model_backend`) — used as-is.
/// 2. **Hosted** — OpenAI-compatible API; requires `config.api_key`.
/// 3. **Local** — OpenAI-compatible server at `config.base_url`
///    (default LM Studio on port 1234); sends `config.local_api_key` only.
/// 4. **Named provider** — `ProviderFactory::create_llm_provider`, which
///    reads that provider's key from the environment.
/// 5. **Auto** — hosted when an API key is configured, then the
///    `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` pair, then
///    `ProviderFactory::from_env`.
pub fn resolve_backend(
    config: &ExtractionConfig,
) -> Result<Arc<dyn ModelBackend>, Script2JsonError> {
    if let Some(ref backend) = config.model_backend {
        return Ok(Arc::clone(backend));
    }

    match config.backend {
        BackendKind::Hosted => hosted_backend(config),
        BackendKind::Local => local_backend(config),
        BackendKind::Provider(ref name) => {
            let model = config.model.as_deref().unwrap_or(DEFAULT_HOSTED_MODEL);
            named_provider(name, model)
        }
        BackendKind::Auto => {
            if config.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
                return hosted_backend(config);
            }

            if let (Ok(prov), Ok(model)) = (
                std::env::var("EDGEQUAKE_LLM_PROVIDER"),
                std::env::var("EDGEQUAKE_MODEL"),
            ) {
                if !prov.is_empty() && !model.is_empty() {
                    return named_provider(&prov, &model);
                }
            }

            let (llm_provider, _embedding) =
                ProviderFactory::from_env().map_err(|e| Script2JsonError::BackendNotConfigured {
                    backend: "auto".to_string(),
                    hint: format!(
                        "No model backend could be auto-detected from environment.\n\
                        Set OPENAI_API_KEY, pass --backend local for a local server, \
                        or configure an edgequake-llm provider.\n\
                        Error: {e}"
                    ),
                })?;
            info!("Using auto-detected edgequake-llm provider");
            Ok(Arc::new(ProviderBackend::new(llm_provider, "auto")))
        }
    }
}

fn hosted_backend(config: &ExtractionConfig) -> Result<Arc<dyn ModelBackend>, Script2JsonError> {
    let key = config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Script2JsonError::BackendNotConfigured {
            backend: "hosted".to_string(),
            hint: "The hosted backend requires an API key. Set OPENAI_API_KEY or pass --api-key."
                .to_string(),
        })?;
    let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_HOSTED_BASE_URL);
    let model = config.model.as_deref().unwrap_or(DEFAULT_HOSTED_MODEL);
    http_backend("hosted", base_url, model, Some(key))
}

fn local_backend(config: &ExtractionConfig) -> Result<Arc<dyn ModelBackend>, Script2JsonError> {
    let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_LOCAL_BASE_URL);
    let model = config.model.as_deref().unwrap_or(DEFAULT_LOCAL_MODEL);
    // The hosted key stays with the hosted API.
    http_backend("local", base_url, model, config.local_api_key.clone())
}

fn http_backend(
    label: &str,
    base_url: &str,
    model: &str,
    api_key: Option<String>,
) -> Result<Arc<dyn ModelBackend>, Script2JsonError> {
    let backend = OpenAiCompatibleBackend::new(label, base_url, model, api_key)
        .map_err(|e| Script2JsonError::Internal(format!("Failed to build HTTP client: {e}")))?;
    info!("Using {} backend {} (model {})", label, backend.endpoint(), model);
    Ok(Arc::new(backend))
}

fn named_provider(name: &str, model: &str) -> Result<Arc<dyn ModelBackend>, Script2JsonError> {
    let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        Script2JsonError::BackendNotConfigured {
            backend: name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    info!("Using edgequake-llm provider {} (model {})", name, model);
    Ok(Arc::new(ProviderBackend::new(provider, name)))
}

/// Send the extraction prompt and return the trimmed answer.
///
/// The call is bounded by `config.api_timeout_secs` regardless of backend.
/// Any error becomes a per-file [`FileError`]; nothing here aborts the batch.
pub async fn invoke_model(
    backend: &dyn ModelBackend,
    prompt: &str,
    config: &ExtractionConfig,
) -> Result<String, FileError> {
    let system = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let params = GenerationParams::from_config(config);
    let secs = config.api_timeout_secs;
    let start = Instant::now();

    let response = tokio::time::timeout(
        Duration::from_secs(secs),
        backend.generate(system, prompt, &params),
    )
    .await
    .map_err(|_| FileError::ModelTimeout { secs })??;

    debug!(
        "{}: {} chars in {:?}",
        backend.name(),
        response.len(),
        start.elapsed()
    );
    Ok(response.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingBackend {
        seen: Mutex<Vec<(String, String, GenerationParams)>>,
        answer: String,
    }

    #[async_trait]
    impl ModelBackend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(
            &self,
            system: &str,
            prompt: &str,
            params: &GenerationParams,
        ) -> Result<String, BackendError> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), prompt.to_string(), *params));
            Ok(self.answer.clone())
        }
    }

    struct SlowBackend;

    #[async_trait]
    impl ModelBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate(
            &self,
            _system: &str,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, BackendError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl ModelBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(
            &self,
            _system: &str,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, BackendError> {
            Err(BackendError::Status {
                status: 401,
                body: "Incorrect API key provided".into(),
            })
        }
    }

    #[test]
    fn params_follow_config_defaults() {
        let params = GenerationParams::from_config(&ExtractionConfig::default());
        assert_eq!(params.max_tokens, 750);
        assert_eq!(params.temperature, 0.5);
    }

    #[tokio::test]
    async fn invoke_sends_system_prompt_and_params() {
        let backend = RecordingBackend {
            seen: Mutex::new(Vec::new()),
            answer: "  {\"scenes\": []}\n".into(),
        };
        let config = ExtractionConfig::default();
        let out = invoke_model(&backend, "the prompt", &config).await.unwrap();
        assert_eq!(out, "{\"scenes\": []}");

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(seen[0].1, "the prompt");
        assert_eq!(seen[0].2.temperature, 0.5);
    }

    #[tokio::test]
    async fn custom_system_prompt_is_used() {
        let backend = RecordingBackend {
            seen: Mutex::new(Vec::new()),
            answer: "{}".into(),
        };
        let config = ExtractionConfig::builder()
            .system_prompt("Be terse.")
            .build()
            .unwrap();
        invoke_model(&backend, "p", &config).await.unwrap();
        assert_eq!(backend.seen.lock().unwrap()[0].0, "Be terse.");
    }

    #[tokio::test]
    async fn backend_error_is_model_failure() {
        let config = ExtractionConfig::default();
        let err = invoke_model(&FailingBackend, "p", &config).await.unwrap_err();
        assert!(matches!(err, FileError::ModelFailed { .. }), "got: {err:?}");
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let config = ExtractionConfig::builder()
            .api_timeout_secs(1)
            .build()
            .unwrap();
        let err = invoke_model(&SlowBackend, "p", &config).await.unwrap_err();
        assert_eq!(err, FileError::ModelTimeout { secs: 1 });
    }

    #[test]
    fn hosted_without_key_is_not_configured() {
        let config = ExtractionConfig::builder()
            .backend(BackendKind::Hosted)
            .build()
            .unwrap();
        let err = resolve_backend(&config).err().expect("should fail");
        assert!(matches!(err, Script2JsonError::BackendNotConfigured { .. }));
    }

    #[test]
    fn local_backend_needs_only_a_base_url() {
        let config = ExtractionConfig::builder()
            .backend(BackendKind::Local)
            .base_url("http://127.0.0.1:9999/v1/")
            .build()
            .unwrap();
        let backend = resolve_backend(&config).unwrap();
        assert_eq!(backend.name(), "local");
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let backend = OpenAiCompatibleBackend::new(
            "local",
            "http://localhost:1234/v1/",
            DEFAULT_LOCAL_MODEL,
            None,
        )
        .unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:1234/v1/chat/completions");
        assert_eq!(backend.model(), DEFAULT_LOCAL_MODEL);
    }

    #[test]
    fn injected_backend_takes_precedence() {
        let injected: Arc<dyn ModelBackend> = Arc::new(FailingBackend);
        let config = ExtractionConfig::builder()
            .backend(BackendKind::Hosted)
            .model_backend(Arc::clone(&injected))
            .build()
            .unwrap();
        let resolved = resolve_backend(&config).unwrap();
        assert_eq!(resolved.name(), "failing");
    }

    #[test]
    fn chat_request_wire_shape() {
        let body = ChatRequest {
            model: "gpt-4",
            messages: vec![
                WireMessage {
                    role: "system",
                    content: "sys",
                },
                WireMessage {
                    role: "user",
                    content: "usr",
                },
            ],
            max_tokens: 750,
            temperature: 0.5,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "gpt-4");
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "usr");
        assert_eq!(v["max_tokens"], 750);
        assert_eq!(v["temperature"], 0.5);
    }

    #[test]
    fn chat_response_tolerates_null_content() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    // ── HTTP round trips against a one-shot local server ─────────────────

    use crate::config::RecoveryStrategy;
    use crate::pipeline::recover::recover_json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Read one HTTP request (headers plus `content-length` body).
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Answer exactly one request with `status` and `body`. Returns the base
    /// URL to point a backend at and a handle yielding the raw request.
    async fn serve_once(status: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (base_url, handle)
    }

    fn body_of(request: &str) -> serde_json::Value {
        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    fn has_header(request: &str, name: &str) -> bool {
        request
            .lines()
            .take_while(|l| !l.is_empty())
            .any(|l| l.to_ascii_lowercase().starts_with(&format!("{name}:")))
    }

    const OK_SCENES: &str =
        r#"{"choices":[{"message":{"role":"assistant","content":"{\"scenes\":[]}"}}]}"#;

    #[tokio::test]
    async fn hosted_round_trip_sends_bearer_key_and_params() {
        let (base_url, server) = serve_once("200 OK", OK_SCENES).await;
        let backend =
            OpenAiCompatibleBackend::new("hosted", base_url, "m", Some("k".into())).unwrap();
        let params = GenerationParams::from_config(&ExtractionConfig::default());

        let answer = backend.generate("sys", "usr", &params).await.unwrap();
        assert_eq!(answer, r#"{"scenes":[]}"#);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions "), "got: {request}");
        assert!(
            request.to_ascii_lowercase().contains("authorization: bearer k\r\n"),
            "got: {request}"
        );
        let body = body_of(&request);
        assert_eq!(body["model"], "m");
        assert_eq!(body["max_tokens"], 750);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "usr");
    }

    #[tokio::test]
    async fn unauthorized_is_a_model_communication_failure() {
        let (base_url, _server) = serve_once(
            "401 Unauthorized",
            r#"{"error":{"message":"Incorrect API key provided"}}"#,
        )
        .await;
        let backend =
            OpenAiCompatibleBackend::new("hosted", base_url, "m", Some("bad".into())).unwrap();

        let err = invoke_model(&backend, "p", &ExtractionConfig::default())
            .await
            .unwrap_err();
        match err {
            FileError::ModelFailed { ref detail } => {
                assert!(detail.contains("401"), "got: {detail}");
                assert!(detail.contains("Incorrect API key provided"), "got: {detail}");
            }
            ref other => panic!("expected ModelFailed, got {other:?}"),
        }
        assert!(err.to_string().starts_with("Model communication failure"));
    }

    #[tokio::test]
    async fn empty_choices_is_no_content() {
        let (base_url, _server) = serve_once("200 OK", r#"{"choices":[]}"#).await;
        let backend = OpenAiCompatibleBackend::new("local", base_url, "m", None).unwrap();
        let params = GenerationParams::from_config(&ExtractionConfig::default());

        let err = backend.generate("s", "p", &params).await.unwrap_err();
        assert!(matches!(err, BackendError::NoContent), "got: {err:?}");
    }

    #[tokio::test]
    async fn null_content_ends_as_empty_response() {
        let (base_url, _server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
        )
        .await;
        let backend = OpenAiCompatibleBackend::new("local", base_url, "m", None).unwrap();

        let answer = invoke_model(&backend, "p", &ExtractionConfig::default())
            .await
            .unwrap();
        assert_eq!(answer, "");
        assert_eq!(
            recover_json(&answer, RecoveryStrategy::Greedy).unwrap_err(),
            FileError::EmptyResponse
        );
    }

    #[tokio::test]
    async fn local_backend_does_not_forward_hosted_key() {
        let (base_url, server) = serve_once("200 OK", OK_SCENES).await;
        let config = ExtractionConfig::builder()
            .backend(BackendKind::Local)
            .base_url(base_url)
            .api_key("sk-hosted-secret")
            .build()
            .unwrap();
        let backend = resolve_backend(&config).unwrap();

        invoke_model(backend.as_ref(), "p", &config).await.unwrap();

        let request = server.await.unwrap();
        assert!(!has_header(&request, "authorization"), "got: {request}");
        assert!(!request.contains("sk-hosted-secret"));
    }

    #[tokio::test]
    async fn local_backend_sends_its_own_key() {
        let (base_url, server) = serve_once("200 OK", OK_SCENES).await;
        let config = ExtractionConfig::builder()
            .backend(BackendKind::Local)
            .base_url(base_url)
            .api_key("sk-hosted-secret")
            .local_api_key("lm-studio")
            .build()
            .unwrap();
        let backend = resolve_backend(&config).unwrap();

        invoke_model(backend.as_ref(), "p", &config).await.unwrap();

        let request = server.await.unwrap();
        assert!(
            request.to_ascii_lowercase().contains("authorization: bearer lm-studio\r\n"),
            "got: {request}"
        );
        assert!(!request.contains("sk-hosted-secret"));
    }

    #[tokio::test]
    async fn silent_server_is_a_model_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let _server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let backend = OpenAiCompatibleBackend::new("local", base_url, "m", None).unwrap();
        let config = ExtractionConfig::builder()
            .api_timeout_secs(1)
            .build()
            .unwrap();

        let err = invoke_model(&backend, "p", &config).await.unwrap_err();
        assert_eq!(err, FileError::ModelTimeout { secs: 1 });
    }
}

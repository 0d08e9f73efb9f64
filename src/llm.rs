// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLIENTE LLM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait de backend (uma tentativa = uma chamada de rede) e o cliente que
// aplica a política de retry sobre ele.
//
// Cada tentativa retorna um `Attempt` explícito:
// - Success      → resultado devolvido imediatamente
// - RateLimited  → espera o backoff e tenta de novo (até o limite)
// - Failed       → erro propagado sem retry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Número máximo de tentativas por chamada
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Espera entre tentativas após rate limit
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Erros do cliente LLM
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    /// Todas as tentativas sofreram rate limit
    #[error("Rate limit exceeded after {attempts} attempts: {message}")]
    RateLimited {
        /// Tentativas feitas
        attempts: u32,
        /// Mensagem da última tentativa
        message: String,
    },

    /// Falha sem retry: rede, auth, resposta inválida, timeout
    #[error("Request failed: {0}")]
    RequestFailed(String),
}

impl LlmError {
    /// Retorna true se o erro foi rate limit
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }
}

/// Requisição de completion: um par (system, user) e parâmetros
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Modelo
    pub model: String,
    /// Instrução de sistema
    pub system: String,
    /// Conteúdo do usuário (chunk ou resumos combinados)
    pub prompt: String,
    /// Temperatura
    pub temperature: f32,
    /// Máximo de tokens de saída
    pub max_tokens: u32,
}

/// Uso de tokens reportado pelo endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens de entrada
    pub input_tokens: u64,
    /// Tokens gerados
    pub output_tokens: u64,
}

/// Resposta gerada pelo LLM
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    /// Texto gerado
    pub text: String,
    /// Tokens cobrados pela chamada
    pub usage: TokenUsage,
}

impl CompletionResult {
    /// Cria um resultado
    pub fn new(text: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage {
                input_tokens,
                output_tokens,
            },
        }
    }
}

/// Resultado de uma única tentativa
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// Resposta recebida
    Success(CompletionResult),
    /// Endpoint sinalizou rate limit (pode tentar de novo)
    RateLimited(String),
    /// Qualquer outra falha: rede, auth, requisição inválida, timeout
    Failed(String),
}

/// Backend de completion: faz exatamente uma chamada remota por tentativa.
///
/// Permite trocar o endpoint real por um mock nos testes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Executa uma tentativa
    async fn attempt(&self, request: &CompletionRequest) -> Attempt;
}

/// Política de retry para rate limit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Tentativas totais (mínimo 1)
    pub max_attempts: u32,
    /// Espera entre tentativas
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Política sem espera (testes)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }
}

/// Cliente de completion com retry limitado
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    policy: RetryPolicy,
}

impl CompletionClient {
    /// Cria um cliente com a política padrão (3 tentativas, 60s)
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            policy: RetryPolicy::default(),
        }
    }

    /// Define a política de retry
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Política em uso
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Envia a requisição, repetindo apenas em rate limit.
    ///
    /// # Erros
    /// - [`LlmError::RateLimited`] se todas as tentativas sofreram rate limit
    /// - [`LlmError::RequestFailed`] na primeira falha de outro tipo
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult, LlmError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_message = String::new();

        for attempt in 1..=max_attempts {
            match self.backend.attempt(request).await {
                Attempt::Success(result) => {
                    log::debug!(
                        "🤖 Resposta recebida (tentativa {}/{}): {} + {} tokens",
                        attempt,
                        max_attempts,
                        result.usage.input_tokens,
                        result.usage.output_tokens
                    );
                    return Ok(result);
                }
                Attempt::Failed(message) => {
                    return Err(LlmError::RequestFailed(message));
                }
                Attempt::RateLimited(message) => {
                    log::warn!(
                        "⏳ API rate limit. Tentativa {}/{} falhou: {}",
                        attempt,
                        max_attempts,
                        message
                    );
                    last_message = message;

                    if attempt < max_attempts && !self.policy.backoff.is_zero() {
                        log::info!("⏳ Aguardando {:?} antes de tentar novamente...", self.policy.backoff);
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
            }
        }

        Err(LlmError::RateLimited {
            attempts: max_attempts,
            message: last_message,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BACKEND ROTEIRIZADO PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Backend que devolve tentativas pré-definidas, em ordem, e grava as requisições.
///
/// Quando o roteiro acaba, toda tentativa falha.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Attempt>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    /// Cria o backend com o roteiro de tentativas
    pub fn new(script: Vec<Attempt>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requisições recebidas até agora
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Número de tentativas recebidas
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn attempt(&self, request: &CompletionRequest) -> Attempt {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| Attempt::Failed("Scripted backend exhausted".into()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO ANTHROPIC (MESSAGES API)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// URL base padrão da API
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Versão da API enviada no header `anthropic-version`
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Timeout padrão por requisição
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    temperature: f32,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Cliente para a Messages API da Anthropic
pub struct AnthropicBackend {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicBackend {
    /// Cria o backend com URL e timeout padrão
    ///
    /// # Erros
    /// Falha do builder do `reqwest` (backend TLS indisponível)
    pub fn new(api_key: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            api_key,
            base_url: ANTHROPIC_BASE_URL.into(),
            client: build_http_client(DEFAULT_REQUEST_TIMEOUT)?,
        })
    }

    /// Troca a URL base (proxy, servidor local)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Reconstrói o cliente HTTP com outro timeout por requisição
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, reqwest::Error> {
        self.client = build_http_client(timeout)?;
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

fn build_request_body(request: &CompletionRequest) -> MessagesRequest<'_> {
    MessagesRequest {
        model: &request.model,
        max_tokens: request.max_tokens,
        system: &request.system,
        temperature: request.temperature,
        messages: vec![ApiMessage {
            role: "user",
            content: &request.prompt,
        }],
    }
}

/// Extrai texto (blocos `text` concatenados) e uso de tokens do corpo da resposta
fn parse_messages_response(body: &str) -> Result<CompletionResult, String> {
    let parsed: MessagesResponse =
        serde_json::from_str(body).map_err(|e| format!("Invalid response format: {}", e))?;

    let text: String = parsed
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    Ok(CompletionResult {
        text,
        usage: parsed.usage,
    })
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    async fn attempt(&self, request: &CompletionRequest) -> Attempt {
        let body = build_request_body(request);

        log::debug!(
            "📤 POST {} (model={}, {} chars)",
            self.endpoint(),
            request.model,
            request.prompt.len()
        );

        let response = match self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Attempt::Failed(format!("Timeout: {}", e)),
            Err(e) => return Attempt::Failed(format!("Network error: {}", e)),
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return Attempt::Failed(format!("Network error: {}", e)),
        };

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Attempt::RateLimited(format!("HTTP {}: {}", status, text));
        }

        if !status.is_success() {
            return Attempt::Failed(format!("HTTP {}: {}", status, text));
        }

        match parse_messages_response(&text) {
            Ok(result) => Attempt::Success(result),
            Err(message) => Attempt::Failed(message),
        }
    }
}

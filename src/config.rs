// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONFIGURAÇÃO DO SUMMARIZER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Modelo, chunking, retry, pausas e tabela de preços.
// Todas as configurações podem ser definidas via .env
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::llm::{
    AnthropicBackend, CompletionClient, RetryPolicy, ANTHROPIC_BASE_URL, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_BACKOFF,
};
use crate::pricing::{PricingError, PricingTable};
use crate::prompts::{DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE};
use crate::summarizer::{PipelineConfig, DEFAULT_CALL_PAUSE};
use crate::utils::segment::DEFAULT_CHUNK_TOKENS;

/// Modelo padrão
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5";

/// Erros de configuração
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `ANTHROPIC_API_KEY` ausente ou vazia
    #[error("ANTHROPIC_API_KEY is not set (add it to your environment or .env file)")]
    MissingApiKey,

    /// Valor inválido para uma variável
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue {
        /// Nome da variável
        name: String,
        /// Valor recebido
        value: String,
    },

    /// Falha ao carregar a tabela de preços
    #[error(transparent)]
    PricingFile(#[from] PricingError),

    /// Cliente HTTP não pôde ser construído (TLS, timeout)
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuração completa do summarizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizerConfig {
    /// Chave da API (obrigatória apenas para `summarize`)
    pub api_key: Option<String>,

    /// URL base da Messages API
    pub base_url: String,

    /// Modelo usado nas chamadas
    pub model: String,

    /// Tamanho alvo de chunk em tokens.
    /// Padrão: 40000
    pub chunk_tokens: NonZeroUsize,

    /// Máximo de tokens de saída por chamada.
    /// Padrão: 4096
    pub max_output_tokens: u32,

    /// Temperatura.
    /// Padrão: 0.5
    pub temperature: f32,

    /// Tentativas por chamada em caso de rate limit.
    /// Padrão: 3
    pub retry_attempts: u32,

    /// Espera entre tentativas.
    /// Padrão: 60s
    pub retry_backoff: Duration,

    /// Pausa após cada chamada da fase map.
    /// Padrão: 60s
    pub call_pause: Duration,

    /// Timeout de cada requisição HTTP.
    /// Padrão: 600s
    pub request_timeout: Duration,

    /// Arquivo JSON de preços (None = tabela embutida)
    pub pricing_file: Option<PathBuf>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: ANTHROPIC_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            chunk_tokens: NonZeroUsize::new(DEFAULT_CHUNK_TOKENS).unwrap_or(NonZeroUsize::MIN),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            retry_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            call_pause: DEFAULT_CALL_PAUSE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            pricing_file: None,
        }
    }
}

impl SummarizerConfig {
    /// Configuração do pipeline (chunking e pausa)
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            chunk_tokens: self.chunk_tokens,
            call_pause: self.call_pause,
        }
    }

    /// Política de retry
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            backoff: self.retry_backoff,
        }
    }

    /// Chave da API, ou erro se ausente
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Tabela de preços: arquivo configurado ou padrão embutido
    pub fn load_pricing(&self) -> Result<PricingTable, ConfigError> {
        match &self.pricing_file {
            Some(path) => Ok(PricingTable::from_file(path)?),
            None => Ok(PricingTable::with_defaults()),
        }
    }

    /// Cliente HTTP real com a política de retry configurada
    pub fn build_client(&self) -> Result<CompletionClient, ConfigError> {
        let backend = AnthropicBackend::new(self.require_api_key()?.to_string())?
            .with_base_url(&self.base_url)
            .with_timeout(self.request_timeout)?;

        Ok(CompletionClient::new(Arc::new(backend)).with_policy(self.retry_policy()))
    }
}

/// Carrega a configuração a partir das variáveis de ambiente.
///
/// Variáveis suportadas:
/// - `ANTHROPIC_API_KEY`: chave da API
/// - `ANTHROPIC_BASE_URL`: URL base (padrão: https://api.anthropic.com)
/// - `SUMMARIZER_MODEL`: modelo (padrão: claude-haiku-4-5)
/// - `SUMMARIZER_CHUNK_TOKENS`: tokens por chunk (padrão: 40000)
/// - `SUMMARIZER_MAX_OUTPUT_TOKENS`: tokens de saída (padrão: 4096)
/// - `SUMMARIZER_TEMPERATURE`: temperatura (padrão: 0.5)
/// - `SUMMARIZER_RETRY_ATTEMPTS`: tentativas em rate limit (padrão: 3)
/// - `SUMMARIZER_RETRY_BACKOFF_SECS`: espera entre tentativas (padrão: 60)
/// - `SUMMARIZER_CALL_PAUSE_SECS`: pausa entre chunks (padrão: 60)
/// - `SUMMARIZER_REQUEST_TIMEOUT_SECS`: timeout HTTP (padrão: 600)
/// - `SUMMARIZER_PRICING_FILE`: JSON de preços (opcional)
///
/// Valores inválidos geram `warn!` e mantêm o padrão.
pub fn load_summarizer_config() -> SummarizerConfig {
    load_summarizer_config_from(|name| std::env::var(name).ok())
}

/// Igual a [`load_summarizer_config`], com fonte de variáveis injetável.
pub fn load_summarizer_config_from(get: impl Fn(&str) -> Option<String>) -> SummarizerConfig {
    let mut config = SummarizerConfig::default();

    // Strings: apenas trim, vazio = não definido
    let get = |name: &str| get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(key) = get("ANTHROPIC_API_KEY") {
        config.api_key = Some(key);
    }

    if let Some(base_url) = get("ANTHROPIC_BASE_URL") {
        log::info!("📦 ANTHROPIC_BASE_URL={}", base_url);
        config.base_url = base_url;
    }

    if let Some(model) = get("SUMMARIZER_MODEL") {
        log::info!("📦 SUMMARIZER_MODEL={}", model);
        config.model = model;
    }

    if let Some(tokens) = parse_var::<NonZeroUsize>(&get, "SUMMARIZER_CHUNK_TOKENS") {
        log::info!("📦 SUMMARIZER_CHUNK_TOKENS={}", tokens);
        config.chunk_tokens = tokens;
    }

    if let Some(max) = parse_var::<u32>(&get, "SUMMARIZER_MAX_OUTPUT_TOKENS").filter(|m| *m > 0) {
        log::info!("📦 SUMMARIZER_MAX_OUTPUT_TOKENS={}", max);
        config.max_output_tokens = max;
    }

    if let Some(temperature) = parse_var::<f32>(&get, "SUMMARIZER_TEMPERATURE") {
        if (0.0..=1.0).contains(&temperature) {
            log::info!("📦 SUMMARIZER_TEMPERATURE={}", temperature);
            config.temperature = temperature;
        } else {
            log::warn!(
                "⚠️ SUMMARIZER_TEMPERATURE={} fora de [0, 1], usando {}",
                temperature,
                config.temperature
            );
        }
    }

    if let Some(attempts) = parse_var::<u32>(&get, "SUMMARIZER_RETRY_ATTEMPTS") {
        if attempts >= 1 {
            log::info!("📦 SUMMARIZER_RETRY_ATTEMPTS={}", attempts);
            config.retry_attempts = attempts;
        } else {
            log::warn!(
                "⚠️ SUMMARIZER_RETRY_ATTEMPTS=0 inválido (mínimo 1), usando {}",
                config.retry_attempts
            );
        }
    }

    if let Some(secs) = parse_var::<u64>(&get, "SUMMARIZER_RETRY_BACKOFF_SECS") {
        log::info!("📦 SUMMARIZER_RETRY_BACKOFF_SECS={}", secs);
        config.retry_backoff = Duration::from_secs(secs);
    }

    if let Some(secs) = parse_var::<u64>(&get, "SUMMARIZER_CALL_PAUSE_SECS") {
        log::info!("📦 SUMMARIZER_CALL_PAUSE_SECS={}", secs);
        config.call_pause = Duration::from_secs(secs);
    }

    if let Some(secs) = parse_var::<u64>(&get, "SUMMARIZER_REQUEST_TIMEOUT_SECS").filter(|s| *s > 0) {
        log::info!("📦 SUMMARIZER_REQUEST_TIMEOUT_SECS={}", secs);
        config.request_timeout = Duration::from_secs(secs);
    }

    if let Some(path) = get("SUMMARIZER_PRICING_FILE") {
        log::info!("📦 SUMMARIZER_PRICING_FILE={}", path);
        config.pricing_file = Some(PathBuf::from(path));
    }

    log::info!(
        "🔧 Summarizer: modelo={} | chunk={} tokens | retry={}x/{:?} | pausa={:?}",
        config.model,
        config.chunk_tokens,
        config.retry_attempts,
        config.retry_backoff,
        config.call_pause
    );

    config
}

/// Lê e converte uma variável; valor inválido vira `warn!` e `None`.
fn parse_var<T: FromStr>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = get(name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            let err = ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw,
            };
            log::warn!("⚠️ {}, usando padrão", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> SummarizerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_summarizer_config_from(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_env() {
        let config = load(&[]);
        assert_eq!(config, SummarizerConfig::default());
        assert_eq!(config.model, "claude-haiku-4-5");
        assert_eq!(config.chunk_tokens.get(), 40_000);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.call_pause, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(600));
        assert!(config.pricing_file.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("ANTHROPIC_BASE_URL", "http://localhost:8080"),
            ("SUMMARIZER_MODEL", "claude-sonnet-4-5"),
            ("SUMMARIZER_CHUNK_TOKENS", "1000"),
            ("SUMMARIZER_TEMPERATURE", "0.2"),
            ("SUMMARIZER_RETRY_ATTEMPTS", "5"),
            ("SUMMARIZER_RETRY_BACKOFF_SECS", "0"),
            ("SUMMARIZER_CALL_PAUSE_SECS", "2"),
            ("SUMMARIZER_PRICING_FILE", "prices.json"),
        ]);

        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.model, "claude-sonnet-4-5");
        assert_eq!(config.pipeline_config().chunk_tokens.get(), 1000);
        assert_eq!(config.pipeline_config().call_pause, Duration::from_secs(2));
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.retry_policy(), RetryPolicy::immediate(5));
        assert_eq!(config.pricing_file, Some(PathBuf::from("prices.json")));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = load(&[
            ("SUMMARIZER_CHUNK_TOKENS", "0"),
            ("SUMMARIZER_TEMPERATURE", "hot"),
            ("SUMMARIZER_RETRY_ATTEMPTS", "-1"),
            ("SUMMARIZER_CALL_PAUSE_SECS", "soon"),
            ("SUMMARIZER_MAX_OUTPUT_TOKENS", "0"),
        ]);

        assert_eq!(config, SummarizerConfig::default());
    }

    #[test]
    fn test_temperature_out_of_range_is_ignored() {
        let config = load(&[("SUMMARIZER_TEMPERATURE", "1.5")]);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn test_zero_retry_attempts_keeps_default() {
        let config = load(&[("SUMMARIZER_RETRY_ATTEMPTS", "0")]);
        assert_eq!(config.retry_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.retry_policy().max_attempts, 3);
    }

    #[test]
    fn test_build_client_applies_retry_policy() {
        let config = load(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("SUMMARIZER_RETRY_ATTEMPTS", "5"),
            ("SUMMARIZER_RETRY_BACKOFF_SECS", "7"),
            ("SUMMARIZER_REQUEST_TIMEOUT_SECS", "30"),
        ]);

        let client = config.build_client().unwrap();
        assert_eq!(
            client.policy(),
            RetryPolicy {
                max_attempts: 5,
                backoff: Duration::from_secs(7),
            }
        );
    }

    #[test]
    fn test_missing_api_key() {
        let config = load(&[("ANTHROPIC_API_KEY", "   ")]);
        assert!(matches!(config.require_api_key(), Err(ConfigError::MissingApiKey)));
        assert!(matches!(config.build_client(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_load_pricing_default_and_missing_file() {
        let config = SummarizerConfig::default();
        assert!(config.load_pricing().unwrap().get(DEFAULT_MODEL).is_some());

        let config = SummarizerConfig {
            pricing_file: Some(PathBuf::from("/does/not/exist.json")),
            ..SummarizerConfig::default()
        };
        assert!(matches!(config.load_pricing(), Err(ConfigError::PricingFile(_))));
    }
}

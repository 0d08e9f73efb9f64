//! # Doc Summarizer
//!
//! Resume documentos longos (PDF, DOCX, RTF, TXT, Markdown) com modelos
//! Claude, usando map-reduce quando o documento não cabe em uma chamada.
//!
//! ## Fluxo
//!
//! 1. **Leitura** (`utils::FileReader`): extrai o texto do arquivo
//! 2. **Chunking** (`utils::segment`): divide em trechos de ~40k tokens,
//!    preferindo quebras de parágrafo, depois de linha, depois espaço
//! 3. **Map**: cada chunk é resumido em sequência, com pausa entre chamadas
//! 4. **Reduce**: os resumos parciais são combinados em um resumo final
//! 5. **Custo**: cada chamada bem-sucedida é cobrada no `CostLedger`
//!
//! Falhas remotas nunca descartam trabalho: o run termina em um
//! [`SummaryOutcome`] que carrega resumos parciais e custo acumulado.
//!
//! ## Exemplo de Uso
//!
//! ```rust,ignore
//! use doc_summarizer::prelude::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_summarizer_config();
//!     let pricing = Arc::new(config.load_pricing()?);
//!     let summarizer = Summarizer::new(config.build_client()?, pricing.clone(), config.pipeline_config());
//!
//!     let content = FileReader::new().read_file("paper.pdf")?;
//!     let spec = PromptSpec::new(PromptStyle::Simple, &config.model, &pricing)?;
//!
//!     let outcome = summarizer.run(&content.text, &spec).await?;
//!     println!("{}", outcome.best_text().unwrap_or_default());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Configuração via variáveis de ambiente.
///
/// **API:**
/// - `ANTHROPIC_API_KEY`: Chave da API (obrigatória para resumir)
/// - `ANTHROPIC_BASE_URL`: URL base (padrão: https://api.anthropic.com)
///
/// **Summarizer:**
/// - `SUMMARIZER_MODEL`: Modelo (padrão: "claude-haiku-4-5")
/// - `SUMMARIZER_CHUNK_TOKENS`: Tokens por chunk (padrão: 40000)
/// - `SUMMARIZER_RETRY_ATTEMPTS`: Tentativas em rate limit (padrão: 3)
/// - `SUMMARIZER_CALL_PAUSE_SECS`: Pausa entre chunks (padrão: 60)
/// - `SUMMARIZER_PRICING_FILE`: Tabela de preços em JSON (opcional)
pub mod config;

/// Cliente de completion com retry limitado.
///
/// Define a trait `CompletionBackend` e implementações para:
/// - Anthropic Messages API
/// - Backend roteirizado para testes
pub mod llm;

/// Preços por modelo e cálculo de custo por chamada.
pub mod pricing;

/// Estilos de resumo e instruções de sistema.
pub mod prompts;

/// Pipeline map-reduce e seus estados terminais.
pub mod summarizer;

/// Utilitários diversos.
///
/// - Chunking de documentos
/// - Leitura de arquivos
/// - Ledger de custo
pub mod utils;

// Re-exports principais
pub use config::{load_summarizer_config, ConfigError, SummarizerConfig};
pub use llm::{CompletionClient, LlmError, RetryPolicy};
pub use pricing::{Cost, PricingError, PricingTable};
pub use prompts::{PromptError, PromptSpec, PromptStyle};
pub use summarizer::{PipelineConfig, SummarizeError, Summarizer, SummaryOutcome};

/// Versão da biblioteca.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude com imports comuns para uso rápido.
///
/// ```rust,ignore
/// use doc_summarizer::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::config::{load_summarizer_config, SummarizerConfig};
    pub use crate::llm::{AnthropicBackend, CompletionBackend, CompletionClient, LlmError, RetryPolicy};
    pub use crate::pricing::{Cost, ModelPrice, PricingTable};
    pub use crate::prompts::{PromptSpec, PromptStyle};
    pub use crate::summarizer::{PipelineConfig, SummarizeError, Summarizer, SummaryOutcome};
    pub use crate::utils::{CallPhase, CostLedger, FileContent, FileReader};
}

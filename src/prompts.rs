// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROMPTS - Estilos de resumo
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Conjunto fechado de estilos. Cada estilo carrega sua instrução de sistema;
// um nome desconhecido é erro na construção, nunca no meio de um run.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::fmt;
use std::str::FromStr;

use crate::llm::CompletionRequest;
use crate::pricing::{PricingError, PricingTable};

/// Temperatura usada nos resumos
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Máximo de tokens de saída por chamada
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

/// Diretiva anexada à instrução na fase de redução
pub const REDUCE_DIRECTIVE: &str = "You will receive multiple summaries of sections of a large document. Combine them into one coherent summary.";

const GROUNDING_RULE: &str = "Base your summary strictly on the content of the provided document. If something is unclear or not covered in the document, say so rather than speculating.";

/// Erros de seleção de estilo
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    /// Nome que não corresponde a nenhum estilo
    #[error("Unknown prompt style '{name}' (available: {available})")]
    UnknownStyle {
        /// Nome recebido
        name: String,
        /// Estilos aceitos, separados por vírgula
        available: String,
    },
}

/// Estilo de resumo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PromptStyle {
    /// Resumo geral, fiel e conciso
    #[default]
    Default,
    /// Sem jargão, para o público geral
    Simple,
    /// Detalhe técnico completo
    InDepth,
    /// Nível de pesquisa, para especialistas
    Expert,
}

impl PromptStyle {
    /// Todos os estilos, na ordem do menu
    pub const ALL: [PromptStyle; 4] = [
        PromptStyle::Default,
        PromptStyle::Simple,
        PromptStyle::InDepth,
        PromptStyle::Expert,
    ];

    /// Nome usado na CLI e no .env
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Simple => "simple",
            Self::InDepth => "in_depth",
            Self::Expert => "expert",
        }
    }

    /// Descrição curta para o menu interativo
    pub fn description(&self) -> &'static str {
        match self {
            Self::Default => "Faithful, concise summary of the main points",
            Self::Simple => "Plain language, no jargon, five-minute read",
            Self::InDepth => "Full technical detail: methods, results and why they matter",
            Self::Expert => "Research-grade: limitations, implementation details, related work",
        }
    }

    /// Instrução de sistema do estilo
    pub fn instruction(&self) -> String {
        let persona = match self {
            Self::Default => "You are a careful analyst who writes faithful, well-organized summaries. Summarize this document, covering its purpose, main points and conclusions in clear prose. The goal is for the reader to grasp the essentials of the document quickly.",
            Self::Simple => "You are a science communicator who explains complex research to general audiences. Summarize this document using no jargon, simple analogies, and plain language. The goal is for the reader to understand what the document covers and why it matters in less than five minutes.",
            Self::InDepth => "You are a technical writer who explains research clearly without sacrificing accuracy. Summarize this document with full technical detail, explaining why each concept, method, and result matters. The goal is for the reader to fully understand the paper's contributions, methods, and results.",
            Self::Expert => "You are a research scientist summarizing a paper for a knowledgeable peer. Provide a research-grade summary including limitations, implementation details, comparisons to related work, and mathematical or architectural specifics. The goal is to give the reader a deep enough understanding to consider implementing or reproducing ideas from the paper.",
        };
        format!("{} {}", persona, GROUNDING_RULE)
    }

    fn available() -> String {
        Self::ALL
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for PromptStyle {
    type Err = PromptError;

    /// Case-insensitive; aceita `-` ou `_` em "in_depth"
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|style| style.name() == normalized)
            .ok_or_else(|| PromptError::UnknownStyle {
                name: value.to_string(),
                available: Self::available(),
            })
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Configuração completa de uma chamada de resumo.
///
/// O modelo é validado contra a tabela de preços na construção, antes
/// de qualquer gasto.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSpec {
    /// Estilo escolhido
    pub style: PromptStyle,
    /// Instrução de sistema da fase map
    pub system_instruction: String,
    /// Temperatura
    pub temperature: f32,
    /// Modelo (já validado)
    pub model: String,
    /// Máximo de tokens de saída por chamada
    pub max_output_tokens: u32,
}

impl PromptSpec {
    /// Cria a configuração para um estilo e modelo
    ///
    /// # Erros
    /// [`PricingError::UnknownModel`] se o modelo não tem preço
    pub fn new(
        style: PromptStyle,
        model: impl Into<String>,
        pricing: &PricingTable,
    ) -> Result<Self, PricingError> {
        let model = model.into();
        pricing.ensure_known(&model)?;

        Ok(Self {
            style,
            system_instruction: style.instruction(),
            temperature: DEFAULT_TEMPERATURE,
            model,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        })
    }

    /// Define a temperatura
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Define o máximo de tokens de saída
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Instrução da fase de redução
    pub fn reduce_instruction(&self) -> String {
        format!("{} {}", self.system_instruction, REDUCE_DIRECTIVE)
    }

    /// Requisição para resumir um trecho (ou o documento inteiro)
    pub fn map_request(&self, content: &str) -> CompletionRequest {
        self.request(self.system_instruction.clone(), content)
    }

    /// Requisição para combinar os resumos parciais
    pub fn reduce_request(&self, summaries: &str) -> CompletionRequest {
        self.request(self.reduce_instruction(), summaries)
    }

    fn request(&self, system: String, prompt: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            system,
            prompt: prompt.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_output_tokens,
        }
    }
}

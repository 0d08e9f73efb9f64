// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PRICING - Tabela de preços e cálculo de custo
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Preços em USD por milhão de tokens, por modelo.
// Carregada uma vez no início do processo e somente leitura durante o run.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::llm::CompletionResult;

/// Tokens por unidade de preço
pub const TOKENS_PER_PRICE_UNIT: f64 = 1_000_000.0;

/// Erros da tabela de preços
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    /// Modelo ausente da tabela: nenhuma chamada deve ser feita
    #[error("Unknown model: '{model}' (known: {known})")]
    UnknownModel {
        /// Modelo solicitado
        model: String,
        /// Modelos conhecidos, separados por vírgula
        known: String,
    },

    /// Preço negativo ou não finito
    #[error("Invalid price for model '{model}': {reason}")]
    InvalidPrice {
        /// Modelo com preço inválido
        model: String,
        /// Motivo
        reason: String,
    },

    /// Arquivo de preços ilegível
    #[error("Failed to load pricing file {path}: {reason}")]
    LoadError {
        /// Caminho do arquivo
        path: String,
        /// Motivo
        reason: String,
    },
}

/// Preço de um modelo (USD por milhão de tokens)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    /// Preço de entrada
    pub input: f64,
    /// Preço de saída
    pub output: f64,
}

impl ModelPrice {
    /// Cria um preço
    pub fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }

    /// Custo de uma resposta. Linear nas contagens de tokens.
    pub fn cost(&self, result: &CompletionResult) -> Cost {
        Cost {
            input: result.usage.input_tokens as f64 / TOKENS_PER_PRICE_UNIT * self.input,
            output: result.usage.output_tokens as f64 / TOKENS_PER_PRICE_UNIT * self.output,
        }
    }

    fn validate(&self, model: &str) -> Result<(), PricingError> {
        for (label, value) in [("input", self.input), ("output", self.output)] {
            if !value.is_finite() || value < 0.0 {
                return Err(PricingError::InvalidPrice {
                    model: model.to_string(),
                    reason: format!("{} price must be a non-negative number, got {}", label, value),
                });
            }
        }
        Ok(())
    }
}

/// Custo de uma ou mais chamadas
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cost {
    /// Custo de entrada (USD)
    pub input: f64,
    /// Custo de saída (USD)
    pub output: f64,
}

impl Cost {
    /// Custo total
    pub fn total(&self) -> f64 {
        self.input + self.output
    }
}

impl std::ops::Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost {
            input: self.input + rhs.input,
            output: self.output + rhs.output,
        }
    }
}

/// Tabela modelo → preço
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    prices: HashMap<String, ModelPrice>,
}

impl PricingTable {
    /// Tabela vazia
    pub fn new() -> Self {
        Self::default()
    }

    /// Tabela com os preços embutidos
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.prices.insert("claude-haiku-4-5".into(), ModelPrice::new(1.00, 5.00));
        table.prices.insert("claude-sonnet-4-5".into(), ModelPrice::new(3.00, 15.00));
        table.prices.insert("claude-opus-4-5".into(), ModelPrice::new(5.00, 25.00));
        table
    }

    /// Carrega de JSON: `{"modelo": {"input": 1.0, "output": 5.0}}`
    pub fn from_json(json: &str) -> Result<Self, PricingError> {
        let prices: HashMap<String, ModelPrice> =
            serde_json::from_str(json).map_err(|e| PricingError::LoadError {
                path: "<inline>".into(),
                reason: e.to_string(),
            })?;

        for (model, price) in &prices {
            price.validate(model)?;
        }

        Ok(Self { prices })
    }

    /// Carrega de um arquivo JSON
    pub fn from_file(path: &Path) -> Result<Self, PricingError> {
        let content = std::fs::read_to_string(path).map_err(|e| PricingError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let table = Self::from_json(&content).map_err(|e| match e {
            PricingError::LoadError { reason, .. } => PricingError::LoadError {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })?;

        log::info!(
            "💲 Tabela de preços carregada de {} ({} modelos)",
            path.display(),
            table.len()
        );
        Ok(table)
    }

    /// Insere ou substitui o preço de um modelo
    pub fn insert(&mut self, model: impl Into<String>, price: ModelPrice) -> Result<(), PricingError> {
        let model = model.into();
        price.validate(&model)?;
        self.prices.insert(model, price);
        Ok(())
    }

    /// Preço de um modelo, se conhecido
    pub fn get(&self, model: &str) -> Option<ModelPrice> {
        self.prices.get(model).copied()
    }

    /// Garante que o modelo tem preço. Chamar antes de qualquer chamada remota.
    pub fn ensure_known(&self, model: &str) -> Result<ModelPrice, PricingError> {
        self.get(model).ok_or_else(|| PricingError::UnknownModel {
            model: model.to_string(),
            known: self.models().join(", "),
        })
    }

    /// Custo (entrada, saída) de uma resposta para o modelo dado
    pub fn cost(&self, result: &CompletionResult, model: &str) -> Result<Cost, PricingError> {
        self.ensure_known(model).map(|price| price.cost(result))
    }

    /// Modelos conhecidos, ordenados
    pub fn models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.prices.keys().cloned().collect();
        models.sort();
        models
    }

    /// Número de modelos
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Retorna true se a tabela está vazia
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::TokenUsage;

    fn result(input_tokens: u64, output_tokens: u64) -> CompletionResult {
        CompletionResult {
            text: "x".into(),
            usage: TokenUsage {
                input_tokens,
                output_tokens,
            },
        }
    }

    #[test]
    fn test_cost_per_million() {
        let table = PricingTable::from_json(r#"{"m": {"input": 1.0, "output": 5.0}}"#).unwrap();
        let cost = table.cost(&result(1_000_000, 2_000_000), "m").unwrap();

        assert_eq!(cost.input, 1.0);
        assert_eq!(cost.output, 10.0);
        assert_eq!(cost.total(), 11.0);
    }

    #[test]
    fn test_cost_is_linear() {
        let table = PricingTable::with_defaults();
        let single = table.cost(&result(1_000, 300), "claude-sonnet-4-5").unwrap();
        let triple = table.cost(&result(3_000, 900), "claude-sonnet-4-5").unwrap();

        assert!((triple.input - 3.0 * single.input).abs() < 1e-12);
        assert!((triple.output - 3.0 * single.output).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_model() {
        let table = PricingTable::with_defaults();
        let err = table.cost(&result(10, 10), "gpt-4").unwrap_err();

        assert!(matches!(err, PricingError::UnknownModel { ref model, .. } if model == "gpt-4"));
        assert!(table.ensure_known("claude-haiku-4-5").is_ok());
    }

    #[test]
    fn test_defaults() {
        let table = PricingTable::with_defaults();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("claude-opus-4-5"), Some(ModelPrice::new(5.0, 25.0)));
        assert_eq!(
            table.models(),
            vec!["claude-haiku-4-5", "claude-opus-4-5", "claude-sonnet-4-5"]
        );
    }

    #[test]
    fn test_rejects_negative_price() {
        let err = PricingTable::from_json(r#"{"m": {"input": -1.0, "output": 5.0}}"#).unwrap_err();
        assert!(matches!(err, PricingError::InvalidPrice { .. }));

        let mut table = PricingTable::new();
        assert!(table.insert("m", ModelPrice::new(1.0, f64::NAN)).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.json");
        std::fs::write(&path, r#"{"custom": {"input": 2.0, "output": 4.0}}"#).unwrap();

        let table = PricingTable::from_file(&path).unwrap();
        assert_eq!(table.get("custom"), Some(ModelPrice::new(2.0, 4.0)));

        std::fs::write(&path, "not json").unwrap();
        let err = PricingTable::from_file(&path).unwrap_err();
        assert!(matches!(err, PricingError::LoadError { ref path, .. } if path.ends_with("prices.json")));
    }
}

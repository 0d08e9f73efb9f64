// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// COST LEDGER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Acumula custo e tokens de um único run do pipeline.
// Suporta:
// - Totais de entrada/saída (somente crescem)
// - Histórico por chamada, marcado com a fase
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::fmt;

use crate::llm::CompletionResult;
use crate::pricing::Cost;

/// Fase do pipeline em que uma chamada foi feita
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    /// Documento inteiro em uma chamada
    Single,
    /// Resumo de um chunk (índice a partir de 0)
    Map {
        /// Índice do chunk
        index: usize,
    },
    /// Combinação final dos resumos parciais
    Reduce,
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallPhase::Single => write!(f, "single"),
            CallPhase::Map { index } => write!(f, "chunk {}", index + 1),
            CallPhase::Reduce => write!(f, "reduce"),
        }
    }
}

/// Custo de uma chamada registrada
#[derive(Debug, Clone)]
pub struct CallCost {
    /// Fase da chamada
    pub phase: CallPhase,
    /// Tokens de entrada cobrados
    pub input_tokens: u64,
    /// Tokens de saída cobrados
    pub output_tokens: u64,
    /// Custo da chamada
    pub cost: Cost,
}

/// Ledger de custos de um run
#[derive(Debug, Clone, Default)]
pub struct CostLedger {
    /// Custo acumulado (entrada e saída)
    cost: Cost,

    /// Tokens de entrada acumulados
    input_tokens: u64,

    /// Tokens de saída acumulados
    output_tokens: u64,

    /// Histórico por chamada
    history: Vec<CallCost>,
}

impl CostLedger {
    /// Cria um ledger vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra uma chamada bem-sucedida
    pub fn record(&mut self, phase: CallPhase, result: &CompletionResult, cost: Cost) {
        self.cost = self.cost + cost;
        self.input_tokens += result.usage.input_tokens;
        self.output_tokens += result.usage.output_tokens;

        self.history.push(CallCost {
            phase,
            input_tokens: result.usage.input_tokens,
            output_tokens: result.usage.output_tokens,
            cost,
        });

        log::debug!(
            "💲 {}: {} + {} tokens = ${:.6} (total: ${:.6})",
            phase,
            result.usage.input_tokens,
            result.usage.output_tokens,
            cost.total(),
            self.total_cost()
        );
    }

    /// Custo de entrada acumulado
    pub fn input_cost(&self) -> f64 {
        self.cost.input
    }

    /// Custo de saída acumulado
    pub fn output_cost(&self) -> f64 {
        self.cost.output
    }

    /// Custo total acumulado
    pub fn total_cost(&self) -> f64 {
        self.cost.total()
    }

    /// Custos acumulados como `Cost`
    pub fn breakdown(&self) -> Cost {
        self.cost
    }

    /// Tokens de entrada acumulados
    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    /// Tokens de saída acumulados
    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    /// Tokens totais
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Chamadas registradas, em ordem
    pub fn calls(&self) -> &[CallCost] {
        &self.history
    }

    /// Retorna true se nenhuma chamada foi cobrada
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ESTADOS TERMINAIS DO PIPELINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::llm::LlmError;
use crate::utils::{CallPhase, CostLedger};

/// Resultado de um run do pipeline.
///
/// Todo estado carrega o ledger: custo acumulado nunca é descartado.
/// Pattern matching exaustivo força o chamador a tratar cada caso.
#[derive(Debug, Clone)]
pub enum SummaryOutcome {
    /// Resumo final pronto
    ///
    /// Custo = fase map + redução (ou a chamada única).
    Done {
        /// Resumo final
        summary: String,
        /// Número de chunks processados
        chunk_count: usize,
        /// Custo total do run
        ledger: CostLedger,
    },

    /// Um chunk falhou depois de pelo menos um sucesso
    ///
    /// Expõe os resumos dos chunks [0, failed_chunk), sem redução.
    PartialResult {
        /// Resumos parciais concatenados (separados por linha em branco)
        summaries: String,
        /// Índice (0-based) do chunk que falhou
        failed_chunk: usize,
        /// Total de chunks do documento
        chunk_count: usize,
        /// Erro que interrompeu o run
        error: LlmError,
        /// Custo até a falha
        ledger: CostLedger,
    },

    /// Todos os chunks ok, mas a redução falhou
    ///
    /// Expõe os resumos nunca combinados e apenas o custo da fase map.
    ReduceFailed {
        /// Resumos de todos os chunks, concatenados
        summaries: String,
        /// Total de chunks
        chunk_count: usize,
        /// Erro da redução
        error: LlmError,
        /// Custo da fase map
        ledger: CostLedger,
    },

    /// Nada foi produzido
    ///
    /// Falha na chamada única ou no primeiro chunk. Custo zero.
    Aborted {
        /// Onde a falha ocorreu
        failed_at: CallPhase,
        /// Erro que abortou o run
        error: LlmError,
        /// Ledger (vazio)
        ledger: CostLedger,
    },
}

impl SummaryOutcome {
    /// Retorna true se o resumo final foi produzido
    pub fn is_complete(&self) -> bool {
        matches!(self, SummaryOutcome::Done { .. })
    }

    /// Retorna true se há algum texto utilizável (final ou parcial)
    pub fn has_output(&self) -> bool {
        self.best_text().is_some()
    }

    /// Melhor texto disponível: resumo final ou resumos parciais
    pub fn best_text(&self) -> Option<&str> {
        match self {
            SummaryOutcome::Done { summary, .. } => Some(summary),
            SummaryOutcome::PartialResult { summaries, .. }
            | SummaryOutcome::ReduceFailed { summaries, .. } => Some(summaries),
            SummaryOutcome::Aborted { .. } => None,
        }
    }

    /// Ledger do run
    pub fn ledger(&self) -> &CostLedger {
        match self {
            SummaryOutcome::Done { ledger, .. }
            | SummaryOutcome::PartialResult { ledger, .. }
            | SummaryOutcome::ReduceFailed { ledger, .. }
            | SummaryOutcome::Aborted { ledger, .. } => ledger,
        }
    }

    /// Erro que encerrou o run, se houve
    pub fn error(&self) -> Option<&LlmError> {
        match self {
            SummaryOutcome::Done { .. } => None,
            SummaryOutcome::PartialResult { error, .. }
            | SummaryOutcome::ReduceFailed { error, .. }
            | SummaryOutcome::Aborted { error, .. } => Some(error),
        }
    }

    /// Fase em que o run falhou
    pub fn failed_phase(&self) -> Option<CallPhase> {
        match self {
            SummaryOutcome::Done { .. } => None,
            SummaryOutcome::PartialResult { failed_chunk, .. } => {
                Some(CallPhase::Map { index: *failed_chunk })
            }
            SummaryOutcome::ReduceFailed { .. } => Some(CallPhase::Reduce),
            SummaryOutcome::Aborted { failed_at, .. } => Some(*failed_at),
        }
    }

    /// Nome curto do estado, para logs
    pub fn name(&self) -> &'static str {
        match self {
            SummaryOutcome::Done { .. } => "done",
            SummaryOutcome::PartialResult { .. } => "partial_result",
            SummaryOutcome::ReduceFailed { .. } => "reduce_failed",
            SummaryOutcome::Aborted { .. } => "aborted",
        }
    }

    /// Descrição da falha para o usuário
    pub fn failure_description(&self) -> Option<String> {
        match self {
            SummaryOutcome::Done { .. } => None,
            SummaryOutcome::PartialResult {
                failed_chunk,
                chunk_count,
                error,
                ..
            } => Some(format!(
                "Failed on chunk {}/{} ({}). Showing summaries of {} completed chunks.",
                failed_chunk + 1,
                chunk_count,
                error,
                failed_chunk
            )),
            SummaryOutcome::ReduceFailed { error, .. } => Some(format!(
                "Failed to combine summaries ({}). Showing successful chunk summaries.",
                error
            )),
            SummaryOutcome::Aborted {
                failed_at, error, ..
            } => Some(match failed_at {
                CallPhase::Map { index } => {
                    format!("Failed on chunk {} ({}). No chunks summarised.", index + 1, error)
                }
                _ => format!("Failed to summarize: {}", error),
            }),
        }
    }
}

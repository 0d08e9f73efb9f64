// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PIPELINE DE RESUMO (MAP-REDUCE)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Start ──► 1 chunk  ──► chamada única ──► Done | Aborted
//       └─► N chunks ──► map (sequencial, pausa entre chamadas)
//                         ├─ falha no chunk 0   ──► Aborted
//                         ├─ falha no chunk i>0 ──► PartialResult
//                         └─ todos ok ──► reduce ──► Done | ReduceFailed
//
// Chamadas estritamente sequenciais: custo determinístico e respeito ao
// rate limit do endpoint.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod state;

pub use state::SummaryOutcome;

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use crate::llm::CompletionClient;
use crate::pricing::{ModelPrice, PricingError, PricingTable};
use crate::prompts::PromptSpec;
use crate::utils::segment::{chunk_document, ChunkResult, DEFAULT_CHUNK_TOKENS};
use crate::utils::{CallPhase, CostLedger};

/// Separador entre resumos parciais (linha em branco)
pub const SUMMARY_SEPARATOR: &str = "\n\n";

/// Pausa padrão entre chamadas da fase map
pub const DEFAULT_CALL_PAUSE: Duration = Duration::from_secs(60);

/// Erros que impedem o run de começar. Nenhuma chamada remota foi feita.
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    /// Modelo sem preço na tabela
    #[error(transparent)]
    UnknownModel(#[from] PricingError),

    /// Documento sem nenhum caractere
    #[error("Document is empty: nothing to summarize")]
    EmptyDocument,
}

/// Configuração do pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Tamanho alvo de chunk em tokens
    pub chunk_tokens: NonZeroUsize,
    /// Pausa após cada chamada bem-sucedida da fase map
    pub call_pause: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_tokens: NonZeroUsize::new(DEFAULT_CHUNK_TOKENS).unwrap_or(NonZeroUsize::MIN),
            call_pause: DEFAULT_CALL_PAUSE,
        }
    }
}

/// Orquestra chunking, chamadas ao LLM e contabilidade de custo.
///
/// # Exemplo
/// ```rust,ignore
/// let summarizer = Summarizer::new(client, Arc::new(PricingTable::with_defaults()), PipelineConfig::default());
/// let spec = PromptSpec::new(PromptStyle::Simple, "claude-haiku-4-5", &pricing)?;
///
/// match summarizer.run(&document, &spec).await? {
///     SummaryOutcome::Done { summary, ledger, .. } => println!("{} (${:.6})", summary, ledger.total_cost()),
///     other => eprintln!("{}", other.failure_description().unwrap_or_default()),
/// }
/// ```
pub struct Summarizer {
    client: CompletionClient,
    pricing: Arc<PricingTable>,
    config: PipelineConfig,
}

impl Summarizer {
    /// Cria o pipeline com cliente, tabela de preços e configuração
    pub fn new(client: CompletionClient, pricing: Arc<PricingTable>, config: PipelineConfig) -> Self {
        Self {
            client,
            pricing,
            config,
        }
    }

    /// Chunks que o run produziria para este documento
    pub fn chunk(&self, document: &str) -> ChunkResult {
        chunk_document(document, self.config.chunk_tokens)
    }

    /// Executa um run completo.
    ///
    /// # Erros
    /// Apenas condições detectadas antes de qualquer gasto:
    /// - [`SummarizeError::UnknownModel`]
    /// - [`SummarizeError::EmptyDocument`]
    ///
    /// Falhas remotas viram estados terminais de [`SummaryOutcome`].
    pub async fn run(&self, document: &str, spec: &PromptSpec) -> Result<SummaryOutcome, SummarizeError> {
        let price = self.pricing.ensure_known(&spec.model)?;
        let chunks = self.chunk(document);

        log::info!(
            "📚 Documento: {} caracteres, {} chunk(s), estilo={}, modelo={}",
            document.chars().count(),
            chunks.len(),
            spec.style,
            spec.model
        );

        let outcome = match chunks.len() {
            0 => return Err(SummarizeError::EmptyDocument),
            1 => self.run_single(document, spec, price).await,
            _ => self.run_map_reduce(&chunks, spec, price).await,
        };

        log::info!(
            "🏁 Run finalizado: {} | custo total ${:.6}",
            outcome.name(),
            outcome.ledger().total_cost()
        );

        Ok(outcome)
    }

    async fn run_single(&self, document: &str, spec: &PromptSpec, price: ModelPrice) -> SummaryOutcome {
        let mut ledger = CostLedger::new();
        log::info!("📝 Resumindo documento...");

        match self.client.complete(&spec.map_request(document)).await {
            Ok(result) => {
                ledger.record(CallPhase::Single, &result, price.cost(&result));
                SummaryOutcome::Done {
                    summary: result.text,
                    chunk_count: 1,
                    ledger,
                }
            }
            Err(error) => {
                log::error!("❌ Falha ao resumir: {}", error);
                SummaryOutcome::Aborted {
                    failed_at: CallPhase::Single,
                    error,
                    ledger,
                }
            }
        }
    }

    async fn run_map_reduce(&self, chunks: &ChunkResult, spec: &PromptSpec, price: ModelPrice) -> SummaryOutcome {
        let chunk_count = chunks.len();
        let mut ledger = CostLedger::new();
        let mut summaries: Vec<String> = Vec::with_capacity(chunk_count);

        // Fase map
        for (index, chunk) in chunks.iter().enumerate() {
            log::info!("📝 Resumindo chunk {}/{}...", index + 1, chunk_count);

            match self.client.complete(&spec.map_request(&chunk.text)).await {
                Ok(result) => {
                    ledger.record(CallPhase::Map { index }, &result, price.cost(&result));
                    summaries.push(result.text);
                    self.pause().await;
                }
                Err(error) => {
                    log::warn!("❌ Falha no chunk {}/{}: {}", index + 1, chunk_count, error);

                    if index == 0 {
                        return SummaryOutcome::Aborted {
                            failed_at: CallPhase::Map { index },
                            error,
                            ledger,
                        };
                    }

                    return SummaryOutcome::PartialResult {
                        summaries: summaries.join(SUMMARY_SEPARATOR),
                        failed_chunk: index,
                        chunk_count,
                        error,
                        ledger,
                    };
                }
            }
        }

        // Fase reduce
        let buffer = summaries.join(SUMMARY_SEPARATOR);
        log::info!("🧩 Gerando resumo final a partir de {} resumos...", chunk_count);

        match self.client.complete(&spec.reduce_request(&buffer)).await {
            Ok(result) => {
                ledger.record(CallPhase::Reduce, &result, price.cost(&result));
                SummaryOutcome::Done {
                    summary: result.text,
                    chunk_count,
                    ledger,
                }
            }
            Err(error) => {
                log::warn!("❌ Falha ao combinar resumos: {}", error);
                SummaryOutcome::ReduceFailed {
                    summaries: buffer,
                    chunk_count,
                    error,
                    ledger,
                }
            }
        }
    }

    async fn pause(&self) {
        if !self.config.call_pause.is_zero() {
            log::debug!("⏸️ Pausa de {:?} (rate limit)", self.config.call_pause);
            tokio::time::sleep(self.config.call_pause).await;
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Attempt, CompletionResult, LlmError, RetryPolicy, ScriptedBackend};
    use crate::prompts::{PromptStyle, REDUCE_DIRECTIVE};

    const PRICE_IN: f64 = 1.0;
    const PRICE_OUT: f64 = 5.0;

    fn pricing() -> Arc<PricingTable> {
        Arc::new(PricingTable::from_json(r#"{"m": {"input": 1.0, "output": 5.0}}"#).unwrap())
    }

    fn spec() -> PromptSpec {
        PromptSpec::new(PromptStyle::Simple, "m", &pricing()).unwrap()
    }

    fn ok(text: &str, input: u64, output: u64) -> Attempt {
        Attempt::Success(CompletionResult::new(text, input, output))
    }

    fn failed() -> Attempt {
        Attempt::Failed("HTTP 500".into())
    }

    /// chunk de 10 tokens = 40 caracteres
    fn summarizer(backend: Arc<ScriptedBackend>) -> Summarizer {
        let client = CompletionClient::new(backend).with_policy(RetryPolicy::immediate(3));
        Summarizer::new(
            client,
            pricing(),
            PipelineConfig {
                chunk_tokens: NonZeroUsize::new(10).unwrap(),
                call_pause: Duration::ZERO,
            },
        )
    }

    /// Três parágrafos de ~30 caracteres → 3 chunks
    fn three_chunk_document() -> String {
        ["a".repeat(30), "b".repeat(30), "c".repeat(30)].join("\n\n")
    }

    fn cost(input: u64, output: u64) -> f64 {
        input as f64 / 1e6 * PRICE_IN + output as f64 / 1e6 * PRICE_OUT
    }

    #[tokio::test]
    async fn test_single_chunk_done() {
        let backend = Arc::new(ScriptedBackend::new(vec![ok("X", 10, 20)]));
        let summarizer = summarizer(backend.clone());
        let document = "d".repeat(30);

        let outcome = summarizer.run(&document, &spec()).await.unwrap();

        match &outcome {
            SummaryOutcome::Done { summary, chunk_count, ledger } => {
                assert_eq!(summary, "X");
                assert_eq!(*chunk_count, 1);
                assert_eq!(ledger.input_cost(), 10.0 / 1e6 * PRICE_IN);
                assert_eq!(ledger.output_cost(), 20.0 / 1e6 * PRICE_OUT);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, document);
        assert_eq!(requests[0].system, PromptStyle::Simple.instruction());
    }

    #[tokio::test]
    async fn test_single_chunk_failure_aborts_with_zero_cost() {
        let backend = Arc::new(ScriptedBackend::new(vec![failed()]));
        let outcome = summarizer(backend).run("short", &spec()).await.unwrap();

        match outcome {
            SummaryOutcome::Aborted { failed_at, ledger, .. } => {
                assert_eq!(failed_at, CallPhase::Single);
                assert_eq!(ledger.total_cost(), 0.0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_map_reduce_done() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ok("s0", 100, 10),
            ok("s1", 100, 10),
            ok("s2", 100, 10),
            ok("final", 50, 40),
        ]));
        let summarizer = summarizer(backend.clone());

        let outcome = summarizer.run(&three_chunk_document(), &spec()).await.unwrap();

        match &outcome {
            SummaryOutcome::Done { summary, chunk_count, ledger } => {
                assert_eq!(summary, "final");
                assert_eq!(*chunk_count, 3);
                assert!((ledger.total_cost() - (3.0 * cost(100, 10) + cost(50, 40))).abs() < 1e-12);
                assert_eq!(ledger.calls().len(), 4);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let requests = backend.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0].prompt, "a".repeat(30));
        assert_eq!(requests[3].prompt, "s0\n\ns1\n\ns2");
        assert!(requests[3].system.ends_with(REDUCE_DIRECTIVE));
    }

    #[tokio::test]
    async fn test_partial_result_on_second_chunk_failure() {
        let backend = Arc::new(ScriptedBackend::new(vec![ok("s0", 100, 10), failed()]));
        let outcome = summarizer(backend.clone())
            .run(&three_chunk_document(), &spec())
            .await
            .unwrap();

        match outcome {
            SummaryOutcome::PartialResult {
                summaries,
                failed_chunk,
                chunk_count,
                error,
                ledger,
            } => {
                assert_eq!(summaries, "s0");
                assert_eq!(failed_chunk, 1);
                assert_eq!(chunk_count, 3);
                assert_eq!(error, LlmError::RequestFailed("HTTP 500".into()));
                assert!((ledger.total_cost() - cost(100, 10)).abs() < 1e-12);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // Nenhuma chamada de redução depois da falha
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_first_chunk_failure_aborts() {
        let backend = Arc::new(ScriptedBackend::new(vec![failed()]));
        let outcome = summarizer(backend.clone())
            .run(&three_chunk_document(), &spec())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SummaryOutcome::Aborted { failed_at: CallPhase::Map { index: 0 }, ref ledger, .. } if ledger.is_empty()
        ));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_reduce_failure_keeps_map_output_and_cost() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ok("s0", 100, 10),
            ok("s1", 200, 20),
            ok("s2", 300, 30),
            failed(),
        ]));
        let outcome = summarizer(backend).run(&three_chunk_document(), &spec()).await.unwrap();

        match outcome {
            SummaryOutcome::ReduceFailed { summaries, chunk_count, ledger, .. } => {
                assert_eq!(summaries, "s0\n\ns1\n\ns2");
                assert_eq!(chunk_count, 3);
                let expected = cost(100, 10) + cost(200, 20) + cost(300, 30);
                assert!((ledger.total_cost() - expected).abs() < 1e-12);
                assert!(ledger.calls().iter().all(|c| c.phase != CallPhase::Reduce));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limited_chunk_is_retried_inside_run() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Attempt::RateLimited("429".into()),
            ok("X", 1, 1),
        ]));
        let outcome = summarizer(backend.clone()).run("short", &spec()).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_model_makes_no_calls() {
        let backend = Arc::new(ScriptedBackend::new(vec![ok("X", 1, 1)]));
        let mut spec = spec();
        spec.model = "not-priced".into();

        let err = summarizer(backend.clone()).run("short", &spec).await.unwrap_err();

        assert!(matches!(err, SummarizeError::UnknownModel(_)));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_document_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let err = summarizer(backend.clone()).run("", &spec()).await.unwrap_err();

        assert!(matches!(err, SummarizeError::EmptyDocument));
        assert_eq!(backend.calls(), 0);
    }

    // ━━━ Tempo (relógio pausado do tokio: sleeps avançam instantaneamente) ━━━

    const MINUTE: Duration = Duration::from_secs(60);

    fn timed_summarizer(backend: Arc<ScriptedBackend>, pause: Duration, backoff: Duration) -> Summarizer {
        let client = CompletionClient::new(backend).with_policy(RetryPolicy {
            max_attempts: 3,
            backoff,
        });
        Summarizer::new(
            client,
            pricing(),
            PipelineConfig {
                chunk_tokens: NonZeroUsize::new(10).unwrap(),
                call_pause: pause,
            },
        )
    }

    fn two_chunk_document() -> String {
        ["a".repeat(30), "b".repeat(30)].join("\n\n")
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_after_each_map_call_and_backoff_on_rate_limit() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ok("s0", 10, 1),
            Attempt::RateLimited("429".into()),
            ok("s1", 10, 1),
            ok("final", 5, 5),
        ]));
        let summarizer = timed_summarizer(backend.clone(), MINUTE, MINUTE);

        let start = tokio::time::Instant::now();
        let outcome = summarizer.run(&two_chunk_document(), &spec()).await.unwrap();

        // pausa (s0) + backoff (429) + pausa (s1); o reduce não pausa
        assert_eq!(start.elapsed(), 3 * MINUTE);
        assert!(outcome.is_complete());
        assert_eq!(backend.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_chunk_does_not_pause() {
        let backend = Arc::new(ScriptedBackend::new(vec![ok("X", 1, 1)]));
        let summarizer = timed_summarizer(backend, MINUTE, MINUTE);

        let start = tokio::time::Instant::now();
        let outcome = summarizer.run("short", &spec()).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(outcome.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_chunk_stops_without_pausing() {
        let backend = Arc::new(ScriptedBackend::new(vec![ok("s0", 10, 1), failed()]));
        let summarizer = timed_summarizer(backend.clone(), MINUTE, MINUTE);

        let start = tokio::time::Instant::now();
        let outcome = summarizer.run(&two_chunk_document(), &spec()).await.unwrap();

        // só a pausa depois do chunk 0
        assert_eq!(start.elapsed(), MINUTE);
        assert!(matches!(outcome, SummaryOutcome::PartialResult { failed_chunk: 1, .. }));
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.chunk_tokens.get(), DEFAULT_CHUNK_TOKENS);
        assert_eq!(config.call_pause, Duration::from_secs(60));
    }
}

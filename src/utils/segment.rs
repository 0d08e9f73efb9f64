// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SEGMENT - Chunking de Documentos
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Divide um documento em chunks limitados por um budget aproximado de tokens.
//
// Preferência de quebra (busca para trás a partir do ponto aproximado):
// 1. Parágrafo (\n\n)
// 2. Linha (\n)
// 3. Espaço em branco
// 4. Corte seco no ponto aproximado
//
// O separador encontrado é consumido; o corte seco não perde nenhum caractere.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::num::NonZeroUsize;

/// Aproximação local: 1 token ≈ 4 caracteres
pub const CHARS_PER_TOKEN: usize = 4;

/// Tamanho padrão de chunk em tokens
pub const DEFAULT_CHUNK_TOKENS: usize = 40_000;

/// Tipo de quebra usada para fechar um chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    /// Quebra de parágrafo (\n\n)
    Paragraph,
    /// Quebra de linha (\n)
    Line,
    /// Qualquer espaço em branco
    Whitespace,
    /// Nenhum separador na janela: corte no ponto aproximado
    HardCut,
    /// Último chunk (resto do documento)
    Tail,
}

/// Fatia contígua do documento
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Texto do chunk
    pub text: String,
    /// Offset inicial (bytes) no documento original
    pub start: usize,
    /// Offset final exclusivo (bytes)
    pub end: usize,
    /// Separador consumido logo após o chunk, se houve um
    pub separator: Option<char>,
    /// Como o chunk foi fechado
    pub break_kind: BreakKind,
}

impl Chunk {
    /// Número de caracteres do chunk
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Resultado do chunking de um documento
#[derive(Debug, Clone, Default)]
pub struct ChunkResult {
    /// Chunks em ordem de documento
    pub chunks: Vec<Chunk>,
}

impl ChunkResult {
    /// Retorna true se não há chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Retorna o número de chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Itera sobre os chunks
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    /// Reconstrói o documento reinserindo os separadores consumidos
    pub fn reassemble(&self) -> String {
        let mut out = String::new();
        for chunk in &self.chunks {
            out.push_str(&chunk.text);
            if let Some(sep) = chunk.separator {
                out.push(sep);
            }
        }
        out
    }
}

/// Estimativa de tokens: ceil(caracteres / 4)
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Divide um documento em chunks de até `target_tokens * 4` caracteres.
///
/// # Argumentos
/// * `document` - Texto completo
/// * `target_tokens` - Tamanho alvo em tokens (nunca zero)
///
/// # Retorna
/// `ChunkResult` com os chunks em ordem. Documento vazio → nenhum chunk.
///
/// # Exemplo
/// ```rust
/// use std::num::NonZeroUsize;
/// use doc_summarizer::utils::segment::chunk_document;
///
/// let text = "Primeiro parágrafo.\n\nSegundo parágrafo.";
/// let result = chunk_document(text, NonZeroUsize::new(5).unwrap());
///
/// assert_eq!(result.len(), 2);
/// assert_eq!(result.reassemble(), text);
/// ```
pub fn chunk_document(document: &str, target_tokens: NonZeroUsize) -> ChunkResult {
    let budget = target_tokens.get().saturating_mul(CHARS_PER_TOKEN);
    let mut chunks = Vec::new();
    let mut current = 0usize;

    while current < document.len() {
        let rest = &document[current..];

        // Ponto aproximado: `budget` caracteres à frente (sempre em fronteira de char)
        let split = match rest.char_indices().nth(budget) {
            Some((offset, _)) => current + offset,
            None => {
                chunks.push(Chunk {
                    text: rest.to_string(),
                    start: current,
                    end: document.len(),
                    separator: None,
                    break_kind: BreakKind::Tail,
                });
                break;
            }
        };

        // Separador exatamente em `current` geraria chunk vazio: janela começa no próximo char
        let first_len = rest.chars().next().map(char::len_utf8).unwrap_or(1);
        let window_start = current + first_len;
        let window = &document[window_start..split];

        let (clean_split, separator, kind) = find_clean_split(window)
            .map(|(offset, sep, kind)| (window_start + offset, Some(sep), kind))
            .unwrap_or((split, None, BreakKind::HardCut));

        chunks.push(Chunk {
            text: document[current..clean_split].to_string(),
            start: current,
            end: clean_split,
            separator,
            break_kind: kind,
        });

        current = match separator {
            Some(sep) => clean_split + sep.len_utf8(),
            None => clean_split,
        };
    }

    log::debug!(
        "✂️ Documento de {} bytes dividido em {} chunks (budget: {} chars)",
        document.len(),
        chunks.len(),
        budget
    );

    ChunkResult { chunks }
}

/// Busca para trás o melhor ponto de quebra dentro da janela.
///
/// Retorna (offset na janela, separador consumido, tipo).
fn find_clean_split(window: &str) -> Option<(usize, char, BreakKind)> {
    if let Some(pos) = window.rfind("\n\n") {
        return Some((pos, '\n', BreakKind::Paragraph));
    }
    if let Some(pos) = window.rfind('\n') {
        return Some((pos, '\n', BreakKind::Line));
    }
    window
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(pos, c)| (pos, c, BreakKind::Whitespace))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    /// Gerador determinístico de documentos variados (palavras, linhas, parágrafos, multibyte)
    fn synthetic_document(seed: u64, len_words: usize) -> String {
        let words = ["alpha", "beta", "ção", "日本語", "x", "longerwordwithoutspaces", "ñ", "🚀"];
        let separators = [" ", " ", " ", "\n", "\n\n", "\t", "  "];
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as usize
        };

        let mut doc = String::new();
        for _ in 0..len_words {
            doc.push_str(words[next() % words.len()]);
            doc.push_str(separators[next() % separators.len()]);
        }
        doc
    }

    #[test]
    fn test_empty_document() {
        let result = chunk_document("", tokens(10));
        assert!(result.is_empty());
    }

    #[test]
    fn test_short_document_single_chunk() {
        let text = "Um documento curto.\n\nCom dois parágrafos.";
        let result = chunk_document(text, tokens(100));

        assert_eq!(result.len(), 1);
        assert_eq!(result.chunks[0].text, text);
        assert_eq!(result.chunks[0].break_kind, BreakKind::Tail);
    }

    #[test]
    fn test_exact_budget_is_single_chunk() {
        let text = "a".repeat(40);
        let result = chunk_document(&text, tokens(10));

        assert_eq!(result.len(), 1);
        assert_eq!(result.chunks[0].text, text);
    }

    #[test]
    fn test_prefers_paragraph_break() {
        // budget = 20 chars
        let text = "aaaa bbbb\n\ncccc\ndddd eeee ffff";
        let result = chunk_document(text, tokens(5));

        assert_eq!(result.chunks[0].text, "aaaa bbbb");
        assert_eq!(result.chunks[0].break_kind, BreakKind::Paragraph);
        assert_eq!(result.chunks[0].separator, Some('\n'));
        // O segundo \n do parágrafo fica no início do próximo chunk
        assert!(result.chunks[1].text.starts_with('\n'));
        assert_eq!(result.reassemble(), text);
    }

    #[test]
    fn test_falls_back_to_newline_then_whitespace() {
        let text = "aaaa bbbb\ncccc dddd eeee ffff gggg";
        let result = chunk_document(text, tokens(5));
        assert_eq!(result.chunks[0].text, "aaaa bbbb");
        assert_eq!(result.chunks[0].break_kind, BreakKind::Line);

        let text = "aaaa bbbb cccc dddd eeee ffff gggg";
        let result = chunk_document(text, tokens(5));
        assert_eq!(result.chunks[0].text, "aaaa bbbb cccc dddd");
        assert_eq!(result.chunks[0].break_kind, BreakKind::Whitespace);
        assert_eq!(result.reassemble(), text);
    }

    #[test]
    fn test_hard_cut_drops_nothing() {
        let text = "x".repeat(100);
        let result = chunk_document(&text, tokens(10));

        assert_eq!(result.len(), 3);
        assert_eq!(result.chunks[0].char_count(), 40);
        assert_eq!(result.chunks[0].break_kind, BreakKind::HardCut);
        assert_eq!(result.chunks[0].separator, None);
        assert_eq!(result.chunks[2].char_count(), 20);
        assert_eq!(result.reassemble(), text);
    }

    #[test]
    fn test_separator_at_window_start_is_ignored() {
        // Um \n no início da janela geraria chunk vazio
        let text = format!("\n{}", "y".repeat(60));
        let result = chunk_document(&text, tokens(5));

        assert!(result.iter().all(|c| !c.text.is_empty()));
        assert_eq!(result.reassemble(), text);
    }

    #[test]
    fn test_multibyte_never_split() {
        let text = "日本語のテキスト".repeat(20);
        let result = chunk_document(&text, tokens(3));

        for chunk in result.iter() {
            assert!(text.is_char_boundary(chunk.start));
            assert!(text.is_char_boundary(chunk.end));
            assert!(chunk.char_count() <= 12);
        }
        assert_eq!(result.reassemble(), text);
    }

    #[test]
    fn test_positions_match_text() {
        let text = synthetic_document(7, 300);
        let result = chunk_document(&text, tokens(8));

        for chunk in result.iter() {
            assert_eq!(&text[chunk.start..chunk.end], chunk.text);
        }
    }

    #[test]
    fn test_reassemble_property_over_many_documents() {
        for seed in 0..40u64 {
            let text = synthetic_document(seed, 5 + (seed as usize * 13) % 400);
            for size in [1usize, 2, 3, 7, 10, 25, 1000] {
                let result = chunk_document(&text, tokens(size));
                assert_eq!(result.reassemble(), text, "seed={} size={}", seed, size);
                for chunk in result.iter() {
                    assert!(!chunk.text.is_empty());
                    assert!(chunk.char_count() <= size * CHARS_PER_TOKEN);
                }
            }
        }
    }

    #[test]
    fn test_bounded_termination() {
        let text = "lorem ipsum dolor sit amet ".repeat(8); // > 200 chars
        let result = chunk_document(&text[..200], tokens(10));

        assert!(result.len() >= 5 && result.len() <= 200);
        assert!(result.iter().all(|c| c.char_count() <= 40));
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("ção!"), 1);
    }
}

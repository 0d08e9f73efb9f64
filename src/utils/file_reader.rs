//! # File Reader Utilities
//!
//! Leitura de documentos locais e extração de texto para o pipeline de resumo.
//!
//! ## Tipos de Arquivo Suportados
//!
//! | Tipo | Extensões | Extração |
//! |------|-----------|----------|
//! | PDF | `.pdf` | `pdf_extract` (stderr silenciado com `gag`) |
//! | DOCX | `.docx` | `word/document.xml` dentro do zip |
//! | RTF | `.rtf` | Máquina de estados sobre control words |
//! | Texto | `.txt` | UTF-8 (lossy) |
//! | Markdown | `.md`, `.markdown` | UTF-8 (lossy) |
//!
//! ## Exemplo de Uso
//!
//! ```rust,no_run
//! use doc_summarizer::utils::FileReader;
//!
//! let reader = FileReader::new();
//! let content = reader.read_file("paper.pdf")?;
//! println!("{} palavras, ~{} tokens", content.word_count, content.estimated_tokens);
//! # Ok::<(), doc_summarizer::utils::FileReaderError>(())
//! ```
//!
//! ## Limites
//!
//! - Tamanho máximo de arquivo: 100MB (configurável via [`FileReader::with_max_size`])

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::segment::estimate_tokens;

/// Limite máximo de tamanho de arquivo padrão (100MB).
const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Caminho do corpo do documento dentro de um DOCX
const DOCX_DOCUMENT_PART: &str = "word/document.xml";

/// Erros de leitura e extração de documentos.
#[derive(Debug, Error)]
pub enum FileReaderError {
    /// Extensão não reconhecida.
    #[error("Unsupported file format: {0} (supported: .pdf, .docx, .rtf, .txt, .md)")]
    UnsupportedFormat(String),

    /// Arquivo não existe.
    #[error("File not found: {0}")]
    NotFound(String),

    /// Arquivo excede o limite máximo de tamanho permitido.
    #[error("File too large: {size} bytes (max: {max})")]
    FileTooLarge {
        /// Tamanho do arquivo em bytes
        size: u64,
        /// Limite máximo permitido em bytes
        max: u64,
    },

    /// Erro de entrada/saída do sistema de arquivos.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Falha ao extrair texto do formato (PDF corrompido, zip inválido...).
    #[error("Text extraction failed: {0}")]
    Extraction(String),
}

/// Tipos de documento suportados, detectados pela extensão (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Documento PDF
    Pdf,
    /// Documento Word (Office Open XML)
    Docx,
    /// Rich Text Format
    Rtf,
    /// Texto puro
    Text,
    /// Markdown
    Markdown,
}

impl FileType {
    /// Detecta o tipo pela extensão do caminho.
    ///
    /// ```rust
    /// use doc_summarizer::utils::FileType;
    ///
    /// assert_eq!(FileType::from_path("Paper.PDF"), Some(FileType::Pdf));
    /// assert_eq!(FileType::from_path("notes.markdown"), Some(FileType::Markdown));
    /// assert_eq!(FileType::from_path("image.png"), None);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let extension = path.as_ref().extension()?.to_str()?.to_lowercase();

        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "rtf" => Some(Self::Rtf),
            "txt" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// Texto extraído de um documento, com metadados.
#[derive(Debug, Clone)]
pub struct FileContent {
    /// Caminho original do arquivo
    pub source: String,

    /// Tipo detectado
    pub file_type: FileType,

    /// Texto extraído
    pub text: String,

    /// Tamanho original do arquivo em bytes (antes da extração de texto)
    pub size_bytes: u64,

    /// Número de caracteres do texto extraído
    pub char_count: usize,

    /// Número de palavras (via [`str::split_whitespace`])
    pub word_count: usize,

    /// Estimativa de tokens (4 caracteres por token)
    pub estimated_tokens: usize,
}

impl FileContent {
    fn new(source: &str, file_type: FileType, text: String, size_bytes: u64) -> Self {
        Self {
            source: source.to_string(),
            file_type,
            char_count: text.chars().count(),
            word_count: text.split_whitespace().count(),
            estimated_tokens: estimate_tokens(&text),
            text,
            size_bytes,
        }
    }

    /// Retorna true se nenhum texto visível foi extraído
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Leitor de documentos locais.
///
/// ```rust
/// use doc_summarizer::utils::FileReader;
///
/// let reader = FileReader::new()
///     .with_max_size(50 * 1024 * 1024); // 50MB
/// ```
#[derive(Debug, Clone)]
pub struct FileReader {
    /// Tamanho máximo de arquivo permitido em bytes
    max_size: u64,
}

impl FileReader {
    /// Cria um leitor com limite padrão de 100MB
    pub fn new() -> Self {
        Self {
            max_size: MAX_FILE_SIZE,
        }
    }

    /// Define o tamanho máximo de arquivo permitido.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Lê um arquivo local e extrai o texto.
    ///
    /// A extensão é verificada antes da existência do arquivo.
    ///
    /// # Erros
    ///
    /// - [`FileReaderError::UnsupportedFormat`] - extensão não suportada
    /// - [`FileReaderError::NotFound`] - arquivo inexistente
    /// - [`FileReaderError::FileTooLarge`] - acima do limite configurado
    /// - [`FileReaderError::Io`] - falha de leitura
    /// - [`FileReaderError::Extraction`] - PDF/DOCX inválido
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<FileContent, FileReaderError> {
        let path = path.as_ref();
        let source = path.display().to_string();
        log::info!("📂 Lendo arquivo local: {}", source);

        let file_type = FileType::from_path(path)
            .ok_or_else(|| FileReaderError::UnsupportedFormat(source.clone()))?;
        let data = self.read_bytes(path)?;
        let size_bytes = data.len() as u64;

        let text = match file_type {
            FileType::Pdf => extract_pdf_text(&data)?,
            FileType::Docx => extract_docx_text(&data)?,
            FileType::Rtf => rtf_to_text(&String::from_utf8_lossy(&data)),
            FileType::Text | FileType::Markdown => String::from_utf8_lossy(&data).into_owned(),
        };

        let content = FileContent::new(&source, file_type, text, size_bytes);

        log::info!(
            "✅ Arquivo processado: {} | tipo={:?} | {} bytes | {} palavras | ~{} tokens",
            content.source,
            content.file_type,
            content.size_bytes,
            content.word_count,
            content.estimated_tokens
        );

        Ok(content)
    }

    /// Extrai o texto de um PDF e grava ao lado dele com extensão `.txt`.
    ///
    /// Retorna o caminho do arquivo gerado.
    pub fn convert_pdf_to_txt(&self, path: impl AsRef<Path>) -> Result<PathBuf, FileReaderError> {
        let path = path.as_ref();

        if FileType::from_path(path) != Some(FileType::Pdf) {
            return Err(FileReaderError::UnsupportedFormat(format!(
                "{} (conversion requires a .pdf file)",
                path.display()
            )));
        }

        let data = self.read_bytes(path)?;
        let text = extract_pdf_text(&data)?;
        let output = path.with_extension("txt");

        std::fs::write(&output, text)?;
        log::info!("💾 Texto salvo em {}", output.display());

        Ok(output)
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FileReaderError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FileReaderError::NotFound(path.display().to_string()),
            _ => FileReaderError::Io(e),
        })?;

        if metadata.len() > self.max_size {
            return Err(FileReaderError::FileTooLarge {
                size: metadata.len(),
                max: self.max_size,
            });
        }

        Ok(std::fs::read(path)?)
    }
}

impl Default for FileReader {
    fn default() -> Self {
        Self::new()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PDF
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Extrai texto de um PDF em memória.
///
/// `pdf_extract` escreve avisos de fonte direto no stderr e pode entrar em
/// pânico com PDFs malformados; ambos viram silêncio e
/// [`FileReaderError::Extraction`].
pub fn extract_pdf_text(data: &[u8]) -> Result<String, FileReaderError> {
    log::info!("📄 Extraindo texto de PDF ({} bytes)", data.len());

    // Falha se o stderr já estiver silenciado; seguimos sem o gag
    let _silence = gag::Gag::stderr().ok();

    guard_extraction(|| pdf_extract::extract_text_from_mem(data))
}

/// Roda um extrator convertendo erro e pânico em [`FileReaderError::Extraction`].
///
/// Depende de `panic = "unwind"` no perfil de build.
fn guard_extraction<F, E>(extract: F) -> Result<String, FileReaderError>
where
    F: FnOnce() -> Result<String, E> + std::panic::UnwindSafe,
    E: std::fmt::Display,
{
    match std::panic::catch_unwind(extract) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(FileReaderError::Extraction(e.to_string())),
        Err(_) => Err(FileReaderError::Extraction("PDF parser panicked".into())),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DOCX
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

static XML_ENTITY: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);").ok());

/// Extrai texto de um DOCX em memória
pub fn extract_docx_text(data: &[u8]) -> Result<String, FileReaderError> {
    log::info!("📄 Extraindo texto de DOCX ({} bytes)", data.len());

    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| FileReaderError::Extraction(format!("invalid DOCX container: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_DOCUMENT_PART)
        .map_err(|e| FileReaderError::Extraction(format!("{}: {}", DOCX_DOCUMENT_PART, e)))?
        .read_to_string(&mut xml)?;

    Ok(docx_xml_to_text(&xml))
}

/// Converte o XML de `word/document.xml` em texto.
///
/// - `<w:p>` → `\n` antes de cada parágrafo
/// - `<w:t>` → conteúdo do run
/// - `<w:tab/>` → tab (exceto definições de tab stop em `<w:tabs>`)
/// - `<w:br/>`, `<w:cr/>` → quebra de linha
pub fn docx_xml_to_text(xml: &str) -> String {
    let mut text = String::with_capacity(xml.len() / 4);
    let mut in_run_text = false;
    let mut in_tab_stops = false;

    // Cada pedaço após '<' é "tag>texto"
    for (position, piece) in xml.split('<').enumerate() {
        let (tag, content) = match piece.split_once('>') {
            Some((tag, content)) if position > 0 => (Some(tag), content),
            _ => (None, piece),
        };

        if let Some(tag) = tag.filter(|t| !t.starts_with('?') && !t.starts_with('!')) {
            let closing = tag.starts_with('/');
            let self_closing = tag.ends_with('/');
            let name = tag
                .trim_start_matches('/')
                .split(|c: char| c.is_whitespace() || c == '/')
                .next()
                .unwrap_or_default();

            match (name, closing) {
                ("w:p", false) => text.push('\n'),
                ("w:t", false) => in_run_text = !self_closing,
                ("w:t", true) => in_run_text = false,
                ("w:tabs", false) => in_tab_stops = !self_closing,
                ("w:tabs", true) => in_tab_stops = false,
                ("w:tab", false) if !in_tab_stops => text.push('\t'),
                ("w:br", false) | ("w:cr", false) => text.push('\n'),
                _ => {}
            }
        }

        if in_run_text && !content.is_empty() {
            text.push_str(&decode_xml_entities(content));
        }
    }

    text
}

/// Decodifica as entidades XML predefinidas e referências numéricas
pub fn decode_xml_entities(text: &str) -> String {
    let Some(entity_pattern) = XML_ENTITY.as_ref().filter(|_| text.contains('&')) else {
        return text.to_string();
    };

    entity_pattern
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => {
                    let code = match entity.strip_prefix("#x") {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => entity.trim_start_matches('#').parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RTF
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Destinos cujo conteúdo não é texto do documento
const RTF_SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "themedata",
    "datastore",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "xmlnstbl",
    "latentstyles",
];

/// Estado de um grupo `{...}`
#[derive(Debug, Clone, Copy)]
struct RtfGroup {
    /// Conteúdo do grupo é descartado
    skip: bool,
    /// Caracteres de fallback após `\uN`
    unicode_skip: usize,
}

impl Default for RtfGroup {
    fn default() -> Self {
        Self {
            skip: false,
            unicode_skip: 1,
        }
    }
}

/// Converte RTF em texto puro.
///
/// Máquina de estados com pilha de grupos:
/// - Destinos ignorados (`\*`, fonttbl, colortbl, stylesheet, info, pict...)
/// - `\par`/`\line` → `\n`, `\tab` → `\t`
/// - `\'hh` → byte como caractere Latin-1
/// - `\uN` → Unicode, pulando os `\ucN` caracteres de fallback
/// - `\\`, `\{`, `\}` → literais
pub fn rtf_to_text(rtf: &str) -> String {
    let chars: Vec<char> = rtf.chars().collect();
    let mut out = String::with_capacity(rtf.len() / 2);
    let mut stack: Vec<RtfGroup> = Vec::new();
    let mut group = RtfGroup::default();
    let mut pending_skip = 0usize;
    let mut i = 0;

    let mut emit = |c: char, group: &RtfGroup, pending_skip: &mut usize| {
        if group.skip {
            return;
        }
        if *pending_skip > 0 {
            *pending_skip -= 1;
            return;
        }
        out.push(c);
    };

    while i < chars.len() {
        match chars[i] {
            '{' => {
                stack.push(group);
                pending_skip = 0;
                i += 1;
            }
            '}' => {
                group = stack.pop().unwrap_or_default();
                pending_skip = 0;
                i += 1;
            }
            '\r' | '\n' => i += 1,
            '\\' => {
                i += 1;
                let Some(&next) = chars.get(i) else { break };

                if next.is_ascii_alphabetic() {
                    let start = i;
                    while i < chars.len() && chars[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();

                    let param_start = i;
                    if i < chars.len() && chars[i] == '-' {
                        i += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let param: Option<i32> = chars[param_start..i]
                        .iter()
                        .collect::<String>()
                        .parse()
                        .ok();

                    // Espaço delimitador pertence à control word
                    if i < chars.len() && chars[i] == ' ' {
                        i += 1;
                    }

                    match word.as_str() {
                        "par" | "line" | "sect" | "page" => emit('\n', &group, &mut pending_skip),
                        "tab" => emit('\t', &group, &mut pending_skip),
                        "emdash" => emit('—', &group, &mut pending_skip),
                        "endash" => emit('–', &group, &mut pending_skip),
                        "lquote" => emit('‘', &group, &mut pending_skip),
                        "rquote" => emit('’', &group, &mut pending_skip),
                        "ldblquote" => emit('“', &group, &mut pending_skip),
                        "rdblquote" => emit('”', &group, &mut pending_skip),
                        "bullet" => emit('•', &group, &mut pending_skip),
                        "uc" => group.unicode_skip = param.unwrap_or(1).max(0) as usize,
                        "u" => {
                            if let Some(code) = param {
                                let code = if code < 0 { code + 65_536 } else { code };
                                if let Some(c) = char::from_u32(code as u32) {
                                    emit(c, &group, &mut pending_skip);
                                }
                                pending_skip = group.unicode_skip;
                            }
                        }
                        w if RTF_SKIPPED_DESTINATIONS.contains(&w) => group.skip = true,
                        _ => {
                            if pending_skip > 0 {
                                pending_skip -= 1;
                            }
                        }
                    }
                } else {
                    i += 1;
                    match next {
                        '\'' => {
                            let hex: String = chars.iter().skip(i).take(2).collect();
                            i += hex.chars().count();
                            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                                emit(char::from(byte), &group, &mut pending_skip);
                            }
                        }
                        '*' => group.skip = true,
                        '\\' | '{' | '}' => emit(next, &group, &mut pending_skip),
                        '~' => emit('\u{a0}', &group, &mut pending_skip),
                        '_' => emit('-', &group, &mut pending_skip),
                        '\r' | '\n' => emit('\n', &group, &mut pending_skip),
                        _ => {}
                    }
                }
            }
            c => {
                emit(c, &group, &mut pending_skip);
                i += 1;
            }
        }
    }

    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TESTES UNITÁRIOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

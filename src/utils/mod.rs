// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// UTILITÁRIOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Utilitários compartilhados pelo pipeline:
// - Text segmentation (chunking)
// - File reading (PDF, DOCX, RTF, texto)
// - Cost ledger por run
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod cost_ledger;
mod file_reader;
/// Chunking de documentos em trechos do tamanho de uma chamada.
pub mod segment;

pub use cost_ledger::{CallCost, CallPhase, CostLedger};
pub use file_reader::{
    decode_xml_entities, docx_xml_to_text, extract_docx_text, extract_pdf_text, rtf_to_text,
    FileContent, FileReader, FileReaderError, FileType,
};
pub use segment::{chunk_document, estimate_tokens, BreakKind, Chunk, ChunkResult};

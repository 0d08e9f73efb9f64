// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DOC SUMMARIZER CLI
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// CLI para resumir documentos longos com Claude.
//
// Uso:
//   doc-summarizer summarize paper.pdf --style simple
//   doc-summarizer summarize            (pergunta o arquivo e o estilo)
//   doc-summarizer stats report.docx
//   doc-summarizer convert paper.pdf
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use doc_summarizer::prelude::*;

#[derive(Parser)]
#[command(name = "doc-summarizer", version, about = "Summarize long documents with Claude")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resume um documento (map-reduce quando necessário)
    Summarize {
        /// Arquivo (.pdf, .docx, .rtf, .txt, .md); perguntado se ausente
        file: Option<PathBuf>,
        /// Estilo: default, simple, in_depth, expert; menu se ausente
        #[arg(long)]
        style: Option<PromptStyle>,
        /// Modelo (sobrescreve SUMMARIZER_MODEL)
        #[arg(long)]
        model: Option<String>,
        /// Tokens por chunk (sobrescreve SUMMARIZER_CHUNK_TOKENS)
        #[arg(long)]
        chunk_tokens: Option<NonZeroUsize>,
    },
    /// Mostra tamanho e número de chunks, sem chamar a API
    Stats {
        file: PathBuf,
        #[arg(long)]
        chunk_tokens: Option<NonZeroUsize>,
    },
    /// Extrai o texto de um PDF para um .txt ao lado dele
    Convert { file: PathBuf },
}

/// Tenta carregar o arquivo .env de múltiplos locais possíveis
fn load_dotenv() {
    let possible_paths = [PathBuf::from(".env"), PathBuf::from("../.env")];

    for path in &possible_paths {
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => {
                    eprintln!(
                        "✓ Carregado .env de: {:?}",
                        path.canonicalize().unwrap_or(path.clone())
                    );
                    return;
                }
                Err(e) => {
                    eprintln!("⚠ Erro ao carregar {:?}: {}", path, e);
                }
            }
        }
    }

    // Última tentativa: dotenvy padrão (sobe pelos diretórios)
    if dotenvy::dotenv().is_err() {
        eprintln!("⚠ Nenhum arquivo .env encontrado. Certifique-se de que ANTHROPIC_API_KEY está definida.");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Carregar .env PRIMEIRO, antes de qualquer coisa
    load_dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = load_summarizer_config();

    match cli.cmd {
        Command::Summarize {
            file,
            style,
            model,
            chunk_tokens,
        } => {
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(tokens) = chunk_tokens {
                config.chunk_tokens = tokens;
            }
            run_summarize(config, file, style).await
        }
        Command::Stats { file, chunk_tokens } => {
            if let Some(tokens) = chunk_tokens {
                config.chunk_tokens = tokens;
            }
            run_stats(&config, file)
        }
        Command::Convert { file } => {
            let output = FileReader::new().convert_pdf_to_txt(&file)?;
            println!("✓ Texto salvo em {}", output.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_summarize(
    config: SummarizerConfig,
    file: Option<PathBuf>,
    style: Option<PromptStyle>,
) -> anyhow::Result<ExitCode> {
    // Chave, preços e modelo validados antes de perguntar qualquer coisa
    let pricing = Arc::new(config.load_pricing()?);
    pricing.ensure_known(&config.model)?;
    let client = config.build_client()?;

    let path = match file {
        Some(path) => path,
        None => PathBuf::from(ask_file()?),
    };

    let content = FileReader::new().read_file(&path)?;
    if content.is_blank() {
        anyhow::bail!("No text could be extracted from {}", content.source);
    }

    let style = match style {
        Some(style) => style,
        None => ask_style()?,
    };

    let spec = PromptSpec::new(style, &config.model, &pricing)?
        .with_temperature(config.temperature)
        .with_max_output_tokens(config.max_output_tokens);

    let summarizer = Summarizer::new(client, pricing, config.pipeline_config());

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(" DOC SUMMARIZER v{}", doc_summarizer::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Arquivo: {} (~{} tokens)", content.source, content.estimated_tokens);
    println!("Estilo:  {}", style);
    println!("Modelo:  {}", config.model);
    println!();

    let outcome = summarizer.run(&content.text, &spec).await?;

    if let Some(description) = outcome.failure_description() {
        eprintln!("✗ {}", description);
        eprintln!();
    }

    if let Some(text) = outcome.best_text() {
        println!("{}", text);
        println!();
    }

    print_cost_breakdown(outcome.ledger());

    Ok(if outcome.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_stats(config: &SummarizerConfig, file: PathBuf) -> anyhow::Result<ExitCode> {
    let content = FileReader::new().read_file(&file)?;
    let chunks = doc_summarizer::utils::chunk_document(&content.text, config.chunk_tokens);

    println!("Arquivo:          {}", content.source);
    println!("Tipo:             {:?}", content.file_type);
    println!("Bytes:            {}", content.size_bytes);
    println!("Caracteres:       {}", content.char_count);
    println!("Palavras:         {}", content.word_count);
    println!("Tokens estimados: {}", content.estimated_tokens);
    println!("Chunks:           {} (de {} tokens)", chunks.len(), config.chunk_tokens);

    Ok(ExitCode::SUCCESS)
}

fn print_cost_breakdown(ledger: &CostLedger) {
    if ledger.is_empty() {
        println!("There has been no API cost for this summary.");
        return;
    }

    let cost = ledger.breakdown();
    println!("Cost Breakdown");
    println!("{}", "-".repeat(20));
    println!("Input: ${:.6}", cost.input);
    println!("Output: ${:.6}", cost.output);
    println!("Total: ${:.6}", cost.total());
}

fn read_line(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut line = String::new();
    if std::io::stdin().read_line(&mut line)? == 0 {
        anyhow::bail!("stdin closed");
    }
    Ok(line.trim().to_string())
}

fn ask_file() -> anyhow::Result<String> {
    loop {
        // Caminhos arrastados para o terminal vêm entre aspas
        let answer = read_line("Path to the document: ")?;
        let path = answer.trim_matches(|c| c == '"' || c == '\'');
        if !path.is_empty() {
            return Ok(path.to_string());
        }
    }
}

fn ask_style() -> anyhow::Result<PromptStyle> {
    println!("Choose a summary style:");
    for (i, style) in PromptStyle::ALL.iter().enumerate() {
        println!("  {}. {:<9} {}", i + 1, style.name(), style.description());
    }

    loop {
        let answer = read_line(&format!("Style [1-{}, Enter = default]: ", PromptStyle::ALL.len()))?;
        if answer.is_empty() {
            return Ok(PromptStyle::default());
        }

        let by_number = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| PromptStyle::ALL.get(i).copied());

        match by_number.map(Ok).unwrap_or_else(|| answer.parse::<PromptStyle>()) {
            Ok(style) => return Ok(style),
            Err(e) => eprintln!("✗ {}", e),
        }
    }
}

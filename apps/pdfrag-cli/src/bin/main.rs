//! Interactive PDF assistant.
//!
//! With no arguments, presents the menu (load a PDF, one-shot QnA,
//! interactive chat, summary). With a path plus `--question`/`--summary`
//! it runs one-shot. Stages run through the tool server by default;
//! `--local` wires the in-process collaborators instead.

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use pdfrag_core::chunker::{ChunkingConfig, WindowChunker};
use pdfrag_core::config::Config;
use pdfrag_pipeline::collab::{ToolChunker, ToolCompleter, ToolEmbedder, ToolExtractor};
use pdfrag_pipeline::extract::PdfExtractor;
use pdfrag_pipeline::{DocumentPipeline, PipelineConfig};
use pdfrag_tool::{ServerSpec, ToolChannel};
use pdfrag_vector::{SnapshotIndex, VectorStore};

struct CliArgs {
    pdf_path: Option<String>,
    pages: Option<String>,
    question: Option<String>,
    summary: bool,
    top_k: Option<usize>,
    local: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut out = CliArgs {
        pdf_path: None,
        pages: None,
        question: None,
        summary: false,
        top_k: None,
        local: false,
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--question" | "-q" => {
                if i + 1 < args.len() {
                    out.question = Some(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("Error: --question requires a value");
                    std::process::exit(1);
                }
            }
            "--pages" => {
                if i + 1 < args.len() {
                    out.pages = Some(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("Error: --pages requires a value");
                    std::process::exit(1);
                }
            }
            "--top-k" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse::<usize>() {
                        Ok(k) => {
                            out.top_k = Some(k);
                            i += 1;
                        }
                        Err(_) => {
                            eprintln!("Error: --top-k requires a number");
                            std::process::exit(1);
                        }
                    }
                } else {
                    eprintln!("Error: --top-k requires a number");
                    std::process::exit(1);
                }
            }
            "--summary" | "-s" => out.summary = true,
            "--local" => out.local = true,
            other if !other.starts_with('-') => out.pdf_path = Some(other.to_string()),
            other => {
                eprintln!("Unknown flag: {other}");
                std::process::exit(1);
            }
        }
        i += 1;
    }
    out
}

fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let args = parse_args();
    let mut pipeline = build_pipeline(&config, args.local)?;

    // One-shot mode mirrors `pdfrag <pdf> --question ... --summary`.
    if let Some(pdf_path) = &args.pdf_path {
        load_with_spinner(&mut pipeline, pdf_path, args.pages.as_deref())?;
        if args.summary {
            println!("\nSummary:\n{}", pipeline.summarize()?);
        }
        if let Some(question) = &args.question {
            let answer = pipeline.ask(question, args.top_k, None)?;
            println!("\nQ: {question}\nA: {answer}");
        }
        if args.summary || args.question.is_some() {
            return Ok(());
        }
    }

    menu_loop(&mut pipeline, args.pdf_path, args.top_k)
}

fn build_pipeline(config: &Config, local: bool) -> anyhow::Result<DocumentPipeline> {
    let chunking = ChunkingConfig {
        chunk_size: config.get("chunking.chunk_size").unwrap_or(500),
        chunk_overlap: config.get("chunking.chunk_overlap").unwrap_or(0),
    };
    let cfg = PipelineConfig {
        chunking,
        top_k: config.get("qna.top_k").unwrap_or(pdfrag_pipeline::DEFAULT_TOP_K),
    };
    if local {
        let embedder = pdfrag_embed::embedder_from_config(config)?;
        let completer = pdfrag_llm::completer_from_config(config)?;
        return Ok(DocumentPipeline::new(
            Box::new(PdfExtractor),
            Box::new(WindowChunker),
            embedder,
            Box::new(VectorStore::new()),
            completer,
            cfg,
        ));
    }
    let timeout = Duration::from_secs(config.get("tools.timeout_secs").unwrap_or(30));
    let channel = Arc::new(ToolChannel::new(server_spec(config), timeout)?);
    let dim = config.get("embedding.dim").unwrap_or(pdfrag_embed::DEFAULT_DIM);
    Ok(DocumentPipeline::new(
        Box::new(ToolExtractor::new(channel.clone())),
        Box::new(ToolChunker::new(channel.clone())),
        Box::new(ToolEmbedder::new(channel.clone(), dim)),
        Box::new(SnapshotIndex::new(snapshot_path(config))),
        Box::new(ToolCompleter::new(channel)),
        cfg,
    ))
}

/// Tool server launch command: configured value, else the binary that ships
/// next to this one.
fn server_spec(config: &Config) -> ServerSpec {
    let command = config.get::<String>("tools.server_cmd").unwrap_or_else(|_| {
        env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("pdfrag-toolserver")))
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| "pdfrag-toolserver".to_string())
    });
    ServerSpec::new(command)
}

fn snapshot_path(config: &Config) -> PathBuf {
    config
        .get::<String>("snapshot_path")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("pdfrag").join("store.json"))
}

fn load_with_spinner(
    pipeline: &mut DocumentPipeline,
    pdf_path: &str,
    pages: Option<&str>,
) -> anyhow::Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Processing {pdf_path}..."));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = pipeline.load(pdf_path, pages);
    spinner.finish_and_clear();
    let report = result?;
    println!("✅ Loaded '{}' ({} chunks indexed)", report.doc_id, report.chunk_count);
    Ok(())
}

fn prompt_line(prompt: &str) -> anyhow::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_for_pdf() -> anyhow::Result<String> {
    loop {
        let path = prompt_line("Enter the path to your PDF file: ")?;
        if path.is_empty() {
            continue;
        }
        if !PathBuf::from(&path).is_file() {
            println!("File not found: {path}");
            continue;
        }
        if !path.to_lowercase().ends_with(".pdf") {
            println!("Please provide a valid PDF file.");
            continue;
        }
        return Ok(path);
    }
}

fn menu_loop(
    pipeline: &mut DocumentPipeline,
    mut pdf_path: Option<String>,
    top_k: Option<usize>,
) -> anyhow::Result<()> {
    println!("Welcome to the PDF Assistant!");
    loop {
        println!("\nPlease select an action:");
        println!("1. Load a PDF");
        println!("2. Ask a question about the PDF");
        println!("3. Start an interactive chat with the PDF");
        println!("4. Get a summary of the PDF");
        println!("5. Exit");
        let choice = prompt_line("\n> ")?;
        match choice.as_str() {
            "1" => {
                let path = prompt_for_pdf()?;
                if let Err(e) = load_with_spinner(pipeline, &path, None) {
                    println!("Error: {e}");
                    continue;
                }
                pdf_path = Some(path);
            }
            "2" => {
                if pipeline.doc_id().is_none() {
                    println!("Please load a PDF first (option 1).");
                    continue;
                }
                let question = prompt_line("Enter your question: ")?;
                match pipeline.ask(&question, top_k, None) {
                    Ok(answer) => println!("\nAnswer:\n{answer}"),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "3" => {
                if pipeline.doc_id().is_none() {
                    println!("Please load a PDF first (option 1).");
                    continue;
                }
                chat_loop(pipeline, pdf_path.as_deref(), top_k)?;
            }
            "4" => {
                if pipeline.doc_id().is_none() {
                    println!("Please load a PDF first (option 1).");
                    continue;
                }
                match pipeline.summarize() {
                    Ok(summary) => println!("\nSummary:\n{summary}"),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "5" => {
                println!("Goodbye!");
                return Ok(());
            }
            _ => println!("Invalid choice. Please enter a number from 1 to 5."),
        }
    }
}

fn chat_loop(
    pipeline: &mut DocumentPipeline,
    pdf_path: Option<&str>,
    top_k: Option<usize>,
) -> anyhow::Result<()> {
    println!("\nChat started. Type 'summary' for a summary, 'clear' to reload, 'exit' to end chat.");
    loop {
        let input = prompt_line("\nYou: ")?;
        match input.to_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" => {
                println!("Ending chat...");
                return Ok(());
            }
            "clear" => {
                let Some(path) = pdf_path else {
                    println!("No document path to reload.");
                    continue;
                };
                println!("Reloading document...");
                match pipeline.load(path, None) {
                    Ok(report) => println!("Document reloaded ({} chunks).", report.chunk_count),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "summary" => match pipeline.summarize() {
                Ok(summary) => println!("\nSummary:\n{summary}"),
                Err(e) => println!("Error: {e}"),
            },
            _ => match pipeline.ask(&input, top_k, None) {
                Ok(answer) => println!("\nAssistant: {answer}"),
                Err(e) => println!("Error: {e}"),
            },
        }
    }
}

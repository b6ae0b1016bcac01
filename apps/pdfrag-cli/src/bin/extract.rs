//! One-shot PDF extraction CLI.

use std::env;

use pdfrag_core::traits::Extractor;
use pdfrag_pipeline::extract::PdfExtractor;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut pdf_path = None;
    let mut pages = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--pages" => {
                if i + 1 < args.len() {
                    pages = Some(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("Error: --pages requires a value (e.g. '1,2,-1')");
                    std::process::exit(1);
                }
            }
            other if !other.starts_with('-') => pdf_path = Some(other.to_string()),
            other => {
                eprintln!("Unknown flag: {other}");
                std::process::exit(1);
            }
        }
        i += 1;
    }
    let Some(pdf_path) = pdf_path else {
        eprintln!("Usage: pdfrag-extract <pdf_path> [--pages '1,2,-1']");
        std::process::exit(1);
    };
    let content = PdfExtractor.extract(&pdf_path, pages.as_deref())?;
    println!("{content}");
    Ok(())
}

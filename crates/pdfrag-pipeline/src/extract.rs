//! PDF text extraction collaborator.
//!
//! `pdf-extract` separates pages with form feeds, which is what the page
//! selector indexes into. Selector format: comma-separated page numbers,
//! negative numbers counted from the end, e.g. `"1,2,-1"`.

use std::path::Path;

use pdfrag_core::traits::Extractor;
use pdfrag_core::{Error, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extract(&self, pdf_path: &str, pages: Option<&str>) -> Result<String> {
        let path = Path::new(pdf_path);
        if !path.is_file() {
            return Err(Error::ExtractionFailed(format!("no such file: {pdf_path}")));
        }
        let text = pdf_extract::extract_text(path)
            .map_err(|e| Error::ExtractionFailed(format!("{pdf_path}: {e}")))?;
        match pages.map(str::trim).filter(|p| !p.is_empty()) {
            None => Ok(text),
            Some(selector) => {
                let all_pages: Vec<&str> = text.split('\x0c').collect();
                let picked = select_pages(&all_pages, selector)?;
                Ok(picked.join("\n"))
            }
        }
    }
}

fn select_pages<'a>(pages: &[&'a str], selector: &str) -> Result<Vec<&'a str>> {
    let total = pages.len() as i64;
    let mut out = Vec::new();
    for part in selector.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let n: i64 = part
            .parse()
            .map_err(|_| Error::ExtractionFailed(format!("invalid page number: {part}")))?;
        let idx = if n < 0 { total + n } else { n - 1 };
        if idx < 0 || idx >= total {
            return Err(Error::ExtractionFailed(format!(
                "page {part} out of range (document has {total} pages)"
            )));
        }
        out.push(pages[idx as usize]);
    }
    Ok(out)
}

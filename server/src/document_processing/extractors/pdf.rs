// PDF extraction module

use anyhow::{anyhow, Context, Result};
use pdf_extract::extract_text_by_pages;
use std::path::Path;

pub struct PdfExtractor;

impl PdfExtractor {
    /// Extract text page by page, in page order. Each page that yields text
    /// contributes that text plus a newline; pages with nothing extractable
    /// (scanned images, blank pages) contribute nothing.
    pub fn extract(pdf_path: impl AsRef<Path>) -> Result<String> {
        let pdf_path = pdf_path.as_ref();

        // pdf-extract panics on some malformed font tables.
        let pages = std::panic::catch_unwind(|| extract_text_by_pages(pdf_path))
            .map_err(|_| anyhow!("PDF parser panicked on {}", pdf_path.display()))?
            .with_context(|| format!("Failed to extract text from PDF: {}", pdf_path.display()))?;

        Ok(Self::join_pages(pages))
    }

    fn join_pages<I>(pages: I) -> String
    where
        I: IntoIterator<Item = String>,
    {
        let mut text = String::new();
        for page in pages {
            if page.trim().is_empty() {
                continue;
            }
            text.push_str(&page);
            text.push('\n');
        }
        text
    }
}

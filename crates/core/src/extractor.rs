use crate::chunking::normalize_whitespace;
use crate::error::{IngestError, Result};
use crate::models::{Document, PageText};
use lopdf::Document as PdfDocument;
use std::path::Path;
use tracing::debug;

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>> {
        let document =
            PdfDocument::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            let text = normalize_whitespace(&text);
            if !text.is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text,
                });
            }
        }

        if pages.is_empty() {
            return Err(IngestError::NoText(path.to_path_buf()));
        }

        Ok(pages)
    }
}

/// Reads the PDF at `path` into an ordered list of non-empty page texts.
pub fn load_document(path: &Path) -> Result<Document> {
    load_document_with(&LopdfExtractor, path)
}

pub fn load_document_with<X: PdfExtractor + ?Sized>(extractor: &X, path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }
    if path.file_name().is_none() {
        return Err(IngestError::MissingFileName(path.display().to_string()));
    }

    let pages = extractor.extract_pages(path)?;
    debug!(path = %path.display(), pages = pages.len(), "extracted pdf text");

    Ok(Document {
        path: path.to_path_buf(),
        pages,
    })
}

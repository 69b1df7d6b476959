//! PDF text extraction with page tracking

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Parsed PDF with per-page text
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Original filename
    pub filename: String,
    /// SHA-256 of the raw bytes
    pub content_hash: String,
    /// Total pages in the file (including pages without text)
    pub total_pages: u32,
    /// Pages that produced text, in order
    pub pages: Vec<PageContent>,
}

impl ParsedDocument {
    /// All page text joined together
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Content from a single page
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text content of the page
    pub content: String,
}

/// Replace typographic glyphs and ligatures that PDF fonts commonly emit
fn cleanup_pdf_text(text: &str) -> String {
    const REPLACEMENTS: &[(char, &str)] = &[
        ('\u{2010}', "-"),   // Hyphen
        ('\u{2011}', "-"),   // Non-breaking hyphen
        ('\u{2013}', "-"),   // En dash
        ('\u{2014}', "--"),  // Em dash
        ('\u{2018}', "'"),   // Left single quote
        ('\u{2019}', "'"),   // Right single quote
        ('\u{201C}', "\""),  // Left double quote
        ('\u{201D}', "\""),  // Right double quote
        ('\u{2022}', "* "),  // Bullet
        ('\u{2026}', "..."), // Ellipsis
        ('\u{00A0}', " "),   // Non-breaking space
        ('\u{FB00}', "ff"),
        ('\u{FB01}', "fi"),
        ('\u{FB02}', "fl"),
        ('\u{FB03}', "ffi"),
        ('\u{FB04}', "ffl"),
        ('\0', ""),
    ];

    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        match REPLACEMENTS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => cleaned.push_str(to),
            None => cleaned.push(c),
        }
    }

    cleaned
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// PDF parser
pub struct PdfParser;

impl PdfParser {
    /// Parse a PDF upload
    ///
    /// Text is extracted page by page with lopdf; when that yields nothing,
    /// pdf-extract is tried on the whole file and the result is attributed
    /// to page 1.
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        Self::check_type(filename, data)?;

        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        if doc.is_encrypted() {
            return Err(Error::file_parse(filename, "PDF is encrypted"));
        }

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let total_pages = page_numbers.len() as u32;

        let mut pages = Vec::with_capacity(page_numbers.len());
        for page_number in page_numbers {
            match doc.extract_text(&[page_number]) {
                Ok(text) => {
                    let content = cleanup_pdf_text(&text);
                    if !content.is_empty() {
                        pages.push(PageContent {
                            page_number,
                            content,
                        });
                    }
                }
                Err(e) => {
                    tracing::debug!("Could not extract text from page {}: {}", page_number, e);
                }
            }
        }

        if pages.is_empty() {
            tracing::warn!("lopdf produced no text for {}, trying pdf-extract", filename);
            let content = Self::extract_with_pdf_extract(filename, data)?;
            pages.push(PageContent {
                page_number: 1,
                content,
            });
        }

        tracing::debug!(
            "Parsed {}: {} of {} pages contain text",
            filename,
            pages.len(),
            total_pages
        );

        Ok(ParsedDocument {
            filename: filename.to_string(),
            content_hash: hash_bytes(data),
            total_pages: total_pages.max(1),
            pages,
        })
    }

    /// Only PDFs are accepted, by extension and by magic bytes
    pub fn check_type(filename: &str, data: &[u8]) -> Result<()> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        if extension != "pdf" {
            return Err(Error::UnsupportedFileType(format!(
                "'{}' - only PDF files are supported",
                if extension.is_empty() { "<none>" } else { &extension }
            )));
        }

        if !data.starts_with(b"%PDF") {
            return Err(Error::file_parse(filename, "File does not look like a PDF"));
        }

        Ok(())
    }

    fn extract_with_pdf_extract(filename: &str, data: &[u8]) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Text extraction failed: {}", e)))?;
        let content = cleanup_pdf_text(&text);

        if content.is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(content)
    }
}

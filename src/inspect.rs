//! Post-render verification of produced PDF files.
//!
//! Rendering is deterministic, but the bytes still leave the process and
//! land in archives and mail pipelines. This module re-opens a finished
//! file with an independent parser and answers the questions a delivery
//! step asks: does it parse, how many pages, is it encrypted, what text
//! comes back out.

use std::path::Path;

use lopdf::Document as LoDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectErrorCode {
    ParseFailed,
    Encrypted,
    NoPages,
    Io,
}

impl InspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectErrorCode::ParseFailed => "PDF_PARSE_FAILED",
            InspectErrorCode::Encrypted => "PDF_ENCRYPTED",
            InspectErrorCode::NoPages => "PDF_NO_PAGES",
            InspectErrorCode::Io => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectError {
    pub code: InspectErrorCode,
    pub message: String,
}

impl std::fmt::Display for InspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for InspectError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfSummary {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
}

pub fn inspect_bytes(bytes: &[u8]) -> Result<PdfSummary, InspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| InspectError {
        code: InspectErrorCode::ParseFailed,
        message: err.to_string(),
    })?;

    Ok(PdfSummary {
        pdf_version: pdf.version.clone(),
        page_count: pdf.get_pages().len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
    })
}

pub fn inspect_path(path: &Path) -> Result<PdfSummary, InspectError> {
    let data = std::fs::read(path).map_err(|err| InspectError {
        code: InspectErrorCode::Io,
        message: err.to_string(),
    })?;
    inspect_bytes(&data)
}

/// Text of one page as the parser recovers it, pages numbered from 1.
/// With the embedded font path this round-trips through the ToUnicode
/// CMap, so Arabic content comes back as characters, not glyph ids.
pub fn extract_page_text(bytes: &[u8], page_number: u32) -> Result<String, InspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| InspectError {
        code: InspectErrorCode::ParseFailed,
        message: err.to_string(),
    })?;
    pdf.extract_text(&[page_number]).map_err(|err| InspectError {
        code: InspectErrorCode::ParseFailed,
        message: err.to_string(),
    })
}

pub fn delivery_issues(summary: &PdfSummary) -> Vec<InspectErrorCode> {
    let mut issues = Vec::new();
    if summary.encrypted {
        issues.push(InspectErrorCode::Encrypted);
    }
    if summary.page_count == 0 {
        issues.push(InspectErrorCode::NoPages);
    }
    issues
}

pub fn require_deliverable(summary: &PdfSummary) -> Result<(), InspectError> {
    for issue in delivery_issues(summary) {
        match issue {
            InspectErrorCode::Encrypted => {
                return Err(InspectError {
                    code: InspectErrorCode::Encrypted,
                    message: "encrypted output cannot be delivered".to_string(),
                });
            }
            InspectErrorCode::NoPages => {
                return Err(InspectError {
                    code: InspectErrorCode::NoPages,
                    message: "pdf has no pages".to_string(),
                });
            }
            InspectErrorCode::ParseFailed | InspectErrorCode::Io => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Command, Document, Page};
    use crate::trace::TraceLogger;
    use crate::types::{Pt, Size};

    fn rendered_pdf_bytes(text: &str) -> Vec<u8> {
        let doc = Document {
            page_size: Size::a4(),
            pages: vec![Page {
                commands: vec![Command::DrawText {
                    x: Pt::from_i32(72),
                    y: Pt::from_i32(72),
                    size: Pt::from_i32(14),
                    text: text.to_string(),
                }],
            }],
            face: None,
        };
        crate::pdf::document_to_pdf(&doc, Some("Report"), &TraceLogger::disabled())
            .expect("write pdf")
    }

    #[test]
    fn our_own_output_parses() {
        let bytes = rendered_pdf_bytes("hello");
        let summary = inspect_bytes(&bytes).expect("inspect");
        assert_eq!(summary.page_count, 1);
        assert!(!summary.encrypted);
        assert_eq!(summary.file_size_bytes, bytes.len());
        assert!(!summary.pdf_version.is_empty());
        assert!(require_deliverable(&summary).is_ok());
    }

    #[test]
    fn page_text_round_trips_through_the_parser() {
        let bytes = rendered_pdf_bytes("٨٢٪");
        // Fallback output carries the ASCII stand-ins for the digits.
        let text = extract_page_text(&bytes, 1).expect("extract");
        assert!(text.contains("82%"));
    }

    #[test]
    fn malformed_data_is_rejected() {
        let err = inspect_bytes(b"not a pdf").expect_err("invalid");
        assert_eq!(err.code, InspectErrorCode::ParseFailed);
    }

    #[test]
    fn missing_file_reports_io_error() {
        let missing = std::env::temp_dir().join(format!(
            "taqrir_inspect_missing_{}_{}.pdf",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        let err = inspect_path(&missing).expect_err("missing");
        assert_eq!(err.code, InspectErrorCode::Io);
    }

    #[test]
    fn delivery_rejects_empty_page_count() {
        let summary = PdfSummary {
            pdf_version: "1.7".to_string(),
            page_count: 0,
            encrypted: false,
            file_size_bytes: 0,
        };
        assert_eq!(delivery_issues(&summary), vec![InspectErrorCode::NoPages]);
        let err = require_deliverable(&summary).expect_err("must fail");
        assert_eq!(err.code, InspectErrorCode::NoPages);
    }

    #[test]
    fn delivery_rejects_encrypted_files() {
        let summary = PdfSummary {
            pdf_version: "1.7".to_string(),
            page_count: 1,
            encrypted: true,
            file_size_bytes: 1024,
        };
        let issues = delivery_issues(&summary);
        assert!(issues.contains(&InspectErrorCode::Encrypted));
        let err = require_deliverable(&summary).expect_err("must fail");
        assert_eq!(err.code, InspectErrorCode::Encrypted);
    }
}

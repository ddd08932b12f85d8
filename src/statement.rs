//! Statement file decoding — CSV, PDF and plain text into analyzable text.

use csv::ReaderBuilder;
use std::fmt::Write as _;
use tracing::{info, warn};

use crate::error::ParseError;
use crate::mailbox::types::Attachment;

/// Declared/detected statement file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    Csv,
    Pdf,
    Text,
    Unknown,
}

/// Detect the format from the filename extension, falling back to the
/// declared MIME type.
pub fn detect_format(filename: &str, mime_type: &str) -> StatementFormat {
    let name = filename.to_lowercase();
    if name.ends_with(".csv") {
        return StatementFormat::Csv;
    }
    if name.ends_with(".pdf") {
        return StatementFormat::Pdf;
    }
    if name.ends_with(".txt") {
        return StatementFormat::Text;
    }
    if mime_type.contains("csv") {
        return StatementFormat::Csv;
    }
    if mime_type.contains("pdf") {
        return StatementFormat::Pdf;
    }
    if mime_type.contains("text") {
        return StatementFormat::Text;
    }
    StatementFormat::Unknown
}

/// Extract plain text from a statement attachment.
///
/// Unknown formats pass through as raw decoded text rather than failing —
/// the analysis step copes with loosely structured input.
pub fn extract_text(attachment: &Attachment) -> Result<String, ParseError> {
    let format = detect_format(&attachment.filename, &attachment.mime_type);
    info!(
        filename = %attachment.filename,
        mime_type = %attachment.mime_type,
        ?format,
        "Parsing statement attachment"
    );

    match format {
        StatementFormat::Csv => expand_csv(&attachment.content),
        StatementFormat::Pdf => extract_pdf(&attachment.content),
        StatementFormat::Text => std::str::from_utf8(&attachment.content)
            .map(str::to_string)
            .map_err(|e| ParseError::Encoding(e.to_string())),
        StatementFormat::Unknown => {
            warn!(filename = %attachment.filename, "Unsupported statement format, passing through");
            Ok(String::from_utf8_lossy(&attachment.content).into_owned())
        }
    }
}

/// Expand CSV rows into one labeled block per transaction, keyed by the
/// header row.
fn expand_csv(bytes: &[u8]) -> Result<String, ParseError> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ParseError::Csv(e.to_string()))?
        .clone();

    let mut formatted = String::from("Credit Card Transactions:\n\n");
    let mut count = 0usize;
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ParseError::Csv(e.to_string()))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let _ = writeln!(formatted, "Transaction {}:", index + 1);
        for (key, value) in headers.iter().zip(record.iter()) {
            let _ = writeln!(formatted, "  {key}: {value}");
        }
        formatted.push('\n');
        count += 1;
    }

    info!(records = count, "Parsed records from CSV");
    Ok(formatted)
}

/// Page-concatenated PDF text extraction.
fn extract_pdf(bytes: &[u8]) -> Result<String, ParseError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ParseError::Pdf(e.to_string()))
}

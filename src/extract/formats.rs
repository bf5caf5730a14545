//! Per-format decoders
//!
//! Each decoder turns raw upload bytes into plain text. None of them apply
//! the length limit; `prepare_file` does that once for every format.

use crate::error::{ParleyError, Result};
use std::io::{Cursor, Read};

/// Extract text from a PDF, dropping blank lines
pub fn pdf_text(bytes: &[u8]) -> Result<String> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ParleyError::Extraction(format!("PDF parse error: {}", e)))?;

    let text = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(text)
}

/// Extract paragraph text from a DOCX (Office Open XML) archive
///
/// Legacy binary `.doc` files are not zip archives and fail here.
pub fn docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ParleyError::Extraction(format!("Failed to read document as ZIP: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ParleyError::Extraction(format!("Document missing word/document.xml: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| ParleyError::Extraction(format!("Failed to read document.xml: {}", e)))?;

    Ok(document_xml_text(&xml))
}

/// Collect `<w:t>` runs per `<w:p>` paragraph, one output line per paragraph
fn document_xml_text(xml: &str) -> String {
    let mut lines = Vec::new();
    let mut rest = xml;

    while let Some(start) = find_element(rest, "w:p") {
        let paragraph_start = &rest[start..];
        if paragraph_start.starts_with("<w:p/>") {
            rest = &paragraph_start["<w:p/>".len()..];
            continue;
        }
        let end = paragraph_start
            .find("</w:p>")
            .map(|i| i + "</w:p>".len())
            .unwrap_or(paragraph_start.len());
        let paragraph = &paragraph_start[..end];

        let text = paragraph_runs(paragraph);
        if !text.is_empty() {
            lines.push(text);
        }
        rest = &paragraph_start[end..];
    }

    lines.join("\n")
}

fn paragraph_runs(paragraph: &str) -> String {
    let mut text = String::new();
    let mut rest = paragraph;

    while let Some(start) = find_element(rest, "w:t") {
        let run = &rest[start..];
        let Some(open_end) = run.find('>') else {
            break;
        };
        // Self-closing <w:t/> carries no text.
        if run[..open_end].ends_with('/') {
            rest = &run[open_end + 1..];
            continue;
        }
        let content = &run[open_end + 1..];
        match content.find("</w:t>") {
            Some(close) => {
                text.push_str(&unescape_xml(&content[..close]));
                rest = &content[close + "</w:t>".len()..];
            }
            None => break,
        }
    }

    text
}

/// Byte offset of the next `<name>` or `<name ...>` open tag
///
/// A plain substring search would also hit `<w:pPr>` or `<w:tab/>`.
fn find_element(haystack: &str, name: &str) -> Option<usize> {
    let needle = format!("<{}", name);
    let mut offset = 0;
    while let Some(found) = haystack[offset..].find(&needle) {
        let at = offset + found;
        let next = haystack[at + needle.len()..].chars().next();
        if matches!(next, Some('>') | Some(' ') | Some('/')) {
            return Some(at);
        }
        offset = at + needle.len();
    }
    None
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// First `max_rows` CSV records, fields joined with `", "`
pub fn csv_text(bytes: &[u8], max_rows: usize) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records().take(max_rows) {
        let record =
            record.map_err(|e| ParleyError::Extraction(format!("CSV parse error: {}", e)))?;
        rows.push(record.iter().collect::<Vec<_>>().join(", "));
    }

    Ok(rows.join("\n"))
}

/// Lossy UTF-8 decode for everything without a dedicated decoder
pub fn plain_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
pub(crate) fn docx_fixture(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;

    let body: String = paragraphs
        .iter()
        .map(|p| {
            format!(
                r#"<w:p><w:pPr><w:pStyle w:val="Normal"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                p
            )
        })
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

//! Encoding-tolerant text loading
//!
//! Instrument exports arrive in whatever encoding the acquisition PC used.
//! The loader tries each configured encoding in order and, when all of them
//! reject the bytes, decodes UTF-8 lossily so a single bad byte never costs
//! the whole file.

use crate::Result;
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, warn};

/// Label reported when every configured encoding failed
pub const LOSSY_LABEL: &str = "utf-8 (lossy)";

/// Decoded file contents
#[derive(Debug, Clone)]
pub struct DecodedText {
    /// Decoded text
    pub text: String,
    /// Encoding label that succeeded, or [`LOSSY_LABEL`]
    pub encoding: String,
}

impl DecodedText {
    /// True when undecodable bytes were replaced
    pub fn is_lossy(&self) -> bool {
        self.encoding == LOSSY_LABEL
    }
}

/// Reads files by trying an ordered list of encodings
#[derive(Debug, Clone)]
pub struct TextLoader {
    encodings: Vec<String>,
}

impl TextLoader {
    pub fn new(encodings: Vec<String>) -> Self {
        Self { encodings }
    }

    /// Read and decode a file. Only I/O failures are errors.
    pub fn read(&self, path: &Path) -> Result<DecodedText> {
        let bytes = std::fs::read(path)?;
        let decoded = self.decode(&bytes);
        if decoded.is_lossy() {
            warn!(
                "{}: no configured encoding matched, decoded with replacement characters",
                path.display()
            );
        } else {
            debug!("{}: decoded as {}", path.display(), decoded.encoding);
        }
        Ok(decoded)
    }

    /// Read a file and split it into rows of cells
    pub fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>> {
        let decoded = self.read(path)?;
        Ok(split_rows(&decoded.text))
    }

    /// Decode bytes with the first encoding that accepts them
    pub fn decode(&self, bytes: &[u8]) -> DecodedText {
        for label in &self.encodings {
            if let Some(text) = decode_strict(bytes, label) {
                return DecodedText {
                    text: text.into_owned(),
                    encoding: label.clone(),
                };
            }
        }
        DecodedText {
            text: String::from_utf8_lossy(bytes).into_owned(),
            encoding: LOSSY_LABEL.to_string(),
        }
    }
}

/// Decode without replacement; `None` when the bytes are not valid in `label`
/// or the label is unknown.
pub fn decode_strict<'a>(bytes: &'a [u8], label: &str) -> Option<Cow<'a, str>> {
    let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
    match normalized.as_str() {
        "utf-8-sig" | "utf8-sig" => {
            let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            std::str::from_utf8(body).ok().map(Cow::Borrowed)
        }
        "utf-8" | "utf8" => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
        other => {
            let whatwg = match other {
                "cp932" | "ms932" | "mskanji" => "windows-31j",
                "sjis" | "shift-jis" => "shift_jis",
                _ => other,
            };
            match Encoding::for_label(whatwg.as_bytes()) {
                Some(encoding) => encoding.decode_without_bom_handling_and_without_replacement(bytes),
                None => {
                    warn!("Unknown text encoding {:?}, skipping", label);
                    None
                }
            }
        }
    }
}

/// Split decoded text into rows of untrimmed cells
///
/// An empty line becomes an empty row so that scanners can see blank-row
/// boundaries. A quoted cell spanning lines is joined before parsing; a quote
/// in the middle of a cell is literal text.
pub fn split_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut pending = String::new();

    for line in text.lines() {
        if pending.is_empty() && line.is_empty() {
            rows.push(Vec::new());
            continue;
        }
        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(line);

        if ends_inside_quotes(&pending) {
            continue;
        }
        rows.push(parse_record(&pending));
        pending.clear();
    }

    if !pending.is_empty() {
        rows.push(parse_record(&pending));
    }
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    /// A quote inside a quoted field: closes it, or escapes a second quote
    QuoteInQuoted,
}

/// True when a quoted field opened at the start of a cell is still open at
/// the end of `record`. Same quoting rules as the `csv` reader.
fn ends_inside_quotes(record: &str) -> bool {
    let mut state = QuoteState::FieldStart;
    for c in record.chars() {
        state = match (state, c) {
            (QuoteState::Quoted, '"') => QuoteState::QuoteInQuoted,
            (QuoteState::Quoted, _) => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted, '"') => QuoteState::Quoted,
            (_, ',') | (_, '\n') => QuoteState::FieldStart,
            (QuoteState::FieldStart, '"') => QuoteState::Quoted,
            _ => QuoteState::Unquoted,
        };
    }
    state == QuoteState::Quoted
}

fn parse_record(line: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(str::to_string).collect(),
        Ok(false) => Vec::new(),
        Err(e) => {
            debug!("Malformed delimited line, splitting on commas: {}", e);
            line.split(',').map(str::to_string).collect()
        }
    }
}

/// True when a row has no cells or only whitespace cells
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// First cell of a row, trimmed; empty for an empty row
pub fn first_cell(row: &[String]) -> &str {
    row.first().map(|c| c.trim()).unwrap_or("")
}

/// Parse a locale-tolerant number: thousands commas are stripped, blanks and
/// non-finite values are missing.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> TextLoader {
        TextLoader::new(vec![
            "utf-8-sig".to_string(),
            "cp932".to_string(),
            "utf-8".to_string(),
        ])
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let decoded = loader().decode(b"\xEF\xBB\xBFEye,S/N\nL,611167\n");
        assert_eq!(decoded.encoding, "utf-8-sig");
        assert!(decoded.text.starts_with("Eye"));
    }

    #[test]
    fn test_shift_jis_fallback() {
        // "あい" in Shift_JIS
        let bytes = b"Sector,\x82\xa0\x82\xa2\n";
        let decoded = loader().decode(bytes);
        assert_eq!(decoded.encoding, "cp932");
        assert_eq!(decoded.text, "Sector,あい\n");
    }

    #[test]
    fn test_lossy_fallback_never_fails() {
        let only_utf8 = TextLoader::new(vec!["utf-8".to_string()]);
        let decoded = only_utf8.decode(b"Center,\xff1.0\n");
        assert!(decoded.is_lossy());
        assert!(decoded.text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_unknown_encoding_is_skipped() {
        let odd = TextLoader::new(vec!["no-such-encoding".to_string(), "utf-8".to_string()]);
        assert_eq!(odd.decode(b"a,b").encoding, "utf-8");
    }

    #[test]
    fn test_split_rows_keeps_blank_lines() {
        let rows = split_rows("Eye,S/N\r\nL,611167\r\n\r\n<ETDRS>\n");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["Eye", "S/N"]);
        assert!(rows[2].is_empty());
        assert_eq!(rows[3], vec!["<ETDRS>"]);
    }

    #[test]
    fn test_split_rows_quoted_cells() {
        let rows = split_rows("Size,\"0.5/1.5, 3.0mm\"\n\"multi\nline\",x\n");
        assert_eq!(rows[0], vec!["Size", "0.5/1.5, 3.0mm"]);
        assert_eq!(rows[1], vec!["multi\nline", "x"]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_split_rows_mid_cell_quote_is_literal() {
        let rows = split_rows(
            "Comment,5\" lens\nEye,S/N\nL,611167\n\n<ETDRS 9 Sector Density>\nCenter,0.00,0.00\n",
        );
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0], vec!["Comment", "5\" lens"]);
        assert_eq!(rows[1], vec!["Eye", "S/N"]);
        assert!(rows[3].is_empty());
        assert_eq!(rows[5], vec!["Center", "0.00", "0.00"]);
    }

    #[test]
    fn test_split_rows_escaped_quotes_stay_in_cell() {
        let rows = split_rows("Note,\"say \"\"hi\"\"\nthere\"\nCenter,1.0\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["Note", "say \"hi\"\nthere"]);
        assert_eq!(rows[1], vec!["Center", "1.0"]);
    }

    #[test]
    fn test_split_rows_does_not_trim() {
        let rows = split_rows(" Center , 1.5 ,\n");
        assert_eq!(rows[0], vec![" Center ", " 1.5 ", ""]);
    }

    #[test]
    fn test_blank_row_detection() {
        assert!(is_blank_row(&[]));
        assert!(is_blank_row(&["".to_string(), "  ".to_string()]));
        assert!(!is_blank_row(&["".to_string(), "x".to_string()]));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number(" 0.00 "), Some(0.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("nan"), None);
    }
}

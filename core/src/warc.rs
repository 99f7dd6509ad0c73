//! WARC/1.0 record codec.
//!
//! A record is a plain-text header block, a blank line, the raw payload and
//! the WARC trailer, all gzip-compressed as one member so that each record can
//! be decompressed on its own given its byte span in the archive file.

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::gzip;

pub const WARC_VERSION: &str = "WARC/1.0";
pub const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";
const CRLF: &str = "\r\n";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("compressed input of {0} bytes exceeds the 4 GiB limit")]
    InputTooLarge(u64),
    #[error("decompression failed: {0}")]
    Decompression(String),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("archive read failed: {0}")]
    Read(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One decoded archive record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub record_id: String,
    pub target_uri: String,
    pub date: Option<String>,
    /// Uncompressed payload size in bytes.
    pub content_length: usize,
    /// Header fields in file order, names as written.
    pub headers: Vec<(String, String)>,
    pub content: Vec<u8>,
}

impl ArchiveRecord {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn record_header(url: &str, content_length: usize) -> String {
    let date = time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    let fields = [
        ("WARC-Type", "response".to_string()),
        ("WARC-Target-URI", url.to_string()),
        ("WARC-Date", date),
        ("WARC-Record-ID", format!("<urn:uuid:{}>", Uuid::new_v4())),
        ("Content-Type", "text/html".to_string()),
        ("Content-Length", content_length.to_string()),
    ];
    let mut header = String::from(WARC_VERSION);
    header.push_str(CRLF);
    for (name, value) in fields {
        header.push_str(name);
        header.push_str(": ");
        header.push_str(&value);
        header.push_str(CRLF);
    }
    header
}

/// Serialize the uncompressed record: header, blank line, content, trailer.
pub fn encode_uncompressed(url: &str, content: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    if url.contains(|c: char| c == '\r' || c == '\n') {
        return Err(ArchiveError::MalformedRecord("url contains a line break".into()));
    }
    let header = record_header(url, content.len());
    let mut raw = Vec::with_capacity(header.len() + content.len() + 2 * HEADER_SEPARATOR.len());
    raw.extend_from_slice(header.as_bytes());
    raw.extend_from_slice(CRLF.as_bytes());
    raw.extend_from_slice(content);
    raw.extend_from_slice(HEADER_SEPARATOR);
    Ok(raw)
}

/// Encode one record into an independently decompressible gzip blob.
pub fn encode(url: &str, content: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    gzip::compress(&encode_uncompressed(url, content)?)
}

/// Inverse of [`encode`].
pub fn decode(compressed: &[u8]) -> Result<ArchiveRecord, ArchiveError> {
    let raw = gzip::decompress(compressed)?;
    parse_record(&raw)
}

/// Split a decompressed record at its first blank line and parse the header.
pub fn parse_record(raw: &[u8]) -> Result<ArchiveRecord, ArchiveError> {
    let split = find_separator(raw)
        .ok_or_else(|| ArchiveError::MalformedRecord("no header separator found".into()))?;
    let header = std::str::from_utf8(&raw[..split])
        .map_err(|_| ArchiveError::MalformedRecord("header is not valid UTF-8".into()))?;
    let rest = &raw[split + HEADER_SEPARATOR.len()..];

    let mut lines = header.split(CRLF);
    match lines.next() {
        Some(v) if v.starts_with("WARC/") => {}
        _ => return Err(ArchiveError::MalformedRecord("missing WARC version line".into())),
    }
    let mut headers = Vec::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ArchiveError::MalformedRecord(format!("bad header line: {line:?}")))?;
        // Only the single space written after the colon belongs to the syntax.
        let value = value.strip_prefix(' ').unwrap_or(value);
        headers.push((name.trim().to_string(), value.to_string()));
    }

    let lookup = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };
    let target_uri = lookup("WARC-Target-URI")
        .ok_or_else(|| ArchiveError::MalformedRecord("missing WARC-Target-URI".into()))?;
    let record_id = lookup("WARC-Record-ID").unwrap_or_default();
    let date = lookup("WARC-Date");

    let content = match lookup("Content-Length") {
        Some(declared) => {
            let n: usize = declared.trim().parse().map_err(|_| {
                ArchiveError::MalformedRecord(format!("bad Content-Length: {declared:?}"))
            })?;
            if n > rest.len() {
                return Err(ArchiveError::MalformedRecord(format!(
                    "Content-Length {n} exceeds the {} payload bytes present",
                    rest.len()
                )));
            }
            rest[..n].to_vec()
        }
        None => rest.to_vec(),
    };

    Ok(ArchiveRecord {
        record_id,
        target_uri,
        date,
        content_length: content.len(),
        headers,
        content,
    })
}

fn find_separator(raw: &[u8]) -> Option<usize> {
    raw.windows(HEADER_SEPARATOR.len())
        .position(|w| w == HEADER_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields_are_written() {
        let raw = encode_uncompressed("http://example.com/a", b"hello").unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(text.starts_with("WARC/1.0\r\n"));
        assert!(text.contains("WARC-Target-URI: http://example.com/a\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.contains("WARC-Record-ID: <urn:uuid:"));
        assert!(text.ends_with("\r\n\r\nhello\r\n\r\n"));
    }

    #[test]
    fn record_ids_are_unique() {
        let a = decode(&encode("http://a", b"x").unwrap()).unwrap();
        let b = decode(&encode("http://a", b"x").unwrap()).unwrap();
        assert_ne!(a.record_id, b.record_id);
    }

    #[test]
    fn body_may_contain_blank_lines() {
        let body = b"line one\r\n\r\nline two";
        let rec = decode(&encode("http://example.com", body).unwrap()).unwrap();
        assert_eq!(rec.content, body);
        assert_eq!(rec.content_length, body.len());
    }

    #[test]
    fn missing_separator_is_malformed() {
        let packed = gzip::compress(b"WARC/1.0\r\nWARC-Target-URI: x\r\n").unwrap();
        assert!(matches!(decode(&packed), Err(ArchiveError::MalformedRecord(_))));
    }

    #[test]
    fn short_body_is_malformed() {
        let raw = b"WARC/1.0\r\nWARC-Target-URI: http://x\r\nContent-Length: 50\r\n\r\nshort";
        assert!(matches!(parse_record(raw), Err(ArchiveError::MalformedRecord(_))));
    }

    #[test]
    fn body_without_length_takes_remainder() {
        let raw = b"WARC/1.0\r\nWARC-Target-URI: http://x\r\n\r\n<p>hi</p>";
        let rec = parse_record(raw).unwrap();
        assert_eq!(rec.content, b"<p>hi</p>");
        assert_eq!(rec.header("warc-target-uri"), Some("http://x"));
    }

    #[test]
    fn url_whitespace_survives_decode() {
        for url in [" http://example.com", "http://example.com ", "  spaced  ", ""] {
            let rec = decode(&encode(url, b"body").unwrap()).unwrap();
            assert_eq!(rec.target_uri, url);
        }
    }

    #[test]
    fn url_with_line_break_is_refused() {
        assert!(encode("http://x\r\nWARC-Type: evil", b"").is_err());
    }
}

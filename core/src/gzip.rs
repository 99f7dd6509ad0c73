use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::warc::ArchiveError;

/// Hard ceiling on the size of one decompressed record.
pub const MAX_DECOMPRESSED_SIZE: u64 = 100 * 1024 * 1024;

/// Largest compressed input accepted by [`decompress`].
pub const MAX_COMPRESSED_SIZE: u64 = u32::MAX as u64;

/// Compress `data` as a single gzip member.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 64), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress one gzip member, refusing inputs above 4 GiB and outputs above
/// [`MAX_DECOMPRESSED_SIZE`].
pub fn decompress(compressed: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    decompress_with_limit(compressed, MAX_DECOMPRESSED_SIZE)
}

pub fn decompress_with_limit(compressed: &[u8], limit: u64) -> Result<Vec<u8>, ArchiveError> {
    check_input_len(compressed.len() as u64)?;

    let mut out = Vec::new();
    // Read one byte past the limit so an oversized stream is detectable.
    GzDecoder::new(compressed)
        .take(limit.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| ArchiveError::Decompression(e.to_string()))?;
    if out.len() as u64 > limit {
        return Err(ArchiveError::Decompression(format!(
            "decompressed data exceeds maximum allowed size of {limit} bytes"
        )));
    }
    Ok(out)
}

pub(crate) fn check_input_len(len: u64) -> Result<(), ArchiveError> {
    if len > MAX_COMPRESSED_SIZE {
        return Err(ArchiveError::InputTooLarge(len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_roundtrip() {
        let packed = compress(b"").unwrap();
        assert!(!packed.is_empty());
        assert_eq!(decompress(&packed).unwrap(), b"");
    }

    #[test]
    fn text_roundtrip() {
        let original = b"This is a test string for gzip compression.";
        let packed = compress(original).unwrap();
        assert_eq!(decompress(&packed).unwrap(), original);
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let packed = compress(&b"some reasonably long payload ".repeat(64)).unwrap();
        let cut = &packed[..packed.len() / 2];
        assert!(matches!(decompress(cut), Err(ArchiveError::Decompression(_))));
    }

    #[test]
    fn corrupt_stream_is_rejected() {
        assert!(matches!(
            decompress(b"definitely not gzip"),
            Err(ArchiveError::Decompression(_))
        ));
    }

    #[test]
    fn output_limit_is_enforced() {
        let packed = compress(&vec![b'a'; 4096]).unwrap();
        assert!(matches!(
            decompress_with_limit(&packed, 1024),
            Err(ArchiveError::Decompression(_))
        ));
        assert_eq!(decompress_with_limit(&packed, 4096).unwrap().len(), 4096);
    }

    #[test]
    fn oversized_input_is_rejected_before_decoding() {
        assert!(matches!(
            check_input_len(MAX_COMPRESSED_SIZE + 1),
            Err(ArchiveError::InputTooLarge(_))
        ));
        assert!(check_input_len(MAX_COMPRESSED_SIZE).is_ok());
    }
}

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::gzip;
use crate::warc::{self, ArchiveError};

/// Byte span of one compressed record inside an archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordLocation {
    pub offset: u64,
    pub length: u64,
}

/// Append-only writer for `.warc.gz` archives. Single writer per file.
pub struct ArchiveWriter {
    file: File,
    path: PathBuf,
    position: u64,
    sync: bool,
}

impl ArchiveWriter {
    /// Open (or create) an archive for appending. Offsets continue from the
    /// current end of the file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let position = file.metadata()?.len();
        Ok(Self { file, path, position, sync: false })
    }

    /// Call `sync_data` after each record.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Current end-of-archive offset.
    pub fn position(&self) -> u64 { self.position }

    /// Append one record and return where it landed. Offsets are taken from
    /// the file length, so bytes left behind by an earlier failed write never
    /// shift a returned location.
    pub fn write_record(&mut self, url: &str, content: &[u8]) -> Result<RecordLocation, ArchiveError> {
        let blob = warc::encode(url, content)?;
        let offset = self.file.metadata()?.len();
        if let Err(e) = self.append(&blob) {
            self.rewind(offset);
            return Err(e.into());
        }
        let length = blob.len() as u64;
        self.position = offset + length;
        tracing::debug!(url, offset, length, path = %self.path.display(), "archived record");
        Ok(RecordLocation { offset, length })
    }

    fn append(&mut self, blob: &[u8]) -> std::io::Result<()> {
        self.file.write_all(blob)?;
        self.file.flush()?;
        if self.sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Drop a partial record and resync the cursor with the file.
    fn rewind(&mut self, offset: u64) {
        if let Err(e) = self.file.set_len(offset) {
            tracing::warn!(path = %self.path.display(), offset, error = %e, "could not truncate partial record");
        }
        self.position = self.file.metadata().map(|m| m.len()).unwrap_or(offset);
    }
}

/// Read exactly the bytes of one record. The file handle is dropped on every
/// return path.
pub fn read_record_bytes<P: AsRef<Path>>(path: P, location: RecordLocation) -> Result<Vec<u8>, ArchiveError> {
    let path = path.as_ref();
    if location.length == 0 {
        return Err(ArchiveError::Read(format!("zero-length record location in {}", path.display())));
    }
    let mut file = File::open(path)
        .map_err(|e| ArchiveError::Read(format!("could not open {}: {e}", path.display())))?;
    let size = file.metadata()?.len();
    let end = location
        .offset
        .checked_add(location.length)
        .ok_or_else(|| ArchiveError::Read("record location overflows".into()))?;
    if end > size {
        return Err(ArchiveError::Read(format!(
            "record [{}, {end}) lies beyond end of {} ({size} bytes)",
            location.offset,
            path.display()
        )));
    }
    gzip::check_input_len(location.length)?;
    let length = usize::try_from(location.length)
        .map_err(|_| ArchiveError::InputTooLarge(location.length))?;

    file.seek(SeekFrom::Start(location.offset))?;
    let mut buf = vec![0u8; length];
    file.read_exact(&mut buf).map_err(|e| {
        ArchiveError::Read(format!(
            "failed to read full record: expected {} bytes at {}: {e}",
            location.length, location.offset
        ))
    })?;
    Ok(buf)
}

/// Random-access read followed by decode.
pub fn read_record<P: AsRef<Path>>(path: P, location: RecordLocation) -> Result<warc::ArchiveRecord, ArchiveError> {
    let bytes = read_record_bytes(path, location)?;
    warc::decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reopen_continues_offsets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crawl.warc.gz");
        let first = ArchiveWriter::open(&path).unwrap().write_record("http://a", b"one").unwrap();
        let mut writer = ArchiveWriter::open(&path).unwrap();
        assert_eq!(writer.position(), first.length);
        let second = writer.write_record("http://b", b"two").unwrap();
        assert_eq!(second.offset, first.offset + first.length);
    }

    #[test]
    fn location_past_eof_is_a_read_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crawl.warc.gz");
        let loc = ArchiveWriter::open(&path).unwrap().write_record("http://a", b"x").unwrap();
        let bad = RecordLocation { offset: loc.offset + 1, length: loc.length };
        assert!(matches!(read_record_bytes(&path, bad), Err(ArchiveError::Read(_))));
    }

    #[test]
    fn offsets_follow_the_file_past_stray_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crawl.warc.gz");
        let mut writer = ArchiveWriter::open(&path).unwrap();
        let first = writer.write_record("http://a", b"one").unwrap();

        // Leftovers of a torn append.
        let junk = [0x1f, 0x8b, 0x08, 0x00, 0x42];
        OpenOptions::new().append(true).open(&path).unwrap().write_all(&junk).unwrap();

        let second = writer.write_record("http://b", b"two").unwrap();
        assert_eq!(second.offset, first.length + junk.len() as u64);
        assert_eq!(writer.position(), second.offset + second.length);
        assert_eq!(read_record(&path, second).unwrap().content, b"two");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_write_leaves_the_cursor_at_the_file_end() {
        if !Path::new("/dev/full").exists() {
            return;
        }
        let mut writer = ArchiveWriter::open("/dev/full").unwrap();
        assert!(matches!(writer.write_record("http://a", b"body"), Err(ArchiveError::Io(_))));
        assert_eq!(writer.position(), 0);
        assert_eq!(writer.path(), Path::new("/dev/full"));
    }

    #[test]
    fn oversized_location_is_refused_before_reading() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crawl.warc.gz");
        std::fs::File::create(&path).unwrap().set_len(gzip::MAX_COMPRESSED_SIZE + 2).unwrap();
        let loc = RecordLocation { offset: 0, length: gzip::MAX_COMPRESSED_SIZE + 1 };
        assert!(matches!(read_record_bytes(&path, loc), Err(ArchiveError::InputTooLarge(_))));
    }

    #[test]
    fn zero_length_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crawl.warc.gz");
        std::fs::write(&path, b"abc").unwrap();
        let loc = RecordLocation { offset: 0, length: 0 };
        assert!(matches!(read_record_bytes(&path, loc), Err(ArchiveError::Read(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let loc = RecordLocation { offset: 0, length: 10 };
        assert!(matches!(
            read_record_bytes(dir.path().join("absent.warc.gz"), loc),
            Err(ArchiveError::Read(_))
        ));
    }
}

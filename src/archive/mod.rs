//! Read-only archive filesystem over an in-memory tar-v7-style blob.
//!
//! Layout T only (see `DESIGN.md`): a sequence of 512-byte records, each a
//! tar v7 header immediately followed by its (512-padded) data. An all-zero
//! record ends the archive; every byte from that record to the end of the
//! blob must be zero, and a blob with no such terminator is rejected.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::djb2::djb2;
use crate::error::{EngineError, Result};
use crate::logging::{log_debug, log_error};

const RECORD_SIZE: usize = 512;
const NAME_LEN: usize = 100;
const SIZE_OFFSET: usize = 124;
const SIZE_LEN: usize = 12;
const TYPE_OFFSET: usize = 156;

/// Seek origin, matching the C `SEEK_SET`/`SEEK_CUR`/`SEEK_END` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    Start,
    Current,
    End,
}

#[derive(Debug)]
struct FileEntry {
    hash: u32,
    path: String,
    offset: usize,
    size: u64,
}

/// A parsed, read-only archive. Borrows nothing past construction: file
/// data is referenced by `(offset, size)` into the archive the caller keeps
/// alive for the `Archive`'s own lifetime.
pub struct Archive<'a> {
    data: &'a [u8],
    entries: Vec<FileEntry>,
}

impl<'a> Archive<'a> {
    /// Parses `data` as a tar-v7-style archive. Two passes: the first
    /// validates structure (NUL-terminated names, parseable octal sizes,
    /// in-bounds record spans, an all-zero terminator record with nothing
    /// but zero bytes after it) without allocating; the second fills and
    /// sorts the entry table. A blob with no terminator at all is rejected.
    pub fn open(data: &'a [u8]) -> Result<Self> {
        let mut offset = 0usize;
        let mut raw_entries: Vec<(String, usize, u64)> = Vec::new();
        let mut terminated = false;

        while offset < data.len() {
            if offset + RECORD_SIZE > data.len() {
                return Err(EngineError::InvalidArchive {
                    reason: "truncated record".to_string(),
                });
            }
            let record = &data[offset..offset + RECORD_SIZE];
            if record[0] == 0 {
                // The terminator record, and everything after it to the end
                // of the archive, must be all zero.
                if !data[offset..].iter().all(|&b| b == 0) {
                    return Err(EngineError::InvalidArchive {
                        reason: "trailing bytes after end-of-archive terminator are not zero"
                            .to_string(),
                    });
                }
                terminated = true;
                break;
            }

            let name = parse_name(record)?;
            let size = parse_octal_size(record)?;
            let data_start = offset + RECORD_SIZE;
            let padded = size.div_ceil(RECORD_SIZE as u64) as usize * RECORD_SIZE;
            if data_start + padded > data.len() {
                return Err(EngineError::InvalidArchive {
                    reason: "record data exceeds archive bounds".to_string(),
                });
            }

            // Regular files only ('0' or NUL type flag); anything else
            // (directories, links) has no byte payload the filesystem serves.
            let type_flag = record[TYPE_OFFSET];
            if type_flag == b'0' || type_flag == 0 {
                raw_entries.push((name, data_start, size));
            }

            offset = data_start + padded;
        }

        if !terminated {
            return Err(EngineError::InvalidArchive {
                reason: "missing end-of-archive terminator".to_string(),
            });
        }

        let mut entries: Vec<FileEntry> = raw_entries
            .into_iter()
            .map(|(path, data_offset, size)| {
                let hash = djb2(&path);
                FileEntry {
                    hash,
                    path,
                    offset: data_offset,
                    size,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.hash.cmp(&b.hash).then_with(|| a.path.cmp(&b.path)));

        log_debug!("archive: parsed {} entries", entries.len());
        Ok(Archive { data, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, path: &str) -> Option<usize> {
        let hash = djb2(path);
        let idx = self
            .entries
            .partition_point(|e| e.hash < hash || (e.hash == hash && e.path.as_str() < path));
        self.entries
            .get(idx)
            .filter(|e| e.hash == hash && e.path == path)
            .map(|_| idx)
    }

    pub fn file_size(&self, path: &str) -> Result<u64> {
        let idx = self.find(path).ok_or_else(|| {
            log_error!("archive: not found: {path}");
            EngineError::NotFound {
                path: path.to_string(),
            }
        })?;
        Ok(self.entries[idx].size)
    }

    /// Opens a read-only handle to `path`, positioned at offset 0.
    pub fn open_file(&self, path: &str) -> Result<FileHandle<'_, 'a>> {
        let idx = self.find(path).ok_or_else(|| {
            log_error!("archive: not found: {path}");
            EngineError::NotFound {
                path: path.to_string(),
            }
        })?;
        Ok(FileHandle {
            archive: self,
            entry: idx,
            pos: 0,
        })
    }
}

fn parse_name(record: &[u8]) -> Result<String> {
    let raw = &record[0..NAME_LEN];
    let end = raw.iter().position(|&b| b == 0).ok_or_else(|| EngineError::InvalidArchive {
        reason: "name field is not NUL-terminated".to_string(),
    })?;
    core::str::from_utf8(&raw[..end])
        .map(|s| s.to_string())
        .map_err(|_| EngineError::InvalidArchive {
            reason: "non-UTF-8 path".to_string(),
        })
}

fn parse_octal_size(record: &[u8]) -> Result<u64> {
    let raw = &record[SIZE_OFFSET..SIZE_OFFSET + SIZE_LEN];
    let end = raw
        .iter()
        .position(|&b| b == 0 || b == b' ')
        .unwrap_or(SIZE_LEN);
    let text = core::str::from_utf8(&raw[..end]).map_err(|_| EngineError::InvalidArchive {
        reason: "non-UTF-8 size field".to_string(),
    })?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(trimmed, 8).map_err(|_| EngineError::InvalidArchive {
        reason: "unparseable octal size field".to_string(),
    })
}

/// A read-only cursor over one archived file.
pub struct FileHandle<'fs, 'a> {
    archive: &'fs Archive<'a>,
    entry: usize,
    pos: u64,
}

impl<'fs, 'a> FileHandle<'fs, 'a> {
    fn entry(&self) -> &FileEntry {
        &self.archive.entries[self.entry]
    }

    pub fn size(&self) -> u64 {
        self.entry().size
    }

    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// `End` subtracts `offset` from `size` rather than adding it — kept
    /// exactly as specified (see `DESIGN.md`'s open-question entry).
    pub fn seek(&mut self, offset: i64, whence: SeekFrom) -> Result<u64> {
        let size = self.size() as i64;
        let new_pos = match whence {
            SeekFrom::Start => offset,
            SeekFrom::Current => self.pos as i64 + offset,
            SeekFrom::End => size - offset,
        };
        if new_pos < 0 || new_pos > size {
            return Err(EngineError::InvalidSeek { pos: new_pos });
        }
        self.pos = new_pos as u64;
        Ok(self.pos)
    }

    /// Reads up to `buf.len()` bytes, returning the number actually read
    /// (clamped to the remaining file size), and advances the cursor.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let entry = self.entry();
        let remaining = entry.size.saturating_sub(self.pos) as usize;
        let n = remaining.min(buf.len());
        let start = entry.offset + self.pos as usize;
        buf[..n].copy_from_slice(&self.archive.data[start..start + n]);
        self.pos += n as u64;
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_record(name: &str, data: &[u8]) -> Vec<u8> {
        let mut record = alloc::vec![0u8; RECORD_SIZE];
        record[0..name.len()].copy_from_slice(name.as_bytes());
        let size_field = alloc::format!("{:011o}", data.len());
        record[SIZE_OFFSET..SIZE_OFFSET + size_field.len()].copy_from_slice(size_field.as_bytes());
        record[TYPE_OFFSET] = b'0';
        let mut out = record;
        out.extend_from_slice(data);
        let pad = (RECORD_SIZE - (data.len() % RECORD_SIZE)) % RECORD_SIZE;
        out.extend(core::iter::repeat(0u8).take(pad));
        out
    }

    fn build_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut blob = Vec::new();
        for (name, data) in files {
            blob.extend(pack_record(name, data));
        }
        blob.extend_from_slice(&[0u8; RECORD_SIZE]);
        blob
    }

    #[test]
    fn roundtrip_two_files() {
        let blob = build_archive(&[("a.bin", &[1, 2, 3, 4]), ("b.bin", &[])]);
        let archive = Archive::open(&blob).unwrap();
        assert_eq!(archive.file_size("a.bin").unwrap(), 4);
        assert_eq!(archive.file_size("b.bin").unwrap(), 0);

        let mut handle = archive.open_file("a.bin").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(handle.read(&mut buf), 4);
        assert_eq!(buf, [1, 2, 3, 4]);

        assert!(matches!(
            archive.open_file("missing"),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn seek_and_tell() {
        let blob = build_archive(&[("a.bin", &[1, 2, 3, 4, 5])]);
        let archive = Archive::open(&blob).unwrap();
        let mut handle = archive.open_file("a.bin").unwrap();
        handle.seek(3, SeekFrom::Start).unwrap();
        assert_eq!(handle.tell(), 3);
        let mut buf = [0u8; 2];
        assert_eq!(handle.read(&mut buf), 2);
        assert_eq!(buf, [4, 5]);
    }

    #[test]
    fn seek_end_subtracts() {
        let blob = build_archive(&[("a.bin", &[1, 2, 3, 4, 5])]);
        let archive = Archive::open(&blob).unwrap();
        let mut handle = archive.open_file("a.bin").unwrap();
        handle.seek(2, SeekFrom::End).unwrap();
        assert_eq!(handle.tell(), 3);
    }

    #[test]
    fn missing_terminator_is_rejected() {
        // No trailing all-zero record at all.
        let blob = pack_record("a.bin", &[1, 2, 3]);
        assert!(matches!(
            Archive::open(&blob),
            Err(EngineError::InvalidArchive { .. })
        ));
    }

    #[test]
    fn garbage_after_terminator_is_rejected() {
        let mut blob = build_archive(&[("a.bin", &[1, 2, 3])]);
        // Corrupt a byte past the terminator record.
        let last = blob.len() - 1;
        blob[last] = 0xFF;
        assert!(matches!(
            Archive::open(&blob),
            Err(EngineError::InvalidArchive { .. })
        ));
    }

    #[test]
    fn non_nul_terminated_name_is_rejected() {
        let mut record = alloc::vec![b'x'; RECORD_SIZE];
        // Fill the whole 100-byte name field with non-NUL bytes.
        for b in record[0..NAME_LEN].iter_mut() {
            *b = b'x';
        }
        let size_field = alloc::format!("{:011o}", 0);
        record[SIZE_OFFSET..SIZE_OFFSET + size_field.len()].copy_from_slice(size_field.as_bytes());
        record[TYPE_OFFSET] = b'0';
        let mut blob = record;
        blob.extend_from_slice(&[0u8; RECORD_SIZE]);
        assert!(matches!(
            Archive::open(&blob),
            Err(EngineError::InvalidArchive { .. })
        ));
    }

    #[test]
    fn invalid_seek_is_rejected() {
        let blob = build_archive(&[("a.bin", &[1, 2, 3])]);
        let archive = Archive::open(&blob).unwrap();
        let mut handle = archive.open_file("a.bin").unwrap();
        assert!(handle.seek(10, SeekFrom::Start).is_err());
        assert!(handle.seek(-1, SeekFrom::Start).is_err());
    }
}

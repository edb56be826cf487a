//! Script packaging into tar archives the runtime can extract.

use bytes::Bytes;
use std::io;

/// File name the script is materialized as inside the container.
pub const SCRIPT_NAME: &str = "script.sh";

/// Permission bits of the materialized script (owner read/write/execute).
pub const SCRIPT_MODE: u32 = 0o700;

/// Raw script uploaded for execution.
///
/// The destination name and mode are fixed; only the content varies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPayload {
    content: Bytes,
}

impl ScriptPayload {
    /// Wrap raw script bytes.
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Script content.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Content length in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// True if the script has no content.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Destination file name.
    pub fn file_name(&self) -> &'static str {
        SCRIPT_NAME
    }

    /// Destination permission bits.
    pub fn mode(&self) -> u32 {
        SCRIPT_MODE
    }

    /// Package the script as a single-entry archive.
    pub fn to_archive(&self) -> io::Result<Archive> {
        pack(self.content.clone(), self.file_name(), self.mode())
    }
}

/// One file inside an [`Archive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Relative path the runtime materializes under the destination directory.
    pub name: String,
    /// Permission bits.
    pub mode: u32,
    /// File content.
    pub content: Bytes,
    /// Declared size; always equals `content.len()`.
    pub size: u64,
}

/// A serialized tar archive together with the entries it contains.
#[derive(Debug, Clone)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
    bytes: Bytes,
}

impl Archive {
    /// Entries in archive order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Serialized tar stream.
    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Consume the archive, returning the tar stream.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Length of the tar stream in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the tar stream is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Wrap `content` into a single-entry tar archive.
///
/// The entry is a regular file named `entry_name` with permission bits
/// `mode`. Content is never inspected.
///
/// # Errors
///
/// Returns an error only if the stream cannot be written. Names longer than
/// a ustar header allows are carried in a GNU long-name entry.
pub fn pack(content: impl Into<Bytes>, entry_name: &str, mode: u32) -> io::Result<Archive> {
    let content: Bytes = content.into();
    let size = content.len() as u64;

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(size);
    header.set_mode(mode);

    let mut builder = tar::Builder::new(Vec::with_capacity(content.len() + 1024));
    builder.append_data(&mut header, entry_name, content.as_ref())?;
    let bytes = builder.into_inner()?;

    tracing::trace!(entry = entry_name, mode = format!("{mode:o}"), size, archive_len = bytes.len(), "Packed archive");

    Ok(Archive {
        entries: vec![ArchiveEntry {
            name: entry_name.to_string(),
            mode,
            content,
            size,
        }],
        bytes: Bytes::from(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    /// Unpack every entry as (path, mode, content).
    fn unpack(bytes: &[u8]) -> Vec<(String, u32, Vec<u8>)> {
        let mut archive = tar::Archive::new(bytes);
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let path = entry.path().unwrap().to_string_lossy().into_owned();
                let mode = entry.header().mode().unwrap();
                let mut content = Vec::new();
                entry.read_to_end(&mut content).unwrap();
                (path, mode, content)
            })
            .collect()
    }

    #[test]
    fn test_pack_single_entry() {
        let archive = pack(&b"#!/bin/sh\necho hi\n"[..], SCRIPT_NAME, SCRIPT_MODE).unwrap();

        let entries = unpack(archive.as_bytes());
        assert_eq!(entries.len(), 1);
        let (path, mode, content) = &entries[0];
        assert_eq!(path, "script.sh");
        assert_eq!(*mode & 0o777, 0o700);
        assert_eq!(content, b"#!/bin/sh\necho hi\n");
    }

    #[test]
    fn test_entry_metadata_matches_content() {
        let content = vec![0u8, 159, 146, 150, 255, b'\n'];
        let archive = pack(content.clone(), "script.sh", 0o700).unwrap();

        assert_eq!(archive.entries().len(), 1);
        let entry = &archive.entries()[0];
        assert_eq!(entry.name, "script.sh");
        assert_eq!(entry.mode, 0o700);
        assert_eq!(entry.size, content.len() as u64);
        assert_eq!(entry.content.as_ref(), &content[..]);

        let (_, _, unpacked) = &unpack(archive.as_bytes())[0];
        assert_eq!(unpacked, &content);
    }

    #[test]
    fn test_pack_empty_content() {
        let archive = pack(Bytes::new(), "script.sh", 0o700).unwrap();
        let entries = unpack(archive.as_bytes());
        assert_eq!(entries.len(), 1);
        assert!(entries[0].2.is_empty());
        assert_eq!(archive.entries()[0].size, 0);
    }

    #[test]
    fn test_owner_executable_bit() {
        let archive = pack(&b"exit 0\n"[..], "script.sh", SCRIPT_MODE).unwrap();
        let (_, mode, _) = &unpack(archive.as_bytes())[0];
        assert_ne!(mode & 0o100, 0, "owner execute bit must be set");
        assert_eq!(mode & 0o077, 0, "group/other bits must be clear");
    }

    #[test]
    fn test_long_entry_name_round_trips() {
        let name = format!("{}.sh", "a".repeat(120));
        let archive = pack(&b"echo hi\n"[..], &name, 0o700).unwrap();

        let entries = unpack(archive.as_bytes());
        assert_eq!(entries.len(), 1);
        let (path, mode, content) = &entries[0];
        assert_eq!(path, &name);
        assert_eq!(*mode & 0o777, 0o700);
        assert_eq!(content, b"echo hi\n");
        assert_eq!(archive.entries()[0].name, name);
    }

    #[test]
    fn test_archive_is_block_aligned() {
        let archive = pack(&b"echo aligned\n"[..], "script.sh", 0o700).unwrap();
        assert!(!archive.is_empty());
        assert_eq!(archive.len() % 512, 0);
    }

    #[test]
    fn test_script_payload_to_archive() {
        let payload = ScriptPayload::new(&b"#!/bin/sh\nuptime\n"[..]);
        assert_eq!(payload.file_name(), "script.sh");
        assert_eq!(payload.mode(), 0o700);
        assert_eq!(payload.len(), 17);
        assert!(!payload.is_empty());

        let archive = payload.to_archive().unwrap();
        assert_eq!(archive.entries()[0].content, *payload.content());
    }
}

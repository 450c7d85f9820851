//! # Framed Append Files
//!
//! `tables.db` and `rows.db` are append-only logs of length-prefixed
//! records. Every frame is:
//!
//! ```text
//! +----------------+----------+-------------------+
//! | len u32 LE     | pad (4)  | payload (len B)   |
//! +----------------+----------+-------------------+
//! ```
//!
//! The header is 8 bytes but only the low 4 carry the length; the pad
//! bytes are written as zero and ignored on decode. This framing is part
//! of the on-disk format and must not change.
//!
//! ## Mutation Discipline
//!
//! - Appends go through `O_APPEND`; the returned offset (frame start) is
//!   taken from the file length before the write and is what the B+tree
//!   index stores.
//! - The only in-place writes are same-length patches at recorded offsets
//!   (a catalog row's index flag byte, its trailing row count). A patch
//!   never changes a frame's length.
//!
//! ## Access Pattern
//!
//! Files are opened per operation and closed when it completes; only the
//! B+tree page file stays open for the session. A missing file reads as
//! empty, which is how a fresh database directory starts.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};

use crate::config::FRAME_HEADER_SIZE;

/// Handle on one framed append file. Holds only the path; every operation
/// opens the file for its own duration.
#[derive(Debug, Clone)]
pub struct HeapFile {
    path: PathBuf,
}

impl HeapFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_append(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .wrap_err_with(|| format!("failed to open '{}' for append", self.path.display()))
    }

    fn open_read(&self) -> Result<File> {
        File::open(&self.path)
            .wrap_err_with(|| format!("failed to open '{}'", self.path.display()))
    }

    fn open_write(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .wrap_err_with(|| format!("failed to open '{}' for patching", self.path.display()))
    }

    /// Appends one frame and returns the file offset of its header.
    pub fn append_frame(&self, payload: &[u8]) -> Result<u32> {
        use std::io::Write;

        let mut file = self.open_append()?;
        let offset = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", self.path.display()))?
            .len();

        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&[0u8; 4]);
        frame.extend_from_slice(payload);

        file.write_all(&frame)
            .wrap_err_with(|| format!("failed to append frame to '{}'", self.path.display()))?;

        Ok(offset as u32)
    }

    /// Reads the frame whose header starts at `offset`, returning the payload.
    pub fn read_frame_at(&self, offset: u32) -> Result<Vec<u8>> {
        let file = self.open_read()?;

        let mut header = [0u8; FRAME_HEADER_SIZE];
        file.read_exact_at(&mut header, offset as u64)
            .wrap_err_with(|| {
                format!(
                    "failed to read frame header at {} in '{}'",
                    offset,
                    self.path.display()
                )
            })?;

        let len = u32::from_le_bytes(header[..4].try_into().unwrap()) as usize;
        let mut payload = vec![0u8; len];
        file.read_exact_at(&mut payload, offset as u64 + FRAME_HEADER_SIZE as u64)
            .wrap_err_with(|| {
                format!(
                    "failed to read {}-byte frame payload at {} in '{}'",
                    len,
                    offset,
                    self.path.display()
                )
            })?;

        Ok(payload)
    }

    /// Overwrites bytes at an absolute file offset. The caller guarantees
    /// the patch has the same length as what it replaces.
    pub fn patch_at(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let file = self.open_write()?;
        let len = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", self.path.display()))?
            .len();
        ensure!(
            offset + bytes.len() as u64 <= len,
            "patch of {} bytes at {} runs past end of '{}' ({} bytes)",
            bytes.len(),
            offset,
            self.path.display(),
            len
        );
        file.write_all_at(bytes, offset)
            .wrap_err_with(|| format!("failed to patch '{}' at {}", self.path.display(), offset))
    }

    /// Walks every frame in file order, yielding `(frame_offset, payload)`.
    /// A missing file yields nothing.
    pub fn walk(&self) -> Result<Vec<(u32, Vec<u8>)>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .wrap_err_with(|| format!("failed to open '{}'", self.path.display()))
            }
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .wrap_err_with(|| format!("failed to read '{}'", self.path.display()))?;

        let mut frames = Vec::new();
        let mut pos = 0usize;
        while pos < bytes.len() {
            ensure!(
                pos + FRAME_HEADER_SIZE <= bytes.len(),
                "truncated frame header at {} in '{}'",
                pos,
                self.path.display()
            );
            let len = u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
            let start = pos + FRAME_HEADER_SIZE;
            ensure!(
                start + len <= bytes.len(),
                "truncated frame payload at {} in '{}'",
                pos,
                self.path.display()
            );
            frames.push((pos as u32, bytes[start..start + len].to_vec()));
            pos = start + len;
        }

        Ok(frames)
    }
}

//! # B+Tree Pager
//!
//! The pager presents `index.db` as an array of 4096-byte pages and owns
//! the durability protocol for the copy-on-write B+tree above it.
//!
//! ## File Layout
//!
//! ```text
//! Offset 0:     Page 0 (reserved; first 32 bytes are the master page)
//! Offset 4096:  Page 1
//! Offset 8192:  Page 2
//! ...
//! ```
//!
//! The master page records the tree root and the number of allocated
//! pages:
//!
//! ```text
//! +----------+-----------+------------+------------+
//! | "winnie" | pad (10B) | root u64 LE| used u64 LE|
//! +----------+-----------+------------+------------+
//! 0          6           16           24           32
//! ```
//!
//! ## Commit Protocol
//!
//! Newly allocated pages accumulate in memory and hit the file only at
//! [`Pager::flush`]:
//!
//! ```text
//! 1. fallocate the file to cover every pending page
//! 2. remap if the mmap no longer covers the file
//! 3. copy pending pages into their mmap slots
//! 4. fsync               <- pages durable, still unreachable
//! 5. pwrite master page  <- positional write, never through the mmap
//! 6. fsync               <- commit point
//! ```
//!
//! A crash before step 6 leaves the old master in place: the new pages sit
//! past the recorded `used` count and are invisible. A mmap store to the
//! master page would not be atomic, which is why step 5 is a positional
//! write; a 32-byte write at offset 0 is below any sector size.
//!
//! ## Growth
//!
//! File growth multiplies capacity by 9/8 (minimum one page) until the
//! pending pages fit, amortizing fallocate calls. The mmap is remapped to
//! the new length under `&mut self`; the borrow checker guarantees no page
//! view survives a remap, so no hazard tracking is needed.
//!
//! ## Reclamation
//!
//! `page_del` never shrinks the file and never reuses a flushed page; the
//! file grows for the lifetime of the database. Pages allocated and then
//! released *within one flush epoch* were never visible on disk, so their
//! in-memory slots are recycled. Per-statement execution flushes after
//! every mutation and never hits that path; bulk loads batch many inserts
//! into one epoch and stay compact because of it.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use eyre::{bail, ensure, Result, WrapErr};
use memmap2::MmapMut;
use tracing::debug;
use zerocopy::little_endian::U64;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::btree::{BNode, BTree, PageStore};
use crate::config::{DB_SIG, MASTER_PAGE_SIZE, PAGE_SIZE};

/// First 32 bytes of page 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct MasterPage {
    signature: [u8; 6],
    reserved: [u8; 10],
    root: U64,
    used: U64,
}

const _: () = assert!(std::mem::size_of::<MasterPage>() == MASTER_PAGE_SIZE);

impl MasterPage {
    fn new(root: u64, used: u64) -> Self {
        Self {
            signature: *DB_SIG,
            reserved: [0u8; 10],
            root: U64::new(root),
            used: U64::new(used),
        }
    }
}

/// Mmap-backed page array plus the pending-page allocator. Implements
/// [`PageStore`] for the B+tree.
#[derive(Debug)]
pub struct PageFile {
    path: PathBuf,
    file: File,
    mmap: Option<MmapMut>,
    /// Pages the file has room for (fallocate high-water mark).
    file_pages: u64,
    /// Pages made durable by the last flush; page 0 is always reserved.
    flushed: u64,
    /// Pages allocated since the last flush, indexed by `id - flushed`.
    pending: Vec<Vec<u8>>,
    /// Pending slots released by `page_del` before ever being flushed.
    free_pending: Vec<usize>,
}

impl PageFile {
    fn open(path: &Path) -> Result<(Self, u64)> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .wrap_err_with(|| format!("failed to open page file '{}'", path.display()))?;

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?
            .len();

        ensure!(
            file_size % PAGE_SIZE as u64 == 0,
            "page file '{}' size {} is not a multiple of page size {}",
            path.display(),
            file_size,
            PAGE_SIZE
        );

        // SAFETY: MmapMut::map_mut is unsafe because mapped files can be
        // modified externally. The database holds the only handle for the
        // session (single-process contract), every access is bounds-checked
        // against `flushed`, and the mapping's lifetime is tied to PageFile.
        let mmap = if file_size > 0 {
            Some(unsafe {
                MmapMut::map_mut(&file)
                    .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
            })
        } else {
            None
        };

        let mut pf = Self {
            path: path.to_path_buf(),
            file,
            mmap,
            file_pages: file_size / PAGE_SIZE as u64,
            flushed: 1, // page 0 reserved for the master page
            pending: Vec::new(),
            free_pending: Vec::new(),
        };

        let root = pf.load_master(file_size)?;
        Ok((pf, root))
    }

    /// Validates the master page of a non-empty file and returns the root.
    /// An empty file has no master page yet; it appears at the first flush.
    fn load_master(&mut self, file_size: u64) -> Result<u64> {
        let Some(mmap) = self.mmap.as_ref() else {
            return Ok(0);
        };

        let master = MasterPage::read_from_bytes(&mmap[..MASTER_PAGE_SIZE])
            .map_err(|_| eyre::eyre!("master page shorter than {} bytes", MASTER_PAGE_SIZE))?;

        ensure!(
            master.signature == *DB_SIG,
            "bad signature in '{}'",
            self.path.display()
        );

        let root = master.root.get();
        let used = master.used.get();
        let max_pages = file_size / PAGE_SIZE as u64;
        ensure!(
            used >= 1 && used <= max_pages,
            "bad master page in '{}': used={} out of range 1..={}",
            self.path.display(),
            used,
            max_pages
        );
        ensure!(
            root < used,
            "bad master page in '{}': root={} not below used={}",
            self.path.display(),
            root,
            used
        );

        self.flushed = used;
        Ok(root)
    }

    /// Grows the file, 9/8 at a time, until it covers `npages`.
    fn extend_file(&mut self, npages: u64) -> Result<()> {
        if self.file_pages >= npages {
            return Ok(());
        }

        let mut file_pages = self.file_pages;
        while file_pages < npages {
            file_pages += (file_pages / 8).max(1);
        }

        let file_size = file_pages * PAGE_SIZE as u64;
        fallocate(&self.file, file_size)
            .wrap_err_with(|| format!("failed to extend '{}'", self.path.display()))?;

        debug!(pages = file_pages, "extended page file");
        self.file_pages = file_pages;
        Ok(())
    }

    /// Remaps after growth. `&mut self` proves no page view is live.
    fn extend_mmap(&mut self) -> Result<()> {
        let mapped = self.mmap.as_ref().map_or(0, |m| m.len() as u64);
        if mapped >= self.file_pages * PAGE_SIZE as u64 {
            return Ok(());
        }

        // SAFETY: see `open`. The previous mapping is dropped on reassignment
        // and nothing can reference it across this &mut method.
        self.mmap = Some(unsafe {
            MmapMut::map_mut(&self.file)
                .wrap_err_with(|| format!("failed to remap '{}'", self.path.display()))?
        });
        Ok(())
    }

    /// Writes pending pages into the mmap and commits the master page.
    fn flush(&mut self, root: u64) -> Result<()> {
        let npages = self.flushed + self.pending.len() as u64;
        self.extend_file(npages)?;
        self.extend_mmap()?;

        let mmap = self.mmap.as_mut().expect("mmap must exist after extend");
        for (i, page) in self.pending.iter().enumerate() {
            let start = (self.flushed as usize + i) * PAGE_SIZE;
            mmap[start..start + page.len()].copy_from_slice(page);
            if page.len() < PAGE_SIZE {
                mmap[start + page.len()..start + PAGE_SIZE].fill(0);
            }
        }

        // Pages must be durable before the master page points at them.
        self.file
            .sync_all()
            .wrap_err_with(|| format!("fsync of '{}' failed", self.path.display()))?;

        self.flushed = npages;
        self.pending.clear();
        self.free_pending.clear();

        let master = MasterPage::new(root, self.flushed);
        self.file
            .write_at(master.as_bytes(), 0)
            .wrap_err_with(|| format!("failed to write master page of '{}'", self.path.display()))?;
        self.file
            .sync_all()
            .wrap_err_with(|| format!("fsync of '{}' failed", self.path.display()))?;

        debug!(root, used = self.flushed, "committed master page");
        Ok(())
    }
}

impl PageStore for PageFile {
    fn page_get(&self, ptr: u64) -> BNode {
        if ptr < self.flushed {
            let mmap = self.mmap.as_ref().expect("flushed page without a mapping");
            let start = ptr as usize * PAGE_SIZE;
            return BNode::from_bytes(mmap[start..start + PAGE_SIZE].to_vec());
        }

        let slot = (ptr - self.flushed) as usize;
        match self.pending.get(slot) {
            Some(page) if !page.is_empty() => BNode::from_bytes(page.clone()),
            _ => panic!("bad page id {}", ptr),
        }
    }

    fn page_new(&mut self, node: BNode) -> u64 {
        let page = node.as_bytes();
        assert!(page.len() <= PAGE_SIZE, "page image too large: {}", page.len());

        if let Some(slot) = self.free_pending.pop() {
            self.pending[slot] = page.to_vec();
            return self.flushed + slot as u64;
        }

        self.pending.push(page.to_vec());
        self.flushed + (self.pending.len() - 1) as u64
    }

    fn page_del(&mut self, ptr: u64) {
        // Flushed pages are never reclaimed; the file only grows. A page
        // born and released inside the current epoch was never on disk, so
        // its slot can be handed out again.
        if ptr >= self.flushed {
            let slot = (ptr - self.flushed) as usize;
            self.pending[slot] = Vec::new();
            self.free_pending.push(slot);
        }
    }
}

/// Session handle on `index.db`: the page file plus the current tree root.
///
/// [`Pager::set`] is the per-statement path (insert + flush). Bulk loaders
/// may call [`Pager::insert`] repeatedly and [`Pager::commit`] once.
#[derive(Debug)]
pub struct Pager {
    file: PageFile,
    root: u64,
}

impl Pager {
    /// Opens or creates the page file, validating the master page when one
    /// exists. Corruption here aborts startup.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (file, root) = PageFile::open(path.as_ref())?;
        debug!(
            path = %path.as_ref().display(),
            root,
            used = file.flushed,
            "opened page file"
        );
        Ok(Self { file, root })
    }

    /// Point lookup through the tree.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        BTree::new(self.root).get(&self.file, key)
    }

    /// Inserts without flushing. Pending pages stay in memory until
    /// [`Pager::commit`].
    pub fn insert(&mut self, key: &[u8], val: &[u8]) {
        let mut tree = BTree::new(self.root);
        tree.insert(&mut self.file, key, val);
        self.root = tree.root;
    }

    /// Makes every pending insert durable and commits the current root.
    pub fn commit(&mut self) -> Result<()> {
        self.file.flush(self.root)
    }

    /// Insert-and-flush: the per-statement mutation path.
    pub fn set(&mut self, key: &[u8], val: &[u8]) -> Result<()> {
        self.insert(key, val);
        self.commit()
    }

    /// Rewrites the live tree into a fresh page file and swaps it in,
    /// shedding every page the copy-on-write history left behind. This is
    /// the only way the page file ever shrinks; normal operation never
    /// reclaims pages.
    pub fn compact(&mut self) -> Result<()> {
        self.commit()?;

        let entries = BTree::new(self.root).scan(&self.file);

        let mut side_path = self.file.path.clone().into_os_string();
        side_path.push(".compact");
        let side_path = PathBuf::from(side_path);
        match std::fs::remove_file(&side_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).wrap_err_with(|| {
                    format!("failed to clear stale '{}'", side_path.display())
                })
            }
        }

        {
            let mut fresh = Pager::open(&side_path)?;
            for (key, val) in &entries {
                fresh.insert(key, val);
            }
            fresh.commit()?;
        }

        std::fs::rename(&side_path, &self.file.path).wrap_err_with(|| {
            format!(
                "failed to move '{}' over '{}'",
                side_path.display(),
                self.file.path.display()
            )
        })?;

        let (file, root) = PageFile::open(&self.file.path)?;
        debug!(
            entries = entries.len(),
            pages = file.flushed,
            "compacted page file"
        );
        self.file = file;
        self.root = root;
        Ok(())
    }

    /// Tree root page id (0 when the tree is empty).
    pub fn root(&self) -> u64 {
        self.root
    }

    /// Pages made durable so far, including the reserved page 0.
    pub fn used_pages(&self) -> u64 {
        self.file.flushed
    }
}

#[cfg(target_os = "linux")]
fn fallocate(file: &File, size: u64) -> Result<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: plain syscall on an owned, open descriptor.
    let ret = unsafe { libc::fallocate(file.as_raw_fd(), 0, 0, size as libc::off_t) };
    if ret != 0 {
        bail!(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn fallocate(file: &File, size: u64) -> Result<()> {
    file.set_len(size).wrap_err("failed to extend file")
}

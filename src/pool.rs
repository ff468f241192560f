//! bounded pool of OS file handles shared by every section body and output
//! file.
//!
//! Callers get the illusion of unlimited simultaneously open logical files:
//! the pool keeps at most `capacity` handles open, reuses a handle when the
//! same path comes back in the same mode, swaps the underlying handle in
//! place on a mode change, and evicts an idle handle when a new path needs a
//! slot. A slot that is mid-operation is never evicted; when every slot is
//! mid-operation the requesting caller blocks on a condition variable until
//! one is released.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::Error;

/// how a pooled handle was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// create if missing, position every write at the end
    Append,
    /// create if missing, leave existing content alone until the caller
    /// truncates it explicitly
    Write,
}

enum SlotIo {
    Read(File),
    Write(BufWriter<File>),
}

impl SlotIo {
    fn flush(&mut self) -> io::Result<()> {
        match self {
            SlotIo::Read(_) => Ok(()),
            SlotIo::Write(writer) => writer.flush(),
        }
    }
}

struct Slot {
    path: PathBuf,
    mode: OpenMode,
    /// mid-operation marker. a locked slot is never evicted and a second
    /// operation on the same path waits for it.
    locked: bool,
    io: Arc<Mutex<SlotIo>>,
}

/// the bounded handle pool. construct once and pass around by [`Arc`].
pub struct FilePool {
    capacity: usize,
    slots: Mutex<Vec<Slot>>,
    freed: Condvar,
}

impl fmt::Debug for FilePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePool")
            .field("capacity", &self.capacity)
            .field("open", &self.slots.lock().len())
            .finish()
    }
}

impl FilePool {
    /// a small default that stays well under any platform's open-file ceiling
    pub const DEFAULT_CAPACITY: usize = 32;

    pub fn new(capacity: usize) -> Arc<Self> {
        assert!(capacity > 0, "a file pool needs at least one slot");
        Arc::new(Self {
            capacity,
            slots: Mutex::new(Vec::new()),
            freed: Condvar::new(),
        })
    }

    pub fn with_default_capacity() -> Arc<Self> {
        Self::new(Self::DEFAULT_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// number of currently open handles
    pub fn open_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// make sure a handle for `path` exists in the given mode without
    /// performing any I/O on it
    pub fn open(&self, path: impl AsRef<Path>, mode: OpenMode) -> Result<(), Error> {
        let path = path.as_ref();
        self.acquire(path, mode)?;
        self.release(path);
        Ok(())
    }

    /// run `action` against the read handle for `path`. The slot is locked
    /// for the duration so no other operation can race on the same handle.
    pub fn apply_read<T>(
        &self,
        path: impl AsRef<Path>,
        action: impl FnOnce(&mut File) -> io::Result<T>,
    ) -> Result<T, Error> {
        let path = path.as_ref();
        let io = self.acquire(path, OpenMode::Read)?;

        let result = {
            let mut guard = io.lock();
            match &mut *guard {
                SlotIo::Read(file) => action(file),
                SlotIo::Write(_) => unreachable!("read acquisition always yields a read handle"),
            }
        };

        self.release(path);
        result.map_err(Error::Io)
    }

    /// run `action` against the write handle for `path`, locking the slot
    /// for the duration. `flush_now = false` leaves the data buffered for
    /// batching; the buffer is flushed on a later `flush_now = true` call, a
    /// mode change, or eviction.
    pub fn apply_write<T>(
        &self,
        path: impl AsRef<Path>,
        mode: OpenMode,
        flush_now: bool,
        action: impl FnOnce(&mut BufWriter<File>) -> io::Result<T>,
    ) -> Result<T, Error> {
        assert!(
            matches!(mode, OpenMode::Append | OpenMode::Write),
            "apply_write requires a write-capable mode"
        );

        let path = path.as_ref();
        let io = self.acquire(path, mode)?;

        let result = {
            let mut guard = io.lock();
            match &mut *guard {
                SlotIo::Write(writer) => action(&mut *writer).and_then(|value| {
                    if flush_now {
                        writer.flush()?;
                    }
                    Ok(value)
                }),
                SlotIo::Read(_) => unreachable!("write acquisition always yields a write handle"),
            }
        };

        self.release(path);
        result.map_err(Error::Io)
    }

    /// stream the whole content of `source` onto the end of `destination`
    /// without loading it into memory, returning the number of bytes copied.
    /// Both slots stay locked for the duration.
    pub fn append_file_content(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> Result<u64, Error> {
        let source = source.as_ref();
        let destination = destination.as_ref();

        let src_io = self.acquire(source, OpenMode::Read)?;
        let dst_io = match self.acquire(destination, OpenMode::Append) {
            Ok(io) => io,
            Err(error) => {
                self.release(source);
                return Err(error);
            }
        };

        let copied = {
            // both slots are marked locked, so neither guard can contend
            let mut src = src_io.lock();
            let mut dst = dst_io.lock();
            match (&mut *src, &mut *dst) {
                (SlotIo::Read(from), SlotIo::Write(to)) => from
                    .seek(SeekFrom::Start(0))
                    .and_then(|_| io::copy(from, to)),
                _ => unreachable!("acquisition modes fix the handle variants"),
            }
        };

        self.release(source);
        self.release(destination);
        copied.map_err(Error::Io)
    }

    /// close any handle for `path` and delete the file from disk. A missing
    /// file is not an error. Waits if the path is mid-operation.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();

        let mut slots = self.slots.lock();
        loop {
            match slots.iter().position(|slot| slot.path == path) {
                Some(index) if slots[index].locked => {
                    self.freed.wait(&mut slots);
                }
                Some(index) => {
                    slots.remove(index);
                    self.freed.notify_all();
                    break;
                }
                None => break,
            }
        }
        drop(slots);

        debug!(path = %path.display(), "removing backing file");
        match std::fs::remove_file(path) {
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// find or create the slot for `path`, mark it locked, and hand back its
    /// handle. Blocks while the path is mid-operation or the pool is
    /// saturated with locked slots.
    fn acquire(&self, path: &Path, mode: OpenMode) -> Result<Arc<Mutex<SlotIo>>, Error> {
        assert!(
            !path.as_os_str().is_empty(),
            "cannot open a file with an empty path"
        );

        let mut slots = self.slots.lock();
        loop {
            if let Some(index) = slots.iter().position(|slot| slot.path == path) {
                if slots[index].locked {
                    trace!(path = %path.display(), "handle is mid-operation, waiting");
                    self.freed.wait(&mut slots);
                    continue;
                }

                if slots[index].mode != mode {
                    // swap the underlying handle but keep the slot's identity
                    debug!(path = %path.display(), ?mode, "reopening handle in a new mode");
                    let slot = &mut slots[index];
                    let mut guard = slot.io.lock();
                    guard.flush().map_err(Error::Io)?;
                    *guard = open_slot(path, mode).map_err(Error::Io)?;
                    drop(guard);
                    slot.mode = mode;
                }

                let slot = &mut slots[index];
                slot.locked = true;
                return Ok(slot.io.clone());
            }

            if slots.len() >= self.capacity {
                let Some(victim) = slots.iter().position(|slot| !slot.locked) else {
                    trace!("pool saturated and every handle is mid-operation, waiting");
                    self.freed.wait(&mut slots);
                    continue;
                };
                let evicted = slots.remove(victim);
                debug!(path = %evicted.path.display(), "evicting idle handle");
                evicted.io.lock().flush().map_err(Error::Io)?;
            }

            debug!(path = %path.display(), ?mode, "opening handle");
            let io = Arc::new(Mutex::new(open_slot(path, mode).map_err(Error::Io)?));
            slots.push(Slot {
                path: path.to_path_buf(),
                mode,
                locked: true,
                io: io.clone(),
            });
            return Ok(io);
        }
    }

    fn release(&self, path: &Path) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter_mut().find(|slot| slot.path == path) {
            slot.locked = false;
        }
        self.freed.notify_all();
    }
}

fn open_slot(path: &Path, mode: OpenMode) -> io::Result<SlotIo> {
    match mode {
        OpenMode::Read => File::open(path).map(SlotIo::Read),
        OpenMode::Append => OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map(|file| SlotIo::Write(BufWriter::new(file))),
        OpenMode::Write => OpenOptions::new()
            .write(true)
            .create(true)
            .open(path)
            .map(|file| SlotIo::Write(BufWriter::new(file))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn write_to(pool: &FilePool, path: &Path, content: &str, flush: bool) {
        pool.apply_write(path, OpenMode::Append, flush, |writer| {
            writer.write_all(content.as_bytes())
        })
        .unwrap();
    }

    fn read_back(pool: &FilePool, path: &Path) -> String {
        pool.apply_read(path, |file| {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            Ok(content)
        })
        .unwrap()
    }

    #[test]
    fn same_path_same_mode_reuses_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        let pool = FilePool::new(4);
        let path = dir.path().join("a.tmp");

        write_to(&pool, &path, "one", false);
        write_to(&pool, &path, "two", true);

        assert_eq!(pool.open_count(), 1);
        assert_eq!(read_back(&pool, &path), "onetwo");
    }

    #[test]
    fn mode_change_flushes_and_keeps_one_slot() {
        let dir = tempfile::tempdir().unwrap();
        let pool = FilePool::new(4);
        let path = dir.path().join("a.tmp");

        // deferred flush, then a read in the same pool must still see it
        write_to(&pool, &path, "buffered", false);
        assert_eq!(read_back(&pool, &path), "buffered");
        assert_eq!(pool.open_count(), 1);
    }

    #[test]
    fn capacity_overflow_evicts_an_idle_handle() {
        let dir = tempfile::tempdir().unwrap();
        let pool = FilePool::new(2);

        for name in ["a.tmp", "b.tmp", "c.tmp"] {
            write_to(&pool, &dir.path().join(name), name, false);
        }

        assert_eq!(pool.open_count(), 2);
        // the evicted handle was flushed, nothing was lost
        assert_eq!(read_back(&pool, &dir.path().join("a.tmp")), "a.tmp");
    }

    #[test]
    fn open_more_paths_than_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let pool = FilePool::new(3);

        for i in 0..4 {
            pool.open(dir.path().join(format!("{i}.tmp")), OpenMode::Append)
                .unwrap();
        }

        assert_eq!(pool.open_count(), 3);
    }

    #[test]
    fn append_file_content_copies_all_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let pool = FilePool::new(4);
        let src = dir.path().join("src.tmp");
        let dst = dir.path().join("dst.tmp");

        write_to(&pool, &src, "0 1 2\n", false);
        write_to(&pool, &dst, "header\n", false);

        let copied = pool.append_file_content(&src, &dst).unwrap();
        assert_eq!(copied, 6);
        assert_eq!(read_back(&pool, &dst), "header\n0 1 2\n");
    }

    #[test]
    fn append_file_content_can_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let pool = FilePool::new(4);
        let src = dir.path().join("src.tmp");
        let dst = dir.path().join("dst.tmp");

        write_to(&pool, &src, "x", true);
        pool.append_file_content(&src, &dst).unwrap();
        let copied = pool.append_file_content(&src, &dst).unwrap();

        assert_eq!(copied, 1);
        assert_eq!(read_back(&pool, &dst), "xx");
    }

    #[test]
    fn remove_file_closes_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let pool = FilePool::new(4);
        let path = dir.path().join("a.tmp");

        write_to(&pool, &path, "x", true);
        pool.remove_file(&path).unwrap();

        assert_eq!(pool.open_count(), 0);
        assert!(!path.exists());
        // deleting again is fine
        pool.remove_file(&path).unwrap();
    }

    #[test]
    #[should_panic(expected = "empty path")]
    fn empty_path_is_a_programming_error() {
        let pool = FilePool::new(1);
        let _ = pool.open("", OpenMode::Read);
    }
}

//! The open-file table and byte-addressed file I/O.

use crate::bitmap;
use crate::error::OsError;
use crate::fs::Fs;
use crate::inode::{self, InodeKind};
use crate::param::{
    MAX_FILE_SIZE, SECTOR_BITMAP_SECTORS, SECTOR_BITMAP_START, SECTOR_SIZE, TOTAL_SECTORS,
};
use crate::path;

/// One open-file table entry. `inum == 0` marks a free slot; inode 0 is the
/// root directory and is never opened as a file.
#[derive(Debug, Clone, Copy)]
pub struct OpenFile {
    pub inum: u32,
    pub size: u32,
    pub pos: u32,
}

impl OpenFile {
    pub(crate) const FREE: Self = Self {
        inum: 0,
        size: 0,
        pos: 0,
    };
}

impl Fs {
    /// Looks up an in-use open-file entry, rejecting out-of-range and stale
    /// descriptors.
    fn open_file(&self, fd: usize) -> Result<OpenFile, OsError> {
        match self.open_files.get(fd) {
            Some(entry) if entry.inum != 0 => Ok(*entry),
            _ => Err(OsError::BadFd),
        }
    }

    /// Opens the regular file at `path` and returns its descriptor.
    pub fn open(&mut self, path: &str) -> Result<usize, OsError> {
        let resolved = path::resolve(&self.disk, path).map_err(|_| OsError::NoSuchFile)?;
        let inum = resolved.child.ok_or(OsError::NoSuchFile)?;
        let node = inode::read(&self.disk, inum)?;
        if node.kind != InodeKind::FILE {
            log::debug!("open: '{path}' is not a regular file");
            return Err(OsError::General);
        }

        let fd = self
            .open_files
            .iter()
            .position(|entry| entry.inum == 0)
            .ok_or(OsError::TooManyOpenFiles)?;
        self.open_files[fd] = OpenFile {
            inum,
            size: node.size,
            pos: 0,
        };

        log::debug!("open: '{path}' is fd {fd}");
        Ok(fd)
    }

    /// Reads up to `buf.len()` bytes from the current position and returns
    /// the number of bytes transferred.
    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize, OsError> {
        let entry = self.open_file(fd)?;
        let node = inode::read(&self.disk, entry.inum)?;

        let n = buf.len().min((node.size - entry.pos) as usize);
        let mut done = 0;
        while done < n {
            let pos = entry.pos as usize + done;
            let offset = pos % SECTOR_SIZE;
            let chunk = (n - done).min(SECTOR_SIZE - offset);

            let mut sbuf = [0u8; SECTOR_SIZE];
            self.disk.read(node.data[pos / SECTOR_SIZE], &mut sbuf)?;
            buf[done..done + chunk].copy_from_slice(&sbuf[offset..offset + chunk]);
            done += chunk;
        }

        self.open_files[fd].pos += n as u32;
        Ok(n)
    }

    /// Writes `buf` at the current position and returns the number of bytes
    /// transferred. Sectors the file already owns are reused; missing ones
    /// are allocated on demand. When the disk fills up mid-write the short
    /// count is returned, and a write that cannot transfer anything fails
    /// with `NoSpace`.
    pub fn write(&mut self, fd: usize, buf: &[u8]) -> Result<usize, OsError> {
        let entry = self.open_file(fd)?;
        if entry.pos as usize + buf.len() > MAX_FILE_SIZE {
            return Err(OsError::FileTooBig);
        }

        let mut node = inode::read(&self.disk, entry.inum)?;
        let mut done = 0;
        while done < buf.len() {
            let pos = entry.pos as usize + done;
            let group = pos / SECTOR_SIZE;
            let offset = pos % SECTOR_SIZE;
            let chunk = (buf.len() - done).min(SECTOR_SIZE - offset);

            let mut sbuf = [0u8; SECTOR_SIZE];
            if node.data[group] == 0 {
                let Some(sector) = bitmap::first_unused(
                    &mut self.disk,
                    SECTOR_BITMAP_START,
                    SECTOR_BITMAP_SECTORS,
                    TOTAL_SECTORS,
                )?
                else {
                    log::debug!("write: disk full after {done} bytes");
                    break;
                };
                node.data[group] = sector;
                // fresh sector, nothing to preserve
            } else if chunk != SECTOR_SIZE {
                self.disk.read(node.data[group], &mut sbuf)?;
            }

            sbuf[offset..offset + chunk].copy_from_slice(&buf[done..done + chunk]);
            self.disk.write(node.data[group], &sbuf)?;
            done += chunk;
        }

        if done == 0 && !buf.is_empty() {
            return Err(OsError::NoSpace);
        }

        let pos = entry.pos + done as u32;
        if pos > node.size {
            node.size = pos;
        }
        // data[] may have gained sectors even when the size is unchanged
        inode::write(&mut self.disk, entry.inum, &node)?;
        self.open_files[fd].pos = pos;
        self.open_files[fd].size = node.size;
        Ok(done)
    }

    /// Moves the read/write position. The new position must lie within the
    /// file, end inclusive.
    pub fn seek(&mut self, fd: usize, offset: u32) -> Result<(), OsError> {
        let entry = self.open_file(fd)?;
        if offset > entry.size {
            return Err(OsError::SeekOutOfBounds);
        }
        self.open_files[fd].pos = offset;
        Ok(())
    }

    /// Releases the descriptor. Nothing is flushed; pair with `sync`.
    pub fn close(&mut self, fd: usize) -> Result<(), OsError> {
        self.open_file(fd)?;
        self.open_files[fd] = OpenFile::FREE;
        log::debug!("close: fd {fd}");
        Ok(())
    }
}

//! The volume: boot and sync, namespace operations, and directory reads.

use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};

use crate::bitmap;
use crate::dir;
use crate::disk::{Disk, DiskError};
use crate::error::OsError;
use crate::file::OpenFile;
use crate::inode::{self, DiskInode, InodeKind};
use crate::param::{
    DATA_START, DIRENT_SIZE, DIRENTS_PER_SECTOR, INODE_BITMAP_SECTORS, INODE_BITMAP_START,
    MAX_FILES, MAX_OPEN_FILES, OS_MAGIC, SECTOR_BITMAP_SECTORS, SECTOR_BITMAP_START, SECTOR_SIZE,
    SUPERBLOCK_START,
};
use crate::path::{self, ROOT_INUM};

/// On-disk superblock, stored at sector 0. Only the magic number is
/// meaningful; the rest of the sector stays zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Superblock {
    pub magic: u32,
}

/// A mounted volume: the in-memory disk image, the backstore file it syncs
/// to, and the open-file table.
pub struct Fs {
    pub(crate) disk: Disk,
    backstore: PathBuf,
    pub(crate) open_files: [OpenFile; MAX_OPEN_FILES],
}

impl Fs {
    /// Boots from the backstore file, formatting a fresh volume when the
    /// file does not exist yet. An existing backstore must have the exact
    /// image size and a valid superblock magic.
    pub fn boot<P: AsRef<Path>>(backstore: P) -> Result<Self, OsError> {
        let backstore = backstore.as_ref().to_path_buf();

        let disk = match Disk::load(&backstore) {
            Ok(disk) => {
                let mut buf = [0u8; SECTOR_SIZE];
                disk.read(SUPERBLOCK_START, &mut buf)?;
                let sb: Superblock = bytemuck::pod_read_unaligned(&buf[..size_of::<Superblock>()]);
                if sb.magic != OS_MAGIC {
                    log::debug!("boot: bad magic {:#010x}", sb.magic);
                    return Err(OsError::General);
                }
                log::debug!("boot: loaded volume from {}", backstore.display());
                disk
            }
            Err(DiskError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                let mut disk = Disk::new();
                Self::format(&mut disk)?;
                disk.save(&backstore)?;
                log::debug!("boot: formatted new volume at {}", backstore.display());
                disk
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            disk,
            backstore,
            open_files: [OpenFile::FREE; MAX_OPEN_FILES],
        })
    }

    /// Writes the metadata of an empty volume into a zeroed image.
    pub(crate) fn format(disk: &mut Disk) -> Result<(), DiskError> {
        let mut buf = [0u8; SECTOR_SIZE];
        let sb = Superblock { magic: OS_MAGIC };
        buf[..size_of::<Superblock>()].copy_from_slice(bytemuck::bytes_of(&sb));
        disk.write(SUPERBLOCK_START, &buf)?;

        // inode 0 is the root directory
        bitmap::init(disk, INODE_BITMAP_START, INODE_BITMAP_SECTORS, 1)?;
        // every metadata sector is permanently allocated
        bitmap::init(
            disk,
            SECTOR_BITMAP_START,
            SECTOR_BITMAP_SECTORS,
            DATA_START as usize,
        )?;
        inode::write(disk, ROOT_INUM, &DiskInode::new(InodeKind::DIR))
    }

    /// Saves the in-memory image to the backstore file.
    pub fn sync(&self) -> Result<(), OsError> {
        self.disk.save(&self.backstore)?;
        log::debug!("sync: saved volume to {}", self.backstore.display());
        Ok(())
    }

    /// Creates a regular file at `path`.
    pub fn create_file(&mut self, path: &str) -> Result<(), OsError> {
        self.create(InodeKind::FILE, path)
    }

    /// Creates an empty directory at `path`.
    pub fn create_dir(&mut self, path: &str) -> Result<(), OsError> {
        self.create(InodeKind::DIR, path)
    }

    fn create(&mut self, kind: InodeKind, path: &str) -> Result<(), OsError> {
        let resolved = path::resolve(&self.disk, path).map_err(|_| OsError::Create)?;
        if resolved.child.is_some() {
            log::debug!("create: '{path}' already exists");
            return Err(OsError::Create);
        }

        let inum = bitmap::first_unused(
            &mut self.disk,
            INODE_BITMAP_START,
            INODE_BITMAP_SECTORS,
            MAX_FILES,
        )
        .map_err(|_| OsError::Create)?
        .ok_or(OsError::Create)?;

        if inode::write(&mut self.disk, inum, &DiskInode::new(kind)).is_err()
            || dir::append(&mut self.disk, resolved.parent, resolved.name, inum).is_err()
        {
            // roll the inode bit back
            let _ = bitmap::clear(&mut self.disk, INODE_BITMAP_START, inum);
            return Err(OsError::Create);
        }

        log::debug!("create: '{path}' is inode {inum}");
        Ok(())
    }

    /// Removes the regular file at `path`.
    pub fn unlink_file(&mut self, path: &str) -> Result<(), OsError> {
        self.unlink(InodeKind::FILE, path)
    }

    /// Removes the directory at `path`, which must be empty.
    pub fn unlink_dir(&mut self, path: &str) -> Result<(), OsError> {
        self.unlink(InodeKind::DIR, path)
    }

    fn missing(kind: InodeKind) -> OsError {
        if kind.is_dir() {
            OsError::NoSuchDir
        } else {
            OsError::NoSuchFile
        }
    }

    fn unlink(&mut self, kind: InodeKind, path: &str) -> Result<(), OsError> {
        let resolved = path::resolve(&self.disk, path).map_err(|_| Self::missing(kind))?;
        let child = resolved.child.ok_or(Self::missing(kind))?;
        if child == ROOT_INUM {
            return Err(if kind.is_dir() {
                OsError::RootDir
            } else {
                OsError::General
            });
        }
        if self.is_open(child) {
            log::debug!("unlink: inode {child} is open");
            return Err(OsError::FileInUse);
        }

        let node = inode::read(&self.disk, child)?;
        if node.kind != kind {
            log::debug!("unlink: '{path}' has the wrong kind");
            return Err(OsError::General);
        }
        if node.kind.is_dir() && node.size > 0 {
            return Err(OsError::DirNotEmpty);
        }

        for &sector in node.data.iter().filter(|&&s| s != 0) {
            bitmap::clear(&mut self.disk, SECTOR_BITMAP_START, sector)?;
        }
        bitmap::clear(&mut self.disk, INODE_BITMAP_START, child)?;
        inode::write(&mut self.disk, child, &DiskInode::zeroed())?;
        dir::remove(&mut self.disk, resolved.parent, child)?;

        log::debug!("unlink: removed '{path}' (inode {child})");
        Ok(())
    }

    /// Size of the directory at `path` in bytes of packed entries.
    /// Returns 0 when the path does not name a directory.
    pub fn dir_size(&self, path: &str) -> usize {
        let Ok(resolved) = path::resolve(&self.disk, path) else {
            return 0;
        };
        let Some(child) = resolved.child else {
            return 0;
        };
        let Ok(node) = inode::read(&self.disk, child) else {
            return 0;
        };
        if !node.kind.is_dir() {
            return 0;
        }
        node.size as usize * DIRENT_SIZE
    }

    /// Copies the directory's entries into `buf` as packed name-and-inode
    /// records and returns the number of bytes copied.
    pub fn dir_read(&self, path: &str, buf: &mut [u8]) -> Result<usize, OsError> {
        let resolved = path::resolve(&self.disk, path).map_err(|_| OsError::NoSuchDir)?;
        let child = resolved.child.ok_or(OsError::NoSuchDir)?;
        let node = inode::read(&self.disk, child)?;
        if !node.kind.is_dir() {
            return Err(OsError::General);
        }

        let required = node.size as usize * DIRENT_SIZE;
        if buf.len() < required {
            return Err(OsError::BufferTooSmall);
        }

        let mut remaining = node.size as usize;
        let mut copied = 0;
        let mut group = 0;
        while remaining > 0 {
            let mut sbuf = [0u8; SECTOR_SIZE];
            self.disk.read(node.data[group], &mut sbuf)?;
            let take = remaining.min(DIRENTS_PER_SECTOR) * DIRENT_SIZE;
            buf[copied..copied + take].copy_from_slice(&sbuf[..take]);
            copied += take;
            remaining = remaining.saturating_sub(DIRENTS_PER_SECTOR);
            group += 1;
        }

        Ok(required)
    }

    /// Whether some open-file entry refers to `inum`.
    fn is_open(&self, inum: u32) -> bool {
        self.open_files.iter().any(|entry| entry.inum == inum)
    }
}

//! Directory entries and the operations that keep a directory's data
//! sectors consistent with its inode.

use bytemuck::{Pod, Zeroable};

use crate::bitmap;
use crate::disk::{Disk, DiskError};
use crate::error::OsError;
use crate::inode::{self, DiskInode};
use crate::param::{
    DIRENT_SIZE, DIRENTS_PER_SECTOR, MAX_DIRENTS, MAX_NAME, SECTOR_BITMAP_SECTORS,
    SECTOR_BITMAP_START, SECTOR_SIZE, TOTAL_SECTORS,
};

/// One directory entry: a NUL-terminated name and the inode it refers to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Dirent {
    pub name: [u8; MAX_NAME],
    pub inum: u32,
}

const _: () = assert!(size_of::<Dirent>() == DIRENT_SIZE);

impl Dirent {
    pub fn new(name: &str, inum: u32) -> Self {
        let mut entry = Self {
            name: [0; MAX_NAME],
            inum,
        };
        // clip so the record always keeps its terminating NUL
        let bytes = name.as_bytes();
        let len = bytes.len().min(MAX_NAME - 1);
        entry.name[..len].copy_from_slice(&bytes[..len]);
        entry
    }

    /// Compares the stored NUL-terminated name against `name`.
    pub fn is_named(&self, name: &str) -> bool {
        let end = self.name.iter().position(|&c| c == 0).unwrap_or(MAX_NAME);
        &self.name[..end] == name.as_bytes()
    }
}

fn entry_at(buf: &[u8; SECTOR_SIZE], slot: usize) -> Dirent {
    let offset = slot * DIRENT_SIZE;
    bytemuck::pod_read_unaligned(&buf[offset..offset + DIRENT_SIZE])
}

fn put_entry(buf: &mut [u8; SECTOR_SIZE], slot: usize, entry: &Dirent) {
    let offset = slot * DIRENT_SIZE;
    buf[offset..offset + DIRENT_SIZE].copy_from_slice(bytemuck::bytes_of(entry));
}

/// Appends the entry `(name, child)` to the directory inode `parent_inum`.
/// The entry sector is flushed before the parent's size bump so a torn
/// update cannot claim an entry that was never written.
pub fn append(disk: &mut Disk, parent_inum: u32, name: &str, child: u32) -> Result<(), OsError> {
    let mut parent = inode::read(disk, parent_inum)?;
    let size = parent.size as usize;
    if size >= MAX_DIRENTS {
        log::debug!("dir: inode {parent_inum} is full");
        return Err(OsError::NoSpace);
    }

    let group = size / DIRENTS_PER_SECTOR;
    let mut buf = [0u8; SECTOR_SIZE];
    if size % DIRENTS_PER_SECTOR == 0 {
        // the entry starts a fresh data sector
        let sector = bitmap::first_unused(
            disk,
            SECTOR_BITMAP_START,
            SECTOR_BITMAP_SECTORS,
            TOTAL_SECTORS,
        )?
        .ok_or(OsError::NoSpace)?;
        parent.data[group] = sector;
        log::trace!("dir: sector {sector} for inode {parent_inum} group {group}");
    } else {
        disk.read(parent.data[group], &mut buf)?;
    }

    put_entry(&mut buf, size % DIRENTS_PER_SECTOR, &Dirent::new(name, child));
    disk.write(parent.data[group], &buf)?;

    parent.size += 1;
    inode::write(disk, parent_inum, &parent)?;
    Ok(())
}

/// Looks up `name` among the live entries of `parent`.
pub fn find(disk: &Disk, parent: &DiskInode, name: &str) -> Result<Option<u32>, DiskError> {
    let mut remaining = parent.size as usize;
    let mut group = 0;

    while remaining > 0 {
        let mut buf = [0u8; SECTOR_SIZE];
        disk.read(parent.data[group], &mut buf)?;

        for slot in 0..remaining.min(DIRENTS_PER_SECTOR) {
            let entry = entry_at(&buf, slot);
            if entry.is_named(name) {
                return Ok(Some(entry.inum));
            }
        }

        remaining = remaining.saturating_sub(DIRENTS_PER_SECTOR);
        group += 1;
    }

    Ok(None)
}

/// Removes the entry referring to `child` from the directory inode
/// `parent_inum`. The last live entry moves into the vacated slot so the
/// entries stay packed; an emptied tail sector is returned to the sector
/// bitmap.
pub fn remove(disk: &mut Disk, parent_inum: u32, child: u32) -> Result<(), OsError> {
    let mut parent = inode::read(disk, parent_inum)?;
    let size = parent.size as usize;

    let mut hole = None;
    let mut remaining = size;
    let mut group = 0;
    while remaining > 0 && hole.is_none() {
        let mut buf = [0u8; SECTOR_SIZE];
        disk.read(parent.data[group], &mut buf)?;
        for slot in 0..remaining.min(DIRENTS_PER_SECTOR) {
            if entry_at(&buf, slot).inum == child {
                hole = Some((group, slot));
                break;
            }
        }
        remaining = remaining.saturating_sub(DIRENTS_PER_SECTOR);
        group += 1;
    }
    let Some((hole_group, hole_slot)) = hole else {
        log::debug!("dir: inode {child} not present in inode {parent_inum}");
        return Err(OsError::General);
    };

    let last = size - 1;
    let last_group = last / DIRENTS_PER_SECTOR;
    let last_slot = last % DIRENTS_PER_SECTOR;

    let mut last_buf = [0u8; SECTOR_SIZE];
    disk.read(parent.data[last_group], &mut last_buf)?;
    let moved = entry_at(&last_buf, last_slot);
    put_entry(&mut last_buf, last_slot, &Dirent::zeroed());

    if hole_group == last_group {
        if hole_slot != last_slot {
            put_entry(&mut last_buf, hole_slot, &moved);
        }
        disk.write(parent.data[last_group], &last_buf)?;
    } else {
        disk.write(parent.data[last_group], &last_buf)?;
        let mut hole_buf = [0u8; SECTOR_SIZE];
        disk.read(parent.data[hole_group], &mut hole_buf)?;
        put_entry(&mut hole_buf, hole_slot, &moved);
        disk.write(parent.data[hole_group], &hole_buf)?;
    }

    parent.size -= 1;
    if last_slot == 0 {
        // the tail sector held its final entry
        let sector = parent.data[last_group];
        bitmap::clear(disk, SECTOR_BITMAP_START, sector)?;
        parent.data[last_group] = 0;
    }
    inode::write(disk, parent_inum, &parent)?;
    Ok(())
}

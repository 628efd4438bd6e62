//! On-disk inode records and the inode table accessor.

use bytemuck::{Pod, Zeroable};

use crate::disk::{Disk, DiskError};
use crate::param::{
    INODE_SIZE, INODE_TABLE_START, INODES_PER_SECTOR, MAX_SECTORS_PER_FILE, SECTOR_SIZE,
};

/// Inode kinds
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct InodeKind(u32);

impl InodeKind {
    pub const FILE: Self = Self(0);
    pub const DIR: Self = Self(1);

    pub fn is_dir(self) -> bool {
        self == Self::DIR
    }
}

/// On-disk inode record. `size` counts bytes for files and entries for
/// directories. `data` holds direct sector indices; unused slots are zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DiskInode {
    pub size: u32,
    pub kind: InodeKind,
    pub data: [u32; MAX_SECTORS_PER_FILE],
}

const _: () = assert!(size_of::<DiskInode>() == INODE_SIZE);

impl DiskInode {
    /// An empty inode of the given kind.
    pub fn new(kind: InodeKind) -> Self {
        Self {
            size: 0,
            kind,
            data: [0; MAX_SECTORS_PER_FILE],
        }
    }
}

/// Sector and byte offset of inode `inum` in the inode table.
fn locate(inum: u32) -> (u32, usize) {
    let sector = INODE_TABLE_START + inum / INODES_PER_SECTOR as u32;
    let offset = inum as usize % INODES_PER_SECTOR * INODE_SIZE;
    (sector, offset)
}

/// Reads inode `inum` from the inode table.
pub fn read(disk: &Disk, inum: u32) -> Result<DiskInode, DiskError> {
    let (sector, offset) = locate(inum);
    let mut buf = [0u8; SECTOR_SIZE];
    disk.read(sector, &mut buf)?;
    Ok(bytemuck::pod_read_unaligned(&buf[offset..offset + INODE_SIZE]))
}

/// Writes inode `inum` back to the inode table.
pub fn write(disk: &mut Disk, inum: u32, inode: &DiskInode) -> Result<(), DiskError> {
    let (sector, offset) = locate(inum);
    let mut buf = [0u8; SECTOR_SIZE];
    disk.read(sector, &mut buf)?;
    buf[offset..offset + INODE_SIZE].copy_from_slice(bytemuck::bytes_of(inode));
    disk.write(sector, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::MAX_FILES;

    #[test]
    fn roundtrip_across_sector_boundaries() {
        let mut disk = Disk::new();
        for inum in [0u32, 3, 4, MAX_FILES as u32 - 1] {
            let mut node = DiskInode::new(InodeKind::FILE);
            node.size = inum * 7 + 1;
            node.data[0] = 300 + inum;
            write(&mut disk, inum, &node).unwrap();
        }

        for inum in [0u32, 3, 4, MAX_FILES as u32 - 1] {
            let node = read(&disk, inum).unwrap();
            assert_eq!(node.size, inum * 7 + 1);
            assert_eq!(node.kind, InodeKind::FILE);
            assert_eq!(node.data[0], 300 + inum);
        }
    }

    #[test]
    fn write_preserves_neighbours() {
        let mut disk = Disk::new();
        write(&mut disk, 0, &DiskInode::new(InodeKind::DIR)).unwrap();

        let mut node = DiskInode::new(InodeKind::FILE);
        node.size = 42;
        write(&mut disk, 1, &node).unwrap();

        assert_eq!(read(&disk, 0).unwrap().kind, InodeKind::DIR);
        assert_eq!(read(&disk, 1).unwrap().size, 42);
    }
}

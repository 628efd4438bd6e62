//! The block device: a fixed array of sectors kept in memory, mirrored to a
//! host backstore file on demand.

use std::fs;
use std::io;
use std::ops::Range;
use std::path::Path;

use thiserror::Error;

use crate::param::{IMAGE_SIZE, SECTOR_SIZE, TOTAL_SECTORS};

/// Failures reported by the block device.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("sector {0} out of range")]
    OutOfRange(u32),
    #[error("backstore has the wrong length")]
    ImageSize,
    #[error("backstore i/o failed: {0}")]
    Io(#[from] io::Error),
}

/// The in-memory disk image.
pub struct Disk {
    image: Vec<u8>,
}

impl Disk {
    /// Creates a zeroed disk image.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            image: vec![0; IMAGE_SIZE],
        }
    }

    fn range(sector: u32) -> Result<Range<usize>, DiskError> {
        let index = sector as usize;
        if index >= TOTAL_SECTORS {
            return Err(DiskError::OutOfRange(sector));
        }
        let start = index * SECTOR_SIZE;
        Ok(start..start + SECTOR_SIZE)
    }

    /// Copies one sector into `buf`.
    pub fn read(&self, sector: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), DiskError> {
        buf.copy_from_slice(&self.image[Self::range(sector)?]);
        Ok(())
    }

    /// Overwrites one sector with `buf`.
    pub fn write(&mut self, sector: u32, buf: &[u8; SECTOR_SIZE]) -> Result<(), DiskError> {
        let range = Self::range(sector)?;
        self.image[range].copy_from_slice(buf);
        Ok(())
    }

    /// Loads a whole disk image from the host file.
    /// The file must hold exactly `IMAGE_SIZE` bytes.
    pub fn load(path: &Path) -> Result<Self, DiskError> {
        let image = fs::read(path)?;
        if image.len() != IMAGE_SIZE {
            return Err(DiskError::ImageSize);
        }
        Ok(Self { image })
    }

    /// Saves the whole disk image to the host file.
    pub fn save(&self, path: &Path) -> Result<(), DiskError> {
        fs::write(path, &self.image)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_roundtrip() {
        let mut disk = Disk::new();
        let mut buf = [0xabu8; SECTOR_SIZE];
        disk.write(42, &buf).unwrap();

        let mut out = [0u8; SECTOR_SIZE];
        disk.read(42, &mut out).unwrap();
        assert_eq!(out, buf);

        // neighbours stay untouched
        disk.read(41, &mut buf).unwrap();
        assert_eq!(buf, [0u8; SECTOR_SIZE]);
    }

    #[test]
    fn out_of_range_sector() {
        let mut disk = Disk::new();
        let mut buf = [0u8; SECTOR_SIZE];
        assert!(matches!(
            disk.read(TOTAL_SECTORS as u32, &mut buf),
            Err(DiskError::OutOfRange(_))
        ));
        assert!(matches!(
            disk.write(u32::MAX, &buf),
            Err(DiskError::OutOfRange(_))
        ));
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");

        let mut disk = Disk::new();
        let buf = [0x5au8; SECTOR_SIZE];
        disk.write(7, &buf).unwrap();
        disk.save(&path).unwrap();

        let loaded = Disk::load(&path).unwrap();
        let mut out = [0u8; SECTOR_SIZE];
        loaded.read(7, &mut out).unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn load_rejects_wrong_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.img");
        fs::write(&path, [0u8; 100]).unwrap();
        assert!(matches!(Disk::load(&path), Err(DiskError::ImageSize)));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.img");
        match Disk::load(&path) {
            Ok(_) => panic!("load succeeded on a missing file"),
            Err(DiskError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::NotFound),
            Err(other) => panic!("expected an io error, got {other:?}"),
        }
    }
}

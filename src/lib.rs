//! A small UNIX-style file system that lives inside a fixed-size disk image
//! backed by a host file.
//!
//! [`Fs::boot`] loads (or formats) the image, namespace and file operations
//! mutate the in-memory copy, and [`Fs::sync`] writes it back to the host.

pub mod bitmap;
pub mod dir;
pub mod disk;
pub mod error;
pub mod file;
pub mod fs;
pub mod inode;
pub mod param;
pub mod path;

pub use error::OsError;
pub use fs::Fs;

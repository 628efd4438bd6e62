//! Absolute path resolution over the directory tree.

use crate::dir;
use crate::disk::Disk;
use crate::error::OsError;
use crate::inode;
use crate::param::{MAX_NAME, MAX_PATH};

/// The root directory's inode number
pub const ROOT_INUM: u32 = 0;

/// Result of resolving an absolute path: the inode of the directory that
/// contains (or would contain) the final component, the final component's
/// inode if it exists, and the component itself. Resolving `/` yields
/// `parent == child == 0` with an empty name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub parent: u32,
    pub child: Option<u32>,
    pub name: &'a str,
}

/// A name is legal when it is 1 to `MAX_NAME - 1` bytes of ASCII letters,
/// digits, dots, dashes and underscores.
pub fn legal_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() < MAX_NAME
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_')
}

/// Walks `path` from the root, one component at a time. Fails when the path
/// is not absolute, a component is illegal, or a non-final component is
/// missing or not a directory. Repeated slashes are ignored; `.` and `..`
/// are ordinary names, not navigation.
pub fn resolve<'a>(disk: &Disk, path: &'a str) -> Result<Resolved<'a>, OsError> {
    if !path.starts_with('/') || path.len() >= MAX_PATH {
        log::debug!("path: '{path}' is not a usable absolute path");
        return Err(OsError::General);
    }

    let mut parent = ROOT_INUM;
    let mut child = Some(ROOT_INUM);
    let mut name = "";

    for component in path.split('/').filter(|c| !c.is_empty()) {
        if !legal_name(component) {
            log::debug!("path: illegal component '{component}'");
            return Err(OsError::General);
        }

        // the previous component must exist and be a directory to descend
        let Some(dir_inum) = child else {
            log::debug!("path: '{name}' does not exist");
            return Err(OsError::General);
        };
        let node = inode::read(disk, dir_inum)?;
        if !node.kind.is_dir() {
            log::debug!("path: '{name}' is not a directory");
            return Err(OsError::General);
        }

        parent = dir_inum;
        child = dir::find(disk, &node, component)?;
        name = component;
    }

    Ok(Resolved { parent, child, name })
}

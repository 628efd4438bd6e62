//! End-to-end scenarios over the public API, each against its own backstore
//! file.

use octofs::param::{DIRENT_SIZE, MAX_NAME};
use octofs::{Fs, OsError};

use tempfile::TempDir;

fn boot_temp() -> (TempDir, Fs) {
    let dir = tempfile::tempdir().unwrap();
    let fs = Fs::boot(dir.path().join("fs.img")).unwrap();
    (dir, fs)
}

#[test]
fn format_and_read_empty_root() {
    let (_dir, fs) = boot_temp();

    assert_eq!(fs.dir_size("/"), 0);
    let mut buf = [0u8; 64];
    assert_eq!(fs.dir_read("/", &mut buf).unwrap(), 0);
}

#[test]
fn create_write_and_read_back() {
    let (_dir, mut fs) = boot_temp();

    fs.create_file("/a.txt").unwrap();
    let fd = fs.open("/a.txt").unwrap();

    assert_eq!(fs.write(fd, b"hello").unwrap(), 5);
    fs.seek(fd, 0).unwrap();

    let mut out = [0u8; 5];
    assert_eq!(fs.read(fd, &mut out).unwrap(), 5);
    assert_eq!(&out, b"hello");

    fs.close(fd).unwrap();
}

#[test]
fn create_rejects_illegal_name() {
    let (_dir, mut fs) = boot_temp();

    let err = fs.create_file("/bad name").unwrap_err();
    assert_eq!(err, OsError::Create);
    assert_eq!(err.errno(), -2);
}

#[test]
fn nonempty_directory_cannot_be_unlinked() {
    let (_dir, mut fs) = boot_temp();

    fs.create_dir("/d").unwrap();
    fs.create_file("/d/x").unwrap();
    assert_eq!(fs.unlink_dir("/d").unwrap_err(), OsError::DirNotEmpty);

    fs.unlink_file("/d/x").unwrap();
    fs.unlink_dir("/d").unwrap();
    assert_eq!(fs.dir_size("/"), 0);
}

#[test]
fn open_file_cannot_be_unlinked() {
    let (_dir, mut fs) = boot_temp();

    fs.create_file("/f").unwrap();
    let fd = fs.open("/f").unwrap();
    assert_eq!(fs.unlink_file("/f").unwrap_err(), OsError::FileInUse);

    fs.close(fd).unwrap();
    fs.unlink_file("/f").unwrap();
}

#[test]
fn seek_is_bounded_by_size() {
    let (_dir, mut fs) = boot_temp();

    fs.create_file("/f").unwrap();
    let fd = fs.open("/f").unwrap();
    fs.write(fd, &[0u8; 10]).unwrap();

    assert_eq!(fs.seek(fd, 11).unwrap_err(), OsError::SeekOutOfBounds);
    fs.seek(fd, 10).unwrap();
}

#[test]
fn root_directory_is_permanent() {
    let (_dir, mut fs) = boot_temp();
    assert_eq!(fs.unlink_dir("/").unwrap_err(), OsError::RootDir);
}

#[test]
fn create_unlink_twice_report_errors() {
    let (_dir, mut fs) = boot_temp();

    fs.create_file("/p").unwrap();
    assert_eq!(fs.create_file("/p").unwrap_err(), OsError::Create);

    fs.unlink_file("/p").unwrap();
    assert_eq!(fs.unlink_file("/p").unwrap_err(), OsError::NoSuchFile);
}

#[test]
fn synced_volume_survives_reboot() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("fs.img");

    {
        let mut fs = Fs::boot(&img).unwrap();
        fs.create_dir("/docs").unwrap();
        fs.create_file("/docs/a.txt").unwrap();
        let fd = fs.open("/docs/a.txt").unwrap();
        fs.write(fd, b"hello").unwrap();
        fs.close(fd).unwrap();
        fs.sync().unwrap();
    }

    let mut fs = Fs::boot(&img).unwrap();
    assert_eq!(fs.dir_size("/docs"), DIRENT_SIZE);

    let fd = fs.open("/docs/a.txt").unwrap();
    let mut out = [0u8; 5];
    assert_eq!(fs.read(fd, &mut out).unwrap(), 5);
    assert_eq!(&out, b"hello");
}

#[test]
fn unsynced_changes_do_not_reach_the_backstore() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("fs.img");

    {
        let mut fs = Fs::boot(&img).unwrap();
        fs.create_file("/volatile").unwrap();
        // dropped without sync
    }

    let mut fs = Fs::boot(&img).unwrap();
    assert_eq!(fs.open("/volatile").unwrap_err(), OsError::NoSuchFile);
}

#[test]
fn dir_read_returns_packed_records() {
    let (_dir, mut fs) = boot_temp();

    fs.create_file("/one").unwrap();
    fs.create_dir("/two").unwrap();

    let size = fs.dir_size("/");
    assert_eq!(size, 2 * DIRENT_SIZE);

    let mut buf = vec![0u8; size];
    assert_eq!(fs.dir_read("/", &mut buf).unwrap(), size);

    let mut names = Vec::new();
    for record in buf.chunks(DIRENT_SIZE) {
        let end = record[..MAX_NAME].iter().position(|&c| c == 0).unwrap();
        names.push(std::str::from_utf8(&record[..end]).unwrap().to_string());
    }
    assert_eq!(names, ["one", "two"]);
}

#[test]
fn deep_paths_resolve_after_reboot() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("fs.img");

    {
        let mut fs = Fs::boot(&img).unwrap();
        fs.create_dir("/a").unwrap();
        fs.create_dir("/a/b").unwrap();
        fs.create_dir("/a/b/c").unwrap();
        fs.create_file("/a/b/c/leaf").unwrap();
        let fd = fs.open("/a/b/c/leaf").unwrap();
        fs.write(fd, b"deep").unwrap();
        fs.close(fd).unwrap();
        fs.sync().unwrap();
    }

    let mut fs = Fs::boot(&img).unwrap();
    let fd = fs.open("//a/b//c/leaf").unwrap();
    let mut out = [0u8; 4];
    assert_eq!(fs.read(fd, &mut out).unwrap(), 4);
    assert_eq!(&out, b"deep");
}

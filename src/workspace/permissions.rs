//! 只读权限处理
//!
//! Loaded inputs are protected against accidental modification by removing
//! write permission from every file and directory below them.

use std::fs;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Remove write permission from `root` and everything below it
pub fn make_readonly_recursive(root: &Path) -> io::Result<()> {
    // children first, the directory itself last
    for entry in WalkDir::new(root).contents_first(true).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.path_is_symlink() {
            continue;
        }
        let mut permissions = entry.metadata().map_err(io::Error::from)?.permissions();
        permissions.set_readonly(true);
        fs::set_permissions(entry.path(), permissions)?;
    }
    Ok(())
}

/// Give write permission back to the owner of `root` and everything below it
pub fn make_writable_recursive(root: &Path) -> io::Result<()> {
    // parents first, so the walk can still read them
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.path_is_symlink() {
            continue;
        }
        make_writable(entry.path())?;
    }
    Ok(())
}

#[cfg(unix)]
fn make_writable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o200);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}

/**
 * Temporary file next to an archive being written
 *
 * The file is created with the mode a plain `File::create` would get, so an
 * archive persisted from it is readable by whoever could read the box.
 */
pub fn archive_temp_file(directory: &Path) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".bead-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // umask applies on creation
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(directory)
}

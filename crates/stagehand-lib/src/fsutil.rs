//! Filesystem helpers shared by the publish, checkout and cache paths.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Mode applied to freshly written pipeline files
pub const FILE_MODE: u32 = 0o664;
/// Mode applied to freshly created pipeline directories
pub const DIR_MODE: u32 = 0o775;

/// Current time as an RFC 3339 string
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Create a directory (and parents) with normalized permissions
pub fn mkdir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        set_permissions(path)?;
    }
    Ok(())
}

/// Apply the shared file or directory mode to `path`
pub fn set_permissions(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = if path.is_dir() { DIR_MODE } else { FILE_MODE };
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Copy a file or a directory tree to `dst`
pub fn copy_path(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        copy_dir_contents(src, dst)
    } else {
        std::fs::copy(src, dst).map(|_| ())
    }
}

/// Recursively copy directory contents from src to dst
pub fn copy_dir_contents(src: &Path, dst: &Path) -> io::Result<()> {
    if !dst.exists() {
        std::fs::create_dir_all(dst)?;
    }

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir_contents(&src_path, &dst_path)?;
        } else if file_type.is_file() {
            std::fs::copy(&src_path, &dst_path)?;
        } else if file_type.is_symlink() {
            let target = std::fs::read_link(&src_path)?;
            symlink(&target, &dst_path)?;
        }
    }

    Ok(())
}

/// Copy `src` over `dst` and normalize the new entry's permissions
///
/// `dst` keeps its previous content if the copy fails.
pub fn replace_path(src: &Path, dst: &Path) -> io::Result<()> {
    replace_with(dst, |staging| {
        copy_path(src, staging)?;
        set_permissions(staging)
    })
}

/// Build a new entry beside `dst` with `build`, then swap it into place
///
/// The entry is built under a hidden sibling name and only renamed over
/// `dst` once `build` succeeds. A directory at `dst` is moved aside first
/// and restored if the swap fails.
pub fn replace_with<F>(dst: &Path, build: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let staging = sibling(dst, "tmp");
    let backup = sibling(dst, "old");

    remove_path(&staging)?;
    if let Err(e) = build(&staging) {
        let _ = remove_path(&staging);
        return Err(e);
    }

    let is_dir =
        |path: &Path| matches!(std::fs::symlink_metadata(path), Ok(meta) if meta.is_dir());
    let displace = std::fs::symlink_metadata(dst).is_ok() && (is_dir(dst) || is_dir(&staging));
    if displace {
        remove_path(&backup)?;
        std::fs::rename(dst, &backup)?;
    }

    if let Err(e) = std::fs::rename(&staging, dst) {
        if displace {
            let _ = std::fs::rename(&backup, dst);
        }
        let _ = remove_path(&staging);
        return Err(e);
    }

    if displace {
        remove_path(&backup)?;
    }
    Ok(())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}", name, suffix))
}

/// Remove whatever occupies `path`: a file, a symlink or a directory tree
pub fn remove_path(path: &Path) -> io::Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Create a symbolic link at `link` pointing at `target`
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }
    #[cfg(windows)]
    {
        if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        }
    }
}

/// First free `<stem>_vNNN<ext>` sibling of `path`
///
/// Never returns a path that already exists, so repeated calls with the
/// same input never overwrite each other's results once written.
pub fn version_file(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut version = 0u32;
    loop {
        let candidate = parent.join(format!("{}_v{:03}{}", stem, version, ext));
        if std::fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        version += 1;
    }
}

/// Absolute, lexically normalized form of `path`
///
/// Resolves `.` and `..` without touching the filesystem, so symlinks are
/// preserved as written.
pub fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// Whether two paths name the same location once normalized
pub fn same_path(a: &Path, b: &Path) -> io::Result<bool> {
    Ok(normalize_path(a)? == normalize_path(b)?)
}

/// Whether `path` is `ancestor` or lies beneath it, once both are normalized
pub fn is_within(path: &Path, ancestor: &Path) -> io::Result<bool> {
    Ok(normalize_path(path)?.starts_with(normalize_path(ancestor)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_version_file_skips_existing() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("hero_geo_main.obj");

        let first = version_file(&base);
        assert_eq!(first, temp.path().join("hero_geo_main_v000.obj"));
        std::fs::write(&first, "v0").unwrap();

        let second = version_file(&base);
        assert_eq!(second, temp.path().join("hero_geo_main_v001.obj"));
    }

    #[test]
    fn test_version_file_without_extension() {
        let temp = TempDir::new().unwrap();
        let versioned = version_file(&temp.path().join("notes"));
        assert_eq!(versioned, temp.path().join("notes_v000"));
    }

    #[test]
    fn test_normalize_path() {
        let normalized = normalize_path(Path::new("/proj/assets/../shots/./a")).unwrap();
        assert_eq!(normalized, PathBuf::from("/proj/shots/a"));
    }

    #[test]
    fn test_copy_path_directory() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("sim");
        std::fs::create_dir_all(src.join("frames")).unwrap();
        std::fs::write(src.join("frames/0001.bgeo"), "frame").unwrap();

        let dst = temp.path().join("copy");
        copy_path(&src, &dst).unwrap();

        let content = std::fs::read_to_string(dst.join("frames/0001.bgeo")).unwrap();
        assert_eq!(content, "frame");
    }

    #[test]
    fn test_replace_path_swaps_directory_for_file() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("sim.abc");
        std::fs::write(&src, "new").unwrap();
        let dst = temp.path().join("slot");
        std::fs::create_dir_all(dst.join("stale")).unwrap();

        replace_path(&src, &dst).unwrap();

        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "new");
        assert!(!temp.path().join(".slot.tmp").exists());
        assert!(!temp.path().join(".slot.old").exists());
    }

    #[test]
    fn test_replace_with_keeps_previous_on_failure() {
        let temp = TempDir::new().unwrap();
        let dst = temp.path().join("slot");
        std::fs::write(&dst, "previous").unwrap();

        let result = replace_with(&dst, |staging| {
            std::fs::write(staging, "partial")?;
            Err(io::Error::other("copy failed"))
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "previous");
        assert!(!temp.path().join(".slot.tmp").exists());
    }

    #[test]
    fn test_is_within() {
        assert!(is_within(Path::new("/proj/a/b"), Path::new("/proj/a")).unwrap());
        assert!(is_within(Path::new("/proj/a"), Path::new("/proj/a/")).unwrap());
        assert!(!is_within(Path::new("/proj/ab"), Path::new("/proj/a")).unwrap());
        assert!(!is_within(Path::new("/proj"), Path::new("/proj/a")).unwrap());
    }

    #[test]
    fn test_remove_path_handles_all_kinds() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        let dir = temp.path().join("dir");
        std::fs::write(&file, "x").unwrap();
        std::fs::create_dir_all(dir.join("nested")).unwrap();

        remove_path(&file).unwrap();
        remove_path(&dir).unwrap();
        remove_path(&temp.path().join("missing")).unwrap();

        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_set_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let file = temp.path().join("published.obj");
        std::fs::write(&file, "data").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o600)).unwrap();

        set_permissions(&file).unwrap();

        let mode = std::fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, FILE_MODE);
    }
}

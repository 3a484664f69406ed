//! File-system provider.
//!
//! Everything above this layer talks to directories and files through
//! [`MediaFs`] and the opaque [`DirHandle`] / [`FileHandle`] references, so
//! the scanner, mover and session can run against any backing store.
//! [`LocalFs`] is the std::fs implementation used by the binary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use walkdir::WalkDir;

use crate::media;

/// Opaque reference to a directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DirHandle(PathBuf);

/// Opaque reference to a file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileHandle(PathBuf);

impl DirHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Last path component, or the whole path for roots like `/`.
    pub fn name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.to_string_lossy().into_owned())
    }
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[derive(Clone, Debug)]
pub enum Entry {
    File { name: String, handle: FileHandle },
    Dir { name: String, handle: DirHandle },
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::File { name, .. } | Entry::Dir { name, .. } => name,
        }
    }
}

/// What reading a file's metadata yields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub mime: String,
    /// Last-modified time, milliseconds since the Unix epoch.
    pub modified_ms: i64,
}

pub trait MediaFs {
    /// Immediate children of `dir`, files and directories, in provider order.
    fn entries(&self, dir: &DirHandle) -> io::Result<Vec<Entry>>;

    fn file_info(&self, file: &FileHandle) -> io::Result<FileInfo>;

    fn read(&self, file: &FileHandle) -> io::Result<Vec<u8>>;

    /// Child directory `name` of `parent`. With `create`, it is made if absent.
    fn dir(&self, parent: &DirHandle, name: &str, create: bool) -> io::Result<DirHandle>;

    /// Write the full content of `dir/name`, creating or truncating it.
    fn write(&self, dir: &DirHandle, name: &str, bytes: &[u8]) -> io::Result<FileHandle>;

    /// Remove the named entry of `dir`.
    fn remove(&self, dir: &DirHandle, name: &str) -> io::Result<()>;

    /// Rename `from` to `to` inside `dir`. The caller checks that `to` is
    /// free.
    ///
    /// The default copies through [`MediaFs::write`] and
    /// [`MediaFs::remove`]. A change of case alone goes through a
    /// temporary name, since on a case-insensitive store `from` and `to`
    /// are the same entry.
    fn rename(&self, dir: &DirHandle, from: &str, to: &str) -> io::Result<FileHandle> {
        let handle = self
            .entries(dir)?
            .into_iter()
            .find_map(|e| match e {
                Entry::File { name, handle } if name == from => Some(handle),
                _ => None,
            })
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", from))
            })?;
        let bytes = self.read(&handle)?;
        if from.to_lowercase() == to.to_lowercase() {
            let tmp = format!(".{}.renaming", to);
            self.write(dir, &tmp, &bytes)?;
            self.remove(dir, from)?;
            let out = self.write(dir, to, &bytes)?;
            self.remove(dir, &tmp)?;
            return Ok(out);
        }
        let out = self.write(dir, to, &bytes)?;
        self.remove(dir, from)?;
        Ok(out)
    }

    /// Whether two handles name the same directory.
    fn same_dir(&self, a: &DirHandle, b: &DirHandle) -> bool {
        a == b
    }

    /// All files below `dir` with the directory each was found in.
    ///
    /// The default walks through [`MediaFs::entries`]; subdirectories that
    /// cannot be listed are skipped.
    fn walk_files(&self, dir: &DirHandle) -> io::Result<Vec<(DirHandle, String, FileHandle)>> {
        let mut out = Vec::new();
        walk_into(self, dir, &mut out, true)?;
        Ok(out)
    }
}

fn walk_into<F: MediaFs + ?Sized>(
    fs: &F,
    dir: &DirHandle,
    out: &mut Vec<(DirHandle, String, FileHandle)>,
    is_root: bool,
) -> io::Result<()> {
    let entries = match fs.entries(dir) {
        Ok(e) => e,
        Err(e) if is_root => return Err(e),
        Err(e) => {
            log::debug!("walk: skipping {}: {}", dir.path().display(), e);
            return Ok(());
        }
    };
    for entry in entries {
        match entry {
            Entry::File { name, handle } => out.push((dir.clone(), name, handle)),
            Entry::Dir { handle, .. } => walk_into(fs, &handle, out, false)?,
        }
    }
    Ok(())
}

/// Reject names that would escape the directory they are meant for.
fn check_name(name: &str) -> io::Result<()> {
    let bad_char = name.contains(|c: char| c == '/' || c == '\\');
    if name.is_empty() || name == "." || name == ".." || bad_char {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid entry name: {:?}", name),
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn same_node(a: &fs::Metadata, b: &fs::Metadata, _: &Path, _: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    (a.dev(), a.ino()) == (b.dev(), b.ino())
}

#[cfg(not(unix))]
fn same_node(_: &fs::Metadata, _: &fs::Metadata, a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Local disk provider.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFs;

impl MediaFs for LocalFs {
    fn entries(&self, dir: &DirHandle) -> io::Result<Vec<Entry>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir.path())? {
            let Ok(entry) = entry else { continue };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            // Resolve symlinks so a link to a directory still lists as a directory.
            let is_dir = if file_type.is_symlink() {
                path.is_dir()
            } else {
                file_type.is_dir()
            };
            if is_dir {
                out.push(Entry::Dir {
                    name,
                    handle: DirHandle(path),
                });
            } else {
                out.push(Entry::File {
                    name,
                    handle: FileHandle(path),
                });
            }
        }
        Ok(out)
    }

    fn file_info(&self, file: &FileHandle) -> io::Result<FileInfo> {
        let meta = fs::metadata(file.path())?;
        let modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let name = file
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FileInfo {
            size: meta.len(),
            mime: media::mime_for(&name).to_string(),
            modified_ms,
        })
    }

    fn read(&self, file: &FileHandle) -> io::Result<Vec<u8>> {
        fs::read(file.path())
    }

    fn dir(&self, parent: &DirHandle, name: &str, create: bool) -> io::Result<DirHandle> {
        check_name(name)?;
        let path = parent.path().join(name);
        if create {
            fs::create_dir_all(&path)?;
        } else if !path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", path.display()),
            ));
        }
        Ok(DirHandle(path))
    }

    fn write(&self, dir: &DirHandle, name: &str, bytes: &[u8]) -> io::Result<FileHandle> {
        check_name(name)?;
        let path = dir.path().join(name);
        fs::write(&path, bytes)?;
        Ok(FileHandle(path))
    }

    fn remove(&self, dir: &DirHandle, name: &str) -> io::Result<()> {
        check_name(name)?;
        let path = dir.path().join(name);
        if fs::symlink_metadata(&path)?.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
    }

    fn rename(&self, dir: &DirHandle, from: &str, to: &str) -> io::Result<FileHandle> {
        check_name(from)?;
        check_name(to)?;
        let path = dir.path().join(to);
        fs::rename(dir.path().join(from), &path)?;
        Ok(FileHandle(path))
    }

    fn same_dir(&self, a: &DirHandle, b: &DirHandle) -> bool {
        if a == b {
            return true;
        }
        match (fs::metadata(a.path()), fs::metadata(b.path())) {
            (Ok(x), Ok(y)) => same_node(&x, &y, a.path(), b.path()),
            _ => false,
        }
    }

    fn walk_files(&self, dir: &DirHandle) -> io::Result<Vec<(DirHandle, String, FileHandle)>> {
        // Surface an unreadable root as an error, like `entries` would.
        fs::read_dir(dir.path())?;

        let mut out = Vec::new();
        for entry in WalkDir::new(dir.path())
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let parent = path.parent().unwrap_or(dir.path()).to_path_buf();
            let name = entry.file_name().to_string_lossy().into_owned();
            out.push((DirHandle(parent), name, FileHandle(path.to_path_buf())));
        }
        Ok(out)
    }
}

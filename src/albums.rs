//! Album index: first-level directories of the root are albums, their
//! own subdirectories are groups.

use anyhow::{Context, Result};

use crate::fs::{DirHandle, Entry, MediaFs};
use crate::model::AlbumEntry;
use crate::SorterError;

/// Albums of `root` with their groups, in provider order. Files at either
/// level are ignored. An album whose listing fails is kept with no groups.
pub fn load_albums<F: MediaFs + ?Sized>(fs: &F, root: &DirHandle) -> Result<Vec<AlbumEntry>> {
    let entries = fs
        .entries(root)
        .with_context(|| format!("cannot list {}", root.path().display()))?;

    let mut albums = Vec::new();
    for entry in entries {
        let Entry::Dir { name, handle } = entry else {
            continue;
        };
        let groups = match fs.entries(&handle) {
            Ok(children) => children
                .into_iter()
                .filter_map(|c| match c {
                    Entry::Dir { name, .. } => Some(name),
                    Entry::File { .. } => None,
                })
                .collect(),
            Err(e) => {
                log::debug!("albums: cannot list {}: {}", name, e);
                Vec::new()
            }
        };
        albums.push(AlbumEntry {
            name,
            handle,
            groups,
        });
    }
    Ok(albums)
}

/// Create album `name` under `root` if absent. The caller reloads the index.
pub fn add_album<F: MediaFs + ?Sized>(fs: &F, root: &DirHandle, name: &str) -> Result<DirHandle> {
    create_child(fs, root, name)
}

/// Create group `name` inside `album` if absent. The caller reloads the index.
pub fn add_group<F: MediaFs + ?Sized>(fs: &F, album: &DirHandle, name: &str) -> Result<DirHandle> {
    create_child(fs, album, name)
}

fn create_child<F: MediaFs + ?Sized>(fs: &F, parent: &DirHandle, name: &str) -> Result<DirHandle> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SorterError::EmptyName.into());
    }
    fs.dir(parent, name, true)
        .with_context(|| format!("cannot create {} in {}", name, parent.path().display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;

    #[test]
    fn album_with_two_groups() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Trip/2024")).unwrap();
        std::fs::create_dir_all(dir.path().join("Trip/2025")).unwrap();
        std::fs::write(dir.path().join("Trip/loose.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("root.jpg"), b"x").unwrap();

        let albums = load_albums(&LocalFs, &DirHandle::new(dir.path())).unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].name, "Trip");
        let mut groups = albums[0].groups.clone();
        groups.sort();
        assert_eq!(groups, vec!["2024", "2025"]);
    }

    #[test]
    fn empty_root_has_no_albums() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_albums(&LocalFs, &DirHandle::new(dir.path()))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn add_album_and_group_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = DirHandle::new(dir.path());

        let album = add_album(&LocalFs, &root, "Trip").unwrap();
        add_album(&LocalFs, &root, "Trip").unwrap();
        add_group(&LocalFs, &album, "2024").unwrap();
        add_group(&LocalFs, &album, " 2024 ").unwrap();

        let albums = load_albums(&LocalFs, &root).unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].groups, vec!["2024"]);
    }

    #[test]
    fn blank_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root = DirHandle::new(dir.path());
        let err = add_album(&LocalFs, &root, "   ").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SorterError>(),
            Some(SorterError::EmptyName)
        ));
        assert!(load_albums(&LocalFs, &root).unwrap().is_empty());
    }
}

//! Moves dragged files into an album group.
//!
//! A move is copy-then-delete through the provider: read the source, write
//! it under `album/group`, remove it from the directory it was scanned in.

use anyhow::{Context, Result};

use crate::fs::{DirHandle, MediaFs};
use crate::model::FileEntry;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveReport {
    pub moved: usize,
    pub failed: usize,
    /// `(name, reason)` for every failed name, in payload order.
    pub failures: Vec<(String, String)>,
}

impl MoveReport {
    pub fn summary(&self) -> String {
        format!("Moved {} file(s), {} failed.", self.moved, self.failed)
    }
}

/// Names carried by a drag payload. Anything but a JSON array of strings
/// yields no names.
pub fn parse_payload(payload: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(payload) {
        Ok(names) => names,
        Err(e) => {
            log::debug!("mover: ignoring malformed payload {:?}: {}", payload, e);
            Vec::new()
        }
    }
}

/// Move each named file into `album/group`, one after another. A name
/// matching no entry, or any failing step, counts as a failure and the
/// rest carry on. With duplicate names the first entry wins.
pub fn move_files<F: MediaFs + ?Sized>(
    fs: &F,
    files: &[FileEntry],
    names: &[String],
    album: &DirHandle,
    group: &str,
) -> MoveReport {
    let mut report = MoveReport::default();
    for name in names {
        match move_one(fs, files, name, album, group) {
            Ok(()) => report.moved += 1,
            Err(e) => {
                log::warn!("move {}: {:#}", name, e);
                report.failed += 1;
                report.failures.push((name.clone(), format!("{:#}", e)));
            }
        }
    }
    log::info!("{}", report.summary());
    report
}

fn move_one<F: MediaFs + ?Sized>(
    fs: &F,
    files: &[FileEntry],
    name: &str,
    album: &DirHandle,
    group: &str,
) -> Result<()> {
    let entry = files
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| crate::SorterError::UnknownFile(name.to_string()))?;

    let bytes = fs.read(&entry.handle).context("read")?;
    let dest = fs.dir(album, group, true).context("open group")?;
    if fs.same_dir(&dest, &entry.parent) {
        // Already there; writing then removing would destroy the file.
        return Ok(());
    }
    fs.write(&dest, name, &bytes).context("write")?;
    fs.remove(&entry.parent, name).context("remove source")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use crate::scanner;

    struct Fixture {
        _tmp: tempfile::TempDir,
        root: DirHandle,
        album: DirHandle,
    }

    fn fixture(files: &[&str]) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        for f in files {
            let p = tmp.path().join(f);
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
            std::fs::write(&p, f.as_bytes()).unwrap();
        }
        std::fs::create_dir_all(tmp.path().join("Trip")).unwrap();
        let root = DirHandle::new(tmp.path());
        let album = DirHandle::new(tmp.path().join("Trip"));
        Fixture {
            _tmp: tmp,
            root,
            album,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn moves_and_reports_missing() {
        let fx = fixture(&["a.jpg", "b.jpg"]);
        let files = scanner::scan_top(&LocalFs, &fx.root).unwrap();

        let report = move_files(
            &LocalFs,
            &files,
            &names(&["a.jpg", "missing.jpg"]),
            &fx.album,
            "2024",
        );
        assert_eq!(report.moved, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].0, "missing.jpg");
        assert_eq!(report.summary(), "Moved 1 file(s), 1 failed.");

        let moved = fx.album.path().join("2024/a.jpg");
        assert_eq!(std::fs::read(moved).unwrap(), b"a.jpg");

        let rescan = scanner::scan_top(&LocalFs, &fx.root).unwrap();
        let left: Vec<&str> = rescan.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(left, vec!["b.jpg"]);
    }

    #[test]
    fn deep_entries_leave_their_own_directory() {
        let fx = fixture(&["nested/deep/c.png"]);
        let files = scanner::scan_deep(&LocalFs, &fx.root).unwrap();

        let report = move_files(&LocalFs, &files, &names(&["c.png"]), &fx.album, "G");
        assert_eq!(report.moved, 1);
        assert!(!fx.root.path().join("nested/deep/c.png").exists());
        assert!(fx.album.path().join("G/c.png").exists());
    }

    #[test]
    fn moving_into_current_group_keeps_file() {
        let fx = fixture(&["Trip/G/x.jpg"]);
        let group = DirHandle::new(fx.album.path().join("G"));
        let files = scanner::scan_top(&LocalFs, &group).unwrap();

        let report = move_files(&LocalFs, &files, &names(&["x.jpg"]), &fx.album, "G");
        assert_eq!(report.moved, 1);
        assert!(group.path().join("x.jpg").exists());
    }

    #[cfg(unix)]
    #[test]
    fn group_reached_by_another_name_keeps_file() {
        let fx = fixture(&["Trip/G/x.jpg"]);
        std::os::unix::fs::symlink(fx.album.path().join("G"), fx.album.path().join("g")).unwrap();
        let group = DirHandle::new(fx.album.path().join("G"));
        let files = scanner::scan_top(&LocalFs, &group).unwrap();

        let report = move_files(&LocalFs, &files, &names(&["x.jpg"]), &fx.album, "g");
        assert_eq!(report.moved, 1);
        assert_eq!(std::fs::read(group.path().join("x.jpg")).unwrap(), b"Trip/G/x.jpg");
    }

    #[test]
    fn empty_names_move_nothing() {
        let fx = fixture(&["a.jpg"]);
        let files = scanner::scan_top(&LocalFs, &fx.root).unwrap();
        let report = move_files(&LocalFs, &files, &[], &fx.album, "G");
        assert_eq!(report, MoveReport::default());
        assert!(fx.root.path().join("a.jpg").exists());
    }

    // ── payload ─────────────────────────────────────────────────────────

    #[test]
    fn payload_parsing() {
        assert_eq!(parse_payload(r#"["a.jpg","b c.png"]"#), names(&["a.jpg", "b c.png"]));
        assert!(parse_payload("[]").is_empty());
        assert!(parse_payload("").is_empty());
        assert!(parse_payload("not json").is_empty());
        assert!(parse_payload(r#"{"a":1}"#).is_empty());
        assert!(parse_payload("[1,2]").is_empty());
    }
}
